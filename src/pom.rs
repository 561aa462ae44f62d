use std::path::Path;
use thiserror::Error;
use crate::xml::Xml;
use Error::*;

pub const NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";

#[derive(Error, Debug)]
pub enum Error {
    #[error("read {path}: {err}")]
    ReadFile {
        err: std::io::Error,
        path: String,
    },

    #[error("parse: {0}")]
    Parse(#[from] sxd_document::parser::Error),

    #[error("xpath: {0}")]
    XPath(#[from] sxd_xpath::Error),

    #[error("no groupId in project or parent")]
    GroupIdNotFound,
}

/// Maven group id of a project descriptor.
///
/// A project that omits its own `groupId` inherits the one declared in
/// its `<parent>` block.
pub fn group_id(pom: &str) -> Result<String, Error> {
    let xml = Xml::parse(pom)?;
    let namespaces = [("pom", NAMESPACE)];

    for expr in ["/pom:project/pom:groupId", "/pom:project/pom:parent/pom:groupId"] {
        let group_id = xml.string(expr, &namespaces, &[])?;
        let group_id = group_id.trim();
        if !group_id.is_empty() {
            return Ok(group_id.to_string());
        }
    }

    Err(GroupIdNotFound)
}

pub fn group_id_from_file(path: &Path) -> Result<String, Error> {
    group_id(&std::fs::read_to_string(path).map_err(|err| ReadFile {
        err,
        path: path.display().to_string(),
    })?)
}
