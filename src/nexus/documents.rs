//! Request bodies and response interpretation for the staging API.
//!
//! Every response is a small XML document. Success documents are rooted at
//! the element named after the call (`stagingProfiles`, `promoteResponse`,
//! `stagingRepositories`); failures are rooted at `nexus-error`:
//!
//! ```xml
//! <nexus-error>
//!   <errors>
//!     <error><id>*</id><msg>Unhandled: Missing staging profile</msg></error>
//!   </errors>
//! </nexus-error>
//! ```

use sxd_document::{writer, Package};
use crate::xml::Xml;
use super::Error;

const ERROR_ROOT: &str = "nexus-error";

/// `<promoteRequest>` body for `start`, `finish` and `release`.
///
/// `start` sends only a description; the other calls name the staged
/// repository they act on.
pub fn promote_request(staged_repository_id: Option<&str>, description: &str) -> Result<String, Error> {
    let package = Package::new();
    let document = package.as_document();

    let request = document.create_element("promoteRequest");
    let data = document.create_element("data");
    if let Some(id) = staged_repository_id {
        let element = document.create_element("stagedRepositoryId");
        element.set_text(id);
        data.append_child(element);
    }
    let element = document.create_element("description");
    element.set_text(description);
    data.append_child(element);
    request.append_child(data);
    document.root().append_child(request);

    let mut body = Vec::new();
    writer::format_document(&document, &mut body)?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Parse `body` and check that it is rooted at `expected`.
///
/// A `nexus-error` document becomes [`Error::RemoteApi`] carrying the
/// provider's message verbatim; anything else becomes
/// [`Error::UnexpectedResponse`].
fn expect_root(status: u16, body: &str, expected: &str) -> Result<Xml, Error> {
    let unexpected = || Error::UnexpectedResponse {
        status,
        body: body.to_string(),
    };

    let xml = Xml::parse(body).map_err(|_| unexpected())?;
    match xml.root_name().as_deref() {
        Some(name) if name == expected => Ok(xml),
        Some(ERROR_ROOT) => Err(Error::RemoteApi(
            xml.string("/nexus-error/errors/error/msg", &[], &[])?,
        )),
        _ => Err(unexpected()),
    }
}

/// Id of the staging profile named after `group_id`.
pub fn profile_id(status: u16, body: &str, group_id: &str) -> Result<String, Error> {
    let xml = expect_root(status, body, "stagingProfiles")?;
    let id = xml.string("/stagingProfiles/data/*[name=$group]/id", &[], &[("group", group_id)])?;
    if id.is_empty() {
        return Err(Error::ProfileNotFound(group_id.to_string()));
    }
    Ok(id)
}

/// Id of the repository opened by a `start` call.
pub fn staged_repository_id(status: u16, body: &str) -> Result<String, Error> {
    let xml = expect_root(status, body, "promoteResponse")?;
    let id = xml.string("/promoteResponse/data/stagedRepositoryId", &[], &[])?;
    if id.is_empty() {
        return Err(Error::UnexpectedResponse {
            status,
            body: body.to_string(),
        });
    }
    Ok(id)
}

/// Lifecycle status (`open`, `closed`, ...) of `repository_id`.
pub fn repository_status(status: u16, body: &str, repository_id: &str) -> Result<String, Error> {
    let xml = expect_root(status, body, "stagingRepositories")?;
    let typ = xml.string(
        "/stagingRepositories/data/*[repositoryId=$repository]/type",
        &[],
        &[("repository", repository_id)],
    )?;
    if typ.is_empty() {
        return Err(Error::RepositoryNotFound(repository_id.to_string()));
    }
    Ok(typ)
}

/// `finish` and `release` answer with an empty body on success.
pub fn acknowledgement(status: u16, body: &str) -> Result<(), Error> {
    let success = (200..300).contains(&status);
    if success && body.trim().is_empty() {
        return Ok(());
    }
    match Xml::parse(body) {
        Ok(xml) if xml.root_name().as_deref() == Some(ERROR_ROOT) => Err(Error::RemoteApi(
            xml.string("/nexus-error/errors/error/msg", &[], &[])?,
        )),
        _ if success => Ok(()),
        _ => Err(Error::UnexpectedResponse {
            status,
            body: body.to_string(),
        }),
    }
}
