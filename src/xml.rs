use sxd_document::{parser, Package};
use sxd_xpath::{Context, Factory};

/// A parsed XML document that answers XPath string queries.
pub struct Xml {
    package: Package,
}

impl Xml {
    pub fn parse(text: &str) -> Result<Self, parser::Error> {
        Ok(Self {
            package: parser::parse(text)?,
        })
    }

    /// Local name of the document element, if there is one.
    pub fn root_name(&self) -> Option<String> {
        self.package
            .as_document()
            .root()
            .children()
            .into_iter()
            .find_map(|child| child.element())
            .map(|element| element.name().local_part().to_string())
    }

    /// String value of `expr`, evaluated from the document root.
    ///
    /// `namespaces` binds prefixes usable in `expr`, and `variables` binds
    /// `$name` references to string values. A node-set result yields the
    /// string value of its first node in document order, or an empty string
    /// when nothing matched.
    pub fn string(
        &self,
        expr: &str,
        namespaces: &[(&str, &str)],
        variables: &[(&str, &str)],
    ) -> Result<String, sxd_xpath::Error> {
        let document = self.package.as_document();
        // An empty expression builds to nothing and selects nothing.
        let Some(xpath) = Factory::new().build(expr)? else {
            return Ok(String::new());
        };

        let mut context = Context::new();
        for (prefix, uri) in namespaces {
            context.set_namespace(prefix, uri);
        }
        for (name, value) in variables {
            context.set_variable(*name, value.to_string());
        }

        Ok(xpath.evaluate(&context, document.root())?.string())
    }
}
