//! Reader for the YIN form: the XML mapping of YANG statements.
//!
//! Each statement keyword becomes an element in the YIN namespace; its
//! argument travels either as an attribute or as a child element, per the
//! RFC 6020 §11.1 table reproduced in [`argument_shape`].

use roxmltree::Node;

use crate::stmt::{Document, Keyword, Statement};
use crate::{Error, SyntaxTree};

pub const YIN_NAMESPACE: &str = "urn:ietf:params:xml:ns:yang:yin:1";

/// How a keyword's argument is carried in YIN.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ArgumentShape {
    /// No argument at all (`input`, `output`).
    None,
    /// `<keyword argname="..."/>`
    Attribute(&'static str),
    /// `<keyword><argname>...</argname></keyword>`
    Element(&'static str),
}

/// The RFC 6020 §11.1 argument-placement table.
pub fn argument_shape(keyword: &Keyword) -> ArgumentShape {
    use ArgumentShape::*;
    match keyword {
        Keyword::Anyxml => Attribute("name"),
        Keyword::Argument => Attribute("name"),
        Keyword::Augment => Attribute("target-node"),
        Keyword::Base => Attribute("name"),
        Keyword::BelongsTo => Attribute("module"),
        Keyword::Bit => Attribute("name"),
        Keyword::Case => Attribute("name"),
        Keyword::Choice => Attribute("name"),
        Keyword::Config => Attribute("value"),
        Keyword::Contact => Element("text"),
        Keyword::Container => Attribute("name"),
        Keyword::Default => Attribute("value"),
        Keyword::Description => Element("text"),
        Keyword::Deviate => Attribute("value"),
        Keyword::Deviation => Attribute("target-node"),
        Keyword::Enum => Attribute("name"),
        Keyword::ErrorAppTag => Attribute("value"),
        Keyword::ErrorMessage => Element("value"),
        Keyword::Extension => Attribute("name"),
        Keyword::Feature => Attribute("name"),
        Keyword::FractionDigits => Attribute("value"),
        Keyword::Grouping => Attribute("name"),
        Keyword::Identity => Attribute("name"),
        Keyword::IfFeature => Attribute("name"),
        Keyword::Import => Attribute("module"),
        Keyword::Include => Attribute("module"),
        Keyword::Input => None,
        Keyword::Key => Attribute("value"),
        Keyword::Leaf => Attribute("name"),
        Keyword::LeafList => Attribute("name"),
        Keyword::Length => Attribute("value"),
        Keyword::List => Attribute("name"),
        Keyword::Mandatory => Attribute("value"),
        Keyword::MaxElements => Attribute("value"),
        Keyword::MinElements => Attribute("value"),
        Keyword::Module => Attribute("name"),
        Keyword::Must => Attribute("condition"),
        Keyword::Namespace => Attribute("uri"),
        Keyword::Notification => Attribute("name"),
        Keyword::OrderedBy => Attribute("value"),
        Keyword::Organization => Element("text"),
        Keyword::Output => None,
        Keyword::Path => Attribute("value"),
        Keyword::Pattern => Attribute("value"),
        Keyword::Position => Attribute("value"),
        Keyword::Prefix => Attribute("value"),
        Keyword::Presence => Attribute("value"),
        Keyword::Range => Attribute("value"),
        Keyword::Reference => Element("text"),
        Keyword::Refine => Attribute("target-node"),
        Keyword::RequireInstance => Attribute("value"),
        Keyword::Revision => Attribute("date"),
        Keyword::RevisionDate => Attribute("date"),
        Keyword::Rpc => Attribute("name"),
        Keyword::Status => Attribute("value"),
        Keyword::Submodule => Attribute("name"),
        Keyword::Type => Attribute("name"),
        Keyword::Typedef => Attribute("name"),
        Keyword::Unique => Attribute("tag"),
        Keyword::Units => Attribute("name"),
        Keyword::Uses => Attribute("name"),
        Keyword::Value => Attribute("value"),
        Keyword::When => Attribute("condition"),
        Keyword::YangVersion => Attribute("value"),
        Keyword::YinElement => Attribute("value"),
        Keyword::Unknown(_) => None,
    }
}

/// Parse a YIN document into the same statement tree the YANG grammar
/// produces.
pub fn parse(input: &str) -> SyntaxTree {
    let mut errors = Vec::new();
    let mut statements = Vec::new();

    match roxmltree::Document::parse(input) {
        Ok(doc) => {
            let root = doc.root_element();
            match element_to_statement(root, &mut errors) {
                Some(statement) => statements.push(statement),
                None => errors.push(Error::with_loc(
                    "expected a `module` or `submodule` element",
                    root.tag_name().name().to_string(),
                    root.range().start,
                )),
            }
        }
        Err(e) => errors.push(Error::new("malformed XML", e.to_string())),
    }

    SyntaxTree::from_parts(Document { statements }, errors)
}

fn element_to_statement(node: Node, errors: &mut Vec<Error>) -> Option<Statement> {
    let loc = node.range().start;
    let keyword = match node.tag_name().namespace() {
        Some(YIN_NAMESPACE) | None => Keyword::from_word(node.tag_name().name()),
        Some(_) => {
            // Extension statement from another namespace; keep the prefixed
            // name as written.
            let name = match node.lookup_prefix(node.tag_name().namespace().unwrap()) {
                Some(prefix) if !prefix.is_empty() => {
                    format!("{prefix}:{}", node.tag_name().name())
                }
                _ => node.tag_name().name().to_string(),
            };
            Keyword::Unknown(name)
        }
    };

    if let Keyword::Unknown(name) = &keyword {
        if node.tag_name().namespace() == Some(YIN_NAMESPACE) {
            errors.push(Error::with_loc(
                "unknown YIN statement element",
                name.clone(),
                loc,
            ));
            return None;
        }
    }

    let shape = argument_shape(&keyword);
    let mut arg = match shape {
        ArgumentShape::None => None,
        ArgumentShape::Attribute(name) => {
            let value = node.attribute(name).map(str::to_string);
            if value.is_none() && !matches!(keyword, Keyword::Unknown(_)) {
                errors.push(Error::with_loc(
                    format!("missing `{name}` argument attribute"),
                    keyword.as_str().to_string(),
                    loc,
                ));
            }
            value
        }
        ArgumentShape::Element(name) => {
            let value = node
                .children()
                .find(|c| c.is_element() && c.tag_name().name() == name)
                .map(|c| c.text().unwrap_or_default().to_string());
            if value.is_none() {
                errors.push(Error::with_loc(
                    format!("missing `{name}` argument element"),
                    keyword.as_str().to_string(),
                    loc,
                ));
            }
            value
        }
    };

    // Extension statements carry their argument wherever their definition
    // put it; accept either form.
    if matches!(keyword, Keyword::Unknown(_)) && arg.is_none() {
        arg = node
            .attributes()
            .next()
            .map(|a| a.value().to_string())
            .or_else(|| node.text().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()));
    }

    let mut statement = Statement::new(keyword, arg, loc);
    for child in node.children().filter(|c| c.is_element()) {
        // Skip the argument-carrying element; it is not a substatement.
        if let ArgumentShape::Element(name) = shape {
            if child.tag_name().name() == name
                && child.tag_name().namespace() == Some(YIN_NAMESPACE)
            {
                continue;
            }
        }
        if let Some(child_statement) = element_to_statement(child, errors) {
            statement.children.push(child_statement);
        }
    }

    Some(statement)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stmt::Keyword;

    #[test]
    fn it_maps_yin_onto_statements() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<module name="example"
        xmlns="urn:ietf:params:xml:ns:yang:yin:1"
        xmlns:ex="urn:example">
  <namespace uri="urn:example"/>
  <prefix value="ex"/>
  <description>
    <text>An example module.</text>
  </description>
  <leaf name="greeting">
    <type name="string"/>
  </leaf>
</module>
"#;

        let tree = parse(input);
        assert!(tree.errors().is_empty(), "{:?}", tree.errors());

        let module = &tree.document().statements[0];
        assert_eq!(module.keyword, Keyword::Module);
        assert_eq!(module.arg.as_deref(), Some("example"));

        let description = module.child(&Keyword::Description).unwrap();
        assert_eq!(description.arg.as_deref(), Some("An example module."));

        let leaf = module.child(&Keyword::Leaf).unwrap();
        assert_eq!(leaf.arg.as_deref(), Some("greeting"));
        assert_eq!(
            leaf.child(&Keyword::Type).unwrap().arg.as_deref(),
            Some("string")
        );
    }

    #[test]
    fn it_rejects_missing_arguments() {
        let input = r#"<module xmlns="urn:ietf:params:xml:ns:yang:yin:1"/>"#;
        let tree = parse(input);
        assert!(!tree.errors().is_empty());
    }
}
