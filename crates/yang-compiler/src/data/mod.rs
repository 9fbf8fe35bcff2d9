//! Data instance trees bound to a sealed schema.
//!
//! A [`DataTree`] holds instance nodes that each point at the schema node
//! they instantiate. Parsing validates leaf values against the resolved
//! types; structural (mandatory/min/max/choice) validation is a separate
//! pass so partial documents can be assembled first.

mod json;
mod validate;
mod xml;

use crate::schema::NodeId;

/// Options for the data printers.
#[derive(Clone, Copy, Debug)]
pub struct DataPrintOptions {
    /// Pretty-print with newlines and two-space indentation.
    pub format: bool,
    /// Print the entire top-level chain instead of only the first root.
    pub with_siblings: bool,
    /// Mark defaulted leaves, using the `ietf-netconf-with-defaults`
    /// namespace when that module is loaded.
    pub with_defaults: bool,
}

impl Default for DataPrintOptions {
    fn default() -> Self {
        Self {
            format: true,
            with_siblings: true,
            with_defaults: false,
        }
    }
}

/// One data instance node.
#[derive(Clone, Debug, PartialEq)]
pub struct DataNode {
    pub schema: NodeId,
    /// Canonical value for leafs, leaf-lists and anyxml content.
    pub value: Option<String>,
    pub children: Vec<DataNode>,
    /// Instantiated from a schema default rather than input.
    pub default: bool,
}

impl DataNode {
    pub(crate) fn new(schema: NodeId) -> Self {
        Self {
            schema,
            value: None,
            children: Vec::new(),
            default: false,
        }
    }
}

/// A parsed data document: the top-level sibling chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataTree {
    pub roots: Vec<DataNode>,
}
