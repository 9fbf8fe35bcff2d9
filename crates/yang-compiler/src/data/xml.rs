//! XML data documents: parsing against a sealed schema and printing.

use roxmltree::Node as XmlNode;

use crate::context::Context;
use crate::data::{DataNode, DataPrintOptions, DataTree};
use crate::error::{Error, ErrorKind, Result};
use crate::schema::{ModuleId, NodeId, NodeKind, TypeBase};
use crate::value;

const WITH_DEFAULTS_MODULE: &str = "ietf-netconf-with-defaults";

impl Context {
    /// Parse an XML data document. Every element must match a data node of a
    /// loaded module, located by namespace at the top and by parent below;
    /// leaf values are checked against their resolved types.
    pub fn parse_data_xml(&self, text: &str) -> Result<DataTree> {
        let doc = roxmltree::Document::parse(text).map_err(|e| {
            Error::new(ErrorKind::InvalidValue {
                keyword: "xml".to_string(),
                value: e.to_string(),
            })
        })?;

        let mut tree = DataTree::default();
        let root = doc.root_element();
        // NETCONF-style `<data>`/`<config>` wrappers carry a top-level
        // sibling chain; anything else is itself a data root.
        let is_wrapper =
            root.tag_name().namespace().is_none() && matches!(root.tag_name().name(), "data" | "config");
        if is_wrapper {
            for element in root.children().filter(|c| c.is_element()) {
                tree.roots.push(self.read_element(element, None)?);
            }
        } else {
            tree.roots.push(self.read_element(root, None)?);
        }
        Ok(tree)
    }

    fn read_element(&self, element: XmlNode, parent: Option<NodeId>) -> Result<DataNode> {
        let name = element.tag_name().name();
        let module = match element.tag_name().namespace() {
            Some(namespace) => self.module_by_namespace(namespace),
            None => parent.map(|p| self.main_module(self.node(p).module)),
        };
        let Some(module) = module else {
            return Err(Error::new(ErrorKind::UnresolvedReference {
                what: "data node",
                name: name.to_string(),
            }));
        };

        let schema = self
            .data_children(module, parent)
            .into_iter()
            .find(|&candidate| self.node_name(candidate) == name);
        let Some(schema) = schema else {
            let mut error = Error::new(ErrorKind::UnresolvedReference {
                what: "data node",
                name: name.to_string(),
            });
            if let Some(parent) = parent {
                error = error.with_path(self.schema_path(parent));
            }
            return Err(error);
        };

        let mut node = DataNode::new(schema);
        match &self.node(schema).kind {
            NodeKind::Leaf(leaf) => {
                let text = element.text().unwrap_or_default().trim().to_string();
                if self.typ(leaf.ty).base != TypeBase::Empty {
                    value::check_value(self, leaf.ty, &text)
                        .map_err(|e| e.with_path(self.schema_path(schema)))?;
                    node.value = Some(text);
                }
            }
            NodeKind::LeafList(leaf_list) => {
                let text = element.text().unwrap_or_default().trim().to_string();
                value::check_value(self, leaf_list.ty, &text)
                    .map_err(|e| e.with_path(self.schema_path(schema)))?;
                node.value = Some(text);
            }
            NodeKind::Anyxml(_) => {
                node.value = element.text().map(|t| t.trim().to_string());
            }
            _ => {
                for child in element.children().filter(|c| c.is_element()) {
                    node.children.push(self.read_element(child, Some(schema))?);
                }
            }
        }
        Ok(node)
    }

    fn module_by_namespace(&self, namespace: &str) -> Option<ModuleId> {
        self.modules().into_iter().find(|&m| {
            self.module(m)
                .namespace
                .is_some_and(|ns| self.str(ns) == namespace)
        })
    }

    /// Instantiate missing leaf defaults into the tree, marking them so the
    /// printers can tag them.
    pub fn add_data_defaults(&self, tree: &mut DataTree) {
        let mut roots = std::mem::take(&mut tree.roots);
        for root in &mut roots {
            self.fill_defaults(root);
        }
        tree.roots = roots;
    }

    fn fill_defaults(&self, node: &mut DataNode) {
        let schema = node.schema;
        if !matches!(
            self.node(schema).kind,
            NodeKind::Container(_) | NodeKind::List(_)
        ) {
            return;
        }
        let module = self.main_module(self.node(schema).module);
        for candidate in self.data_children(module, Some(schema)) {
            if let NodeKind::Leaf(leaf) = &self.node(candidate).kind {
                if let Some(default) = leaf.default {
                    let present = node.children.iter().any(|c| c.schema == candidate);
                    if !present {
                        let mut instance = DataNode::new(candidate);
                        instance.value = Some(self.str(default).to_string());
                        instance.default = true;
                        node.children.push(instance);
                    }
                }
            }
        }
        for child in &mut node.children {
            self.fill_defaults(child);
        }
    }

    /// Print a data tree as XML.
    pub fn print_data_xml(&self, tree: &DataTree, options: DataPrintOptions) -> String {
        let mut out = String::new();
        let wd_namespace = options
            .with_defaults
            .then(|| self.with_defaults_namespace())
            .flatten();

        let roots: &[DataNode] = if options.with_siblings {
            &tree.roots
        } else {
            &tree.roots[..tree.roots.len().min(1)]
        };
        for root in roots {
            self.write_xml(&mut out, root, None, wd_namespace.as_deref(), options.format, 0);
        }
        out
    }

    fn with_defaults_namespace(&self) -> Option<String> {
        let module = self.get_module(WITH_DEFAULTS_MODULE, None)?;
        self.module(module)
            .namespace
            .map(|ns| self.str(ns).to_string())
    }

    fn write_xml(
        &self,
        out: &mut String,
        node: &DataNode,
        parent: Option<NodeId>,
        wd_namespace: Option<&str>,
        format: bool,
        depth: usize,
    ) {
        let schema = node.schema;
        let name = self.node_name(schema);
        let pad = if format { "  ".repeat(depth) } else { String::new() };
        let nl = if format { "\n" } else { "" };

        out.push_str(&pad);
        out.push('<');
        out.push_str(name);

        // Top-level elements, and children crossing a module boundary,
        // carry their namespace.
        let module = self.main_module(self.node(schema).module);
        let parent_module = parent.map(|p| self.main_module(self.node(p).module));
        if parent_module != Some(module) {
            if let Some(ns) = self.module(module).namespace {
                out.push_str(&format!(" xmlns=\"{}\"", xml_escape(self.str(ns))));
            }
        }
        if node.default {
            if let Some(wd) = wd_namespace {
                out.push_str(&format!(
                    " xmlns:wd=\"{}\" wd:default=\"true\"",
                    xml_escape(wd)
                ));
            }
        }

        match &node.value {
            Some(value) => {
                if value.is_empty() && node.children.is_empty() {
                    out.push_str(&format!("/>{nl}"));
                } else {
                    out.push('>');
                    out.push_str(&xml_escape(value));
                    out.push_str(&format!("</{name}>{nl}"));
                }
            }
            None if node.children.is_empty() => {
                out.push_str(&format!("/>{nl}"));
            }
            None => {
                out.push('>');
                out.push_str(nl);
                for child in &node.children {
                    self.write_xml(out, child, Some(schema), wd_namespace, format, depth + 1);
                }
                out.push_str(&pad);
                out.push_str(&format!("</{name}>{nl}"));
            }
        }
    }
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
