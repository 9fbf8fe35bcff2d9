//! JSON printing of data trees, following the RFC 7951 conventions the
//! ecosystem expects: module-qualified top-level members, 64-bit and
//! decimal values as strings, `empty` as `[null]`.

use serde_json::{json, Map, Value};

use crate::context::Context;
use crate::data::{DataNode, DataPrintOptions, DataTree};
use crate::schema::{NodeId, NodeKind, TypeBase};

impl Context {
    pub fn print_data_json(&self, tree: &DataTree, options: DataPrintOptions) -> String {
        let roots: &[DataNode] = if options.with_siblings {
            &tree.roots
        } else {
            &tree.roots[..tree.roots.len().min(1)]
        };

        let mut object = Map::new();
        self.collect_members(&mut object, roots, None);
        let value = Value::Object(object);
        if options.format {
            serde_json::to_string_pretty(&value).unwrap_or_default()
        } else {
            serde_json::to_string(&value).unwrap_or_default()
        }
    }

    fn collect_members(&self, object: &mut Map<String, Value>, nodes: &[DataNode], parent: Option<NodeId>) {
        // Lists and leaf-lists fold into arrays under one member name.
        let mut index = 0;
        while index < nodes.len() {
            let node = &nodes[index];
            let name = self.member_name(node.schema, parent);
            match &self.node(node.schema).kind {
                NodeKind::List(_) | NodeKind::LeafList(_) => {
                    let mut items = Vec::new();
                    let schema = node.schema;
                    let mut scan = index;
                    while scan < nodes.len() {
                        if nodes[scan].schema == schema {
                            items.push(self.node_value(&nodes[scan]));
                        }
                        scan += 1;
                    }
                    if !object.contains_key(&name) {
                        object.insert(name, Value::Array(items));
                    }
                }
                _ => {
                    object.insert(name, self.node_value(node));
                }
            }
            index += 1;
        }
    }

    fn member_name(&self, schema: NodeId, parent: Option<NodeId>) -> String {
        let module = self.main_module(self.node(schema).module);
        let parent_module = parent.map(|p| self.main_module(self.node(p).module));
        if parent_module == Some(module) {
            self.node_name(schema).to_string()
        } else {
            format!(
                "{}:{}",
                self.str(self.module(module).name),
                self.node_name(schema)
            )
        }
    }

    fn node_value(&self, node: &DataNode) -> Value {
        match &self.node(node.schema).kind {
            NodeKind::Leaf(leaf) => self.leaf_value(leaf.ty, node.value.as_deref()),
            NodeKind::LeafList(leaf_list) => self.leaf_value(leaf_list.ty, node.value.as_deref()),
            NodeKind::Anyxml(_) => match &node.value {
                Some(value) => Value::String(value.clone()),
                None => Value::Null,
            },
            _ => {
                let mut object = Map::new();
                self.collect_members(&mut object, &node.children, Some(node.schema));
                Value::Object(object)
            }
        }
    }

    fn leaf_value(&self, ty: crate::schema::TypeId, value: Option<&str>) -> Value {
        let base = self.typ(ty).base;
        let Some(text) = value else {
            // `empty` leaves have no text.
            return json!([Value::Null]);
        };
        match base {
            TypeBase::Boolean => match text {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(text.to_string()),
            },
            TypeBase::Empty => json!([Value::Null]),
            base if base.is_integer() => {
                let wide = matches!(base, TypeBase::Int64 | TypeBase::Uint64);
                if wide {
                    Value::String(text.to_string())
                } else {
                    text.parse::<i64>()
                        .map(Value::from)
                        .unwrap_or_else(|_| Value::String(text.to_string()))
                }
            }
            // decimal64 keeps its canonical string form.
            _ => Value::String(text.to_string()),
        }
    }
}
