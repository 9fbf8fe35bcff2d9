//! Structural validation of data trees: mandatory presence, choice
//! exclusivity, and list/leaf-list cardinality.
//!
//! A tree is mandatory-correct iff every mandatory data node reachable from
//! the root has an instance, every choice instantiates at most one case
//! (exactly one when the choice is mandatory), and instance counts lie
//! within `[min-elements, max-elements]`. Subtrees under an absent presence
//! container are exempt; absent non-presence containers are entered as if
//! they existed.

use indexmap::IndexSet;

use crate::context::{Context, Parent};
use crate::data::{DataNode, DataTree};
use crate::error::{Error, ErrorKind, Result};
use crate::schema::{ModuleId, NodeId, NodeKind};

impl Context {
    /// Check a data tree for mandatory-correctness against the schemas of
    /// the modules it instantiates.
    pub fn validate_data(&self, tree: &DataTree) -> Result<()> {
        let mut modules: IndexSet<ModuleId> = IndexSet::new();
        for root in &tree.roots {
            modules.insert(self.main_module(self.node(root.schema).module));
        }

        for module in modules {
            self.check_level(Parent::Module(module), &tree.roots)?;
        }
        for root in &tree.roots {
            self.check_instance(root)?;
        }
        Ok(())
    }

    /// Validate one schema level against the instances present there.
    fn check_level(&self, parent: Parent, instances: &[DataNode]) -> Result<()> {
        for child in self.raw_children(parent) {
            self.check_schema_child(child, instances)?;
        }
        Ok(())
    }

    fn check_schema_child(&self, schema: NodeId, instances: &[DataNode]) -> Result<()> {
        let node = self.node(schema);
        let count = instances.iter().filter(|i| i.schema == schema).count();
        let missing = || {
            Error::new(ErrorKind::MissingRequiredChild {
                parent: self
                    .data_parent(schema)
                    .map(|p| self.schema_path(p))
                    .unwrap_or_else(|| "/".to_string()),
                keyword: self.node_name(schema).to_string(),
            })
        };

        match &node.kind {
            NodeKind::Leaf(_) | NodeKind::Anyxml(_) => {
                if node.mandatory() && count == 0 {
                    return Err(missing());
                }
            }
            NodeKind::List(list) => {
                self.check_cardinality(schema, count, list.min_elements, list.max_elements)?;
            }
            NodeKind::LeafList(leaf_list) => {
                self.check_cardinality(
                    schema,
                    count,
                    leaf_list.min_elements,
                    leaf_list.max_elements,
                )?;
            }
            NodeKind::Container(container) => {
                if count == 0 && container.presence.is_none() {
                    // A non-presence container exists implicitly; mandatory
                    // descendants are still required.
                    self.check_level(Parent::Node(schema), &[])?;
                }
            }
            NodeKind::Choice(_) => {
                self.check_choice(schema, instances)?;
            }
            NodeKind::Uses(_) => {
                self.check_level(Parent::Node(schema), instances)?;
            }
            NodeKind::Case => {
                // Reached through check_choice only.
            }
            _ => {}
        }
        Ok(())
    }

    fn check_cardinality(
        &self,
        schema: NodeId,
        count: usize,
        min: u32,
        max: Option<u32>,
    ) -> Result<()> {
        if (count as u64) < min as u64 || max.is_some_and(|max| count as u64 > max as u64) {
            return Err(Error::new(ErrorKind::InvalidValue {
                keyword: "min-elements".to_string(),
                value: count.to_string(),
            })
            .with_path(self.schema_path(schema)));
        }
        Ok(())
    }

    fn check_choice(&self, choice: NodeId, instances: &[DataNode]) -> Result<()> {
        // Which alternatives have at least one instantiated descendant?
        let mut present: Vec<NodeId> = Vec::new();
        for alternative in self.raw_children(Parent::Node(choice)) {
            let instantiated = instances.iter().any(|instance| {
                self.belongs_to_alternative(instance.schema, alternative)
            });
            if instantiated {
                present.push(alternative);
            }
        }

        if present.len() > 1 {
            return Err(Error::new(ErrorKind::InvalidValue {
                keyword: "choice".to_string(),
                value: format!("{} cases instantiated", present.len()),
            })
            .with_path(self.schema_path(choice)));
        }
        if present.is_empty() {
            if self.node(choice).mandatory() {
                return Err(Error::new(ErrorKind::MissingRequiredChild {
                    parent: self.schema_path(choice),
                    keyword: "case".to_string(),
                }));
            }
            return Ok(());
        }

        // The chosen alternative's own mandatory members apply.
        let chosen = present[0];
        match self.node(chosen).kind {
            NodeKind::Case => self.check_level(Parent::Node(chosen), instances),
            _ => self.check_schema_child(chosen, instances),
        }
    }

    /// Whether an instantiated schema node sits under the given choice
    /// alternative (a case node or a shorthand member).
    fn belongs_to_alternative(&self, schema: NodeId, alternative: NodeId) -> bool {
        let mut current = Some(schema);
        while let Some(id) = current {
            if id == alternative {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    /// Per-instance recursion: containers and lists validate their own
    /// children level.
    fn check_instance(&self, instance: &DataNode) -> Result<()> {
        match &self.node(instance.schema).kind {
            NodeKind::Container(_) | NodeKind::List(_) => {
                self.check_level(Parent::Node(instance.schema), &instance.children)?;
                for child in &instance.children {
                    self.check_instance(child)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
