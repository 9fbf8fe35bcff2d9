//! The repository of loaded modules.
//!
//! A [`Context`] owns the string pool, the schema arenas and the module
//! registry. Loads are atomic: a module either links completely and is
//! registered, or the load fails and every arena slot and string reference it
//! acquired is swept away, leaving the repository untouched.

use crate::arena::Arena;
use crate::dict::{Dict, Sym};
use crate::error::{Error, ErrorKind, Result};
use crate::resolver::{self, Unres};
use crate::rewrite;
use crate::schema::build;
use crate::schema::{
    Identity, Module, ModuleId, ModuleKind, NodeId, NodeKind, SchemaFormat, SchemaNode, Type,
    TypeSpec, Typedef,
};

use yang_parser::{yin, Keyword, Parser, Statement, SyntaxTree};

/// Callback used to fetch the text of a module that another module imports
/// or includes: `(name, revision) -> (text, format)`.
pub type ModuleCallback = dyn Fn(&str, Option<&str>) -> Option<(String, SchemaFormat)> + Send + Sync;

/// Where a sibling chain hangs: the top level of a module, or a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Parent {
    Module(ModuleId),
    Node(NodeId),
}

/// How far child lookup sees through schema-only layers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// Through `uses` only; choice and case match by their own names.
    Schema,
    /// Through `uses`, `choice` and `case`: data-tree addressing.
    Data,
}

#[derive(Default)]
pub struct Context {
    pub(crate) dict: Dict,
    pub(crate) modules: Vec<Option<Module>>,
    pub(crate) nodes: Arena<SchemaNode>,
    pub(crate) types: Arena<Type>,
    pub(crate) typedefs: Arena<Typedef>,
    pub(crate) identities: Arena<Identity>,
    pub(crate) loader: Option<Box<ModuleCallback>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the callback consulted when an imported or included module is
    /// not already present in the repository.
    pub fn set_module_callback(
        &mut self,
        callback: impl Fn(&str, Option<&str>) -> Option<(String, SchemaFormat)>
            + Send
            + Sync
            + 'static,
    ) {
        self.loader = Some(Box::new(callback));
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn module(&self, id: ModuleId) -> &Module {
        self.modules[id.0 as usize]
            .as_ref()
            .expect("stale module id")
    }

    pub(crate) fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        self.modules[id.0 as usize]
            .as_mut()
            .expect("stale module id")
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        self.nodes.get_mut(id)
    }

    pub fn typ(&self, id: crate::schema::TypeId) -> &Type {
        self.types.get(id)
    }

    pub(crate) fn typ_mut(&mut self, id: crate::schema::TypeId) -> &mut Type {
        self.types.get_mut(id)
    }

    pub fn typedef(&self, id: crate::schema::TypedefId) -> &Typedef {
        self.typedefs.get(id)
    }

    pub fn identity(&self, id: crate::schema::IdentityId) -> &Identity {
        self.identities.get(id)
    }

    pub(crate) fn identity_mut(&mut self, id: crate::schema::IdentityId) -> &mut Identity {
        self.identities.get_mut(id)
    }

    /// Resolve an interned string.
    pub fn str(&self, sym: Sym) -> &str {
        self.dict.str(sym)
    }

    /// Current reference count of an interned string; 0 when absent.
    pub fn dict_refs(&self, text: &str) -> u32 {
        self.dict.refs(text)
    }

    /// Number of live entries in the string pool.
    pub fn dict_len(&self) -> usize {
        self.dict.len()
    }

    pub fn node_name(&self, id: NodeId) -> &str {
        self.str(self.node(id).name)
    }

    /// The owning module of a submodule, or the module itself.
    pub fn main_module(&self, id: ModuleId) -> ModuleId {
        match self.module(id).belongs_to {
            Some(owner) => owner,
            None => id,
        }
    }

    // ------------------------------------------------------------------
    // String interning, ledgered per module
    // ------------------------------------------------------------------

    pub(crate) fn intern(&mut self, module: ModuleId, text: &str) -> Sym {
        let sym = self.dict.insert(text);
        self.module_mut(module).strings.push(sym);
        sym
    }

    /// Take a module-owned reference on an already interned string, as deep
    /// copies do when they move text across module boundaries.
    pub(crate) fn adopt(&mut self, module: ModuleId, sym: Sym) -> Sym {
        self.dict.retain(sym);
        self.module_mut(module).strings.push(sym);
        sym
    }

    pub(crate) fn adopt_opt(&mut self, module: ModuleId, sym: Option<Sym>) -> Option<Sym> {
        sym.map(|s| self.adopt(module, s))
    }

    // ------------------------------------------------------------------
    // Sibling chains
    // ------------------------------------------------------------------

    pub(crate) fn chain_head(&self, parent: Parent) -> Option<NodeId> {
        match parent {
            Parent::Module(m) => self.module(m).data,
            Parent::Node(n) => self.node(n).first_child,
        }
    }

    fn set_chain_head(&mut self, parent: Parent, head: Option<NodeId>) {
        match parent {
            Parent::Module(m) => self.module_mut(m).data = head,
            Parent::Node(n) => self.node_mut(n).first_child = head,
        }
    }

    /// The chain a linked node lives in. Top-level nodes, including the ones
    /// a submodule contributes, hang off the main module's data chain.
    pub(crate) fn parent_of(&self, node: NodeId) -> Parent {
        match self.node(node).parent {
            Some(parent) => Parent::Node(parent),
            None => Parent::Module(self.main_module(self.node(node).module)),
        }
    }

    /// Append `child` at the end of `parent`'s chain. O(1): the first
    /// sibling's `prev` always points at the last.
    pub(crate) fn link_child(&mut self, parent: Parent, child: NodeId) {
        self.node_mut(child).next = None;
        match self.chain_head(parent) {
            None => {
                self.node_mut(child).prev = Some(child);
                self.set_chain_head(parent, Some(child));
            }
            Some(head) => {
                let last = self.node(head).prev.expect("linked chain has a last");
                self.node_mut(last).next = Some(child);
                self.node_mut(child).prev = Some(last);
                self.node_mut(head).prev = Some(child);
            }
        }
        self.node_mut(child).parent = match parent {
            Parent::Node(n) => Some(n),
            Parent::Module(_) => None,
        };
    }

    /// Remove `child` from `parent`'s chain, keeping the node alive.
    pub(crate) fn unlink_child(&mut self, parent: Parent, child: NodeId) {
        let head = self.chain_head(parent).expect("unlink from empty chain");
        let next = self.node(child).next;
        let prev = self.node(child).prev.expect("linked node has prev");

        if head == child {
            self.set_chain_head(parent, next);
            if let Some(next) = next {
                // New head inherits the last-sibling pointer.
                let last = if prev == child { next } else { prev };
                self.node_mut(next).prev = Some(last);
            }
        } else {
            self.node_mut(prev).next = next;
            match next {
                Some(next) => self.node_mut(next).prev = Some(prev),
                // Dropping the last sibling: the head's prev moves back.
                None => self.node_mut(head).prev = Some(prev),
            }
        }

        let child = self.node_mut(child);
        child.prev = None;
        child.next = None;
        child.parent = None;
    }

    /// Re-insert `child` into `parent`'s chain right after `after`, or at the
    /// front when `after` is `None`. Used when a deviation toggle restores an
    /// unlinked node.
    pub(crate) fn relink_after(
        &mut self,
        parent: Parent,
        child: NodeId,
        after: Option<NodeId>,
    ) {
        // Fall back to a plain append when the anchor is gone or was never
        // part of this chain.
        let after = after.filter(|a| self.nodes.contains(*a));
        match after {
            None => match self.chain_head(parent) {
                None => self.link_child(parent, child),
                Some(head) => {
                    let last = self.node(head).prev.expect("linked chain has a last");
                    self.node_mut(child).next = Some(head);
                    self.node_mut(child).prev = Some(last);
                    self.node_mut(head).prev = Some(child);
                    self.set_chain_head(parent, Some(child));
                    self.node_mut(child).parent = match parent {
                        Parent::Node(n) => Some(n),
                        Parent::Module(_) => None,
                    };
                }
            },
            Some(after) => {
                let next = self.node(after).next;
                self.node_mut(after).next = Some(child);
                self.node_mut(child).prev = Some(after);
                self.node_mut(child).next = next;
                match next {
                    Some(next) => self.node_mut(next).prev = Some(child),
                    None => {
                        let head = self.chain_head(parent).expect("non-empty chain");
                        self.node_mut(head).prev = Some(child);
                    }
                }
                self.node_mut(child).parent = match parent {
                    Parent::Node(n) => Some(n),
                    Parent::Module(_) => None,
                };
            }
        }
    }

    /// Iterate a sibling chain in order.
    pub(crate) fn siblings(&self, head: Option<NodeId>) -> SiblingIter<'_> {
        SiblingIter {
            ctx: self,
            next: head,
        }
    }

    /// Direct children of `parent`, in chain order.
    pub(crate) fn raw_children(&self, parent: Parent) -> SiblingIter<'_> {
        self.siblings(self.chain_head(parent))
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Find a child of `parent` named `name` in module `module` (main-module
    /// identity), seeing through schema-only layers per `lookup`.
    pub(crate) fn find_child(
        &self,
        parent: Parent,
        module: ModuleId,
        name: &str,
        lookup: Lookup,
    ) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.raw_children(parent).collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            let transparent = match node.kind {
                NodeKind::Uses(_) => true,
                NodeKind::Choice(_) | NodeKind::Case => lookup == Lookup::Data,
                NodeKind::Grouping(_) | NodeKind::Augment(_) => {
                    // Never addressable through a path.
                    continue;
                }
                _ => false,
            };
            if transparent {
                let mut children: Vec<NodeId> = self.raw_children(Parent::Node(id)).collect();
                children.reverse();
                stack.extend(children);
                continue;
            }
            if self.node_name(id) == name && self.main_module(node.module) == module {
                return Some(id);
            }
        }
        None
    }

    /// Data children of a node or module top level: through uses, choice and
    /// case, yielding only nodes that appear in instance documents.
    pub fn data_children(&self, module: ModuleId, parent: Option<NodeId>) -> Vec<NodeId> {
        let parent = match parent {
            Some(node) => Parent::Node(node),
            None => Parent::Module(self.main_module(module)),
        };
        let mut out = Vec::new();
        self.collect_data_children(parent, &mut out);
        out
    }

    fn collect_data_children(&self, parent: Parent, out: &mut Vec<NodeId>) {
        for id in self.raw_children(parent) {
            let node = self.node(id);
            match node.kind {
                NodeKind::Uses(_) | NodeKind::Choice(_) | NodeKind::Case => {
                    self.collect_data_children(Parent::Node(id), out);
                }
                NodeKind::Grouping(_) | NodeKind::Augment(_) => {}
                _ => out.push(id),
            }
        }
    }

    /// The first data-tree ancestor: parents that are uses, choice or case
    /// layers are skipped.
    pub fn data_parent(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.node(node).parent;
        while let Some(id) = current {
            if self.node(id).is_transparent() {
                current = self.node(id).parent;
            } else {
                return Some(id);
            }
        }
        None
    }

    /// Breadcrumb path of a node, for error reports: `/interfaces/interface/name`.
    pub fn schema_path(&self, node: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            parts.push(self.node_name(id).to_string());
            current = self.node(id).parent;
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    pub(crate) fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    // ------------------------------------------------------------------
    // Module registry
    // ------------------------------------------------------------------

    /// Look up a module by name. With a revision the newest revision of the
    /// module must match exactly; without one the implemented revision wins,
    /// falling back to the lexicographically largest revision date.
    pub fn get_module(&self, name: &str, revision: Option<&str>) -> Option<ModuleId> {
        let mut best: Option<ModuleId> = None;
        for (index, slot) in self.modules.iter().enumerate() {
            let Some(module) = slot else { continue };
            if module.is_submodule() || self.str(module.name) != name {
                continue;
            }
            let id = ModuleId(index as u32);
            match revision {
                Some(revision) => {
                    if module.revision().map(|r| self.str(r)) == Some(revision) {
                        return Some(id);
                    }
                }
                None => {
                    if module.implemented {
                        return Some(id);
                    }
                    let newer = match best {
                        None => true,
                        Some(best_id) => {
                            let best_rev =
                                self.module(best_id).revision().map(|r| self.str(r));
                            module.revision().map(|r| self.str(r)) > best_rev
                        }
                    };
                    if newer {
                        best = Some(id);
                    }
                }
            }
        }
        match revision {
            Some(_) => None,
            None => best,
        }
    }

    /// All loaded modules (submodules excluded), in load order.
    pub fn modules(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Some(module) if !module.is_submodule() => Some(ModuleId(index as u32)),
                _ => None,
            })
            .collect()
    }

    /// Mark `module` as the implemented revision of its name.
    pub fn set_implement(&mut self, module: ModuleId) -> Result<()> {
        let name = self.str(self.module(module).name).to_string();
        for (index, slot) in self.modules.iter().enumerate() {
            let Some(other) = slot else { continue };
            if index as u32 != module.0 && other.implemented && self.str(other.name) == name {
                let existing = other
                    .revisions
                    .first()
                    .map(|r| self.str(r.date).to_string())
                    .unwrap_or_default();
                return Err(Error::new(ErrorKind::ConflictingImplementedRevision {
                    name,
                    existing,
                }));
            }
        }
        self.module_mut(module).implemented = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Features
    // ------------------------------------------------------------------

    /// Enable a feature by name, or all features with `"*"`. Enabling a
    /// feature recursively enables the features it depends on.
    pub fn features_enable(&mut self, module: ModuleId, name: &str) -> Result<()> {
        self.features_set(module, name, true)
    }

    /// Disable a feature by name, or all with `"*"`.
    pub fn features_disable(&mut self, module: ModuleId, name: &str) -> Result<()> {
        self.features_set(module, name, false)
    }

    fn features_set(&mut self, module: ModuleId, name: &str, value: bool) -> Result<()> {
        let count = self.module(module).features.len();
        let mut found = name == "*";
        for index in 0..count {
            let feature_name = self.module(module).features[index].name;
            if name == "*" || self.str(feature_name) == name {
                found = true;
                if value {
                    self.feature_enable_at(module, index);
                } else {
                    self.module_mut(module).features[index].enabled = false;
                }
            }
        }
        if found {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::UnresolvedReference {
                what: "feature",
                name: name.to_string(),
            }))
        }
    }

    fn feature_enable_at(&mut self, module: ModuleId, index: usize) {
        if self.module(module).features[index].enabled {
            return;
        }
        self.module_mut(module).features[index].enabled = true;
        let refs = self.module(module).features[index].if_features.clone();
        for fref in refs {
            if let Some((dep_module, dep_index)) = fref.resolved {
                self.feature_enable_at(dep_module, dep_index);
            }
        }
    }

    /// Whether the named feature is enabled; `None` when the module has no
    /// such feature.
    pub fn feature_state(&self, module: ModuleId, name: &str) -> Option<bool> {
        self.module(module)
            .features
            .iter()
            .find(|f| self.str(f.name) == name)
            .map(|f| f.enabled)
    }

    /// `(name, enabled)` for every feature of the module.
    pub fn features_list(&self, module: ModuleId) -> Vec<(String, bool)> {
        self.module(module)
            .features
            .iter()
            .map(|f| (self.str(f.name).to_string(), f.enabled))
            .collect()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Parse, link and register one module. On any failure the repository is
    /// left unchanged, except that imports loaded along the way stay loaded.
    pub fn parse_module(&mut self, text: &str, format: SchemaFormat) -> Result<ModuleId> {
        let statement = parse_text(text, format)?;
        if statement.keyword != Keyword::Module {
            return Err(Error::new(ErrorKind::UnexpectedStatementInContext {
                keyword: statement.keyword.as_str().to_string(),
            })
            .with_loc(statement.loc));
        }

        let id = self.alloc_module(ModuleKind::Module);
        let mut unres = Unres::default();
        let result = build::build_module(self, id, &statement, &mut unres)
            .and_then(|()| resolver::resolve_all(self, &mut unres))
            .and_then(|()| rewrite::finalize(self, id));

        match result {
            Ok(()) => {
                log::debug!(
                    "loaded module `{}` ({} unres entries settled)",
                    self.str(self.module(id).name),
                    unres.settled(),
                );
                Ok(id)
            }
            Err(error) => {
                log::debug!("load failed, rolling back: {error}");
                self.discard_module(id);
                Err(error)
            }
        }
    }

    /// Parse a submodule on behalf of `owner`, depositing its unresolved
    /// references into the includer's queue. The includer finishes resolution
    /// only after all of its submodules are parsed.
    pub(crate) fn parse_submodule(
        &mut self,
        owner: ModuleId,
        text: &str,
        format: SchemaFormat,
        unres: &mut Unres,
    ) -> Result<ModuleId> {
        let statement = parse_text(text, format)?;
        if statement.keyword != Keyword::Submodule {
            return Err(Error::new(ErrorKind::UnexpectedStatementInContext {
                keyword: statement.keyword.as_str().to_string(),
            })
            .with_loc(statement.loc));
        }

        let id = self.alloc_module(ModuleKind::Submodule);
        self.module_mut(id).belongs_to = Some(owner);
        build::build_module(self, id, &statement, unres).inspect_err(|_| {
            self.discard_module(id);
        })?;
        Ok(id)
    }

    fn alloc_module(&mut self, kind: ModuleKind) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(None);
        let name = self.dict.insert("");
        self.dict.retain(name);
        self.modules[id.0 as usize] = Some(Module {
            name,
            prefix: name,
            namespace: None,
            yang_version: None,
            organization: None,
            contact: None,
            description: None,
            reference: None,
            revisions: Vec::new(),
            imports: Vec::new(),
            includes: Vec::new(),
            belongs_to: None,
            identities: Vec::new(),
            features: Vec::new(),
            typedefs: Vec::new(),
            augments: Vec::new(),
            deviations: Vec::new(),
            data: None,
            kind,
            implemented: false,
            deviated: false,
            strings: vec![name, name],
        });
        id
    }

    /// Toggle the deviations published by `module`: applied transforms are
    /// reversed, reversed ones re-applied. The call is its own inverse.
    pub fn switch_deviations(&mut self, module: ModuleId) -> Result<()> {
        rewrite::switch_deviations(self, module)
    }

    /// Destroy a module: tear down its augments and deviations in other
    /// modules, free its arena slots and release its dictionary references.
    pub fn remove_module(&mut self, module: ModuleId) -> Result<()> {
        if self.module(module).is_submodule() {
            return Err(Error::internal(
                "submodules are removed with their owning module",
            ));
        }
        self.discard_module(module);
        Ok(())
    }

    pub(crate) fn discard_module(&mut self, module: ModuleId) {
        rewrite::teardown(self, module);

        let submodules = self.module(module).includes.clone();
        for sub in submodules {
            self.discard_module_slots(sub);
        }
        self.discard_module_slots(module);
    }

    fn discard_module_slots(&mut self, module: ModuleId) {
        // Unlink this module's nodes from chains shared with live modules
        // (top-level nodes of submodules sit in the owner's chain).
        let owned: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.module == module)
            .map(|(id, _)| id)
            .collect();

        for &id in &owned {
            // Remove leafref back-edges this node holds on foreign targets.
            let target = self.node(id).type_id().and_then(|ty| match &self.typ(ty).spec {
                TypeSpec::Leafref {
                    target: Some(target),
                    ..
                } => Some(*target),
                _ => None,
            });
            if let Some(target) = target {
                if self.nodes.contains(target) && self.node(target).module != module {
                    match &mut self.node_mut(target).kind {
                        NodeKind::Leaf(leaf) => leaf.backlinks.retain(|b| *b != id),
                        NodeKind::LeafList(leaf_list) => leaf_list.backlinks.retain(|b| *b != id),
                        _ => {}
                    }
                }
            }
        }

        for &id in &owned {
            let node = self.node(id);
            // Back-edges into a dying module are a caller ordering error.
            let foreign_backlinks = match &node.kind {
                NodeKind::Leaf(leaf) => leaf
                    .backlinks
                    .iter()
                    .filter(|b| self.nodes.contains(**b) && self.node(**b).module != module)
                    .count(),
                NodeKind::LeafList(leaf_list) => leaf_list
                    .backlinks
                    .iter()
                    .filter(|b| self.nodes.contains(**b) && self.node(**b).module != module)
                    .count(),
                _ => 0,
            };
            if foreign_backlinks > 0 {
                log::warn!(
                    "removing `{}` while {foreign_backlinks} leafref(s) in live modules still target it",
                    self.node_name(id),
                );
            }
            debug_assert_eq!(foreign_backlinks, 0);
        }

        // Unlink top-level nodes that live in a foreign chain (submodule
        // contributions, spliced augment children are handled by teardown).
        for &id in &owned {
            let parent = self.parent_of(id);
            let in_live_chain = match parent {
                Parent::Module(m) => m != module && self.modules[m.0 as usize].is_some(),
                Parent::Node(n) => self.nodes.contains(n) && self.node(n).module != module,
            };
            if in_live_chain && self.node(id).prev.is_some() {
                self.unlink_child(parent, id);
            }
        }

        for id in owned {
            self.nodes.free(id);
        }
        for id in self
            .types
            .iter()
            .filter(|(_, t)| t.module == module)
            .map(|(id, _)| id)
            .collect::<Vec<_>>()
        {
            self.types.free(id);
        }
        for id in self
            .typedefs
            .iter()
            .filter(|(_, t)| t.module == module)
            .map(|(id, _)| id)
            .collect::<Vec<_>>()
        {
            self.typedefs.free(id);
        }
        for id in self
            .identities
            .iter()
            .filter(|(_, i)| i.module == module)
            .map(|(id, _)| id)
            .collect::<Vec<_>>()
        {
            self.identities.free(id);
        }

        let strings = std::mem::take(&mut self.module_mut(module).strings);
        for sym in strings {
            self.dict.release(sym);
        }
        self.modules[module.0 as usize] = None;
    }

    /// Invoke the module-loader callback without keeping `self` borrowed.
    pub(crate) fn load_dependency(
        &mut self,
        name: &str,
        revision: Option<&str>,
    ) -> Option<(String, SchemaFormat)> {
        let loader = self.loader.take()?;
        let result = loader(name, revision);
        self.loader = Some(loader);
        result
    }
}

pub(crate) struct SiblingIter<'a> {
    ctx: &'a Context,
    next: Option<NodeId>,
}

impl Iterator for SiblingIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.ctx.node(id).next;
        Some(id)
    }
}

fn parse_text(text: &str, format: SchemaFormat) -> Result<Statement> {
    let tree: SyntaxTree = match format {
        SchemaFormat::Yang => Parser::new(text).parse(),
        SchemaFormat::Yin => yin::parse(text),
    };
    if let Some(error) = tree.errors().first() {
        return Err(crate::error::from_syntax(error));
    }
    let mut statements = tree.into_document().statements;
    if statements.len() != 1 {
        return Err(Error::new(ErrorKind::UnexpectedStatementInContext {
            keyword: statements
                .get(1)
                .map(|s| s.keyword.as_str().to_string())
                .unwrap_or_else(|| "<empty input>".to_string()),
        }));
    }
    Ok(statements.remove(0))
}
