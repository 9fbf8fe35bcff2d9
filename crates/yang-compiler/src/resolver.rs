//! The unresolved-reference work queue and its fixed-point loop.
//!
//! The builder records every forward reference as an [`UnresKind`] entry.
//! The resolver repeatedly scans the queue in insertion order; an entry that
//! resolves is removed and its fixups applied, one that is merely not
//! resolvable *yet* stays for the next pass, and one that can never resolve
//! aborts the load. A full pass that removes nothing terminates with an
//! error reporting the first surviving entry. Deviations run only once every
//! other kind has drained, because applying them mutates targets.

use crate::context::{Context, Lookup, Parent};
use crate::dict::Sym;
use crate::error::{Error, ErrorKind, Result};
use crate::path::{self, SchemaPath};
use crate::rewrite;
use crate::schema::build::node_typedefs;
use crate::schema::{
    IdentityId, ModuleId, NodeId, NodeKind, TypeBase, TypeId, TypedefId, TypeSpec,
};
use crate::value;

/// Kinds of unresolved references, in the loader's vocabulary.
#[derive(Clone, Debug)]
pub(crate) enum UnresKind {
    ModuleRef {
        module: ModuleId,
        dep: Dep,
    },
    TypeDer {
        ty: TypeId,
        scope: Option<NodeId>,
        module: ModuleId,
        in_union: bool,
    },
    TypeDerTypedef {
        ty: TypeId,
        scope: Option<NodeId>,
        module: ModuleId,
        in_union: bool,
    },
    TypeLeafref {
        ty: TypeId,
        node: NodeId,
    },
    TypeIdentref {
        ty: TypeId,
        module: ModuleId,
    },
    TypeDefault {
        ty: TypeId,
        value: Sym,
    },
    Iffeat {
        site: IffeatSite,
    },
    IdentityBase {
        identity: IdentityId,
    },
    Uses {
        node: NodeId,
        depth: u32,
    },
    Augment {
        node: NodeId,
        base: Option<NodeId>,
    },
    ChoiceDefault {
        node: NodeId,
    },
    ListKeys {
        node: NodeId,
    },
    ListUnique {
        node: NodeId,
        index: usize,
    },
    Deviation {
        module: ModuleId,
        index: usize,
    },
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Dep {
    Import(usize),
    Include { name: Sym, revision: Option<Sym> },
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum IffeatSite {
    Node {
        node: NodeId,
        index: usize,
    },
    Feature {
        module: ModuleId,
        feature: usize,
        index: usize,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub module: ModuleId,
    /// Node the entry is anchored to; used to hold back `uses` expansion
    /// until a grouping's subtree has no pending entries.
    pub anchor: Option<NodeId>,
    pub loc: usize,
    pub kind: UnresKind,
}

#[derive(Default)]
pub(crate) struct Unres {
    entries: Vec<Entry>,
    settled: usize,
}

impl Unres {
    pub(crate) fn push(
        &mut self,
        module: ModuleId,
        anchor: Option<NodeId>,
        loc: usize,
        kind: UnresKind,
    ) {
        self.entries.push(Entry {
            module,
            anchor,
            loc,
            kind,
        });
    }

    pub(crate) fn settled(&self) -> usize {
        self.settled
    }

    /// Whether any pending entry is anchored inside the given subtree.
    fn pending_under(&self, ctx: &Context, root: NodeId) -> bool {
        self.entries.iter().any(|entry| {
            entry
                .anchor
                .is_some_and(|anchor| ctx.is_descendant(anchor, root))
        })
    }
}

enum Outcome {
    Resolved,
    Postponed,
}

pub(crate) fn resolve_all(ctx: &mut Context, unres: &mut Unres) -> Result<()> {
    loop {
        let only_deviations = unres
            .entries
            .iter()
            .all(|e| matches!(e.kind, UnresKind::Deviation { .. }));
        let mut progress = false;

        let mut index = 0;
        while index < unres.entries.len() {
            let entry = unres.entries[index].clone();
            if matches!(entry.kind, UnresKind::Deviation { .. }) && !only_deviations {
                index += 1;
                continue;
            }
            match try_resolve(ctx, &entry, unres)? {
                Outcome::Resolved => {
                    unres.entries.remove(index);
                    unres.settled += 1;
                    progress = true;
                }
                Outcome::Postponed => index += 1,
            }
        }

        if unres.entries.is_empty() {
            return Ok(());
        }
        if !progress {
            if !only_deviations
                && unres
                    .entries
                    .iter()
                    .all(|e| matches!(e.kind, UnresKind::Deviation { .. }))
            {
                // Everything else drained this pass; deviations get theirs.
                continue;
            }
            let stuck = unres
                .entries
                .iter()
                .find(|e| !matches!(e.kind, UnresKind::Deviation { .. }))
                .unwrap_or(&unres.entries[0]);
            return Err(stuck_error(ctx, stuck));
        }
    }
}

fn stuck_error(ctx: &Context, entry: &Entry) -> Error {
    let (what, name): (&'static str, String) = match &entry.kind {
        UnresKind::ModuleRef { module, dep } => match dep {
            Dep::Import(index) => (
                "imported module",
                ctx.str(ctx.module(*module).imports[*index].name).to_string(),
            ),
            Dep::Include { name, .. } => ("included submodule", ctx.str(*name).to_string()),
        },
        UnresKind::TypeDer { ty, .. } | UnresKind::TypeDerTypedef { ty, .. } => (
            "type",
            ctx.typ(*ty)
                .name
                .map(|n| ctx.str(n).to_string())
                .unwrap_or_default(),
        ),
        UnresKind::TypeLeafref { ty, .. } => (
            "leafref target",
            match &ctx.typ(*ty).spec {
                TypeSpec::Leafref { path, .. } => ctx.str(*path).to_string(),
                _ => String::new(),
            },
        ),
        UnresKind::TypeIdentref { ty, .. } => (
            "identity",
            match &ctx.typ(*ty).spec {
                TypeSpec::Identityref { base_arg, .. } => ctx.str(*base_arg).to_string(),
                _ => String::new(),
            },
        ),
        UnresKind::TypeDefault { value, .. } => ("default value", ctx.str(*value).to_string()),
        UnresKind::Iffeat { site } => (
            "feature",
            match site {
                IffeatSite::Node { node, index } => {
                    ctx.str(ctx.node(*node).if_features[*index].name).to_string()
                }
                IffeatSite::Feature {
                    module,
                    feature,
                    index,
                } => ctx
                    .str(ctx.module(*module).features[*feature].if_features[*index].name)
                    .to_string(),
            },
        ),
        UnresKind::IdentityBase { identity } => (
            "base identity",
            ctx.identity(*identity)
                .base_arg
                .map(|s| ctx.str(s).to_string())
                .unwrap_or_default(),
        ),
        UnresKind::Uses { node, .. } => (
            "grouping",
            match &ctx.node(*node).kind {
                NodeKind::Uses(uses) => ctx.str(uses.grouping_arg).to_string(),
                _ => String::new(),
            },
        ),
        UnresKind::Augment { node, .. } => (
            "augment target",
            match &ctx.node(*node).kind {
                NodeKind::Augment(augment) => ctx.str(augment.target_arg).to_string(),
                _ => String::new(),
            },
        ),
        UnresKind::ChoiceDefault { node } => (
            "choice default",
            match &ctx.node(*node).kind {
                NodeKind::Choice(choice) => choice
                    .default_arg
                    .map(|s| ctx.str(s).to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            },
        ),
        UnresKind::ListKeys { node } => (
            "list key",
            match &ctx.node(*node).kind {
                NodeKind::List(list) => list
                    .keys_arg
                    .map(|s| ctx.str(s).to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            },
        ),
        UnresKind::ListUnique { node, index } => (
            "unique path",
            match &ctx.node(*node).kind {
                NodeKind::List(list) => ctx.str(list.uniques[*index].arg).to_string(),
                _ => String::new(),
            },
        ),
        UnresKind::Deviation { module, index } => (
            "deviation target",
            ctx.str(ctx.module(*module).deviations[*index].target_arg)
                .to_string(),
        ),
    };
    let mut error = Error::new(ErrorKind::UnresolvedReference { what, name }).with_loc(entry.loc);
    if let Some(anchor) = entry.anchor {
        error = error.with_path(ctx.schema_path(anchor));
    }
    error
}

fn try_resolve(ctx: &mut Context, entry: &Entry, unres: &mut Unres) -> Result<Outcome> {
    match &entry.kind {
        UnresKind::ModuleRef { module, dep } => resolve_module_ref(ctx, *module, dep, unres),
        UnresKind::TypeDer {
            ty,
            scope,
            module,
            in_union,
        }
        | UnresKind::TypeDerTypedef {
            ty,
            scope,
            module,
            in_union,
        } => resolve_type_der(ctx, *ty, *scope, *module, *in_union, unres, entry.loc),
        UnresKind::TypeLeafref { ty, node } => resolve_leafref(ctx, *ty, *node, entry.loc),
        UnresKind::TypeIdentref { ty, module } => resolve_identref(ctx, *ty, *module, entry.loc),
        UnresKind::TypeDefault { ty, value } => resolve_type_default(ctx, *ty, *value, entry.loc),
        UnresKind::Iffeat { site } => resolve_iffeat(ctx, site, entry.loc),
        UnresKind::IdentityBase { identity } => resolve_identity_base(ctx, *identity, entry.loc),
        UnresKind::Uses { node, depth } => resolve_uses(ctx, *node, *depth, unres, entry.loc),
        UnresKind::Augment { node, base } => resolve_augment(ctx, *node, *base, unres, entry.loc),
        UnresKind::ChoiceDefault { node } => resolve_choice_default(ctx, *node, entry.loc),
        UnresKind::ListKeys { node } => resolve_list_keys(ctx, *node, entry.loc),
        UnresKind::ListUnique { node, index } => {
            resolve_list_unique(ctx, *node, *index, entry.loc)
        }
        UnresKind::Deviation { module, index } => {
            resolve_deviation(ctx, *module, *index, entry.loc)
        }
    }
}

// ----------------------------------------------------------------------
// Shared lookups
// ----------------------------------------------------------------------

/// Resolve a reference prefix to a module: the (sub)module's own prefix
/// first, then its import table. `Ok(None)` means the import exists but is
/// not loaded yet; an unknown prefix is a hard failure.
fn resolve_prefix(
    ctx: &Context,
    module: ModuleId,
    prefix: Option<&str>,
) -> Result<Option<ModuleId>> {
    let Some(prefix) = prefix else {
        return Ok(Some(ctx.main_module(module)));
    };
    if ctx.str(ctx.module(module).prefix) == prefix {
        return Ok(Some(ctx.main_module(module)));
    }
    for import in &ctx.module(module).imports {
        if ctx.str(import.prefix) == prefix {
            return Ok(import.module);
        }
    }
    Err(Error::new(ErrorKind::UnknownPrefix {
        prefix: prefix.to_string(),
    }))
}

/// The (sub)modules whose top-level definitions are visible as one scope:
/// the main module plus every included submodule.
fn module_family(ctx: &Context, module: ModuleId) -> Vec<ModuleId> {
    let main = ctx.main_module(module);
    let mut family = vec![main];
    family.extend(ctx.module(main).includes.iter().copied());
    if main != module {
        // A submodule also sees itself before its siblings are loaded.
        if !family.contains(&module) {
            family.push(module);
        }
    }
    family
}

fn find_typedef(
    ctx: &Context,
    module: ModuleId,
    scope: Option<NodeId>,
    name: &str,
    same_module: bool,
) -> Option<TypedefId> {
    if same_module {
        let mut current = scope;
        while let Some(id) = current {
            let found = node_typedefs(&ctx.node(id).kind)
                .iter()
                .find(|&&td| ctx.str(ctx.typedef(td).name) == name);
            if let Some(&td) = found {
                return Some(td);
            }
            current = ctx.node(id).parent;
        }
    }
    for family_module in module_family(ctx, module) {
        let found = ctx
            .module(family_module)
            .typedefs
            .iter()
            .find(|&&td| ctx.str(ctx.typedef(td).name) == name);
        if let Some(&td) = found {
            return Some(td);
        }
    }
    None
}

fn find_identity(ctx: &Context, module: ModuleId, name: &str) -> Option<IdentityId> {
    for family_module in module_family(ctx, module) {
        let found = ctx
            .module(family_module)
            .identities
            .iter()
            .find(|&&id| ctx.str(ctx.identity(id).name) == name);
        if let Some(&id) = found {
            return Some(id);
        }
    }
    None
}

fn find_feature(ctx: &Context, module: ModuleId, name: &str) -> Option<(ModuleId, usize)> {
    for family_module in module_family(ctx, module) {
        let found = ctx
            .module(family_module)
            .features
            .iter()
            .position(|f| ctx.str(f.name) == name);
        if let Some(index) = found {
            return Some((family_module, index));
        }
    }
    None
}

/// Whether a node sits inside a grouping definition or an unapplied
/// uses-level augment: references there are settled at instantiation.
pub(crate) fn in_grouping(ctx: &Context, node: NodeId) -> bool {
    let mut current = ctx.node(node).parent;
    while let Some(id) = current {
        match ctx.node(id).kind {
            NodeKind::Grouping(_) => return true,
            NodeKind::Augment(_) => return ctx.node(id).parent.is_some(),
            _ => current = ctx.node(id).parent,
        }
    }
    false
}

/// Walk a parsed schema path from `start`, in data-node terms. Returns
/// `Ok(None)` when a step does not (yet) exist.
fn walk_path(
    ctx: &Context,
    origin_module: ModuleId,
    start: Option<NodeId>,
    parsed: &SchemaPath,
    lookup: Lookup,
) -> Result<Option<NodeId>> {
    let origin_main = ctx.main_module(origin_module);

    let mut cursor: Option<NodeId> = None;
    let mut root: Option<ModuleId> = None;

    if parsed.absolute {
        let first_module = match resolve_prefix(
            ctx,
            origin_module,
            parsed.segments[0].prefix.as_deref(),
        )? {
            Some(m) => m,
            None => return Ok(None),
        };
        root = Some(first_module);
    } else {
        let mut current = start;
        for _ in 0..parsed.up {
            match current {
                Some(node) => match ctx.data_parent(node) {
                    Some(parent) => current = Some(parent),
                    None => {
                        root = Some(ctx.main_module(ctx.node(node).module));
                        current = None;
                    }
                },
                None => return Ok(None),
            }
        }
        cursor = current;
        if cursor.is_none() && root.is_none() {
            return Ok(None);
        }
    }

    for segment in &parsed.segments {
        let parent = match cursor {
            Some(node) => Parent::Node(node),
            None => Parent::Module(root.expect("path walk has a root")),
        };
        let target_module = match segment.prefix.as_deref() {
            Some(prefix) => match resolve_prefix(ctx, origin_module, Some(prefix))? {
                Some(m) => ctx.main_module(m),
                None => return Ok(None),
            },
            // Data paths default bare names to the path's own module;
            // schema target paths default to the module being addressed.
            None => match lookup {
                Lookup::Data => origin_main,
                Lookup::Schema => match parent {
                    Parent::Module(m) => m,
                    Parent::Node(n) => ctx.main_module(ctx.node(n).module),
                },
            },
        };
        match ctx.find_child(parent, target_module, &segment.name, lookup) {
            Some(found) => {
                cursor = Some(found);
                root = None;
            }
            None => return Ok(None),
        }
    }
    Ok(cursor)
}

// ----------------------------------------------------------------------
// Per-kind resolution
// ----------------------------------------------------------------------

fn resolve_module_ref(
    ctx: &mut Context,
    module: ModuleId,
    dep: &Dep,
    unres: &mut Unres,
) -> Result<Outcome> {
    match dep {
        Dep::Import(index) => {
            let import = ctx.module(module).imports[*index];
            let name = ctx.str(import.name).to_string();
            let revision = import.revision.map(|r| ctx.str(r).to_string());

            if let Some(found) = ctx.get_module(&name, revision.as_deref()) {
                ctx.module_mut(module).imports[*index].module = Some(found);
                return Ok(Outcome::Resolved);
            }
            if let Some((text, format)) = ctx.load_dependency(&name, revision.as_deref()) {
                let loaded = ctx.parse_module(&text, format)?;
                if ctx.str(ctx.module(loaded).name) != name {
                    return Err(Error::new(ErrorKind::UnresolvedReference {
                        what: "imported module",
                        name,
                    }));
                }
                ctx.module_mut(module).imports[*index].module = Some(loaded);
                return Ok(Outcome::Resolved);
            }
            Ok(Outcome::Postponed)
        }
        Dep::Include { name, revision } => {
            let owner = ctx.main_module(module);
            let name_str = ctx.str(*name).to_string();
            let revision_str = revision.map(|r| ctx.str(r).to_string());

            // Already parsed on behalf of this owner?
            let existing = ctx.module(owner).includes.iter().copied().find(|&sub| {
                ctx.str(ctx.module(sub).name) == name_str
            });
            if let Some(sub) = existing {
                if !ctx.module(module).includes.contains(&sub) {
                    ctx.module_mut(module).includes.push(sub);
                }
                return Ok(Outcome::Resolved);
            }

            if let Some((text, format)) = ctx.load_dependency(&name_str, revision_str.as_deref())
            {
                let sub = ctx.parse_submodule(owner, &text, format, unres)?;
                if ctx.str(ctx.module(sub).name) != name_str {
                    ctx.discard_module(sub);
                    return Err(Error::new(ErrorKind::UnresolvedReference {
                        what: "included submodule",
                        name: name_str,
                    }));
                }
                ctx.module_mut(owner).includes.push(sub);
                if module != owner && !ctx.module(module).includes.contains(&sub) {
                    ctx.module_mut(module).includes.push(sub);
                }
                return Ok(Outcome::Resolved);
            }
            Ok(Outcome::Postponed)
        }
    }
}

fn resolve_type_der(
    ctx: &mut Context,
    ty: TypeId,
    scope: Option<NodeId>,
    module: ModuleId,
    in_union: bool,
    unres: &mut Unres,
    loc: usize,
) -> Result<Outcome> {
    let written = ctx
        .typ(ty)
        .name
        .ok_or_else(|| Error::internal("derived type without a name"))?;
    let written = ctx.str(written).to_string();
    let (prefix, bare) = path::split_reference(&written);

    let target_module = match resolve_prefix(ctx, module, prefix)? {
        Some(m) => m,
        None => return Ok(Outcome::Postponed),
    };
    let same_module = ctx.main_module(target_module) == ctx.main_module(module);

    let lookup_module = if same_module { module } else { target_module };
    let Some(td) = find_typedef(ctx, lookup_module, scope, bare, same_module) else {
        return Err(Error::new(ErrorKind::UnresolvedReference {
            what: "type",
            name: written,
        })
        .with_loc(loc));
    };

    let td_type = ctx.typedef(td).ty;
    let base = ctx.typ(td_type).base;
    if base == TypeBase::Unknown {
        return Ok(Outcome::Postponed);
    }
    if in_union && matches!(base, TypeBase::Empty | TypeBase::Leafref) {
        return Err(Error::new(ErrorKind::UnexpectedStatementInContext {
            keyword: base.name().to_string(),
        })
        .with_loc(loc));
    }

    // Restrictions written on the reference must suit the resolved base.
    let compatible = match &ctx.typ(ty).spec {
        TypeSpec::None => true,
        TypeSpec::Number { .. } => base.is_integer() || base == TypeBase::Decimal64,
        TypeSpec::String { patterns, .. } => {
            base == TypeBase::String || (base == TypeBase::Binary && patterns.is_empty())
        }
        _ => false,
    };
    if !compatible {
        return Err(Error::new(ErrorKind::InvalidRange {
            expr: written.clone(),
        })
        .with_loc(loc));
    }
    if base == TypeBase::Binary {
        if let TypeSpec::String {
            length: Some(length),
            ..
        } = ctx.typ(ty).spec.clone()
        {
            ctx.typ_mut(ty).spec = TypeSpec::Binary {
                length: Some(length),
            };
        }
    }

    // A leafref typedef resolves its target per instantiation: each leaf
    // that uses it carries its own copy of the path spec.
    if base == TypeBase::Leafref && matches!(ctx.typ(ty).spec, TypeSpec::None) {
        let leafref_spec = value::chain_find(ctx, td_type, |spec| match spec {
            TypeSpec::Leafref {
                path,
                require_instance,
                ..
            } => Some((*path, *require_instance)),
            _ => None,
        });
        if let Some((tpath, require_instance)) = leafref_spec {
            let owner = ctx.typ(ty).module;
            let tpath = ctx.adopt(owner, tpath);
            ctx.typ_mut(ty).spec = TypeSpec::Leafref {
                path: tpath,
                target: None,
                require_instance,
            };
            if let Some(node) = scope {
                if ctx.node(node).type_id() == Some(ty) && !in_grouping(ctx, node) {
                    unres.push(module, Some(node), loc, UnresKind::TypeLeafref { ty, node });
                }
            }
        }
    }

    let t = ctx.typ_mut(ty);
    t.derived = Some(td);
    t.base = base;
    Ok(Outcome::Resolved)
}

fn resolve_leafref(ctx: &mut Context, ty: TypeId, node: NodeId, loc: usize) -> Result<Outcome> {
    let path_str = match &ctx.typ(ty).spec {
        TypeSpec::Leafref { path, .. } => ctx.str(*path).to_string(),
        _ => return Err(Error::internal("leafref entry on a non-leafref type")),
    };
    let parsed = path::parse(&path_str).map_err(|_| {
        Error::new(ErrorKind::InvalidValue {
            keyword: "path".to_string(),
            value: path_str.clone(),
        })
        .with_loc(loc)
    })?;

    let origin = ctx.typ(ty).module;
    let target = match walk_path(ctx, origin, Some(node), &parsed, Lookup::Data)? {
        Some(target) => target,
        None => return Ok(Outcome::Postponed),
    };
    if !matches!(
        ctx.node(target).kind,
        NodeKind::Leaf(_) | NodeKind::LeafList(_)
    ) {
        return Err(Error::new(ErrorKind::InvalidValue {
            keyword: "path".to_string(),
            value: path_str,
        })
        .with_path(ctx.schema_path(target))
        .with_loc(loc));
    }

    if let TypeSpec::Leafref { target: t, .. } = &mut ctx.typ_mut(ty).spec {
        *t = Some(target);
    }
    match &mut ctx.node_mut(target).kind {
        NodeKind::Leaf(leaf) => {
            if !leaf.backlinks.contains(&node) {
                leaf.backlinks.push(node);
            }
        }
        NodeKind::LeafList(leaf_list) => {
            if !leaf_list.backlinks.contains(&node) {
                leaf_list.backlinks.push(node);
            }
        }
        _ => {}
    }

    // Cycle check over the resolved-so-far chain: the edge that completes a
    // loop is the one that reports it.
    let mut visited = vec![node];
    let mut current = target;
    loop {
        if visited.contains(&current) {
            return Err(Error::new(ErrorKind::CircularLeafref { path: path_str })
                .with_path(ctx.schema_path(node))
                .with_loc(loc));
        }
        visited.push(current);
        let Some(current_ty) = ctx.node(current).type_id() else {
            break;
        };
        if effective_base(ctx, current_ty) != Some(TypeBase::Leafref) {
            break;
        }
        let next = value::chain_find(ctx, current_ty, |spec| match spec {
            TypeSpec::Leafref { target, .. } => Some(*target),
            _ => None,
        })
        .flatten();
        match next {
            Some(next) => current = next,
            None => break,
        }
    }

    Ok(Outcome::Resolved)
}

fn effective_base(ctx: &Context, ty: TypeId) -> Option<TypeBase> {
    let base = ctx.typ(ty).base;
    if base == TypeBase::Unknown {
        None
    } else {
        Some(base)
    }
}

fn resolve_identref(ctx: &mut Context, ty: TypeId, module: ModuleId, loc: usize) -> Result<Outcome> {
    let base_arg = match &ctx.typ(ty).spec {
        TypeSpec::Identityref { base_arg, .. } => ctx.str(*base_arg).to_string(),
        _ => return Err(Error::internal("identityref entry on a wrong type")),
    };
    let (prefix, name) = path::split_reference(&base_arg);
    let target_module = match resolve_prefix(ctx, module, prefix)? {
        Some(m) => m,
        None => return Ok(Outcome::Postponed),
    };
    let Some(identity) = find_identity(ctx, target_module, name) else {
        return Err(Error::new(ErrorKind::UnresolvedReference {
            what: "identity",
            name: base_arg,
        })
        .with_loc(loc));
    };
    if let TypeSpec::Identityref { base, .. } = &mut ctx.typ_mut(ty).spec {
        *base = Some(identity);
    }
    Ok(Outcome::Resolved)
}

fn resolve_type_default(ctx: &mut Context, ty: TypeId, value: Sym, loc: usize) -> Result<Outcome> {
    if !type_settled(ctx, ty) {
        return Ok(Outcome::Postponed);
    }
    let text = ctx.str(value).to_string();
    value::check_value(ctx, ty, &text).map_err(|e| e.with_loc(loc))?;
    Ok(Outcome::Resolved)
}

fn type_settled(ctx: &Context, ty: TypeId) -> bool {
    let t = ctx.typ(ty);
    if t.base == TypeBase::Unknown {
        return false;
    }
    if let TypeSpec::Union { types } = &t.spec {
        return types.iter().all(|member| type_settled(ctx, *member));
    }
    true
}

fn resolve_iffeat(ctx: &mut Context, site: &IffeatSite, loc: usize) -> Result<Outcome> {
    let (name_sym, site_module) = match site {
        IffeatSite::Node { node, index } => {
            (ctx.node(*node).if_features[*index].name, ctx.node(*node).module)
        }
        IffeatSite::Feature {
            module,
            feature,
            index,
        } => (
            ctx.module(*module).features[*feature].if_features[*index].name,
            *module,
        ),
    };
    let written = ctx.str(name_sym).to_string();
    let (prefix, name) = path::split_reference(&written);
    let target_module = match resolve_prefix(ctx, site_module, prefix)? {
        Some(m) => m,
        None => return Ok(Outcome::Postponed),
    };
    let Some(resolved) = find_feature(ctx, target_module, name) else {
        return Err(Error::new(ErrorKind::UnresolvedReference {
            what: "feature",
            name: written,
        })
        .with_loc(loc));
    };
    match site {
        IffeatSite::Node { node, index } => {
            ctx.node_mut(*node).if_features[*index].resolved = Some(resolved);
        }
        IffeatSite::Feature {
            module,
            feature,
            index,
        } => {
            ctx.module_mut(*module).features[*feature].if_features[*index].resolved =
                Some(resolved);
        }
    }
    Ok(Outcome::Resolved)
}

fn resolve_identity_base(ctx: &mut Context, identity: IdentityId, loc: usize) -> Result<Outcome> {
    let ident = ctx.identity(identity);
    let base_arg = ident
        .base_arg
        .ok_or_else(|| Error::internal("identity base entry without a base"))?;
    let module = ident.module;
    let written = ctx.str(base_arg).to_string();
    let (prefix, name) = path::split_reference(&written);

    let target_module = match resolve_prefix(ctx, module, prefix)? {
        Some(m) => m,
        None => return Ok(Outcome::Postponed),
    };
    let Some(base) = find_identity(ctx, target_module, name) else {
        return Err(Error::new(ErrorKind::UnresolvedReference {
            what: "identity",
            name: written,
        })
        .with_loc(loc));
    };
    if base == identity {
        return Err(Error::new(ErrorKind::InvalidValue {
            keyword: "base".to_string(),
            value: written,
        })
        .with_loc(loc));
    }
    ctx.identity_mut(identity).base = Some(base);
    if !ctx.identity(base).derived.contains(&identity) {
        ctx.identity_mut(base).derived.push(identity);
    }
    Ok(Outcome::Resolved)
}

fn resolve_uses(
    ctx: &mut Context,
    node: NodeId,
    depth: u32,
    unres: &mut Unres,
    loc: usize,
) -> Result<Outcome> {
    if depth > 32 {
        return Err(Error::new(ErrorKind::UnresolvedReference {
            what: "grouping",
            name: "circular grouping instantiation".to_string(),
        })
        .with_path(ctx.schema_path(node))
        .with_loc(loc));
    }

    let grouping_arg = match &ctx.node(node).kind {
        NodeKind::Uses(uses) => ctx.str(uses.grouping_arg).to_string(),
        _ => return Err(Error::internal("uses entry on a non-uses node")),
    };
    let (prefix, name) = path::split_reference(&grouping_arg);
    let module = ctx.node(node).module;
    let target_module = match resolve_prefix(ctx, module, prefix)? {
        Some(m) => m,
        None => return Ok(Outcome::Postponed),
    };

    let grouping = find_grouping(ctx, node, module, target_module, name);
    let Some(grouping) = grouping else {
        return Err(Error::new(ErrorKind::UnresolvedReference {
            what: "grouping",
            name: grouping_arg,
        })
        .with_path(ctx.schema_path(node))
        .with_loc(loc));
    };

    if ctx.is_descendant(node, grouping) {
        return Err(Error::new(ErrorKind::UnresolvedReference {
            what: "grouping",
            name: format!("`{grouping_arg}` instantiates itself"),
        })
        .with_loc(loc));
    }
    // Expand only once the grouping body itself has settled.
    if unres.pending_under(ctx, grouping) {
        return Ok(Outcome::Postponed);
    }

    if let NodeKind::Uses(uses) = &mut ctx.node_mut(node).kind {
        uses.grouping = Some(grouping);
    }
    rewrite::expand_uses(ctx, unres, node, grouping, depth, loc)?;
    Ok(Outcome::Resolved)
}

fn find_grouping(
    ctx: &Context,
    uses: NodeId,
    module: ModuleId,
    target_module: ModuleId,
    name: &str,
) -> Option<NodeId> {
    let scan = |parent: Parent| -> Option<NodeId> {
        ctx.raw_children(parent).find(|&child| {
            matches!(ctx.node(child).kind, NodeKind::Grouping(_)) && ctx.node_name(child) == name
        })
    };

    if ctx.main_module(target_module) != ctx.main_module(module) {
        return scan(Parent::Module(ctx.main_module(target_module)));
    }

    let mut current = ctx.node(uses).parent;
    while let Some(id) = current {
        if let Some(found) = scan(Parent::Node(id)) {
            return Some(found);
        }
        current = ctx.node(id).parent;
    }
    scan(Parent::Module(ctx.main_module(module)))
}

fn resolve_augment(
    ctx: &mut Context,
    node: NodeId,
    base: Option<NodeId>,
    unres: &mut Unres,
    loc: usize,
) -> Result<Outcome> {
    let target_arg = match &ctx.node(node).kind {
        NodeKind::Augment(augment) => {
            if augment.target.is_some() {
                return Ok(Outcome::Resolved);
            }
            ctx.str(augment.target_arg).to_string()
        }
        _ => return Err(Error::internal("augment entry on a non-augment node")),
    };
    let parsed = path::parse(&target_arg).map_err(|_| {
        Error::new(ErrorKind::InvalidValue {
            keyword: "augment".to_string(),
            value: target_arg.clone(),
        })
        .with_loc(loc)
    })?;

    let module = ctx.node(node).module;
    let target = match base {
        // A uses-level augment descends from its expanded uses.
        Some(uses) => {
            let mut cursor = uses;
            let mut found = true;
            for segment in &parsed.segments {
                let target_module = match segment.prefix.as_deref() {
                    Some(prefix) => match resolve_prefix(ctx, module, Some(prefix))? {
                        Some(m) => ctx.main_module(m),
                        None => return Ok(Outcome::Postponed),
                    },
                    None => ctx.main_module(module),
                };
                match ctx.find_child(Parent::Node(cursor), target_module, &segment.name, Lookup::Schema)
                {
                    Some(next) => cursor = next,
                    None => {
                        found = false;
                        break;
                    }
                }
            }
            if !found {
                return Ok(Outcome::Postponed);
            }
            cursor
        }
        None => match walk_path(ctx, module, None, &parsed, Lookup::Schema)? {
            Some(target) => target,
            None => return Ok(Outcome::Postponed),
        },
    };

    rewrite::apply_augment(ctx, unres, node, target, base.is_some(), loc)?;
    Ok(Outcome::Resolved)
}

fn resolve_choice_default(ctx: &mut Context, node: NodeId, _loc: usize) -> Result<Outcome> {
    let default_arg = match &ctx.node(node).kind {
        NodeKind::Choice(choice) => match choice.default_arg {
            Some(arg) => ctx.str(arg).to_string(),
            None => return Ok(Outcome::Resolved),
        },
        _ => return Err(Error::internal("choice default entry on a non-choice")),
    };

    // The default names a case or a shorthand child of this choice.
    let found = ctx
        .raw_children(Parent::Node(node))
        .find(|&child| ctx.node_name(child) == default_arg);
    let Some(found) = found else {
        return Ok(Outcome::Postponed);
    };
    if let NodeKind::Choice(choice) = &mut ctx.node_mut(node).kind {
        choice.default = Some(found);
    }
    Ok(Outcome::Resolved)
}

fn resolve_list_keys(ctx: &mut Context, node: NodeId, loc: usize) -> Result<Outcome> {
    let keys_arg = match &ctx.node(node).kind {
        NodeKind::List(list) => match list.keys_arg {
            Some(arg) => ctx.str(arg).to_string(),
            None => return Ok(Outcome::Resolved),
        },
        _ => return Err(Error::internal("list keys entry on a non-list")),
    };
    let list_module = ctx.main_module(ctx.node(node).module);
    let list_config = ctx.node(node).config();

    let mut keys = Vec::new();
    for token in keys_arg.split_whitespace() {
        let Some(leaf) = ctx.find_child(Parent::Node(node), list_module, token, Lookup::Schema)
        else {
            return Ok(Outcome::Postponed);
        };
        if !matches!(ctx.node(leaf).kind, NodeKind::Leaf(_)) {
            return Err(Error::new(ErrorKind::InvalidValue {
                keyword: "key".to_string(),
                value: token.to_string(),
            })
            .with_path(ctx.schema_path(node))
            .with_loc(loc));
        }
        if keys.contains(&leaf) {
            return Err(Error::new(ErrorKind::DuplicateIdentifier {
                name: token.to_string(),
            })
            .with_loc(loc));
        }
        if ctx.node(leaf).config() != list_config {
            return Err(Error::new(ErrorKind::InvalidValue {
                keyword: "config".to_string(),
                value: token.to_string(),
            })
            .with_path(ctx.schema_path(leaf))
            .with_loc(loc));
        }
        keys.push(leaf);
    }

    for &leaf in &keys {
        ctx.node_mut(leaf).flags |= crate::schema::NodeFlags::KEY;
    }
    if let NodeKind::List(list) = &mut ctx.node_mut(node).kind {
        list.keys = keys;
    }
    Ok(Outcome::Resolved)
}

fn resolve_list_unique(
    ctx: &mut Context,
    node: NodeId,
    index: usize,
    loc: usize,
) -> Result<Outcome> {
    let arg = match &ctx.node(node).kind {
        NodeKind::List(list) => ctx.str(list.uniques[index].arg).to_string(),
        _ => return Err(Error::internal("list unique entry on a non-list")),
    };
    let list_module = ctx.main_module(ctx.node(node).module);

    let mut leaves = Vec::new();
    for token in arg.split_whitespace() {
        let segments = path::parse_descendant(token).map_err(|_| {
            Error::new(ErrorKind::InvalidValue {
                keyword: "unique".to_string(),
                value: token.to_string(),
            })
            .with_loc(loc)
        })?;
        let mut cursor = node;
        for segment in &segments {
            let target_module = match segment.prefix.as_deref() {
                Some(prefix) => {
                    match resolve_prefix(ctx, ctx.node(node).module, Some(prefix))? {
                        Some(m) => ctx.main_module(m),
                        None => return Ok(Outcome::Postponed),
                    }
                }
                None => list_module,
            };
            match ctx.find_child(Parent::Node(cursor), target_module, &segment.name, Lookup::Data)
            {
                Some(next) => cursor = next,
                None => return Ok(Outcome::Postponed),
            }
        }
        if !matches!(ctx.node(cursor).kind, NodeKind::Leaf(_)) {
            return Err(Error::new(ErrorKind::InvalidValue {
                keyword: "unique".to_string(),
                value: token.to_string(),
            })
            .with_path(ctx.schema_path(cursor))
            .with_loc(loc));
        }
        if leaves.contains(&cursor) {
            return Err(Error::new(ErrorKind::DuplicateIdentifier {
                name: token.to_string(),
            })
            .with_loc(loc));
        }
        leaves.push(cursor);
    }

    if let NodeKind::List(list) = &mut ctx.node_mut(node).kind {
        list.uniques[index].leaves = leaves;
    }
    Ok(Outcome::Resolved)
}

fn resolve_deviation(
    ctx: &mut Context,
    module: ModuleId,
    index: usize,
    loc: usize,
) -> Result<Outcome> {
    let target_arg = ctx.str(ctx.module(module).deviations[index].target_arg).to_string();
    let parsed = path::parse(&target_arg).map_err(|_| {
        Error::new(ErrorKind::InvalidValue {
            keyword: "deviation".to_string(),
            value: target_arg.clone(),
        })
        .with_loc(loc)
    })?;

    let first_module = match resolve_prefix(
        ctx,
        module,
        parsed.segments[0].prefix.as_deref(),
    )? {
        Some(m) => ctx.main_module(m),
        None => return Ok(Outcome::Postponed),
    };
    if first_module == ctx.main_module(module) {
        return Err(Error::new(ErrorKind::DeviationOfOwnModule).with_loc(loc));
    }

    let target = match walk_path(ctx, module, None, &parsed, Lookup::Schema)? {
        Some(target) => target,
        None => return Ok(Outcome::Postponed),
    };

    rewrite::apply_deviation(ctx, module, index, target, loc)?;
    Ok(Outcome::Resolved)
}
