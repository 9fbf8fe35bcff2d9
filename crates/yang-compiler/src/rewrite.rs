//! Tree rewriters: `uses` expansion, augment splicing, deviation
//! application and NACM flag inheritance.
//!
//! All rewriting happens between parsing and sealing, driven by the
//! resolver. Augments and deviations keep enough bookkeeping to be reversed
//! when the publishing module is destroyed, and deviations can be toggled at
//! runtime.

use crate::context::{Context, Lookup, Parent};
use crate::error::{Error, ErrorKind, Result};
use crate::path;
use crate::resolver::{Unres, UnresKind};
use crate::schema::{
    Deviate, DeviateProps, DeviationSnapshot, Import, ImportOrigin, ModuleId, NacmFlags,
    NodeFlags, NodeId, NodeKind, Refine, Type, TypeId, TypeSpec, Unique,
};

// ----------------------------------------------------------------------
// Uses expansion
// ----------------------------------------------------------------------

/// Deep-copy the grouping's children into the `uses` node, then apply its
/// refines and queue its augments.
pub(crate) fn expand_uses(
    ctx: &mut Context,
    unres: &mut Unres,
    uses: NodeId,
    grouping: NodeId,
    depth: u32,
    loc: usize,
) -> Result<()> {
    let target_module = ctx.node(uses).module;
    let effective_config = ctx
        .data_parent(uses)
        .map(|p| ctx.node(p).config())
        .unwrap_or(true);

    let children: Vec<NodeId> = ctx.raw_children(Parent::Node(grouping)).collect();
    let mut copies = Vec::new();
    for child in children {
        // Grouping definitions are not instantiated by the copy.
        if matches!(ctx.node(child).kind, NodeKind::Grouping(_)) {
            continue;
        }
        let copy = copy_subtree(ctx, child, Parent::Node(uses), target_module)?;
        propagate_config(ctx, copy, effective_config)?;
        copies.push(copy);
    }

    if let NodeKind::Uses(u) = &mut ctx.node_mut(uses).kind {
        u.expanded = true;
    }

    let refines = match &ctx.node(uses).kind {
        NodeKind::Uses(u) => u.refines.clone(),
        _ => Vec::new(),
    };
    for refine in &refines {
        apply_refine(ctx, unres, uses, refine, loc)?;
    }

    for copy in copies {
        enqueue_subtree(ctx, unres, copy, depth + 1);
    }

    let augments = match &ctx.node(uses).kind {
        NodeKind::Uses(u) => u.augments.clone(),
        _ => Vec::new(),
    };
    let module = ctx.node(uses).module;
    for augment in augments {
        unres.push(
            module,
            Some(augment),
            loc,
            UnresKind::Augment {
                node: augment,
                base: Some(uses),
            },
        );
    }
    Ok(())
}

/// Copy one schema subtree under a new parent, re-owning every string and
/// type for `module`. Resolution state that is instantiation-specific
/// (leafref targets, list keys, choice defaults, backlinks) is reset.
fn copy_subtree(
    ctx: &mut Context,
    source: NodeId,
    parent: Parent,
    module: ModuleId,
) -> Result<NodeId> {
    let mut node = ctx.node(source).clone();
    node.module = module;
    node.parent = None;
    node.prev = None;
    node.next = None;
    node.first_child = None;
    // Body annotations are not inherited through `uses`; the use site's own
    // annotations flow down instead.
    node.nacm = NacmFlags::empty();

    node.name = ctx.adopt(module, node.name);
    node.description = ctx.adopt_opt(module, node.description);
    node.reference = ctx.adopt_opt(module, node.reference);
    node.when = ctx.adopt_opt(module, node.when);
    for fref in &mut node.if_features {
        fref.name = ctx.adopt(module, fref.name);
    }
    copy_kind(ctx, &mut node.kind, module)?;

    let copy = ctx.nodes.alloc(node);
    ctx.link_child(parent, copy);

    let children: Vec<NodeId> = ctx.raw_children(Parent::Node(source)).collect();
    for child in children {
        copy_subtree(ctx, child, Parent::Node(copy), module)?;
    }

    // Relative augments hang off a uses by parent pointer only.
    if let NodeKind::Uses(u) = &ctx.node(copy).kind {
        let sources = u.augments.clone();
        let mut remapped = Vec::with_capacity(sources.len());
        for augment in sources {
            let augment_copy = copy_subtree(ctx, augment, Parent::Node(copy), module)?;
            // Keep it out of the child chain, matching how it was built.
            ctx.unlink_child(Parent::Node(copy), augment_copy);
            ctx.node_mut(augment_copy).parent = Some(copy);
            remapped.push(augment_copy);
        }
        if let NodeKind::Uses(u) = &mut ctx.node_mut(copy).kind {
            u.augments = remapped;
        }
    }

    Ok(copy)
}

fn copy_kind(ctx: &mut Context, kind: &mut NodeKind, module: ModuleId) -> Result<()> {
    match kind {
        NodeKind::Container(c) => {
            c.presence = ctx.adopt_opt(module, c.presence);
            c.typedefs.clear();
            for must in &mut c.musts {
                adopt_must(ctx, must, module);
            }
        }
        NodeKind::List(l) => {
            l.keys_arg = ctx.adopt_opt(module, l.keys_arg);
            l.keys.clear();
            for unique in &mut l.uniques {
                unique.arg = ctx.adopt(module, unique.arg);
                unique.leaves.clear();
            }
            l.typedefs.clear();
            for must in &mut l.musts {
                adopt_must(ctx, must, module);
            }
        }
        NodeKind::Leaf(l) => {
            l.ty = copy_type(ctx, l.ty, module)?;
            l.units = ctx.adopt_opt(module, l.units);
            l.default = ctx.adopt_opt(module, l.default);
            l.backlinks.clear();
            for must in &mut l.musts {
                adopt_must(ctx, must, module);
            }
        }
        NodeKind::LeafList(l) => {
            l.ty = copy_type(ctx, l.ty, module)?;
            l.units = ctx.adopt_opt(module, l.units);
            l.backlinks.clear();
            for must in &mut l.musts {
                adopt_must(ctx, must, module);
            }
        }
        NodeKind::Choice(c) => {
            c.default_arg = ctx.adopt_opt(module, c.default_arg);
            c.default = None;
        }
        NodeKind::Anyxml(a) => {
            for must in &mut a.musts {
                adopt_must(ctx, must, module);
            }
        }
        NodeKind::Uses(u) => {
            u.grouping_arg = ctx.adopt(module, u.grouping_arg);
            u.grouping = None;
            u.expanded = false;
            for refine in &mut u.refines {
                adopt_refine(ctx, refine, module);
            }
            // Augment subtrees are remapped by the caller.
        }
        NodeKind::Augment(a) => {
            a.target_arg = ctx.adopt(module, a.target_arg);
            a.target = None;
            a.applied.clear();
        }
        NodeKind::Case => {}
        NodeKind::Grouping(_)
        | NodeKind::Rpc(_)
        | NodeKind::Input(_)
        | NodeKind::Output(_)
        | NodeKind::Notification(_) => {
            // Not instantiated through uses in RFC 6020 grammar.
        }
    }
    Ok(())
}

fn adopt_must(ctx: &mut Context, must: &mut crate::schema::Must, module: ModuleId) {
    must.expr = ctx.adopt(module, must.expr);
    must.error_message = ctx.adopt_opt(module, must.error_message);
    must.error_app_tag = ctx.adopt_opt(module, must.error_app_tag);
    must.description = ctx.adopt_opt(module, must.description);
    must.reference = ctx.adopt_opt(module, must.reference);
}

fn adopt_refine(ctx: &mut Context, refine: &mut Refine, module: ModuleId) {
    refine.target_arg = ctx.adopt(module, refine.target_arg);
    refine.description = ctx.adopt_opt(module, refine.description);
    refine.reference = ctx.adopt_opt(module, refine.reference);
    refine.default = ctx.adopt_opt(module, refine.default);
    refine.presence = ctx.adopt_opt(module, refine.presence);
    for must in &mut refine.musts {
        adopt_must(ctx, must, module);
    }
}

fn copy_type(ctx: &mut Context, source: TypeId, module: ModuleId) -> Result<TypeId> {
    let mut ty: Type = ctx.typ(source).clone();
    ty.module = module;
    ty.name = ctx.adopt_opt(module, ty.name);
    match &mut ty.spec {
        TypeSpec::None => {}
        TypeSpec::String { length, patterns } => {
            if let Some(length) = length {
                adopt_restriction(ctx, length, module);
            }
            for pattern in patterns {
                pattern.expr = ctx.adopt(module, pattern.expr);
                pattern.error_message = ctx.adopt_opt(module, pattern.error_message);
                pattern.error_app_tag = ctx.adopt_opt(module, pattern.error_app_tag);
            }
        }
        TypeSpec::Binary { length } => {
            if let Some(length) = length {
                adopt_restriction(ctx, length, module);
            }
        }
        TypeSpec::Number { range } | TypeSpec::Decimal64 { range, .. } => {
            if let Some(range) = range {
                adopt_restriction(ctx, range, module);
            }
        }
        TypeSpec::Bits { bits } => {
            for bit in bits {
                bit.name = ctx.adopt(module, bit.name);
                bit.description = ctx.adopt_opt(module, bit.description);
                bit.reference = ctx.adopt_opt(module, bit.reference);
            }
        }
        TypeSpec::Enumeration { enums } => {
            for value in enums {
                value.name = ctx.adopt(module, value.name);
                value.description = ctx.adopt_opt(module, value.description);
                value.reference = ctx.adopt_opt(module, value.reference);
            }
        }
        TypeSpec::Leafref { path, target, .. } => {
            *path = ctx.adopt(module, *path);
            *target = None;
        }
        TypeSpec::Identityref { base_arg, .. } => {
            *base_arg = ctx.adopt(module, *base_arg);
        }
        TypeSpec::InstanceIdentifier { .. } => {}
        TypeSpec::Union { types } => {
            let mut members = Vec::with_capacity(types.len());
            for member in types.iter() {
                members.push(copy_type(ctx, *member, module)?);
            }
            *types = members;
        }
    }
    Ok(ctx.types.alloc(ty))
}

fn adopt_restriction(ctx: &mut Context, restriction: &mut crate::schema::Restriction, module: ModuleId) {
    restriction.arg = ctx.adopt(module, restriction.arg);
    restriction.error_message = ctx.adopt_opt(module, restriction.error_message);
    restriction.error_app_tag = ctx.adopt_opt(module, restriction.error_app_tag);
}

/// Effective-config inheritance for a freshly placed subtree: nodes that
/// wrote their own `config` keep it, everything else inherits.
pub(crate) fn propagate_config(ctx: &mut Context, node: NodeId, parent_config: bool) -> Result<()> {
    let flags = ctx.node(node).flags;
    let effective = if flags.contains(NodeFlags::CONFIG_SET) {
        let own = flags.contains(NodeFlags::CONFIG);
        if own && !parent_config {
            return Err(Error::new(ErrorKind::InvalidValue {
                keyword: "config".to_string(),
                value: "true".to_string(),
            })
            .with_path(ctx.schema_path(node)));
        }
        own
    } else {
        let flags = &mut ctx.node_mut(node).flags;
        flags.set(NodeFlags::CONFIG, parent_config);
        parent_config
    };

    if matches!(ctx.node(node).kind, NodeKind::Grouping(_)) {
        return Ok(());
    }
    let children: Vec<NodeId> = ctx.raw_children(Parent::Node(node)).collect();
    for child in children {
        propagate_config(ctx, child, effective)?;
    }
    Ok(())
}

/// Queue resolution work for a subtree that just became part of the real
/// tree (a uses expansion or a spliced uses-level augment).
pub(crate) fn enqueue_subtree(ctx: &Context, unres: &mut Unres, root: NodeId, depth: u32) {
    let module = ctx.node(root).module;
    match &ctx.node(root).kind {
        NodeKind::Leaf(leaf) => {
            enqueue_leafref(ctx, unres, root, leaf.ty, module);
            if let Some(default) = leaf.default {
                unres.push(
                    module,
                    Some(root),
                    0,
                    UnresKind::TypeDefault {
                        ty: leaf.ty,
                        value: default,
                    },
                );
            }
        }
        NodeKind::LeafList(leaf_list) => {
            enqueue_leafref(ctx, unres, root, leaf_list.ty, module);
        }
        NodeKind::List(list) => {
            if list.keys_arg.is_some() && list.keys.is_empty() {
                unres.push(module, Some(root), 0, UnresKind::ListKeys { node: root });
            }
            for (index, unique) in list.uniques.iter().enumerate() {
                if unique.leaves.is_empty() {
                    unres.push(
                        module,
                        Some(root),
                        0,
                        UnresKind::ListUnique { node: root, index },
                    );
                }
            }
        }
        NodeKind::Choice(choice) => {
            if choice.default_arg.is_some() && choice.default.is_none() {
                unres.push(module, Some(root), 0, UnresKind::ChoiceDefault { node: root });
            }
        }
        NodeKind::Uses(uses) => {
            if !uses.expanded {
                unres.push(module, Some(root), 0, UnresKind::Uses { node: root, depth });
            }
        }
        _ => {}
    }

    for child in ctx.raw_children(Parent::Node(root)) {
        enqueue_subtree(ctx, unres, child, depth);
    }
}

fn enqueue_leafref(ctx: &Context, unres: &mut Unres, node: NodeId, ty: TypeId, module: ModuleId) {
    if let TypeSpec::Leafref { target: None, .. } = &ctx.typ(ty).spec {
        unres.push(module, Some(node), 0, UnresKind::TypeLeafref { ty, node });
    }
}

fn apply_refine(
    ctx: &mut Context,
    unres: &mut Unres,
    uses: NodeId,
    refine: &Refine,
    loc: usize,
) -> Result<()> {
    let target_arg = ctx.str(refine.target_arg).to_string();
    let segments = path::parse_descendant(&target_arg).map_err(|_| {
        Error::new(ErrorKind::InvalidValue {
            keyword: "refine".to_string(),
            value: target_arg.clone(),
        })
        .with_loc(loc)
    })?;

    let module = ctx.main_module(ctx.node(uses).module);
    let mut cursor = uses;
    for segment in &segments {
        match ctx.find_child(Parent::Node(cursor), module, &segment.name, Lookup::Schema) {
            Some(next) => cursor = next,
            None => {
                return Err(Error::new(ErrorKind::UnresolvedReference {
                    what: "refine target",
                    name: target_arg,
                })
                .with_path(ctx.schema_path(uses))
                .with_loc(loc));
            }
        }
    }
    let target = cursor;

    if let Some(description) = refine.description {
        let sym = ctx.adopt(ctx.node(target).module, description);
        ctx.node_mut(target).description = Some(sym);
    }
    if let Some(reference) = refine.reference {
        let sym = ctx.adopt(ctx.node(target).module, reference);
        ctx.node_mut(target).reference = Some(sym);
    }
    let path = ctx.schema_path(target);
    let mismatch = |keyword: &str| {
        Error::new(ErrorKind::UnexpectedStatementInContext {
            keyword: keyword.to_string(),
        })
        .with_path(path.clone())
        .with_loc(loc)
    };

    if let Some(mandatory) = refine.mandatory {
        if !matches!(
            ctx.node(target).kind,
            NodeKind::Leaf(_) | NodeKind::Choice(_) | NodeKind::Anyxml(_)
        ) {
            return Err(mismatch("mandatory"));
        }
        ctx.node_mut(target)
            .flags
            .set(NodeFlags::MANDATORY, mandatory);
    }
    if let Some(config) = refine.config {
        let parent_config = ctx
            .data_parent(target)
            .map_or(true, |p| ctx.node(p).config());
        ctx.node_mut(target).flags |= NodeFlags::CONFIG_SET;
        ctx.node_mut(target).flags.set(NodeFlags::CONFIG, config);
        propagate_config(ctx, target, parent_config)?;
    }
    if let Some(default) = refine.default {
        let owner = ctx.node(target).module;
        let sym = ctx.adopt(owner, default);
        let mandatory = ctx.node(target).mandatory();
        match &mut ctx.node_mut(target).kind {
            NodeKind::Leaf(leaf) => {
                if mandatory {
                    return Err(Error::new(ErrorKind::MandatoryWithDefault)
                        .with_path(path.clone())
                        .with_loc(loc));
                }
                leaf.default = Some(sym);
                let ty = leaf.ty;
                unres.push(
                    owner,
                    Some(target),
                    loc,
                    UnresKind::TypeDefault { ty, value: sym },
                );
            }
            NodeKind::Choice(choice) => {
                choice.default_arg = Some(sym);
                choice.default = None;
                unres.push(
                    owner,
                    Some(target),
                    loc,
                    UnresKind::ChoiceDefault { node: target },
                );
            }
            _ => return Err(mismatch("default")),
        }
    }
    if let Some(presence) = refine.presence {
        let owner = ctx.node(target).module;
        let sym = ctx.adopt(owner, presence);
        match &mut ctx.node_mut(target).kind {
            NodeKind::Container(container) => container.presence = Some(sym),
            _ => return Err(mismatch("presence")),
        }
    }
    if let Some(min) = refine.min_elements {
        match &mut ctx.node_mut(target).kind {
            NodeKind::List(list) => list.min_elements = min,
            NodeKind::LeafList(leaf_list) => leaf_list.min_elements = min,
            _ => return Err(mismatch("min-elements")),
        }
    }
    if let Some(max) = refine.max_elements {
        match &mut ctx.node_mut(target).kind {
            NodeKind::List(list) => list.max_elements = max,
            NodeKind::LeafList(leaf_list) => leaf_list.max_elements = max,
            _ => return Err(mismatch("max-elements")),
        }
    }
    if !refine.musts.is_empty() {
        let owner = ctx.node(target).module;
        let mut musts = refine.musts.clone();
        for must in &mut musts {
            adopt_must(ctx, must, owner);
        }
        match &mut ctx.node_mut(target).kind {
            NodeKind::Container(c) => c.musts.extend(musts),
            NodeKind::List(l) => l.musts.extend(musts),
            NodeKind::Leaf(l) => l.musts.extend(musts),
            NodeKind::LeafList(l) => l.musts.extend(musts),
            NodeKind::Anyxml(a) => a.musts.extend(musts),
            _ => return Err(mismatch("must")),
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Augment application
// ----------------------------------------------------------------------

/// Splice the augment's children onto the target's child chain, preserving
/// sibling order. The augment node itself stays with its owning module for
/// printing and teardown.
pub(crate) fn apply_augment(
    ctx: &mut Context,
    unres: &mut Unres,
    augment: NodeId,
    target: NodeId,
    relative: bool,
    loc: usize,
) -> Result<()> {
    if !matches!(
        ctx.node(target).kind,
        NodeKind::Container(_)
            | NodeKind::List(_)
            | NodeKind::Choice(_)
            | NodeKind::Case
            | NodeKind::Input(_)
            | NodeKind::Output(_)
            | NodeKind::Notification(_)
            | NodeKind::Rpc(_)
    ) {
        return Err(Error::new(ErrorKind::UnexpectedStatementInContext {
            keyword: "augment".to_string(),
        })
        .with_path(ctx.schema_path(target))
        .with_loc(loc));
    }

    let children: Vec<NodeId> = ctx.raw_children(Parent::Node(augment)).collect();
    let augment_module = ctx.main_module(ctx.node(augment).module);

    // No duplicate identifiers at the instantiated level.
    for &child in &children {
        let name = ctx.node_name(child).to_string();
        let clash = ctx.raw_children(Parent::Node(target)).any(|existing| {
            let e = ctx.node(existing);
            !matches!(e.kind, NodeKind::Augment(_) | NodeKind::Grouping(_))
                && ctx.str(e.name) == name
                && ctx.main_module(e.module) == augment_module
        });
        if clash {
            return Err(Error::new(ErrorKind::DuplicateIdentifier { name })
                .with_path(ctx.schema_path(target))
                .with_loc(loc));
        }
    }

    let target_config = ctx.node(target).config();
    let target_nacm = ctx.node(target).nacm;
    for &child in &children {
        ctx.unlink_child(Parent::Node(augment), child);
        ctx.link_child(Parent::Node(target), child);
        propagate_config(ctx, child, target_config)?;
        inherit_nacm(ctx, child, target_nacm);
        if relative {
            enqueue_subtree(ctx, unres, child, 0);
        }
    }

    if let NodeKind::Augment(a) = &mut ctx.node_mut(augment).kind {
        a.target = Some(target);
        a.applied = children;
    }

    // Cross-module bookkeeping mirrors deviations: the target learns who
    // extends it.
    let target_main = ctx.main_module(ctx.node(target).module);
    if target_main != augment_module && !relative {
        add_external_import(ctx, target_main, augment_module, ImportOrigin::ViaAugment);
    }
    Ok(())
}

fn add_external_import(
    ctx: &mut Context,
    target: ModuleId,
    source: ModuleId,
    origin: ImportOrigin,
) {
    let already = ctx
        .module(target)
        .imports
        .iter()
        .any(|i| i.module == Some(source) && i.origin == origin);
    if already {
        return;
    }
    let name = ctx.str(ctx.module(source).name).to_string();
    let prefix = ctx.str(ctx.module(source).prefix).to_string();
    let revision = ctx
        .module(source)
        .revision()
        .map(|r| ctx.str(r).to_string());
    let name = ctx.intern(target, &name);
    let prefix = ctx.intern(target, &prefix);
    let revision = revision.map(|r| ctx.intern(target, &r));
    ctx.module_mut(target).imports.push(Import {
        name,
        prefix,
        revision,
        module: Some(source),
        origin,
    });
}

// ----------------------------------------------------------------------
// Deviation application
// ----------------------------------------------------------------------

pub(crate) fn apply_deviation(
    ctx: &mut Context,
    module: ModuleId,
    index: usize,
    target: NodeId,
    loc: usize,
) -> Result<()> {
    let deviates = ctx.module(module).deviations[index].deviates.clone();

    let snapshot = if matches!(deviates.first(), Some(Deviate::NotSupported)) {
        if ctx.node(target).flags.contains(NodeFlags::KEY) {
            return Err(Error::new(ErrorKind::NotSupportedRemovesKey {
                name: ctx.node_name(target).to_string(),
            })
            .with_path(ctx.schema_path(target))
            .with_loc(loc));
        }
        let parent = ctx.node(target).parent;
        let prev = previous_sibling(ctx, target);
        ctx.unlink_child(parent_of_or(ctx, target), target);
        ctx.node_mut(target).flags |= NodeFlags::DEVIATED_AWAY;
        DeviationSnapshot::Unlinked {
            node: target,
            parent,
            prev,
        }
    } else {
        let original = DeviationSnapshot::Properties {
            flags: ctx.node(target).flags,
            kind: Box::new(ctx.node(target).kind.clone()),
        };
        for deviate in &deviates {
            apply_deviate(ctx, module, target, deviate, loc)?;
        }
        original
    };

    {
        let deviation = &mut ctx.module_mut(module).deviations[index];
        deviation.target = Some(target);
        deviation.snapshot = Some(snapshot);
        deviation.active = true;
    }

    let target_main = ctx.main_module(ctx.node(target).module);
    ctx.module_mut(target_main).deviated = true;
    let source_main = ctx.main_module(module);
    add_external_import(ctx, target_main, source_main, ImportOrigin::ViaDeviation);
    ctx.set_implement(source_main)?;
    Ok(())
}

fn parent_of_or(ctx: &Context, node: NodeId) -> Parent {
    match ctx.node(node).parent {
        Some(parent) => Parent::Node(parent),
        None => Parent::Module(ctx.main_module(ctx.node(node).module)),
    }
}

fn previous_sibling(ctx: &Context, node: NodeId) -> Option<NodeId> {
    let prev = ctx.node(node).prev?;
    // The head's prev points at the last sibling; a real predecessor has us
    // as its next.
    if ctx.node(prev).next == Some(node) {
        Some(prev)
    } else {
        None
    }
}

fn apply_deviate(
    ctx: &mut Context,
    module: ModuleId,
    target: NodeId,
    deviate: &Deviate,
    loc: usize,
) -> Result<()> {
    let (props, mode) = match deviate {
        Deviate::Add(props) => (props, DeviateMode::Add),
        Deviate::Replace(props) => (props, DeviateMode::Replace),
        Deviate::Delete(props) => (props, DeviateMode::Delete),
        Deviate::NotSupported => return Err(Error::internal("not-supported reaches apply_deviate")),
    };
    apply_deviate_props(ctx, module, target, props, mode, loc)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DeviateMode {
    Add,
    Replace,
    Delete,
}

fn apply_deviate_props(
    ctx: &mut Context,
    module: ModuleId,
    target: NodeId,
    props: &DeviateProps,
    mode: DeviateMode,
    loc: usize,
) -> Result<()> {
    let path = ctx.schema_path(target);
    let mismatch = |keyword: &str| {
        Error::new(ErrorKind::UnexpectedStatementInContext {
            keyword: keyword.to_string(),
        })
        .with_path(path.clone())
        .with_loc(loc)
    };
    let precondition = |keyword: &str, value: &str| {
        Error::new(ErrorKind::InvalidValue {
            keyword: keyword.to_string(),
            value: value.to_string(),
        })
        .with_path(path.clone())
        .with_loc(loc)
    };

    if let Some(units) = props.units {
        let owner = ctx.node(target).module;
        let sym = ctx.adopt(owner, units);
        let text = ctx.str(units).to_string();
        let current = match &mut ctx.node_mut(target).kind {
            NodeKind::Leaf(leaf) => &mut leaf.units,
            NodeKind::LeafList(leaf_list) => &mut leaf_list.units,
            _ => return Err(mismatch("units")),
        };
        match mode {
            DeviateMode::Add => {
                if current.is_some() {
                    return Err(precondition("units", &text));
                }
                *current = Some(sym);
            }
            DeviateMode::Replace => {
                if current.is_none() {
                    return Err(precondition("units", &text));
                }
                *current = Some(sym);
            }
            DeviateMode::Delete => {
                let matches = current.is_some_and(|c| c == units);
                if !matches {
                    return Err(precondition("units", &text));
                }
                *current = None;
            }
        }
    }

    if !props.musts.is_empty() {
        let owner = ctx.node(target).module;
        let mut incoming = props.musts.clone();
        for must in &mut incoming {
            adopt_must(ctx, must, owner);
        }
        let musts: &mut Vec<crate::schema::Must> = match &mut ctx.node_mut(target).kind {
            NodeKind::Container(c) => &mut c.musts,
            NodeKind::List(l) => &mut l.musts,
            NodeKind::Leaf(l) => &mut l.musts,
            NodeKind::LeafList(l) => &mut l.musts,
            NodeKind::Anyxml(a) => &mut a.musts,
            _ => return Err(mismatch("must")),
        };
        match mode {
            DeviateMode::Add => musts.extend(incoming),
            DeviateMode::Replace => *musts = incoming,
            DeviateMode::Delete => {
                for must in &incoming {
                    let position = musts.iter().position(|m| m.expr == must.expr);
                    match position {
                        Some(position) => {
                            musts.remove(position);
                        }
                        None => return Err(precondition("must", "<no such expression>")),
                    }
                }
            }
        }
    }

    if !props.uniques.is_empty() {
        let owner = ctx.node(target).module;
        for &unique in &props.uniques {
            let sym = ctx.adopt(owner, unique);
            let text = ctx.str(unique).to_string();
            match &mut ctx.node_mut(target).kind {
                NodeKind::List(list) => match mode {
                    DeviateMode::Add | DeviateMode::Replace => list.uniques.push(Unique {
                        arg: sym,
                        leaves: Vec::new(),
                    }),
                    DeviateMode::Delete => {
                        let position =
                            list.uniques.iter().position(|u| u.arg == unique);
                        match position {
                            Some(position) => {
                                list.uniques.remove(position);
                            }
                            None => return Err(precondition("unique", &text)),
                        }
                    }
                },
                _ => return Err(mismatch("unique")),
            }
        }
    }

    if let Some(default) = props.default {
        let owner = ctx.node(target).module;
        let sym = ctx.adopt(owner, default);
        let text = ctx.str(default).to_string();
        match &mut ctx.node_mut(target).kind {
            NodeKind::Leaf(leaf) => match mode {
                DeviateMode::Add => {
                    if leaf.default.is_some() {
                        return Err(precondition("default", &text));
                    }
                    leaf.default = Some(sym);
                }
                DeviateMode::Replace => {
                    if leaf.default.is_none() {
                        return Err(precondition("default", &text));
                    }
                    leaf.default = Some(sym);
                }
                DeviateMode::Delete => {
                    if !leaf.default.is_some_and(|d| d == default) {
                        return Err(precondition("default", &text));
                    }
                    leaf.default = None;
                }
            },
            NodeKind::Choice(choice) => match mode {
                DeviateMode::Add => {
                    if choice.default_arg.is_some() {
                        return Err(precondition("default", &text));
                    }
                    choice.default_arg = Some(sym);
                    choice.default = None;
                }
                DeviateMode::Replace => {
                    if choice.default_arg.is_none() {
                        return Err(precondition("default", &text));
                    }
                    choice.default_arg = Some(sym);
                    choice.default = None;
                }
                DeviateMode::Delete => {
                    if !choice.default_arg.is_some_and(|d| d == default) {
                        return Err(precondition("default", &text));
                    }
                    choice.default_arg = None;
                    choice.default = None;
                }
            },
            _ => return Err(mismatch("default")),
        }
        // A restored or added choice default re-resolves on demand; leaf
        // defaults must stay consistent with the mandatory flag.
        if ctx.node(target).mandatory() && mode != DeviateMode::Delete {
            return Err(Error::new(ErrorKind::MandatoryWithDefault)
                .with_path(ctx.schema_path(target))
                .with_loc(loc));
        }
    }

    if let Some(config) = props.config {
        if mode == DeviateMode::Delete {
            return Err(mismatch("config"));
        }
        if !matches!(
            ctx.node(target).kind,
            NodeKind::Container(_)
                | NodeKind::List(_)
                | NodeKind::Leaf(_)
                | NodeKind::LeafList(_)
                | NodeKind::Choice(_)
                | NodeKind::Anyxml(_)
        ) {
            return Err(mismatch("config"));
        }
        ctx.node_mut(target).flags |= NodeFlags::CONFIG_SET;
        ctx.node_mut(target).flags.set(NodeFlags::CONFIG, config);
        let parent_config = ctx
            .data_parent(target)
            .map_or(true, |p| ctx.node(p).config());
        propagate_config(ctx, target, parent_config)?;
    }

    if let Some(mandatory) = props.mandatory {
        if mode == DeviateMode::Delete {
            return Err(mismatch("mandatory"));
        }
        if !matches!(
            ctx.node(target).kind,
            NodeKind::Leaf(_) | NodeKind::Choice(_) | NodeKind::Anyxml(_)
        ) {
            return Err(mismatch("mandatory"));
        }
        if mandatory {
            let has_default = match &ctx.node(target).kind {
                NodeKind::Leaf(leaf) => leaf.default.is_some(),
                NodeKind::Choice(choice) => choice.default_arg.is_some(),
                _ => false,
            };
            if has_default {
                return Err(Error::new(ErrorKind::MandatoryWithDefault)
                    .with_path(ctx.schema_path(target))
                    .with_loc(loc));
            }
        }
        ctx.node_mut(target)
            .flags
            .set(NodeFlags::MANDATORY, mandatory);
    }

    if let Some(min) = props.min_elements {
        match &mut ctx.node_mut(target).kind {
            NodeKind::List(list) => list.min_elements = min,
            NodeKind::LeafList(leaf_list) => leaf_list.min_elements = min,
            _ => return Err(mismatch("min-elements")),
        }
    }
    if let Some(max) = props.max_elements {
        match &mut ctx.node_mut(target).kind {
            NodeKind::List(list) => list.max_elements = max,
            NodeKind::LeafList(leaf_list) => leaf_list.max_elements = max,
            _ => return Err(mismatch("max-elements")),
        }
    }

    if let Some(ty) = props.ty {
        if mode != DeviateMode::Replace {
            return Err(mismatch("type"));
        }
        let owner = ctx.node(target).module;
        let copied = copy_type(ctx, ty, owner)?;
        match &mut ctx.node_mut(target).kind {
            NodeKind::Leaf(leaf) => leaf.ty = copied,
            NodeKind::LeafList(leaf_list) => leaf_list.ty = copied,
            _ => return Err(mismatch("type")),
        }
    }

    let _ = module;
    Ok(())
}

/// Toggle every deviation published by `module`: its own inverse.
pub(crate) fn switch_deviations(ctx: &mut Context, module: ModuleId) -> Result<()> {
    let count = ctx.module(module).deviations.len();
    let mut touched: indexmap::IndexSet<ModuleId> = indexmap::IndexSet::new();

    for index in 0..count {
        let Some(target) = ctx.module(module).deviations[index].target else {
            continue;
        };
        touched.insert(ctx.main_module(ctx.node(target).module));
        toggle_deviation(ctx, module, index)?;
    }

    for target in touched {
        let deviated = ctx.module(target).deviated;
        ctx.module_mut(target).deviated = !deviated;
    }
    Ok(())
}

fn toggle_deviation(ctx: &mut Context, module: ModuleId, index: usize) -> Result<()> {
    let snapshot = ctx.module_mut(module).deviations[index].snapshot.take();
    let Some(snapshot) = snapshot else {
        return Ok(());
    };

    let new_snapshot = match snapshot {
        DeviationSnapshot::Unlinked { node, parent, prev } => {
            let chain_parent = match parent {
                Some(p) => Parent::Node(p),
                None => Parent::Module(ctx.main_module(ctx.node(node).module)),
            };
            ctx.relink_after(chain_parent, node, prev);
            ctx.node_mut(node).parent = parent;
            ctx.node_mut(node).flags.remove(NodeFlags::DEVIATED_AWAY);
            DeviationSnapshot::Linked { node, parent, prev }
        }
        DeviationSnapshot::Linked { node, parent, prev } => {
            ctx.unlink_child(parent_of_or(ctx, node), node);
            ctx.node_mut(node).flags |= NodeFlags::DEVIATED_AWAY;
            DeviationSnapshot::Unlinked { node, parent, prev }
        }
        DeviationSnapshot::Properties { flags, kind } => {
            let target = ctx.module(module).deviations[index]
                .target
                .ok_or_else(|| Error::internal("deviation snapshot without target"))?;
            let stored = swap_properties(ctx, target, flags, *kind);
            DeviationSnapshot::Properties {
                flags: stored.0,
                kind: Box::new(stored.1),
            }
        }
    };

    let deviation = &mut ctx.module_mut(module).deviations[index];
    deviation.snapshot = Some(new_snapshot);
    deviation.active = !deviation.active;
    Ok(())
}

/// Swap the deviable properties of `target` with a stored snapshot,
/// returning what was current. Backlinks and structural flags stay put.
fn swap_properties(
    ctx: &mut Context,
    target: NodeId,
    flags: NodeFlags,
    mut kind: NodeKind,
) -> (NodeFlags, NodeKind) {
    let backlinks = extract_backlinks(&ctx.node(target).kind);

    let mask = NodeFlags::CONFIG | NodeFlags::CONFIG_SET | NodeFlags::MANDATORY;
    let node = ctx.node_mut(target);
    let current_masked = node.flags & mask;
    let snapshot_masked = flags & mask;
    node.flags = (node.flags & !mask) | snapshot_masked;
    let stored_flags = (flags & !mask) | current_masked;

    std::mem::swap(&mut node.kind, &mut kind);
    restore_backlinks(&mut node.kind, backlinks);

    (stored_flags, kind)
}

fn extract_backlinks(kind: &NodeKind) -> Vec<NodeId> {
    match kind {
        NodeKind::Leaf(leaf) => leaf.backlinks.clone(),
        NodeKind::LeafList(leaf_list) => leaf_list.backlinks.clone(),
        _ => Vec::new(),
    }
}

fn restore_backlinks(kind: &mut NodeKind, backlinks: Vec<NodeId>) {
    match kind {
        NodeKind::Leaf(leaf) => leaf.backlinks = backlinks,
        NodeKind::LeafList(leaf_list) => leaf_list.backlinks = backlinks,
        _ => {}
    }
}

// ----------------------------------------------------------------------
// Teardown and finalization
// ----------------------------------------------------------------------

/// Reverse everything `module` did to other modules: unsplice its augments
/// and restore its deviation targets. Runs before the module's own slots are
/// freed.
pub(crate) fn teardown(ctx: &mut Context, module: ModuleId) {
    let family: Vec<ModuleId> = {
        let mut f = vec![module];
        f.extend(ctx.module(module).includes.iter().copied());
        f
    };

    // Unsplice augment children that live in foreign chains.
    let augment_nodes: Vec<NodeId> = ctx
        .nodes
        .iter()
        .filter(|(_, node)| {
            family.contains(&node.module) && matches!(node.kind, NodeKind::Augment(_))
        })
        .map(|(id, _)| id)
        .collect();
    for augment in augment_nodes {
        let (target, applied) = match &ctx.node(augment).kind {
            NodeKind::Augment(a) => (a.target, a.applied.clone()),
            _ => continue,
        };
        let Some(target) = target else { continue };
        if !ctx.nodes.contains(target) {
            continue;
        }
        if family.contains(&ctx.node(target).module) {
            continue;
        }
        for child in applied {
            if ctx.nodes.contains(child) && ctx.node(child).parent == Some(target) {
                ctx.unlink_child(Parent::Node(target), child);
            }
        }
    }

    // Restore deviation targets that are still applied.
    let count = ctx.module(module).deviations.len();
    for index in 0..count {
        let active = ctx.module(module).deviations[index].active;
        if active {
            let _ = toggle_deviation(ctx, module, index);
        }
        if let Some(target) = ctx.module(module).deviations[index].target {
            if ctx.nodes.contains(target) {
                let target_main = ctx.main_module(ctx.node(target).module);
                if !family.contains(&target_main) {
                    ctx.module_mut(target_main).deviated = false;
                }
            }
        }
    }

    // Drop the bookkeeping import entries other modules hold on us.
    let all: Vec<ModuleId> = (0..ctx.modules.len() as u32)
        .map(ModuleId)
        .filter(|m| ctx.modules[m.0 as usize].is_some() && !family.contains(m))
        .collect();
    for other in all {
        ctx.module_mut(other).imports.retain(|import| {
            !(import.origin != ImportOrigin::Local
                && import.module.is_some_and(|m| family.contains(&m)))
        });
    }
}

/// Post-resolution pass: NACM flags inherit down the data tree, except into
/// grouping definitions.
pub(crate) fn finalize(ctx: &mut Context, module: ModuleId) -> Result<()> {
    let main = ctx.main_module(module);
    let roots: Vec<NodeId> = ctx.raw_children(Parent::Module(main)).collect();
    for root in roots {
        let nacm = ctx.node(root).nacm;
        inherit_nacm(ctx, root, nacm);
    }
    Ok(())
}

fn inherit_nacm(ctx: &mut Context, node: NodeId, inherited: NacmFlags) {
    if matches!(ctx.node(node).kind, NodeKind::Grouping(_)) {
        return;
    }
    ctx.node_mut(node).nacm |= inherited;
    let combined = ctx.node(node).nacm;
    let children: Vec<NodeId> = ctx.raw_children(Parent::Node(node)).collect();
    for child in children {
        inherit_nacm(ctx, child, combined);
    }
}
