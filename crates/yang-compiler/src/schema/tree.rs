//! Compact tree view of a module's data nodes, in the style NETCONF
//! tooling prints schemas.

use crate::context::{Context, Parent};
use crate::schema::{ModuleId, NodeFlags, NodeId, NodeKind};

pub(crate) fn print_tree(ctx: &Context, module: ModuleId) -> String {
    let main = ctx.main_module(module);
    let mut out = format!("module: {}\n", ctx.str(ctx.module(main).name));

    let top = visible_children(ctx, Parent::Module(main));
    let (data, special): (Vec<NodeId>, Vec<NodeId>) = top.into_iter().partition(|&n| {
        !matches!(
            ctx.node(n).kind,
            NodeKind::Rpc(_) | NodeKind::Notification(_)
        )
    });

    for (index, &node) in data.iter().enumerate() {
        print_node(ctx, &mut out, node, "  ", index + 1 == data.len());
    }

    let rpcs: Vec<NodeId> = special
        .iter()
        .copied()
        .filter(|&n| matches!(ctx.node(n).kind, NodeKind::Rpc(_)))
        .collect();
    if !rpcs.is_empty() {
        out.push_str("\n  rpcs:\n");
        for (index, &node) in rpcs.iter().enumerate() {
            print_node(ctx, &mut out, node, "  ", index + 1 == rpcs.len());
        }
    }

    let notifications: Vec<NodeId> = special
        .iter()
        .copied()
        .filter(|&n| matches!(ctx.node(n).kind, NodeKind::Notification(_)))
        .collect();
    if !notifications.is_empty() {
        out.push_str("\n  notifications:\n");
        for (index, &node) in notifications.iter().enumerate() {
            print_node(ctx, &mut out, node, "  ", index + 1 == notifications.len());
        }
    }

    out
}

/// Children as the data tree sees them: groupings and augment bookkeeping
/// nodes are invisible, `uses` is transparent.
fn visible_children(ctx: &Context, parent: Parent) -> Vec<NodeId> {
    let mut out = Vec::new();
    for child in ctx.raw_children(parent) {
        match ctx.node(child).kind {
            NodeKind::Grouping(_) | NodeKind::Augment(_) => {}
            NodeKind::Uses(_) => out.extend(visible_children(ctx, Parent::Node(child))),
            _ => out.push(child),
        }
    }
    out
}

fn print_node(ctx: &Context, out: &mut String, node: NodeId, prefix: &str, last: bool) {
    let n = ctx.node(node);
    let flags = match n.kind {
        NodeKind::Rpc(_) | NodeKind::Input(_) | NodeKind::Output(_) => "-x".to_string(),
        NodeKind::Notification(_) => "-n".to_string(),
        _ => {
            if n.config() {
                "rw".to_string()
            } else {
                "ro".to_string()
            }
        }
    };

    let name = ctx.str(n.name);
    let label = match &n.kind {
        NodeKind::Choice(_) => format!("({name})"),
        NodeKind::Case => format!(":({name})"),
        _ => name.to_string(),
    };

    let marker = match &n.kind {
        NodeKind::List(list) => {
            let keys: Vec<&str> = list.keys.iter().map(|&k| ctx.node_name(k)).collect();
            if keys.is_empty() {
                "*".to_string()
            } else {
                format!("* [{}]", keys.join(" "))
            }
        }
        NodeKind::LeafList(_) => "*".to_string(),
        NodeKind::Container(c) => {
            if c.presence.is_some() {
                "!".to_string()
            } else {
                String::new()
            }
        }
        NodeKind::Leaf(_) | NodeKind::Choice(_) | NodeKind::Anyxml(_) => {
            if n.mandatory() || n.flags.contains(NodeFlags::KEY) {
                String::new()
            } else {
                "?".to_string()
            }
        }
        _ => String::new(),
    };

    let type_column = match &n.kind {
        NodeKind::Leaf(leaf) => {
            let t = ctx.typ(leaf.ty);
            let shown = t
                .name
                .map(|s| ctx.str(s).to_string())
                .unwrap_or_else(|| t.base.name().to_string());
            format!("   {shown}")
        }
        NodeKind::LeafList(leaf_list) => {
            let t = ctx.typ(leaf_list.ty);
            let shown = t
                .name
                .map(|s| ctx.str(s).to_string())
                .unwrap_or_else(|| t.base.name().to_string());
            format!("   {shown}")
        }
        NodeKind::Anyxml(_) => "   anyxml".to_string(),
        _ => String::new(),
    };

    out.push_str(&format!("{prefix}+--{flags} {label}{marker}{type_column}\n"));

    let children = visible_children(ctx, Parent::Node(node));
    let child_prefix = if last {
        format!("{prefix}   ")
    } else {
        format!("{prefix}|  ")
    };
    for (index, &child) in children.iter().enumerate() {
        print_node(ctx, out, child, &child_prefix, index + 1 == children.len());
    }
}
