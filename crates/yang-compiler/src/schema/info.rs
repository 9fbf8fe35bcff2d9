//! The "info" view: a flat dump of a module's metadata, definitions and
//! node headers, useful for tooling and debugging.

use crate::context::{Context, Parent};
use crate::schema::{ModuleId, NodeId, Status, TypeSpec};

pub(crate) fn print_info(ctx: &Context, module: ModuleId) -> String {
    let m = ctx.module(module);
    let mut out = String::new();

    let kind = if m.is_submodule() { "Submodule" } else { "Module" };
    out.push_str(&format!("{kind}: {}\n", ctx.str(m.name)));
    if let Some(namespace) = m.namespace {
        out.push_str(&format!("Namespace: {}\n", ctx.str(namespace)));
    }
    out.push_str(&format!("Prefix: {}\n", ctx.str(m.prefix)));
    if let Some(revision) = m.revision() {
        out.push_str(&format!("Revision: {}\n", ctx.str(revision)));
    }
    out.push_str(&format!(
        "Implemented: {}\nDeviated: {}\n",
        m.implemented, m.deviated
    ));

    for import in &m.imports {
        out.push_str(&format!(
            "Import: {} (prefix {}, {:?})\n",
            ctx.str(import.name),
            ctx.str(import.prefix),
            import.origin,
        ));
    }
    for feature in &m.features {
        out.push_str(&format!(
            "Feature: {} ({})\n",
            ctx.str(feature.name),
            if feature.enabled { "on" } else { "off" }
        ));
    }
    for &identity in &m.identities {
        let i = ctx.identity(identity);
        match i.base_arg {
            Some(base) => out.push_str(&format!(
                "Identity: {} (base {})\n",
                ctx.str(i.name),
                ctx.str(base)
            )),
            None => out.push_str(&format!("Identity: {}\n", ctx.str(i.name))),
        }
    }
    for &typedef in &m.typedefs {
        let td = ctx.typedef(typedef);
        out.push_str(&format!(
            "Typedef: {} ({})\n",
            ctx.str(td.name),
            ctx.typ(td.ty).base.name()
        ));
    }

    let main = ctx.main_module(module);
    for node in ctx.raw_children(Parent::Module(main)) {
        if ctx.node(node).module == module {
            print_node_info(ctx, &mut out, node);
        }
    }
    out
}

fn print_node_info(ctx: &Context, out: &mut String, node: NodeId) {
    let n = ctx.node(node);
    let status = match n.status {
        Status::Current => "current",
        Status::Deprecated => "deprecated",
        Status::Obsolete => "obsolete",
    };
    let config = if n.config() { "config" } else { "state" };
    out.push_str(&format!(
        "{}: {} ({config}, {status})\n",
        capitalized(n.kind.keyword()),
        ctx.schema_path(node),
    ));

    if let Some(ty) = n.type_id() {
        let t = ctx.typ(ty);
        out.push_str(&format!("  type: {}", t.base.name()));
        if let TypeSpec::Leafref { path, target, .. } = &t.spec {
            out.push_str(&format!(
                " (path {}, {})",
                ctx.str(*path),
                if target.is_some() {
                    "resolved"
                } else {
                    "unresolved"
                }
            ));
        }
        out.push('\n');
    }

    for child in ctx.raw_children(Parent::Node(node)) {
        print_node_info(ctx, out, child);
    }
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
