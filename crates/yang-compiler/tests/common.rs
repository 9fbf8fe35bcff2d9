use yang_compiler::{Context, ModuleId, NodeId, SchemaFormat};

/// Load a module, panicking with the error display on failure.
pub fn load(ctx: &mut Context, text: &str) -> ModuleId {
    match ctx.parse_module(text, SchemaFormat::Yang) {
        Ok(module) => module,
        Err(error) => panic!("load failed: {error}"),
    }
}

/// Top-level data node of a module by name.
pub fn top(ctx: &Context, module: ModuleId, name: &str) -> NodeId {
    ctx.data_children(module, None)
        .into_iter()
        .find(|&n| ctx.node_name(n) == name)
        .unwrap_or_else(|| panic!("no top-level node `{name}`"))
}

/// Data child of a node by name.
pub fn child(ctx: &Context, module: ModuleId, parent: NodeId, name: &str) -> NodeId {
    ctx.data_children(module, Some(parent))
        .into_iter()
        .find(|&n| ctx.node_name(n) == name)
        .unwrap_or_else(|| panic!("no child `{name}`"))
}

/// Names of a node's data children, in sibling order.
pub fn child_names(ctx: &Context, module: ModuleId, parent: NodeId) -> Vec<String> {
    ctx.data_children(module, Some(parent))
        .into_iter()
        .map(|n| ctx.node_name(n).to_string())
        .collect()
}
