use crate::common::{child, child_names, load, top};
use yang_compiler::{Context, NodeKind};

#[test]
fn uses_copies_the_grouping_body_into_place() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module c {
  namespace "urn:example:c";
  prefix c;

  grouping g {
    leaf l { type string; }
  }

  container c { uses g; }
}
"#,
    );

    let container = top(&ctx, module, "c");
    assert_eq!(child_names(&ctx, module, container), ["l"]);

    // The instantiated copy belongs to the using module...
    let leaf = child(&ctx, module, container, "l");
    assert_eq!(ctx.node(leaf).module, module);

    // ...and the grouping keeps its own body.
    let grouping = ctx
        .data_children(module, None)
        .into_iter()
        .find(|&n| matches!(ctx.node(n).kind, NodeKind::Grouping(_)));
    assert!(grouping.is_none(), "groupings are not data nodes");
    let printed = ctx.print_module(module, yang_compiler::SchemaOutputFormat::Yang);
    assert!(printed.contains("grouping g"));
    assert!(printed.contains("uses g;"));
}

#[test]
fn uses_from_an_imported_module() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        r#"
module lib {
  namespace "urn:lib";
  prefix lib;
  grouping endpoint {
    leaf host { type string; }
    leaf port { type uint16; }
  }
}
"#,
    );
    let module = load(
        &mut ctx,
        r#"
module app {
  namespace "urn:app";
  prefix app;
  import lib { prefix l; }
  container server { uses l:endpoint; }
}
"#,
    );

    let server = top(&ctx, module, "server");
    assert_eq!(child_names(&ctx, module, server), ["host", "port"]);
    // Copies are owned by the using module, not the library.
    let host = child(&ctx, module, server, "host");
    assert_eq!(ctx.node(host).module, module);
}

#[test]
fn nested_uses_expand_transitively() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module n {
  namespace "urn:n";
  prefix n;

  grouping inner { leaf deep { type string; } }
  grouping outer {
    leaf shallow { type string; }
    uses inner;
  }

  container box { uses outer; }
}
"#,
    );

    let container = top(&ctx, module, "box");
    assert_eq!(child_names(&ctx, module, container), ["shallow", "deep"]);
}

#[test]
fn refine_edits_exactly_one_descendant() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module r {
  namespace "urn:r";
  prefix r;

  grouping g {
    leaf timeout { type uint32; }
    container sub { leaf flag { type boolean; } }
  }

  container main {
    uses g {
      refine timeout { default 30; }
      refine sub { config false; }
    }
  }
}
"#,
    );

    let main = top(&ctx, module, "main");
    let timeout = child(&ctx, module, main, "timeout");
    match &ctx.node(timeout).kind {
        NodeKind::Leaf(leaf) => {
            assert_eq!(ctx.str(leaf.default.unwrap()), "30");
        }
        other => panic!("unexpected kind {other:?}"),
    }

    let sub = child(&ctx, module, main, "sub");
    assert!(!ctx.node(sub).config());
    // Config inheritance reaches the refined subtree.
    let flag = child(&ctx, module, sub, "flag");
    assert!(!ctx.node(flag).config());
}

#[test]
fn unused_grouping_with_dangling_leafref_still_loads() {
    // Target paths in a grouping body are only checked at instantiation; a
    // grouping nobody uses never resolves them.
    let mut ctx = Context::new();
    load(
        &mut ctx,
        r#"
module u {
  namespace "urn:u";
  prefix u;

  grouping unused {
    leaf ref { type leafref { path "../no-such-node"; } }
  }

  leaf real { type string; }
}
"#,
    );
}

#[test]
fn using_a_grouping_with_a_dangling_leafref_fails() {
    let mut ctx = Context::new();
    let error = ctx
        .parse_module(
            r#"
module v {
  namespace "urn:v";
  prefix v;

  grouping broken {
    leaf ref { type leafref { path "../no-such-node"; } }
  }

  container box { uses broken; }
}
"#,
            yang_compiler::SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(
        error.kind,
        yang_compiler::ErrorKind::UnresolvedReference { .. }
    ));
}

#[test]
fn keys_inside_a_grouping_resolve_at_instantiation() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module k {
  namespace "urn:k";
  prefix k;

  grouping entry {
    list item {
      key name;
      leaf name { type string; }
      leaf value { type string; }
    }
  }

  container table { uses entry; }
}
"#,
    );

    let table = top(&ctx, module, "table");
    let item = child(&ctx, module, table, "item");
    match &ctx.node(item).kind {
        NodeKind::List(list) => {
            assert_eq!(list.keys.len(), 1);
            assert_eq!(ctx.node_name(list.keys[0]), "name");
        }
        other => panic!("unexpected kind {other:?}"),
    }
}
