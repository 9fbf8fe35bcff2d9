use crate::common::{child, load, top};
use yang_compiler::schema::TypeSpec;
use yang_compiler::{Context, ErrorKind, NodeKind, SchemaFormat};

#[test]
fn circular_leafrefs_fail_the_load() {
    let mut ctx = Context::new();
    let error = ctx
        .parse_module(
            r#"
module f {
  namespace "urn:example:f";
  prefix f;
  leaf a { type leafref { path "../b"; } }
  leaf b { type leafref { path "../a"; } }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::CircularLeafref { .. }));
}

#[test]
fn leafref_resolution_registers_a_back_edge() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module ifc {
  namespace "urn:ifc";
  prefix ifc;

  container interfaces {
    list interface {
      key name;
      leaf name { type string; }
    }
  }

  leaf primary {
    type leafref { path "/ifc:interfaces/ifc:interface/ifc:name"; }
  }
}
"#,
    );

    let interfaces = top(&ctx, module, "interfaces");
    let interface = child(&ctx, module, interfaces, "interface");
    let name = child(&ctx, module, interface, "name");
    let primary = top(&ctx, module, "primary");

    let ty = ctx.node(primary).type_id().unwrap();
    match &ctx.typ(ty).spec {
        TypeSpec::Leafref { target, .. } => assert_eq!(*target, Some(name)),
        other => panic!("unexpected spec {other:?}"),
    }
    match &ctx.node(name).kind {
        NodeKind::Leaf(leaf) => assert_eq!(leaf.backlinks, [primary]),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn leafref_chains_terminate_and_resolve() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module chain {
  namespace "urn:chain";
  prefix ch;

  leaf origin { type string; }
  leaf first { type leafref { path "../origin"; } }
  leaf second { type leafref { path "../first"; } }
}
"#,
    );

    // Following target.type while the base stays leafref terminates within
    // the number of leaves in the repository.
    let second = top(&ctx, module, "second");
    let mut steps = 0;
    let mut current = second;
    loop {
        let ty = ctx.node(current).type_id().unwrap();
        match &ctx.typ(ty).spec {
            TypeSpec::Leafref { target, .. } => {
                current = target.expect("resolved target");
                steps += 1;
                assert!(steps <= 3, "leafref chain must terminate");
            }
            _ => break,
        }
    }
    assert_eq!(ctx.node_name(current), "origin");
    assert_eq!(steps, 2);
}

#[test]
fn dangling_leafref_survives_no_pass() {
    let mut ctx = Context::new();
    let error = ctx
        .parse_module(
            r#"
module dangling {
  namespace "urn:dangling";
  prefix d;
  leaf a { type leafref { path "../missing"; } }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert_eq!(
        error.kind,
        ErrorKind::UnresolvedReference {
            what: "leafref target",
            name: "../missing".to_string()
        }
    );
}

#[test]
fn leafref_through_a_typedef_resolves_per_leaf() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module tdref {
  namespace "urn:tdref";
  prefix td;

  typedef name-ref { type leafref { path "../name"; } }

  container a {
    leaf name { type string; }
    leaf link { type name-ref; }
  }
  container b {
    leaf name { type string; }
    leaf link { type name-ref; }
  }
}
"#,
    );

    let a = top(&ctx, module, "a");
    let b = top(&ctx, module, "b");
    let a_name = child(&ctx, module, a, "name");
    let b_name = child(&ctx, module, b, "name");
    let a_link = child(&ctx, module, a, "link");
    let b_link = child(&ctx, module, b, "link");

    let target = |leaf| {
        let ty = ctx.node(leaf).type_id().unwrap();
        match &ctx.typ(ty).spec {
            TypeSpec::Leafref { target, .. } => target.unwrap(),
            other => panic!("unexpected spec {other:?}"),
        }
    };
    assert_eq!(target(a_link), a_name);
    assert_eq!(target(b_link), b_name);
}

#[test]
fn unique_paths_resolve_to_descendant_leaves() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module un {
  namespace "urn:un";
  prefix un;

  list server {
    key name;
    unique "endpoint/host endpoint/port";
    leaf name { type string; }
    container endpoint {
      leaf host { type string; }
      leaf port { type uint16; }
    }
  }
}
"#,
    );

    let server = top(&ctx, module, "server");
    match &ctx.node(server).kind {
        NodeKind::List(list) => {
            assert_eq!(list.uniques.len(), 1);
            let names: Vec<&str> = list.uniques[0]
                .leaves
                .iter()
                .map(|&l| ctx.node_name(l))
                .collect();
            assert_eq!(names, ["host", "port"]);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn duplicate_unique_components_are_rejected() {
    let mut ctx = Context::new();
    let error = ctx
        .parse_module(
            r#"
module un2 {
  namespace "urn:un2";
  prefix un;
  list server {
    key name;
    unique "name name";
    leaf name { type string; }
  }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::DuplicateIdentifier { .. }));
}

#[test]
fn list_keys_must_be_direct_child_leaves() {
    let mut ctx = Context::new();
    let error = ctx
        .parse_module(
            r#"
module badkey {
  namespace "urn:badkey";
  prefix bk;
  list entry {
    key sub;
    container sub { leaf x { type string; } }
  }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::InvalidValue { .. }));
}
