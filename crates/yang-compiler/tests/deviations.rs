use crate::common::{child_names, load, top};
use yang_compiler::{Context, ErrorKind, NodeKind, SchemaFormat};

const BASE: &str = r#"
module c {
  namespace "urn:example:c";
  prefix c;

  grouping g {
    leaf l { type string; }
  }

  container c { uses g; }
}
"#;

const NOT_SUPPORTED: &str = r#"
module e {
  namespace "urn:example:e";
  prefix e;
  import c { prefix c; }

  deviation "/c:c/c:l" {
    deviate not-supported;
  }
}
"#;

#[test]
fn not_supported_unlinks_and_switch_toggles() {
    let mut ctx = Context::new();
    let base = load(&mut ctx, BASE);
    let deviating = load(&mut ctx, NOT_SUPPORTED);

    let container = top(&ctx, base, "c");
    assert_eq!(child_names(&ctx, base, container), Vec::<String>::new());
    assert!(ctx.module(base).deviated);
    // Publishing deviations forces the deviating module to implemented.
    assert!(ctx.module(deviating).implemented);

    ctx.switch_deviations(deviating).unwrap();
    assert_eq!(child_names(&ctx, base, container), ["l"]);
    assert!(!ctx.module(base).deviated);

    ctx.switch_deviations(deviating).unwrap();
    assert_eq!(child_names(&ctx, base, container), Vec::<String>::new());
    assert!(ctx.module(base).deviated);
}

#[test]
fn removing_the_deviating_module_restores_the_target() {
    let mut ctx = Context::new();
    let base = load(&mut ctx, BASE);
    let deviating = load(&mut ctx, NOT_SUPPORTED);

    ctx.remove_module(deviating).unwrap();

    let container = top(&ctx, base, "c");
    assert_eq!(child_names(&ctx, base, container), ["l"]);
    assert!(!ctx.module(base).deviated);
}

#[test]
fn deviate_replace_swaps_properties_and_back() {
    let mut ctx = Context::new();
    let base = load(
        &mut ctx,
        r#"
module srv {
  namespace "urn:srv";
  prefix s;
  container server {
    leaf retries { type uint8; default 3; units attempts; }
  }
}
"#,
    );
    let deviating = load(
        &mut ctx,
        r#"
module site {
  namespace "urn:site";
  prefix site;
  import srv { prefix s; }

  deviation "/s:server/s:retries" {
    deviate replace { default 5; }
    deviate delete { units attempts; }
  }
}
"#,
    );

    let server = top(&ctx, base, "server");
    let retries = ctx
        .data_children(base, Some(server))
        .into_iter()
        .find(|&n| ctx.node_name(n) == "retries")
        .unwrap();

    let leaf_default = |ctx: &Context| match &ctx.node(retries).kind {
        NodeKind::Leaf(leaf) => (
            leaf.default.map(|d| ctx.str(d).to_string()),
            leaf.units.map(|u| ctx.str(u).to_string()),
        ),
        _ => panic!("expected a leaf"),
    };

    assert_eq!(
        leaf_default(&ctx),
        (Some("5".to_string()), None),
    );

    ctx.switch_deviations(deviating).unwrap();
    assert_eq!(
        leaf_default(&ctx),
        (Some("3".to_string()), Some("attempts".to_string())),
    );

    ctx.switch_deviations(deviating).unwrap();
    assert_eq!(leaf_default(&ctx), (Some("5".to_string()), None));
}

#[test]
fn deviate_add_requires_absence() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        r#"
module srv {
  namespace "urn:srv";
  prefix s;
  container server { leaf retries { type uint8; default 3; } }
}
"#,
    );
    let error = ctx
        .parse_module(
            r#"
module site {
  namespace "urn:site";
  prefix site;
  import srv { prefix s; }
  deviation "/s:server/s:retries" { deviate add { default 9; } }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::InvalidValue { .. }));
}

#[test]
fn a_module_cannot_deviate_itself() {
    let mut ctx = Context::new();
    let error = ctx
        .parse_module(
            r#"
module selfish {
  namespace "urn:selfish";
  prefix s;
  leaf l { type string; }
  deviation "/s:l" { deviate not-supported; }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::DeviationOfOwnModule);
}

#[test]
fn not_supported_cannot_remove_a_list_key() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        r#"
module keyed {
  namespace "urn:keyed";
  prefix k;
  list entry {
    key name;
    leaf name { type string; }
    leaf value { type string; }
  }
}
"#,
    );
    let error = ctx
        .parse_module(
            r#"
module trimmer {
  namespace "urn:trimmer";
  prefix t;
  import keyed { prefix k; }
  deviation "/k:entry/k:name" { deviate not-supported; }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(
        error.kind,
        ErrorKind::NotSupportedRemovesKey { .. }
    ));
}

#[test]
fn deviation_records_an_external_import_on_the_target() {
    let mut ctx = Context::new();
    let base = load(&mut ctx, BASE);
    load(&mut ctx, NOT_SUPPORTED);

    let external = ctx
        .module(base)
        .imports
        .iter()
        .any(|i| i.origin == yang_compiler::schema::ImportOrigin::ViaDeviation);
    assert!(external);
}
