use crate::common::load;
use yang_compiler::Context;

const MODULE: &str = r#"
module b {
  namespace "urn:example:b";
  prefix b;

  feature x;
  feature y { if-feature x; }
  feature unrelated;

  container fast-path {
    if-feature y;
    leaf enabled { type boolean; }
  }
}
"#;

#[test]
fn enabling_a_feature_enables_its_dependencies() {
    let mut ctx = Context::new();
    let module = load(&mut ctx, MODULE);

    assert_eq!(ctx.feature_state(module, "x"), Some(false));
    assert_eq!(ctx.feature_state(module, "y"), Some(false));

    ctx.features_enable(module, "y").unwrap();
    assert_eq!(ctx.feature_state(module, "x"), Some(true));
    assert_eq!(ctx.feature_state(module, "y"), Some(true));
    assert_eq!(ctx.feature_state(module, "unrelated"), Some(false));
}

#[test]
fn wildcard_touches_every_feature() {
    let mut ctx = Context::new();
    let module = load(&mut ctx, MODULE);

    ctx.features_enable(module, "*").unwrap();
    assert!(ctx.features_list(module).iter().all(|(_, on)| *on));

    ctx.features_disable(module, "*").unwrap();
    assert!(ctx.features_list(module).iter().all(|(_, on)| !*on));
}

#[test]
fn disabling_is_not_recursive() {
    let mut ctx = Context::new();
    let module = load(&mut ctx, MODULE);

    ctx.features_enable(module, "y").unwrap();
    ctx.features_disable(module, "y").unwrap();
    // `x` stays on; only the named feature flips.
    assert_eq!(ctx.feature_state(module, "x"), Some(true));
    assert_eq!(ctx.feature_state(module, "y"), Some(false));
}

#[test]
fn unknown_features_are_reported_without_failing_the_repository() {
    let mut ctx = Context::new();
    let module = load(&mut ctx, MODULE);

    assert!(ctx.features_enable(module, "nope").is_err());
    assert_eq!(ctx.feature_state(module, "nope"), None);
    // The repository is untouched and still functional.
    ctx.features_enable(module, "x").unwrap();
    assert_eq!(ctx.feature_state(module, "x"), Some(true));
}

#[test]
fn cross_module_if_feature_resolves_through_imports() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        r#"
module base {
  namespace "urn:base";
  prefix base;
  feature tunnels;
}
"#,
    );
    let user = load(
        &mut ctx,
        r#"
module user {
  namespace "urn:user";
  prefix u;
  import base { prefix b; }
  feature fancy { if-feature b:tunnels; }
}
"#,
    );

    ctx.features_enable(user, "fancy").unwrap();
    let base = ctx.get_module("base", None).unwrap();
    assert_eq!(ctx.feature_state(base, "tunnels"), Some(true));
}
