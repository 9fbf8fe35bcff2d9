use crate::common::load;
use yang_compiler::{Context, ErrorKind, SchemaFormat};

fn revision_module(revision: &str) -> String {
    format!(
        r#"
module a {{
  namespace "urn:example:a";
  prefix a;
  revision {revision} {{ description "rev"; }}
  leaf x {{ type string; }}
}}
"#
    )
}

#[test]
fn newest_revision_wins_without_implemented() {
    let mut ctx = Context::new();
    load(&mut ctx, &revision_module("2020-01-01"));
    load(&mut ctx, &revision_module("2021-02-02"));

    let found = ctx.get_module("a", None).unwrap();
    assert_eq!(ctx.str(ctx.module(found).revision().unwrap()), "2021-02-02");

    let exact = ctx.get_module("a", Some("2020-01-01")).unwrap();
    assert_eq!(ctx.str(ctx.module(exact).revision().unwrap()), "2020-01-01");
    assert!(ctx.get_module("a", Some("2019-01-01")).is_none());
}

#[test]
fn implemented_revision_takes_priority() {
    let mut ctx = Context::new();
    let old = load(&mut ctx, &revision_module("2020-01-01"));
    load(&mut ctx, &revision_module("2021-02-02"));

    ctx.set_implement(old).unwrap();
    assert_eq!(ctx.get_module("a", None), Some(old));
}

#[test]
fn only_one_revision_can_be_implemented() {
    let mut ctx = Context::new();
    let old = load(&mut ctx, &revision_module("2020-01-01"));
    let new = load(&mut ctx, &revision_module("2021-02-02"));

    ctx.set_implement(old).unwrap();
    let error = ctx.set_implement(new).unwrap_err();
    assert!(matches!(
        error.kind,
        ErrorKind::ConflictingImplementedRevision { .. }
    ));
    // Re-implementing the same revision stays fine.
    ctx.set_implement(old).unwrap();
}

#[test]
fn missing_namespace_fails_the_load() {
    let mut ctx = Context::new();
    let error = ctx
        .parse_module("module a { prefix a; }", SchemaFormat::Yang)
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::MissingRequiredChild { .. }));
}

#[test]
fn failed_load_rolls_the_repository_back() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        r#"module keep { namespace "urn:keep"; prefix k; leaf l { type string; } }"#,
    );
    let modules_before = ctx.modules().len();
    let dict_before = ctx.dict_len();

    // Duplicate sibling identifier: the load must fail without a trace.
    let error = ctx
        .parse_module(
            r#"
module broken {
  namespace "urn:broken";
  prefix b;
  leaf dup { type string; }
  leaf dup { type string; }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::DuplicateIdentifier { .. }));
    assert_eq!(ctx.modules().len(), modules_before);
    assert_eq!(ctx.dict_len(), dict_before);
}

#[test]
fn module_destruction_releases_dict_references() {
    let mut ctx = Context::new();
    let baseline = ctx.dict_len();

    let module = load(
        &mut ctx,
        r#"
module gone {
  namespace "urn:gone";
  prefix g;
  typedef name-type { type string; }
  container box { leaf tag { type name-type; } }
}
"#,
    );
    assert!(ctx.dict_refs("gone") > 0);
    assert!(ctx.dict_refs("name-type") > 0);

    ctx.remove_module(module).unwrap();
    assert_eq!(ctx.dict_refs("gone"), 0);
    assert_eq!(ctx.dict_refs("name-type"), 0);
    assert_eq!(ctx.dict_len(), baseline);
    assert!(ctx.get_module("gone", None).is_none());
}

#[test]
fn imports_load_through_the_module_callback() {
    let mut ctx = Context::new();
    ctx.set_module_callback(|name, _revision| {
        (name == "dep").then(|| {
            (
                r#"
module dep {
  namespace "urn:dep";
  prefix d;
  typedef port { type uint16; }
}
"#
                .to_string(),
                SchemaFormat::Yang,
            )
        })
    });

    let module = load(
        &mut ctx,
        r#"
module user {
  namespace "urn:user";
  prefix u;
  import dep { prefix d; }
  leaf p { type d:port; }
}
"#,
    );

    assert!(ctx.get_module("dep", None).is_some());
    let import = &ctx.module(module).imports[0];
    assert!(import.module.is_some());
}

#[test]
fn unresolvable_import_fails_with_surviving_entry() {
    let mut ctx = Context::new();
    let error = ctx
        .parse_module(
            r#"
module user {
  namespace "urn:user";
  prefix u;
  import nowhere { prefix n; }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert_eq!(
        error.kind,
        ErrorKind::UnresolvedReference {
            what: "imported module",
            name: "nowhere".to_string()
        }
    );
}

#[test]
fn submodules_contribute_to_the_owner_data_chain() {
    let mut ctx = Context::new();
    ctx.set_module_callback(|name, _revision| {
        (name == "main-sub").then(|| {
            (
                r#"
submodule main-sub {
  belongs-to main { prefix m; }
  leaf from-sub { type string; }
}
"#
                .to_string(),
                SchemaFormat::Yang,
            )
        })
    });

    let module = load(
        &mut ctx,
        r#"
module main {
  namespace "urn:main";
  prefix m;
  include main-sub;
  leaf own { type string; }
}
"#,
    );

    let names: Vec<String> = ctx
        .data_children(module, None)
        .into_iter()
        .map(|n| ctx.node_name(n).to_string())
        .collect();
    assert!(names.contains(&"own".to_string()));
    assert!(names.contains(&"from-sub".to_string()));
    assert_eq!(ctx.module(module).includes.len(), 1);
    // Submodules stay out of the by-name registry.
    assert!(ctx.get_module("main-sub", None).is_none());
}

#[test]
fn unknown_prefix_is_reported() {
    let mut ctx = Context::new();
    let error = ctx
        .parse_module(
            r#"
module bad {
  namespace "urn:bad";
  prefix b;
  leaf l { type nosuch:t; }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::UnknownPrefix { .. }));
}
