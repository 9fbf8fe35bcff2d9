use crate::common::{child, load, top};
use yang_compiler::schema::{TypeBase, TypeSpec};
use yang_compiler::{Context, ErrorKind, SchemaFormat};

fn load_err(text: &str) -> ErrorKind {
    let mut ctx = Context::new();
    ctx.parse_module(text, SchemaFormat::Yang).unwrap_err().kind
}

fn wrap(body: &str) -> String {
    format!(
        r#"
module t {{
  namespace "urn:t";
  prefix t;
  {body}
}}
"#
    )
}

#[test]
fn typedef_chains_resolve_to_their_builtin_base() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        &wrap(
            r#"
  typedef percent { type uint8 { range "0..100"; } }
  typedef loss { type percent; }
  leaf packet-loss { type loss; }
"#,
        ),
    );

    let leaf = top(&ctx, module, "packet-loss");
    let ty = ctx.node(leaf).type_id().unwrap();
    assert_eq!(ctx.typ(ty).base, TypeBase::Uint8);
    assert!(ctx.typ(ty).derived.is_some());
}

#[test]
fn restrictions_apply_across_the_derivation_chain() {
    let kind = load_err(&wrap(
        r#"
  typedef percent { type uint8 { range "0..100"; } }
  leaf to-big { type percent; default 101; }
"#,
    ));
    assert!(matches!(kind, ErrorKind::InvalidValue { .. }));
}

#[test]
fn enum_values_auto_assign_after_the_last_explicit() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        &wrap(r#"leaf mode { type enumeration { enum a; enum b { value 5; } enum c; } }"#),
    );

    let leaf = top(&ctx, module, "mode");
    let ty = ctx.node(leaf).type_id().unwrap();
    match &ctx.typ(ty).spec {
        TypeSpec::Enumeration { enums } => {
            let values: Vec<(String, i32, bool)> = enums
                .iter()
                .map(|e| (ctx.str(e.name).to_string(), e.value, e.explicit))
                .collect();
            assert_eq!(
                values,
                [
                    ("a".to_string(), 0, false),
                    ("b".to_string(), 5, true),
                    ("c".to_string(), 6, false),
                ]
            );
        }
        other => panic!("unexpected spec {other:?}"),
    }
}

#[test]
fn enum_value_overflow_is_fatal() {
    let kind = load_err(&wrap(
        r#"leaf mode { type enumeration { enum a { value 2147483647; } enum b; } }"#,
    ));
    assert_eq!(kind, ErrorKind::EnumValueOverflow);
}

#[test]
fn duplicate_enum_names_and_values_are_rejected() {
    assert!(matches!(
        load_err(&wrap(
            r#"leaf m { type enumeration { enum a; enum a; } }"#
        )),
        ErrorKind::DuplicateIdentifier { .. }
    ));
    assert!(matches!(
        load_err(&wrap(
            r#"leaf m { type enumeration { enum a { value 1; } enum b { value 1; } } }"#
        )),
        ErrorKind::InvalidValue { .. }
    ));
}

#[test]
fn bit_positions_sort_ascending_and_overflow_checks() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        &wrap(
            r#"leaf flags { type bits { bit c { position 7; } bit a { position 0; } bit b { position 3; } } }"#,
        ),
    );
    let leaf = top(&ctx, module, "flags");
    let ty = ctx.node(leaf).type_id().unwrap();
    match &ctx.typ(ty).spec {
        TypeSpec::Bits { bits } => {
            let positions: Vec<u32> = bits.iter().map(|b| b.position).collect();
            assert_eq!(positions, [0, 3, 7]);
        }
        other => panic!("unexpected spec {other:?}"),
    }

    assert_eq!(
        load_err(&wrap(
            r#"leaf f { type bits { bit a { position 4294967295; } bit b; } }"#
        )),
        ErrorKind::BitPositionOverflow
    );
}

#[test]
fn fraction_digits_are_mandatory_and_bounded() {
    assert!(matches!(
        load_err(&wrap(r#"leaf d { type decimal64; }"#)),
        ErrorKind::MissingRequiredChild { .. }
    ));
    assert!(matches!(
        load_err(&wrap(r#"leaf d { type decimal64 { fraction-digits 19; } }"#)),
        ErrorKind::InvalidValue { .. }
    ));

    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        &wrap(r#"leaf d { type decimal64 { fraction-digits 2; } default 3.14; }"#),
    );
    let leaf = top(&ctx, module, "d");
    let ty = ctx.node(leaf).type_id().unwrap();
    match &ctx.typ(ty).spec {
        TypeSpec::Decimal64 { digits, divisor, .. } => {
            assert_eq!(*digits, 2);
            assert_eq!(*divisor, 100);
        }
        other => panic!("unexpected spec {other:?}"),
    }
}

#[test]
fn invalid_ranges_are_rejected() {
    assert!(matches!(
        load_err(&wrap(r#"leaf x { type uint8 { range "10..1"; } }"#)),
        ErrorKind::InvalidRange { .. }
    ));
    assert!(matches!(
        load_err(&wrap(r#"leaf x { type uint8 { range "1..10 | 5..20"; } }"#)),
        ErrorKind::InvalidRange { .. }
    ));
}

#[test]
fn unions_refuse_empty_and_leafref_members() {
    assert!(matches!(
        load_err(&wrap(r#"leaf u { type union { type string; type empty; } }"#)),
        ErrorKind::UnexpectedStatementInContext { .. }
    ));

    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        &wrap(r#"leaf u { type union { type string; type uint8; } default 300; }"#),
    );
    // "300" is invalid for uint8 but fine as a string member.
    let leaf = top(&ctx, module, "u");
    assert!(ctx.node(leaf).type_id().is_some());

    let kind = load_err(&wrap(
        r#"leaf u { type union { type uint8; type boolean; } default 300; }"#,
    ));
    assert!(matches!(kind, ErrorKind::InvalidValue { .. }));
}

#[test]
fn mandatory_leaves_cannot_carry_defaults() {
    assert_eq!(
        load_err(&wrap(r#"leaf l { type string; mandatory true; default x; }"#)),
        ErrorKind::MandatoryWithDefault
    );
    assert_eq!(
        load_err(&wrap(
            r#"
  choice transport {
    mandatory true;
    default tcp;
    case tcp { leaf tcp-port { type uint16; } }
  }
"#
        )),
        ErrorKind::MandatoryWithDefault
    );
}

#[test]
fn duplicate_singleton_statements_are_fatal() {
    assert!(matches!(
        load_err(&wrap(r#"leaf l { type string; type string; }"#)),
        ErrorKind::DuplicateStatement { .. }
    ));
    assert!(matches!(
        load_err(&wrap(
            r#"leaf l { type string; description a; description b; }"#
        )),
        ErrorKind::DuplicateStatement { .. }
    ));
    assert!(matches!(
        load_err(&wrap(r#"container c { presence a; presence b; }"#)),
        ErrorKind::DuplicateStatement { .. }
    ));
}

#[test]
fn typedef_names_shadowing_up_the_path_are_rejected() {
    assert!(matches!(
        load_err(&wrap(
            r#"
  typedef dup { type string; }
  container box {
    typedef dup { type uint8; }
    leaf l { type dup; }
  }
"#
        )),
        ErrorKind::DuplicateIdentifier { .. }
    ));
}

#[test]
fn identityref_resolves_across_modules() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        r#"
module crypto-base {
  namespace "urn:crypto";
  prefix cb;
  identity algorithm;
  identity aes { base algorithm; }
}
"#,
    );
    let module = load(
        &mut ctx,
        r#"
module tunnel {
  namespace "urn:tunnel";
  prefix tun;
  import crypto-base { prefix cb; }
  identity aes256 { base cb:aes; }
  leaf cipher { type identityref { base cb:algorithm; } }
}
"#,
    );

    let leaf = top(&ctx, module, "cipher");
    let ty = ctx.node(leaf).type_id().unwrap();
    match &ctx.typ(ty).spec {
        TypeSpec::Identityref { base, .. } => {
            let base = base.expect("resolved base identity");
            assert_eq!(ctx.str(ctx.identity(base).name), "algorithm");
            // aes derives from algorithm; aes256 derives from aes.
            assert_eq!(ctx.identity(base).derived.len(), 1);
        }
        other => panic!("unexpected spec {other:?}"),
    }
}

#[test]
fn config_true_under_config_false_is_rejected() {
    let kind = load_err(&wrap(
        r#"
  container state {
    config false;
    leaf counter { type uint64; config true; }
  }
"#,
    ));
    assert!(matches!(kind, ErrorKind::InvalidValue { .. }));
}

#[test]
fn config_inherits_downward() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        &wrap(
            r#"
  container state {
    config false;
    container inner { leaf counter { type uint64; } }
  }
"#,
        ),
    );
    let state = top(&ctx, module, "state");
    let inner = child(&ctx, module, state, "inner");
    let counter = child(&ctx, module, inner, "counter");
    assert!(!ctx.node(inner).config());
    assert!(!ctx.node(counter).config());
}
