use crate::common::load;
use yang_compiler::{Context, DataPrintOptions, ErrorKind};

const SCHEMA: &str = r#"
module sysmod {
  namespace "urn:sysmod";
  prefix sys;

  container system {
    leaf hostname { type string; mandatory true; }
    leaf port { type uint16; default 830; }
    leaf-list dns { type string; max-elements 2; }
    choice transport {
      mandatory true;
      case tls { leaf tls-cert { type string; } }
      case ssh { leaf ssh-key { type string; } }
    }
  }
}
"#;

const GOOD: &str = r#"
<system xmlns="urn:sysmod">
  <hostname>router1</hostname>
  <dns>192.0.2.1</dns>
  <ssh-key>AAAA</ssh-key>
</system>
"#;

#[test]
fn data_parses_and_validates_against_the_schema() {
    let mut ctx = Context::new();
    load(&mut ctx, SCHEMA);

    let tree = ctx.parse_data_xml(GOOD).unwrap();
    ctx.validate_data(&tree).unwrap();
}

#[test]
fn unknown_elements_are_rejected_at_parse() {
    let mut ctx = Context::new();
    load(&mut ctx, SCHEMA);

    let error = ctx
        .parse_data_xml(r#"<system xmlns="urn:sysmod"><nope>x</nope></system>"#)
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::UnresolvedReference { .. }));
}

#[test]
fn leaf_values_are_type_checked_at_parse() {
    let mut ctx = Context::new();
    load(&mut ctx, SCHEMA);

    let error = ctx
        .parse_data_xml(
            r#"<system xmlns="urn:sysmod"><hostname>h</hostname><port>99999</port></system>"#,
        )
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::InvalidValue { .. }));
}

#[test]
fn missing_mandatory_leaves_fail_validation() {
    let mut ctx = Context::new();
    load(&mut ctx, SCHEMA);

    let tree = ctx
        .parse_data_xml(r#"<system xmlns="urn:sysmod"><ssh-key>AAAA</ssh-key></system>"#)
        .unwrap();
    let error = ctx.validate_data(&tree).unwrap_err();
    assert!(matches!(error.kind, ErrorKind::MissingRequiredChild { .. }));
}

#[test]
fn mandatory_choices_need_exactly_one_case() {
    let mut ctx = Context::new();
    load(&mut ctx, SCHEMA);

    // No case at all.
    let tree = ctx
        .parse_data_xml(r#"<system xmlns="urn:sysmod"><hostname>h</hostname></system>"#)
        .unwrap();
    assert!(ctx.validate_data(&tree).is_err());

    // Two competing cases.
    let tree = ctx
        .parse_data_xml(
            r#"<system xmlns="urn:sysmod">
  <hostname>h</hostname>
  <tls-cert>c</tls-cert>
  <ssh-key>k</ssh-key>
</system>"#,
        )
        .unwrap();
    assert!(ctx.validate_data(&tree).is_err());
}

#[test]
fn leaf_list_cardinality_is_enforced() {
    let mut ctx = Context::new();
    load(&mut ctx, SCHEMA);

    let tree = ctx
        .parse_data_xml(
            r#"<system xmlns="urn:sysmod">
  <hostname>h</hostname>
  <ssh-key>k</ssh-key>
  <dns>a</dns>
  <dns>b</dns>
  <dns>c</dns>
</system>"#,
        )
        .unwrap();
    let error = ctx.validate_data(&tree).unwrap_err();
    assert!(matches!(error.kind, ErrorKind::InvalidValue { .. }));
}

#[test]
fn xml_round_trips_through_the_printer() {
    let mut ctx = Context::new();
    load(&mut ctx, SCHEMA);

    let tree = ctx.parse_data_xml(GOOD).unwrap();
    let printed = ctx.print_data_xml(&tree, DataPrintOptions::default());
    let reparsed = ctx.parse_data_xml(&printed).unwrap();
    assert_eq!(tree, reparsed);
}

#[test]
fn defaults_are_tagged_when_the_wd_module_is_loaded() {
    let mut ctx = Context::new();
    load(&mut ctx, SCHEMA);
    load(
        &mut ctx,
        r#"
module ietf-netconf-with-defaults {
  namespace "urn:ietf:params:xml:ns:yang:ietf-netconf-with-defaults";
  prefix ncwd;
}
"#,
    );

    let mut tree = ctx.parse_data_xml(GOOD).unwrap();
    ctx.add_data_defaults(&mut tree);

    let options = DataPrintOptions {
        with_defaults: true,
        ..DataPrintOptions::default()
    };
    let printed = ctx.print_data_xml(&tree, options);
    assert!(printed.contains("<port"));
    assert!(printed.contains("wd:default=\"true\""));
    assert!(printed
        .contains("urn:ietf:params:xml:ns:yang:ietf-netconf-with-defaults"));
}

#[test]
fn json_printing_follows_the_7951_conventions() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        r#"
module j {
  namespace "urn:j";
  prefix j;
  container box {
    leaf small { type uint8; }
    leaf big { type uint64; }
    leaf on { type boolean; }
    leaf-list tags { type string; }
  }
}
"#,
    );

    let tree = ctx
        .parse_data_xml(
            r#"<box xmlns="urn:j">
  <small>7</small>
  <big>18446744073709551615</big>
  <on>true</on>
  <tags>x</tags>
  <tags>y</tags>
</box>"#,
        )
        .unwrap();

    let printed = ctx.print_data_json(
        &tree,
        DataPrintOptions {
            format: false,
            ..DataPrintOptions::default()
        },
    );
    let value: serde_json::Value = serde_json::from_str(&printed).unwrap();

    assert_eq!(value["j:box"]["small"], serde_json::json!(7));
    assert_eq!(
        value["j:box"]["big"],
        serde_json::json!("18446744073709551615")
    );
    assert_eq!(value["j:box"]["on"], serde_json::json!(true));
    assert_eq!(value["j:box"]["tags"], serde_json::json!(["x", "y"]));
}

#[test]
fn with_siblings_controls_the_printed_chain() {
    let mut ctx = Context::new();
    load(
        &mut ctx,
        r#"
module two {
  namespace "urn:two";
  prefix t;
  container a { leaf x { type string; } }
  container b { leaf y { type string; } }
}
"#,
    );

    let tree = ctx
        .parse_data_xml(
            r#"<data><a xmlns="urn:two"><x>1</x></a><b xmlns="urn:two"><y>2</y></b></data>"#,
        )
        .unwrap();

    let all = ctx.print_data_xml(&tree, DataPrintOptions::default());
    assert!(all.contains("<a ") && all.contains("<b "));

    let first_only = ctx.print_data_xml(
        &tree,
        DataPrintOptions {
            with_siblings: false,
            ..DataPrintOptions::default()
        },
    );
    assert!(first_only.contains("<a ") && !first_only.contains("<b "));
}
