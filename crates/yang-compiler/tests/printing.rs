use crate::common::load;
use expect_test::expect;
use yang_compiler::{Context, SchemaFormat, SchemaOutputFormat};

const MODULE: &str = r#"
module interfaces {
  namespace "urn:example:interfaces";
  prefix if;

  revision 2020-01-01 { description "Initial revision."; }

  feature counters;

  typedef if-name {
    type string { length "1..64"; }
  }

  container interfaces {
    list interface {
      key name;
      unique address;
      leaf name { type if-name; }
      leaf address { type string; }
      leaf enabled { type boolean; default true; }
      leaf-list search { type string; max-elements 4; }
      container stats {
        if-feature counters;
        config false;
        leaf in-octets { type uint64; }
      }
    }
  }

  rpc restart {
    input { leaf delay { type uint32; } }
  }

  notification link-flap {
    leaf ifname { type if-name; }
  }
}
"#;

/// Printing a parsed module and re-parsing the output reaches a fixed
/// point: the second print is byte-identical.
#[test]
fn yang_printing_round_trips() {
    let mut ctx = Context::new();
    let module = load(&mut ctx, MODULE);
    let first = ctx.print_module(module, SchemaOutputFormat::Yang);

    let mut ctx2 = Context::new();
    let module2 = ctx2.parse_module(&first, SchemaFormat::Yang).unwrap();
    let second = ctx2.print_module(module2, SchemaOutputFormat::Yang);

    assert_eq!(first, second);
}

#[test]
fn yin_output_parses_back_to_the_same_module() {
    let mut ctx = Context::new();
    let module = load(&mut ctx, MODULE);
    let yin = ctx.print_module(module, SchemaOutputFormat::Yin);

    let mut ctx2 = Context::new();
    let module2 = ctx2.parse_module(&yin, SchemaFormat::Yin).unwrap();

    assert_eq!(
        ctx.print_module(module, SchemaOutputFormat::Yang),
        ctx2.print_module(module2, SchemaOutputFormat::Yang),
    );
}

#[test]
fn tree_view_shows_the_data_shape() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module tr {
  namespace "urn:tr";
  prefix tr;
  container system {
    leaf host { type string; mandatory true; }
    leaf port { type uint16; default 830; }
    list user {
      key name;
      leaf name { type string; }
    }
  }
}
"#,
    );

    let tree = ctx.print_module(module, SchemaOutputFormat::Tree);
    expect![[r#"
        module: tr
          +--rw system
             +--rw host   string
             +--rw port?   uint16
             +--rw user* [name]
                +--rw name   string
    "#]]
    .assert_eq(&tree);
}

#[test]
fn info_view_lists_definitions_and_nodes() {
    let mut ctx = Context::new();
    let module = load(&mut ctx, MODULE);
    let info = ctx.print_module(module, SchemaOutputFormat::Info);

    assert!(info.contains("Module: interfaces"));
    assert!(info.contains("Namespace: urn:example:interfaces"));
    assert!(info.contains("Revision: 2020-01-01"));
    assert!(info.contains("Feature: counters (off)"));
    assert!(info.contains("Typedef: if-name (string)"));
    assert!(info.contains("Container: /interfaces"));
}

#[test]
fn printed_yang_quotes_what_needs_quoting() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module q {
  namespace "urn:q";
  prefix q;
  leaf l {
    type string;
    description "a \"quoted\" word and a line
break";
  }
}
"#,
    );

    let printed = ctx.print_module(module, SchemaOutputFormat::Yang);
    assert!(printed.contains(r#"description "a \"quoted\" word and a line\nbreak";"#));

    // And it survives a reparse.
    let mut ctx2 = Context::new();
    ctx2.parse_module(&printed, SchemaFormat::Yang).unwrap();
}

#[test]
fn diagnostics_render_with_source_labels() {
    let mut ctx = Context::new();
    let source = r#"
module bad {
  namespace "urn:bad";
  prefix b;
  leaf l { type string; type string; }
}
"#;
    let error = ctx.parse_module(source, SchemaFormat::Yang).unwrap_err();
    let rendered = yang_compiler::diagnostic::render(&error, "bad.yang", source);
    assert!(rendered.contains("duplicate `type` statement"));
    assert!(rendered.contains("bad.yang"));
}
