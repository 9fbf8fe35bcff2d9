use crate::{Keyword, Parser};
use expect_test::expect;

#[test]
fn it_parses_a_complete_module() {
    let input = r#"
module interfaces {
  namespace "urn:example:interfaces";
  prefix if;

  import ietf-yang-types {
    prefix yang;
    revision-date 2013-07-15;
  }

  revision 2020-01-01 {
    description "Initial revision.";
  }

  feature fast-ethernet;

  typedef if-name {
    type string {
      length "1..64";
      pattern "[A-Za-z0-9_.-]+";
    }
  }

  container interfaces {
    list interface {
      key name;
      unique "addr port";
      leaf name { type if-name; }
      leaf addr { type string; }
      leaf port { type uint16; }
      leaf speed {
        if-feature fast-ethernet;
        type uint32;
        units "bit/s";
        default 100000000;
      }
    }
  }
}
"#;

    let tree = Parser::new(input).parse();
    assert_eq!(tree.errors(), &[]);

    let module = &tree.document().statements[0];
    assert_eq!(module.keyword, Keyword::Module);
    assert_eq!(module.arg.as_deref(), Some("interfaces"));

    let keywords: Vec<_> = module.children.iter().map(|c| c.keyword.clone()).collect();
    assert_eq!(
        keywords,
        [
            Keyword::Namespace,
            Keyword::Prefix,
            Keyword::Import,
            Keyword::Revision,
            Keyword::Feature,
            Keyword::Typedef,
            Keyword::Container,
        ]
    );

    let import = module.child(&Keyword::Import).unwrap();
    assert_eq!(import.arg.as_deref(), Some("ietf-yang-types"));
    assert_eq!(
        import
            .child(&Keyword::RevisionDate)
            .unwrap()
            .arg
            .as_deref(),
        Some("2013-07-15")
    );
}

#[test]
fn it_reports_partial_trees_with_errors() {
    let input = "module broken { leaf l { type } }";
    let tree = Parser::new(input).parse();

    assert!(!tree.errors().is_empty());
    // The module statement itself still comes out.
    assert_eq!(tree.document().statements.len(), 1);
}

#[test]
fn it_renders_statement_debug_output() {
    let tree = Parser::new("leaf l { type string; }").parse();
    let debug = format!("{:?}", tree.document().statements[0]);

    expect![[r#"leaf "l"[type "string";]"#]].assert_eq(&debug);
}
