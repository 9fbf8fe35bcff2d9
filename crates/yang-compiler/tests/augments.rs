use crate::common::{child_names, load, top};
use yang_compiler::{Context, ErrorKind, SchemaFormat};

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

const AUGMENTER: &str = r#"
module d {
  namespace "urn:example:d";
  prefix d;
  import c { prefix c; }

  augment "/c:c" {
    leaf extra { type int32; }
  }
}
"#;

#[test]
fn augment_splices_children_in_order() {
    let mut ctx = Context::new();
    let base = load(&mut ctx, BASE);
    load(&mut ctx, AUGMENTER);

    let container = top(&ctx, base, "c");
    assert_eq!(child_names(&ctx, base, container), ["l", "extra"]);
}

#[test]
fn destroying_the_augmenter_unsplices_only_its_children() {
    let mut ctx = Context::new();
    let base = load(&mut ctx, BASE);
    let augmenter = load(&mut ctx, AUGMENTER);

    ctx.remove_module(augmenter).unwrap();

    let container = top(&ctx, base, "c");
    assert_eq!(child_names(&ctx, base, container), ["l"]);
    assert!(ctx.get_module("d", None).is_none());
}

#[test]
fn augmented_children_keep_their_owner_module() {
    let mut ctx = Context::new();
    let base = load(&mut ctx, BASE);
    let augmenter = load(&mut ctx, AUGMENTER);

    let container = top(&ctx, base, "c");
    let extra = ctx
        .data_children(base, Some(container))
        .into_iter()
        .find(|&n| ctx.node_name(n) == "extra")
        .unwrap();
    assert_eq!(ctx.node(extra).module, augmenter);
    // Spliced children inherit the target's effective config.
    assert!(ctx.node(extra).config());
}

#[test]
fn augmenting_a_missing_target_fails() {
    let mut ctx = Context::new();
    load(&mut ctx, BASE);
    let error = ctx
        .parse_module(
            r#"
module bad {
  namespace "urn:bad";
  prefix bad;
  import c { prefix c; }
  augment "/c:nope" { leaf x { type string; } }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::UnresolvedReference { .. }));
}

#[test]
fn augment_rejects_duplicate_names_at_the_target() {
    // A module may augment its own containers; colliding with an existing
    // same-module sibling is still an error.
    let mut ctx = Context::new();
    let error = ctx
        .parse_module(
            r#"
module clash {
  namespace "urn:clash";
  prefix cl;
  container box { leaf item { type string; } }
  augment "/cl:box" { leaf item { type string; } }
}
"#,
            SchemaFormat::Yang,
        )
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::DuplicateIdentifier { .. }));
}

#[test]
fn uses_augment_extends_the_expansion_in_place() {
    let mut ctx = Context::new();
    let module = load(
        &mut ctx,
        r#"
module ua {
  namespace "urn:ua";
  prefix ua;

  grouping g {
    container wrapper { leaf a { type string; } }
  }

  container box {
    uses g {
      augment wrapper { leaf b { type string; } }
    }
  }
}
"#,
    );

    let container = top(&ctx, module, "box");
    let wrapper = ctx
        .data_children(module, Some(container))
        .into_iter()
        .find(|&n| ctx.node_name(n) == "wrapper")
        .unwrap();
    assert_eq!(child_names(&ctx, module, wrapper), ["a", "b"]);
}
