//! Schema printers: YANG and YIN emission.
//!
//! Both textual forms are produced the same way the inputs were consumed:
//! the sealed graph is lowered back to a statement tree, and a small emitter
//! renders that tree as compact YANG or as YIN XML. `uses` nodes print
//! without their expanded children, and augments print the children they
//! spliced, so a round trip re-parses to the same schema.

use yang_parser::yin::{argument_shape, ArgumentShape, YIN_NAMESPACE};
use yang_parser::{Keyword, Statement};

use crate::context::{Context, Parent};
use crate::schema::{
    Bit, Deviate, DeviateProps, EnumValue, ModuleId, Must, NodeFlags, NodeId, NodeKind, Pattern,
    Restriction, Status, TypeId, TypeSpec,
};

/// Schema output formats, mirroring the input set plus the two read-only
/// views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaOutputFormat {
    Yang,
    Yin,
    Tree,
    Info,
}

impl Context {
    /// Serialize a module in the requested format.
    pub fn print_module(&self, module: ModuleId, format: SchemaOutputFormat) -> String {
        match format {
            SchemaOutputFormat::Yang => {
                let statement = lower_module(self, module);
                let mut out = String::new();
                write_yang(&mut out, &statement, 0);
                out
            }
            SchemaOutputFormat::Yin => {
                let statement = lower_module(self, module);
                let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
                write_yin_root(self, module, &mut out, &statement);
                out
            }
            SchemaOutputFormat::Tree => super::tree::print_tree(self, module),
            SchemaOutputFormat::Info => super::info::print_info(self, module),
        }
    }
}

// ----------------------------------------------------------------------
// Graph → statement tree
// ----------------------------------------------------------------------

fn stmt(keyword: Keyword, arg: Option<String>) -> Statement {
    Statement::new(keyword, arg, 0)
}

fn leaf_stmt(keyword: Keyword, arg: &str) -> Statement {
    stmt(keyword, Some(arg.to_string()))
}

fn lower_module(ctx: &Context, module: ModuleId) -> Statement {
    let m = ctx.module(module);
    let keyword = if m.is_submodule() {
        Keyword::Submodule
    } else {
        Keyword::Module
    };
    let mut root = stmt(keyword, Some(ctx.str(m.name).to_string()));

    if let Some(version) = m.yang_version {
        root.children
            .push(leaf_stmt(Keyword::YangVersion, ctx.str(version)));
    }
    if let Some(namespace) = m.namespace {
        root.children
            .push(leaf_stmt(Keyword::Namespace, ctx.str(namespace)));
    }
    if m.is_submodule() {
        if let Some(owner) = m.belongs_to {
            let mut belongs = leaf_stmt(Keyword::BelongsTo, ctx.str(ctx.module(owner).name));
            belongs
                .children
                .push(leaf_stmt(Keyword::Prefix, ctx.str(m.prefix)));
            root.children.push(belongs);
        }
    } else {
        root.children
            .push(leaf_stmt(Keyword::Prefix, ctx.str(m.prefix)));
    }

    for import in &m.imports {
        if import.origin != crate::schema::ImportOrigin::Local {
            continue;
        }
        let mut statement = leaf_stmt(Keyword::Import, ctx.str(import.name));
        statement
            .children
            .push(leaf_stmt(Keyword::Prefix, ctx.str(import.prefix)));
        if let Some(revision) = import.revision {
            statement
                .children
                .push(leaf_stmt(Keyword::RevisionDate, ctx.str(revision)));
        }
        root.children.push(statement);
    }
    for &include in &m.includes {
        root.children
            .push(leaf_stmt(Keyword::Include, ctx.str(ctx.module(include).name)));
    }

    if let Some(organization) = m.organization {
        root.children
            .push(leaf_stmt(Keyword::Organization, ctx.str(organization)));
    }
    if let Some(contact) = m.contact {
        root.children
            .push(leaf_stmt(Keyword::Contact, ctx.str(contact)));
    }
    push_description(ctx, &mut root.children, m.description, m.reference);

    for revision in &m.revisions {
        let mut statement = leaf_stmt(Keyword::Revision, ctx.str(revision.date));
        push_description(ctx, &mut statement.children, revision.description, revision.reference);
        root.children.push(statement);
    }

    for feature in &m.features {
        let mut statement = leaf_stmt(Keyword::Feature, ctx.str(feature.name));
        for fref in &feature.if_features {
            statement
                .children
                .push(leaf_stmt(Keyword::IfFeature, ctx.str(fref.name)));
        }
        push_status(&mut statement.children, feature.status);
        push_description(ctx, &mut statement.children, feature.description, feature.reference);
        root.children.push(statement);
    }

    for &identity in &m.identities {
        let i = ctx.identity(identity);
        let mut statement = leaf_stmt(Keyword::Identity, ctx.str(i.name));
        if let Some(base) = i.base_arg {
            statement.children.push(leaf_stmt(Keyword::Base, ctx.str(base)));
        }
        push_status(&mut statement.children, i.status);
        push_description(ctx, &mut statement.children, i.description, i.reference);
        root.children.push(statement);
    }

    for &typedef in &m.typedefs {
        root.children.push(lower_typedef(ctx, typedef));
    }

    // The data chain belongs to the main module; a submodule prints only its
    // own contributions.
    let chain_owner = ctx.main_module(module);
    for node in ctx.raw_children(Parent::Module(chain_owner)) {
        if ctx.node(node).module == module {
            root.children.push(lower_node(ctx, node));
        }
    }

    for &augment in &m.augments {
        root.children.push(lower_node(ctx, augment));
    }

    for deviation in &m.deviations {
        let mut statement = leaf_stmt(Keyword::Deviation, ctx.str(deviation.target_arg));
        push_description(ctx, &mut statement.children, deviation.description, deviation.reference);
        for deviate in &deviation.deviates {
            statement.children.push(lower_deviate(ctx, deviate));
        }
        root.children.push(statement);
    }

    root
}

fn push_description(
    ctx: &Context,
    children: &mut Vec<Statement>,
    description: Option<crate::dict::Sym>,
    reference: Option<crate::dict::Sym>,
) {
    if let Some(description) = description {
        children.push(leaf_stmt(Keyword::Description, ctx.str(description)));
    }
    if let Some(reference) = reference {
        children.push(leaf_stmt(Keyword::Reference, ctx.str(reference)));
    }
}

fn push_status(children: &mut Vec<Statement>, status: Status) {
    match status {
        Status::Current => {}
        Status::Deprecated => children.push(leaf_stmt(Keyword::Status, "deprecated")),
        Status::Obsolete => children.push(leaf_stmt(Keyword::Status, "obsolete")),
    }
}

fn lower_typedef(ctx: &Context, typedef: crate::schema::TypedefId) -> Statement {
    let td = ctx.typedef(typedef);
    let mut statement = leaf_stmt(Keyword::Typedef, ctx.str(td.name));
    statement.children.push(lower_type(ctx, td.ty));
    if let Some(units) = td.units {
        statement.children.push(leaf_stmt(Keyword::Units, ctx.str(units)));
    }
    if let Some(default) = td.default {
        statement
            .children
            .push(leaf_stmt(Keyword::Default, ctx.str(default)));
    }
    push_status(&mut statement.children, td.status);
    push_description(ctx, &mut statement.children, td.description, td.reference);
    statement
}

fn lower_type(ctx: &Context, ty: TypeId) -> Statement {
    let t = ctx.typ(ty);
    let name = t
        .name
        .map(|n| ctx.str(n).to_string())
        .unwrap_or_else(|| t.base.name().to_string());
    let mut statement = stmt(Keyword::Type, Some(name));

    match &t.spec {
        TypeSpec::None => {}
        TypeSpec::String { length, patterns } => {
            if let Some(length) = length {
                statement.children.push(lower_restriction(ctx, Keyword::Length, length));
            }
            for pattern in patterns {
                statement.children.push(lower_pattern(ctx, pattern));
            }
        }
        TypeSpec::Binary { length } => {
            if let Some(length) = length {
                statement.children.push(lower_restriction(ctx, Keyword::Length, length));
            }
        }
        TypeSpec::Number { range } => {
            if let Some(range) = range {
                statement.children.push(lower_restriction(ctx, Keyword::Range, range));
            }
        }
        TypeSpec::Decimal64 { digits, range, .. } => {
            statement
                .children
                .push(leaf_stmt(Keyword::FractionDigits, &digits.to_string()));
            if let Some(range) = range {
                statement.children.push(lower_restriction(ctx, Keyword::Range, range));
            }
        }
        TypeSpec::Bits { bits } => {
            for bit in bits {
                statement.children.push(lower_bit(ctx, bit));
            }
        }
        TypeSpec::Enumeration { enums } => {
            for value in enums {
                statement.children.push(lower_enum(ctx, value));
            }
        }
        TypeSpec::Leafref {
            path,
            require_instance,
            ..
        } => {
            statement.children.push(leaf_stmt(Keyword::Path, ctx.str(*path)));
            if let Some(require) = require_instance {
                statement
                    .children
                    .push(leaf_stmt(Keyword::RequireInstance, bool_str(*require)));
            }
        }
        TypeSpec::Identityref { base_arg, .. } => {
            statement.children.push(leaf_stmt(Keyword::Base, ctx.str(*base_arg)));
        }
        TypeSpec::InstanceIdentifier { require_instance } => {
            if let Some(require) = require_instance {
                statement
                    .children
                    .push(leaf_stmt(Keyword::RequireInstance, bool_str(*require)));
            }
        }
        TypeSpec::Union { types } => {
            for &member in types {
                statement.children.push(lower_type(ctx, member));
            }
        }
    }
    statement
}

fn lower_restriction(ctx: &Context, keyword: Keyword, restriction: &Restriction) -> Statement {
    let mut statement = stmt(keyword, Some(ctx.str(restriction.arg).to_string()));
    if let Some(message) = restriction.error_message {
        statement
            .children
            .push(leaf_stmt(Keyword::ErrorMessage, ctx.str(message)));
    }
    if let Some(tag) = restriction.error_app_tag {
        statement
            .children
            .push(leaf_stmt(Keyword::ErrorAppTag, ctx.str(tag)));
    }
    statement
}

fn lower_pattern(ctx: &Context, pattern: &Pattern) -> Statement {
    let mut statement = leaf_stmt(Keyword::Pattern, ctx.str(pattern.expr));
    if let Some(message) = pattern.error_message {
        statement
            .children
            .push(leaf_stmt(Keyword::ErrorMessage, ctx.str(message)));
    }
    if let Some(tag) = pattern.error_app_tag {
        statement
            .children
            .push(leaf_stmt(Keyword::ErrorAppTag, ctx.str(tag)));
    }
    statement
}

fn lower_bit(ctx: &Context, bit: &Bit) -> Statement {
    let mut statement = leaf_stmt(Keyword::Bit, ctx.str(bit.name));
    if bit.explicit {
        statement
            .children
            .push(leaf_stmt(Keyword::Position, &bit.position.to_string()));
    }
    push_status(&mut statement.children, bit.status);
    push_description(ctx, &mut statement.children, bit.description, bit.reference);
    statement
}

fn lower_enum(ctx: &Context, value: &EnumValue) -> Statement {
    let mut statement = leaf_stmt(Keyword::Enum, ctx.str(value.name));
    if value.explicit {
        statement
            .children
            .push(leaf_stmt(Keyword::Value, &value.value.to_string()));
    }
    push_status(&mut statement.children, value.status);
    push_description(ctx, &mut statement.children, value.description, value.reference);
    statement
}

fn lower_must(ctx: &Context, must: &Must) -> Statement {
    let mut statement = leaf_stmt(Keyword::Must, ctx.str(must.expr));
    if let Some(message) = must.error_message {
        statement
            .children
            .push(leaf_stmt(Keyword::ErrorMessage, ctx.str(message)));
    }
    if let Some(tag) = must.error_app_tag {
        statement
            .children
            .push(leaf_stmt(Keyword::ErrorAppTag, ctx.str(tag)));
    }
    push_description(ctx, &mut statement.children, must.description, must.reference);
    statement
}

fn lower_node(ctx: &Context, node: NodeId) -> Statement {
    let n = ctx.node(node);
    let keyword = match &n.kind {
        NodeKind::Container(_) => Keyword::Container,
        NodeKind::List(_) => Keyword::List,
        NodeKind::Leaf(_) => Keyword::Leaf,
        NodeKind::LeafList(_) => Keyword::LeafList,
        NodeKind::Choice(_) => Keyword::Choice,
        NodeKind::Case => Keyword::Case,
        NodeKind::Anyxml(_) => Keyword::Anyxml,
        NodeKind::Uses(_) => Keyword::Uses,
        NodeKind::Grouping(_) => Keyword::Grouping,
        NodeKind::Augment(_) => Keyword::Augment,
        NodeKind::Rpc(_) => Keyword::Rpc,
        NodeKind::Input(_) => Keyword::Input,
        NodeKind::Output(_) => Keyword::Output,
        NodeKind::Notification(_) => Keyword::Notification,
    };

    let arg = match &n.kind {
        NodeKind::Input(_) | NodeKind::Output(_) => None,
        NodeKind::Uses(uses) => Some(ctx.str(uses.grouping_arg).to_string()),
        NodeKind::Augment(augment) => Some(ctx.str(augment.target_arg).to_string()),
        _ => Some(ctx.str(n.name).to_string()),
    };
    let mut statement = stmt(keyword, arg);

    for fref in &n.if_features {
        statement
            .children
            .push(leaf_stmt(Keyword::IfFeature, ctx.str(fref.name)));
    }
    if let Some(when) = n.when {
        statement.children.push(leaf_stmt(Keyword::When, ctx.str(when)));
    }
    if n.flags.contains(NodeFlags::CONFIG_SET) {
        statement
            .children
            .push(leaf_stmt(Keyword::Config, bool_str(n.config())));
    }
    if n.flags.contains(NodeFlags::MANDATORY) {
        statement.children.push(leaf_stmt(Keyword::Mandatory, "true"));
    }
    if n.flags.contains(NodeFlags::USER_ORDERED) {
        statement.children.push(leaf_stmt(Keyword::OrderedBy, "user"));
    }
    push_status(&mut statement.children, n.status);
    push_description(ctx, &mut statement.children, n.description, n.reference);

    match &n.kind {
        NodeKind::Container(c) => {
            if let Some(presence) = c.presence {
                statement
                    .children
                    .push(leaf_stmt(Keyword::Presence, ctx.str(presence)));
            }
            for &typedef in &c.typedefs {
                statement.children.push(lower_typedef(ctx, typedef));
            }
            for must in &c.musts {
                statement.children.push(lower_must(ctx, must));
            }
        }
        NodeKind::List(l) => {
            if let Some(keys) = l.keys_arg {
                statement.children.push(leaf_stmt(Keyword::Key, ctx.str(keys)));
            }
            for unique in &l.uniques {
                statement
                    .children
                    .push(leaf_stmt(Keyword::Unique, ctx.str(unique.arg)));
            }
            if l.min_elements > 0 {
                statement
                    .children
                    .push(leaf_stmt(Keyword::MinElements, &l.min_elements.to_string()));
            }
            if let Some(max) = l.max_elements {
                statement
                    .children
                    .push(leaf_stmt(Keyword::MaxElements, &max.to_string()));
            }
            for &typedef in &l.typedefs {
                statement.children.push(lower_typedef(ctx, typedef));
            }
            for must in &l.musts {
                statement.children.push(lower_must(ctx, must));
            }
        }
        NodeKind::Leaf(l) => {
            statement.children.push(lower_type(ctx, l.ty));
            if let Some(units) = l.units {
                statement.children.push(leaf_stmt(Keyword::Units, ctx.str(units)));
            }
            if let Some(default) = l.default {
                statement
                    .children
                    .push(leaf_stmt(Keyword::Default, ctx.str(default)));
            }
            for must in &l.musts {
                statement.children.push(lower_must(ctx, must));
            }
        }
        NodeKind::LeafList(l) => {
            statement.children.push(lower_type(ctx, l.ty));
            if let Some(units) = l.units {
                statement.children.push(leaf_stmt(Keyword::Units, ctx.str(units)));
            }
            if l.min_elements > 0 {
                statement
                    .children
                    .push(leaf_stmt(Keyword::MinElements, &l.min_elements.to_string()));
            }
            if let Some(max) = l.max_elements {
                statement
                    .children
                    .push(leaf_stmt(Keyword::MaxElements, &max.to_string()));
            }
            for must in &l.musts {
                statement.children.push(lower_must(ctx, must));
            }
        }
        NodeKind::Choice(c) => {
            if let Some(default) = c.default_arg {
                statement
                    .children
                    .push(leaf_stmt(Keyword::Default, ctx.str(default)));
            }
        }
        NodeKind::Anyxml(a) => {
            for must in &a.musts {
                statement.children.push(lower_must(ctx, must));
            }
        }
        NodeKind::Uses(u) => {
            for refine in &u.refines {
                statement.children.push(lower_refine(ctx, refine));
            }
            for &augment in &u.augments {
                statement.children.push(lower_node(ctx, augment));
            }
            // Expanded children are an implementation detail; they are not
            // part of the module as written.
            return statement;
        }
        NodeKind::Grouping(g) => {
            for &typedef in &g.typedefs {
                statement.children.push(lower_typedef(ctx, typedef));
            }
        }
        NodeKind::Augment(a) => {
            // After application the children live in the target's chain.
            if !a.applied.is_empty() {
                for &child in &a.applied {
                    statement.children.push(lower_node(ctx, child));
                }
                return statement;
            }
        }
        NodeKind::Rpc(r) => {
            for &typedef in &r.typedefs {
                statement.children.push(lower_typedef(ctx, typedef));
            }
        }
        NodeKind::Input(io) | NodeKind::Output(io) => {
            for &typedef in &io.typedefs {
                statement.children.push(lower_typedef(ctx, typedef));
            }
        }
        NodeKind::Notification(notif) => {
            for &typedef in &notif.typedefs {
                statement.children.push(lower_typedef(ctx, typedef));
            }
        }
        NodeKind::Case => {}
    }

    for child in ctx.raw_children(Parent::Node(node)) {
        statement.children.push(lower_node(ctx, child));
    }
    statement
}

fn lower_refine(ctx: &Context, refine: &crate::schema::Refine) -> Statement {
    let mut statement = leaf_stmt(Keyword::Refine, ctx.str(refine.target_arg));
    if let Some(default) = refine.default {
        statement
            .children
            .push(leaf_stmt(Keyword::Default, ctx.str(default)));
    }
    if let Some(config) = refine.config {
        statement.children.push(leaf_stmt(Keyword::Config, bool_str(config)));
    }
    if let Some(mandatory) = refine.mandatory {
        statement
            .children
            .push(leaf_stmt(Keyword::Mandatory, bool_str(mandatory)));
    }
    if let Some(presence) = refine.presence {
        statement
            .children
            .push(leaf_stmt(Keyword::Presence, ctx.str(presence)));
    }
    if let Some(min) = refine.min_elements {
        statement
            .children
            .push(leaf_stmt(Keyword::MinElements, &min.to_string()));
    }
    if let Some(Some(max)) = refine.max_elements {
        statement
            .children
            .push(leaf_stmt(Keyword::MaxElements, &max.to_string()));
    }
    for must in &refine.musts {
        statement.children.push(lower_must(ctx, must));
    }
    push_description(ctx, &mut statement.children, refine.description, refine.reference);
    statement
}

fn lower_deviate(ctx: &Context, deviate: &Deviate) -> Statement {
    let (arg, props) = match deviate {
        Deviate::NotSupported => return leaf_stmt(Keyword::Deviate, "not-supported"),
        Deviate::Add(props) => ("add", props),
        Deviate::Replace(props) => ("replace", props),
        Deviate::Delete(props) => ("delete", props),
    };
    let mut statement = leaf_stmt(Keyword::Deviate, arg);
    lower_deviate_props(ctx, &mut statement, props);
    statement
}

fn lower_deviate_props(ctx: &Context, statement: &mut Statement, props: &DeviateProps) {
    if let Some(ty) = props.ty {
        statement.children.push(lower_type(ctx, ty));
    }
    if let Some(units) = props.units {
        statement.children.push(leaf_stmt(Keyword::Units, ctx.str(units)));
    }
    for must in &props.musts {
        statement.children.push(lower_must(ctx, must));
    }
    for &unique in &props.uniques {
        statement.children.push(leaf_stmt(Keyword::Unique, ctx.str(unique)));
    }
    if let Some(default) = props.default {
        statement
            .children
            .push(leaf_stmt(Keyword::Default, ctx.str(default)));
    }
    if let Some(config) = props.config {
        statement.children.push(leaf_stmt(Keyword::Config, bool_str(config)));
    }
    if let Some(mandatory) = props.mandatory {
        statement
            .children
            .push(leaf_stmt(Keyword::Mandatory, bool_str(mandatory)));
    }
    if let Some(min) = props.min_elements {
        statement
            .children
            .push(leaf_stmt(Keyword::MinElements, &min.to_string()));
    }
    if let Some(max) = props.max_elements {
        let value = match max {
            Some(max) => max.to_string(),
            None => "unbounded".to_string(),
        };
        statement.children.push(leaf_stmt(Keyword::MaxElements, &value));
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// ----------------------------------------------------------------------
// YANG emission
// ----------------------------------------------------------------------

fn write_yang(out: &mut String, statement: &Statement, indent: usize) {
    for _ in 0..indent {
        out.push_str("  ");
    }
    out.push_str(statement.keyword.as_str());
    if let Some(arg) = &statement.arg {
        out.push(' ');
        out.push_str(&yang_arg(arg));
    }
    if statement.children.is_empty() {
        out.push_str(";\n");
    } else {
        out.push_str(" {\n");
        for child in &statement.children {
            write_yang(out, child, indent + 1);
        }
        for _ in 0..indent {
            out.push_str("  ");
        }
        out.push_str("}\n");
    }
}

/// Quote an argument unless it can stand bare.
fn yang_arg(arg: &str) -> String {
    let bare = !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/' | '[' | ']')
        });
    if bare {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

// ----------------------------------------------------------------------
// YIN emission
// ----------------------------------------------------------------------

fn write_yin_root(ctx: &Context, module: ModuleId, out: &mut String, statement: &Statement) {
    let m = ctx.module(module);
    out.push('<');
    out.push_str(statement.keyword.as_str());
    push_yin_attr(out, "name", statement.arg.as_deref().unwrap_or_default());
    push_yin_attr(out, "xmlns", YIN_NAMESPACE);
    if let Some(namespace) = m.namespace {
        push_yin_attr(
            out,
            &format!("xmlns:{}", ctx.str(m.prefix)),
            ctx.str(namespace),
        );
    }
    out.push_str(">\n");
    for child in &statement.children {
        write_yin(out, child, 1);
    }
    out.push_str(&format!("</{}>\n", statement.keyword.as_str()));
}

fn write_yin(out: &mut String, statement: &Statement, indent: usize) {
    let pad = "  ".repeat(indent);
    let name = statement.keyword.as_str();
    out.push_str(&pad);
    out.push('<');
    out.push_str(name);

    let mut argument_element: Option<(&'static str, &str)> = None;
    if let Some(arg) = &statement.arg {
        match argument_shape(&statement.keyword) {
            ArgumentShape::Attribute(attr) => push_yin_attr(out, attr, arg),
            ArgumentShape::Element(element) => argument_element = Some((element, arg)),
            ArgumentShape::None => {}
        }
    }

    if statement.children.is_empty() && argument_element.is_none() {
        out.push_str("/>\n");
        return;
    }
    out.push_str(">\n");
    if let Some((element, text)) = argument_element {
        out.push_str(&pad);
        out.push_str(&format!(
            "  <{element}>{}</{element}>\n",
            xml_escape(text)
        ));
    }
    for child in &statement.children {
        write_yin(out, child, indent + 1);
    }
    out.push_str(&pad);
    out.push_str(&format!("</{name}>\n"));
}

fn push_yin_attr(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!(" {name}=\"{}\"", xml_escape(value)));
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
