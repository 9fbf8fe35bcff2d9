//! Statement tree → module under construction.
//!
//! The builder walks the parsed statement tree, fills the module's slabs and
//! node chains, enforces statement cardinality and local uniqueness rules,
//! and records every forward reference in the caller's unres queue for the
//! resolver to settle.

use yang_parser::{Keyword, Statement};

use crate::context::{Context, Parent};
use crate::dict::Sym;
use crate::error::{Error, ErrorKind, Result};
use crate::path;
use crate::resolver::{Dep, IffeatSite, Unres, UnresKind};
use crate::schema::{
    Anyxml, Bit, Choice, Container, Deviate, DeviateProps, Deviation, EnumValue, Feature,
    FeatureRef, Grouping, Identity, Import, ImportOrigin, Leaf, LeafList, List, ModuleId,
    ModuleKind, Must, NacmFlags, NodeFlags, NodeId, NodeKind, Notification, Pattern, Refine,
    Restriction, Revision, Rpc, RpcIo, SchemaNode, Status, Type, TypeBase, TypeId, TypedefId,
    TypeSpec, Unique, Uses,
};
use crate::value;

pub(crate) fn build_module(
    ctx: &mut Context,
    module: ModuleId,
    statement: &Statement,
    unres: &mut Unres,
) -> Result<()> {
    ModuleBuilder { ctx, module, unres }.build(statement)
}

/// Post-hoc identifier check: is the node's name unique in its scope?
/// Exposed so tests can verify the invariant on sealed modules.
pub fn check_id(ctx: &Context, node: NodeId, parent: Option<NodeId>) -> Result<()> {
    let parent = match parent {
        Some(p) => Parent::Node(p),
        None => Parent::Module(ctx.main_module(ctx.node(node).module)),
    };
    let name = ctx.node_name(node).to_string();
    let grouping = matches!(ctx.node(node).kind, NodeKind::Grouping(_));
    let count = ctx
        .raw_children(parent)
        .filter(|&sibling| {
            let s = ctx.node(sibling);
            matches!(s.kind, NodeKind::Grouping(_)) == grouping
                && !matches!(s.kind, NodeKind::Augment(_))
                && ctx.str(s.name) == name
        })
        .count();
    if count <= 1 {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::DuplicateIdentifier { name }))
    }
}

struct ModuleBuilder<'a> {
    ctx: &'a mut Context,
    module: ModuleId,
    unres: &'a mut Unres,
}

impl ModuleBuilder<'_> {
    fn build(&mut self, statement: &Statement) -> Result<()> {
        let name = require_arg(statement)?;
        if !is_identifier(name) {
            return Err(invalid(statement));
        }
        let name = self.intern(name);
        self.ctx.module_mut(self.module).name = name;

        let submodule = self.ctx.module(self.module).kind == ModuleKind::Submodule;

        // Header and linkage statements first: later statements depend on
        // the prefix and import table being in place.
        for child in &statement.children {
            match &child.keyword {
                Keyword::Namespace => {
                    if submodule {
                        return Err(unexpected(child));
                    }
                    let sym = self.intern(require_arg(child)?);
                    let module = self.ctx.module_mut(self.module);
                    set_once(&mut module.namespace, sym, child)?;
                }
                Keyword::Prefix => {
                    if submodule {
                        return Err(unexpected(child));
                    }
                    let arg = require_arg(child)?;
                    if !is_identifier(arg) {
                        return Err(invalid(child));
                    }
                    let current = self.ctx.module(self.module).prefix;
                    if !self.ctx.str(current).is_empty() {
                        return Err(duplicate(child));
                    }
                    let sym = self.intern(arg);
                    self.ctx.module_mut(self.module).prefix = sym;
                }
                Keyword::BelongsTo => {
                    if !submodule {
                        return Err(unexpected(child));
                    }
                    self.build_belongs_to(child)?;
                }
                Keyword::YangVersion => {
                    let arg = require_arg(child)?;
                    if arg != "1" {
                        return Err(invalid(child));
                    }
                    let sym = self.intern(arg);
                    let module = self.ctx.module_mut(self.module);
                    set_once(&mut module.yang_version, sym, child)?;
                }
                Keyword::Organization => {
                    let sym = self.intern(require_arg(child)?);
                    set_once(
                        &mut self.ctx.module_mut(self.module).organization,
                        sym,
                        child,
                    )?;
                }
                Keyword::Contact => {
                    let sym = self.intern(require_arg(child)?);
                    set_once(&mut self.ctx.module_mut(self.module).contact, sym, child)?;
                }
                Keyword::Description => {
                    let sym = self.intern(require_arg(child)?);
                    set_once(&mut self.ctx.module_mut(self.module).description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern(require_arg(child)?);
                    set_once(&mut self.ctx.module_mut(self.module).reference, sym, child)?;
                }
                Keyword::Revision => self.build_revision(child)?,
                Keyword::Import => self.build_import(child)?,
                Keyword::Include => self.build_include(child)?,
                _ => {}
            }
        }

        if !submodule {
            let module = self.ctx.module(self.module);
            if module.namespace.is_none() {
                return Err(missing(statement, "namespace"));
            }
            if self.ctx.str(module.prefix).is_empty() {
                return Err(missing(statement, "prefix"));
            }
        }

        // Most recent revision first.
        let mut revisions = std::mem::take(&mut self.ctx.module_mut(self.module).revisions);
        revisions.sort_by(|a, b| self.ctx.str(b.date).cmp(self.ctx.str(a.date)));
        self.ctx.module_mut(self.module).revisions = revisions;

        // Body statements.
        for child in &statement.children {
            match &child.keyword {
                Keyword::Namespace
                | Keyword::Prefix
                | Keyword::BelongsTo
                | Keyword::YangVersion
                | Keyword::Organization
                | Keyword::Contact
                | Keyword::Description
                | Keyword::Reference
                | Keyword::Revision
                | Keyword::Import
                | Keyword::Include => {}
                Keyword::Feature => self.build_feature(child)?,
                Keyword::Identity => self.build_identity(child)?,
                Keyword::Typedef => {
                    let id = self.build_typedef(child, None)?;
                    self.ctx.module_mut(self.module).typedefs.push(id);
                }
                Keyword::Extension => {} // definitions are carried by name only
                Keyword::Augment => {
                    let node = self.build_augment(child, Parent::Module(self.owner()), false)?;
                    self.ctx.module_mut(self.module).augments.push(node);
                    self.unres.push(
                        self.module,
                        Some(node),
                        child.loc,
                        UnresKind::Augment { node, base: None },
                    );
                }
                Keyword::Deviation => self.build_deviation(child)?,
                Keyword::Container
                | Keyword::Leaf
                | Keyword::LeafList
                | Keyword::List
                | Keyword::Choice
                | Keyword::Anyxml
                | Keyword::Uses
                | Keyword::Grouping
                | Keyword::Rpc
                | Keyword::Notification => {
                    self.build_node(child, Parent::Module(self.owner()), true, false)?;
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }

        Ok(())
    }

    /// The module whose top-level chain receives this (sub)module's data.
    fn owner(&self) -> ModuleId {
        self.ctx.main_module(self.module)
    }

    fn intern(&mut self, text: &str) -> Sym {
        self.ctx.intern(self.module, text)
    }

    fn intern_arg(&mut self, statement: &Statement) -> Result<Sym> {
        let arg = require_arg(statement)?;
        Ok(self.intern(arg))
    }

    fn build_belongs_to(&mut self, statement: &Statement) -> Result<()> {
        let owner = self
            .ctx
            .module(self.module)
            .belongs_to
            .ok_or_else(|| Error::internal("submodule without an owner"))?;
        let arg = require_arg(statement)?;
        if self.ctx.str(self.ctx.module(owner).name) != arg {
            return Err(Error::new(ErrorKind::InvalidValue {
                keyword: "belongs-to".to_string(),
                value: arg.to_string(),
            })
            .with_loc(statement.loc));
        }
        let prefix = statement
            .child(&Keyword::Prefix)
            .ok_or_else(|| missing(statement, "prefix"))?;
        let sym = self.intern_arg(prefix)?;
        self.ctx.module_mut(self.module).prefix = sym;
        Ok(())
    }

    fn build_revision(&mut self, statement: &Statement) -> Result<()> {
        let date = require_arg(statement)?;
        if !is_revision_date(date) {
            return Err(invalid(statement));
        }
        let date = self.intern(date);
        let mut description = None;
        let mut reference = None;
        for child in &statement.children {
            match &child.keyword {
                Keyword::Description => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut reference, sym, child)?;
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        self.ctx.module_mut(self.module).revisions.push(Revision {
            date,
            description,
            reference,
        });
        Ok(())
    }

    fn build_import(&mut self, statement: &Statement) -> Result<()> {
        let name = self.intern_arg(statement)?;
        let prefix_stmt = statement
            .child(&Keyword::Prefix)
            .ok_or_else(|| missing(statement, "prefix"))?;
        let prefix = self.intern_arg(prefix_stmt)?;
        let mut revision = None;
        for child in &statement.children {
            match &child.keyword {
                Keyword::Prefix => {}
                Keyword::RevisionDate => {
                    let arg = require_arg(child)?;
                    if !is_revision_date(arg) {
                        return Err(invalid(child));
                    }
                    let sym = self.intern(arg);
                    set_once(&mut revision, sym, child)?;
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }

        // Import prefixes share a namespace with the module's own prefix.
        let module = self.ctx.module(self.module);
        let prefix_str = self.ctx.str(prefix);
        if self.ctx.str(module.prefix) == prefix_str
            || module
                .imports
                .iter()
                .any(|i| self.ctx.str(i.prefix) == prefix_str)
        {
            return Err(Error::new(ErrorKind::DuplicateIdentifier {
                name: prefix_str.to_string(),
            })
            .with_loc(statement.loc));
        }

        let index = self.ctx.module(self.module).imports.len();
        self.ctx.module_mut(self.module).imports.push(Import {
            name,
            prefix,
            revision,
            module: None,
            origin: ImportOrigin::Local,
        });
        self.unres.push(
            self.module,
            None,
            statement.loc,
            UnresKind::ModuleRef {
                module: self.module,
                dep: Dep::Import(index),
            },
        );
        Ok(())
    }

    fn build_include(&mut self, statement: &Statement) -> Result<()> {
        let name = self.intern_arg(statement)?;
        let mut revision = None;
        for child in &statement.children {
            match &child.keyword {
                Keyword::RevisionDate => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut revision, sym, child)?;
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        self.unres.push(
            self.module,
            None,
            statement.loc,
            UnresKind::ModuleRef {
                module: self.module,
                dep: Dep::Include { name, revision },
            },
        );
        Ok(())
    }

    fn build_feature(&mut self, statement: &Statement) -> Result<()> {
        let name = require_arg(statement)?;
        if self
            .ctx
            .module(self.module)
            .features
            .iter()
            .any(|f| self.ctx.str(f.name) == name)
        {
            return Err(Error::new(ErrorKind::DuplicateIdentifier {
                name: name.to_string(),
            })
            .with_loc(statement.loc));
        }
        let name = self.intern(name);

        let mut feature = Feature {
            name,
            enabled: false,
            if_features: Vec::new(),
            description: None,
            reference: None,
            status: Status::default(),
        };
        let mut status_seen = false;
        for child in &statement.children {
            match &child.keyword {
                Keyword::IfFeature => {
                    let sym = self.intern_arg(child)?;
                    feature.if_features.push(FeatureRef {
                        name: sym,
                        resolved: None,
                    });
                }
                Keyword::Description => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut feature.description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut feature.reference, sym, child)?;
                }
                Keyword::Status => {
                    feature.status = self.parse_status(child, &mut status_seen)?;
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }

        let index = self.ctx.module(self.module).features.len();
        let if_count = feature.if_features.len();
        self.ctx.module_mut(self.module).features.push(feature);
        for i in 0..if_count {
            self.unres.push(
                self.module,
                None,
                statement.loc,
                UnresKind::Iffeat {
                    site: IffeatSite::Feature {
                        module: self.module,
                        feature: index,
                        index: i,
                    },
                },
            );
        }
        Ok(())
    }

    fn build_identity(&mut self, statement: &Statement) -> Result<()> {
        let name = require_arg(statement)?;
        let owner = self.owner();
        let duplicate_name = self.ctx.module(owner).identities.iter().any(|&id| {
            self.ctx.str(self.ctx.identity(id).name) == name
        }) || self.ctx.module(self.module).identities.iter().any(|&id| {
            self.ctx.str(self.ctx.identity(id).name) == name
        });
        if duplicate_name {
            return Err(Error::new(ErrorKind::DuplicateIdentifier {
                name: name.to_string(),
            })
            .with_loc(statement.loc));
        }
        let name = self.intern(name);

        let mut identity = Identity {
            module: self.module,
            name,
            base_arg: None,
            base: None,
            derived: Vec::new(),
            description: None,
            reference: None,
            status: Status::default(),
        };
        let mut status_seen = false;
        for child in &statement.children {
            match &child.keyword {
                Keyword::Base => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut identity.base_arg, sym, child)?;
                }
                Keyword::Description => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut identity.description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut identity.reference, sym, child)?;
                }
                Keyword::Status => {
                    identity.status = self.parse_status(child, &mut status_seen)?;
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }

        let has_base = identity.base_arg.is_some();
        let id = self.ctx.identities.alloc(identity);
        self.ctx.module_mut(self.module).identities.push(id);
        if has_base {
            self.unres.push(
                self.module,
                None,
                statement.loc,
                UnresKind::IdentityBase { identity: id },
            );
        }
        Ok(())
    }

    fn build_typedef(&mut self, statement: &Statement, scope: Option<NodeId>) -> Result<TypedefId> {
        let name = require_arg(statement)?;
        if TypeBase::from_builtin(name).is_some() {
            return Err(invalid(statement));
        }
        // Typedef names must be unique along the path to the root.
        if self.find_scoped_typedef(scope, name).is_some() {
            return Err(Error::new(ErrorKind::DuplicateIdentifier {
                name: name.to_string(),
            })
            .with_loc(statement.loc));
        }
        let name = self.intern(name);

        let type_stmt = statement
            .child(&Keyword::Type)
            .ok_or_else(|| missing(statement, "type"))?;
        let ty = self.build_type(type_stmt, scope, None, TypeRole::Typedef)?;

        let mut typedef = crate::schema::Typedef {
            module: self.module,
            name,
            ty,
            units: None,
            default: None,
            description: None,
            reference: None,
            status: Status::default(),
        };
        let mut status_seen = false;
        for child in &statement.children {
            match &child.keyword {
                Keyword::Type => {}
                Keyword::Units => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut typedef.units, sym, child)?;
                }
                Keyword::Default => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut typedef.default, sym, child)?;
                }
                Keyword::Description => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut typedef.description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut typedef.reference, sym, child)?;
                }
                Keyword::Status => {
                    typedef.status = self.parse_status(child, &mut status_seen)?;
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }

        if let Some(default) = typedef.default {
            self.unres.push(
                self.module,
                scope,
                statement.loc,
                UnresKind::TypeDefault { ty, value: default },
            );
        }
        Ok(self.ctx.typedefs.alloc(typedef))
    }

    fn find_scoped_typedef(&self, scope: Option<NodeId>, name: &str) -> Option<TypedefId> {
        let mut current = scope;
        while let Some(id) = current {
            let found = node_typedefs(&self.ctx.node(id).kind)
                .iter()
                .find(|&&td| self.ctx.str(self.ctx.typedef(td).name) == name);
            if let Some(&td) = found {
                return Some(td);
            }
            current = self.ctx.node(id).parent;
        }
        self.ctx
            .module(self.module)
            .typedefs
            .iter()
            .find(|&&td| self.ctx.str(self.ctx.typedef(td).name) == name)
            .copied()
    }

    fn build_type(
        &mut self,
        statement: &Statement,
        scope: Option<NodeId>,
        leaf: Option<NodeId>,
        role: TypeRole,
    ) -> Result<TypeId> {
        let arg = require_arg(statement)?;
        let name = self.intern(arg);
        let base = match path::split_reference(arg) {
            (None, bare) => TypeBase::from_builtin(bare),
            (Some(_), _) => None,
        };

        let ty = Type {
            module: self.module,
            name: Some(name),
            base: base.unwrap_or(TypeBase::Unknown),
            derived: None,
            spec: TypeSpec::None,
        };
        let id = self.ctx.types.alloc(ty);

        match base {
            Some(base) => self.build_builtin_spec(statement, id, base, scope, leaf, role)?,
            None => {
                // A named reference: keep any restrictions it adds and let
                // the resolver join them with the referenced typedef.
                self.build_derived_spec(statement, id)?;
                let kind = match role {
                    TypeRole::Typedef => UnresKind::TypeDerTypedef {
                        ty: id,
                        scope,
                        module: self.module,
                        in_union: false,
                    },
                    TypeRole::Leaf | TypeRole::UnionMember => UnresKind::TypeDer {
                        ty: id,
                        scope,
                        module: self.module,
                        in_union: role == TypeRole::UnionMember,
                    },
                };
                self.unres.push(self.module, scope, statement.loc, kind);
            }
        }
        Ok(id)
    }

    fn build_builtin_spec(
        &mut self,
        statement: &Statement,
        id: TypeId,
        base: TypeBase,
        scope: Option<NodeId>,
        leaf: Option<NodeId>,
        role: TypeRole,
    ) -> Result<()> {
        if role == TypeRole::UnionMember
            && matches!(base, TypeBase::Empty | TypeBase::Leafref)
        {
            return Err(Error::new(ErrorKind::UnexpectedStatementInContext {
                keyword: base.name().to_string(),
            })
            .with_loc(statement.loc));
        }

        let spec = match base {
            TypeBase::String => {
                let mut length = None;
                let mut patterns = Vec::new();
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Length => {
                            let restr = self.parse_restriction(child, false)?;
                            set_once(&mut length, restr, child)?;
                        }
                        Keyword::Pattern => patterns.push(self.parse_pattern(child)?),
                        Keyword::Unknown(_) => {}
                        _ => return Err(unexpected(child)),
                    }
                }
                TypeSpec::String { length, patterns }
            }
            TypeBase::Binary => {
                let mut length = None;
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Length => {
                            let restr = self.parse_restriction(child, false)?;
                            set_once(&mut length, restr, child)?;
                        }
                        Keyword::Unknown(_) => {}
                        _ => return Err(unexpected(child)),
                    }
                }
                TypeSpec::Binary { length }
            }
            TypeBase::Int8
            | TypeBase::Int16
            | TypeBase::Int32
            | TypeBase::Int64
            | TypeBase::Uint8
            | TypeBase::Uint16
            | TypeBase::Uint32
            | TypeBase::Uint64 => {
                let mut range = None;
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Range => {
                            let restr = self.parse_restriction(child, false)?;
                            set_once(&mut range, restr, child)?;
                        }
                        Keyword::Unknown(_) => {}
                        _ => return Err(unexpected(child)),
                    }
                }
                TypeSpec::Number { range }
            }
            TypeBase::Decimal64 => {
                let mut digits = None;
                let mut range = None;
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::FractionDigits => {
                            let arg = require_arg(child)?;
                            let parsed: u8 = arg.parse().map_err(|_| invalid(child))?;
                            if !(1..=18).contains(&parsed) {
                                return Err(invalid(child));
                            }
                            set_once(&mut digits, parsed, child)?;
                        }
                        Keyword::Range => {
                            let restr = self.parse_restriction(child, true)?;
                            set_once(&mut range, restr, child)?;
                        }
                        Keyword::Unknown(_) => {}
                        _ => return Err(unexpected(child)),
                    }
                }
                let digits = digits.ok_or_else(|| missing(statement, "fraction-digits"))?;
                TypeSpec::Decimal64 {
                    digits,
                    divisor: 10i64.pow(digits as u32),
                    range,
                }
            }
            TypeBase::Bits => self.parse_bits(statement)?,
            TypeBase::Enumeration => self.parse_enums(statement)?,
            TypeBase::Leafref => {
                if statement.children_of(&Keyword::Path).count() > 1 {
                    return Err(duplicate(
                        statement.children_of(&Keyword::Path).nth(1).unwrap(),
                    ));
                }
                let path_stmt = statement
                    .child(&Keyword::Path)
                    .ok_or_else(|| missing(statement, "path"))?;
                let path_arg = require_arg(path_stmt)?;
                path::parse(path_arg).map_err(|_| invalid(path_stmt))?;
                let path = self.intern(path_arg);
                let mut require_instance = None;
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Path => {}
                        Keyword::RequireInstance => {
                            let parsed = parse_bool(child)?;
                            set_once(&mut require_instance, parsed, child)?;
                        }
                        Keyword::Unknown(_) => {}
                        _ => return Err(unexpected(child)),
                    }
                }
                // Target resolution is keyed to the instantiated leaf; a
                // grouping body waits until `uses` copies it somewhere real.
                if let Some(leaf) = leaf {
                    if !self.in_grouping(leaf) {
                        self.unres.push(
                            self.module,
                            Some(leaf),
                            statement.loc,
                            UnresKind::TypeLeafref { ty: id, node: leaf },
                        );
                    }
                }
                TypeSpec::Leafref {
                    path,
                    target: None,
                    require_instance,
                }
            }
            TypeBase::Identityref => {
                let base_stmt = statement
                    .child(&Keyword::Base)
                    .ok_or_else(|| missing(statement, "base"))?;
                let base_arg = self.intern_arg(base_stmt)?;
                self.unres.push(
                    self.module,
                    scope,
                    statement.loc,
                    UnresKind::TypeIdentref {
                        ty: id,
                        module: self.module,
                    },
                );
                TypeSpec::Identityref {
                    base_arg,
                    base: None,
                }
            }
            TypeBase::InstanceIdentifier => {
                let mut require_instance = None;
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::RequireInstance => {
                            let parsed = parse_bool(child)?;
                            set_once(&mut require_instance, parsed, child)?;
                        }
                        Keyword::Unknown(_) => {}
                        _ => return Err(unexpected(child)),
                    }
                }
                TypeSpec::InstanceIdentifier { require_instance }
            }
            TypeBase::Union => {
                let mut members = Vec::new();
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Type => {
                            members.push(self.build_type(
                                child,
                                scope,
                                leaf,
                                TypeRole::UnionMember,
                            )?);
                        }
                        Keyword::Unknown(_) => {}
                        _ => return Err(unexpected(child)),
                    }
                }
                if members.is_empty() {
                    return Err(missing(statement, "type"));
                }
                TypeSpec::Union { types: members }
            }
            TypeBase::Boolean | TypeBase::Empty => {
                if statement.children.iter().any(|c| !matches!(c.keyword, Keyword::Unknown(_))) {
                    return Err(unexpected(&statement.children[0]));
                }
                TypeSpec::None
            }
            TypeBase::Unknown => return Err(Error::internal("builtin spec for unknown base")),
        };

        self.ctx.typ_mut(id).spec = spec;
        Ok(())
    }

    /// Restrictions written on a type that references a typedef; the base is
    /// not known yet, so the shape is committed by the resolver.
    fn build_derived_spec(&mut self, statement: &Statement, id: TypeId) -> Result<()> {
        let mut range = None;
        let mut length = None;
        let mut patterns = Vec::new();
        for child in &statement.children {
            match &child.keyword {
                Keyword::Range => {
                    let restr = self.parse_restriction(child, true)?;
                    set_once(&mut range, restr, child)?;
                }
                Keyword::Length => {
                    let restr = self.parse_restriction(child, false)?;
                    set_once(&mut length, restr, child)?;
                }
                Keyword::Pattern => patterns.push(self.parse_pattern(child)?),
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        let spec = if let Some(range) = range {
            TypeSpec::Number { range: Some(range) }
        } else if length.is_some() || !patterns.is_empty() {
            TypeSpec::String { length, patterns }
        } else {
            TypeSpec::None
        };
        self.ctx.typ_mut(id).spec = spec;
        Ok(())
    }

    fn parse_restriction(&mut self, statement: &Statement, decimal: bool) -> Result<Restriction> {
        let arg = require_arg(statement)?;
        let parts = value::parse_range_parts(arg, decimal).map_err(|e| e.with_loc(statement.loc))?;
        let arg = self.intern(arg);
        let mut restriction = Restriction {
            arg,
            parts,
            error_message: None,
            error_app_tag: None,
        };
        for child in &statement.children {
            match &child.keyword {
                Keyword::ErrorMessage => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut restriction.error_message, sym, child)?;
                }
                Keyword::ErrorAppTag => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut restriction.error_app_tag, sym, child)?;
                }
                Keyword::Description | Keyword::Reference => {}
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        Ok(restriction)
    }

    fn parse_pattern(&mut self, statement: &Statement) -> Result<Pattern> {
        let expr = self.intern_arg(statement)?;
        let mut pattern = Pattern {
            expr,
            error_message: None,
            error_app_tag: None,
        };
        for child in &statement.children {
            match &child.keyword {
                Keyword::ErrorMessage => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut pattern.error_message, sym, child)?;
                }
                Keyword::ErrorAppTag => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut pattern.error_app_tag, sym, child)?;
                }
                Keyword::Description | Keyword::Reference => {}
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        Ok(pattern)
    }

    fn parse_bits(&mut self, statement: &Statement) -> Result<TypeSpec> {
        let mut bits: Vec<Bit> = Vec::new();
        let mut next_position: u64 = 0;
        for child in &statement.children {
            match &child.keyword {
                Keyword::Bit => {
                    let name = require_arg(child)?;
                    if bits.iter().any(|b| self.ctx.str(b.name) == name) {
                        return Err(Error::new(ErrorKind::DuplicateIdentifier {
                            name: name.to_string(),
                        })
                        .with_loc(child.loc));
                    }
                    let name = self.intern(name);

                    let mut position = None;
                    let mut description = None;
                    let mut reference = None;
                    let mut status = Status::default();
                    let mut status_seen = false;
                    for sub in &child.children {
                        match &sub.keyword {
                            Keyword::Position => {
                                let arg = require_arg(sub)?;
                                let parsed: u64 = arg.parse().map_err(|_| invalid(sub))?;
                                if parsed > u32::MAX as u64 {
                                    return Err(Error::new(ErrorKind::BitPositionOverflow)
                                        .with_loc(sub.loc));
                                }
                                set_once(&mut position, parsed as u32, sub)?;
                            }
                            Keyword::Description => {
                                let sym = self.intern_arg(sub)?;
                                set_once(&mut description, sym, sub)?;
                            }
                            Keyword::Reference => {
                                let sym = self.intern_arg(sub)?;
                                set_once(&mut reference, sym, sub)?;
                            }
                            Keyword::Status => {
                                status = self.parse_status(sub, &mut status_seen)?;
                            }
                            Keyword::IfFeature => {
                                // carried syntactically only
                                require_arg(sub)?;
                            }
                            Keyword::Unknown(_) => {}
                            _ => return Err(unexpected(sub)),
                        }
                    }

                    let (position, explicit) = match position {
                        Some(p) => (p, true),
                        None => {
                            if next_position > u32::MAX as u64 {
                                return Err(Error::new(ErrorKind::BitPositionOverflow)
                                    .with_loc(child.loc));
                            }
                            (next_position as u32, false)
                        }
                    };
                    if bits.iter().any(|b| b.position == position) {
                        return Err(Error::new(ErrorKind::InvalidValue {
                            keyword: "position".to_string(),
                            value: position.to_string(),
                        })
                        .with_loc(child.loc));
                    }
                    next_position = position as u64 + 1;
                    bits.push(Bit {
                        name,
                        position,
                        explicit,
                        description,
                        reference,
                        status,
                    });
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        if bits.is_empty() {
            return Err(missing(statement, "bit"));
        }
        bits.sort_by_key(|b| b.position);
        Ok(TypeSpec::Bits { bits })
    }

    fn parse_enums(&mut self, statement: &Statement) -> Result<TypeSpec> {
        let mut enums: Vec<EnumValue> = Vec::new();
        let mut next_value: i64 = 0;
        for child in &statement.children {
            match &child.keyword {
                Keyword::Enum => {
                    let name = require_arg(child)?;
                    if name.is_empty() || name.trim() != name {
                        return Err(invalid(child));
                    }
                    if enums.iter().any(|e| self.ctx.str(e.name) == name) {
                        return Err(Error::new(ErrorKind::DuplicateIdentifier {
                            name: name.to_string(),
                        })
                        .with_loc(child.loc));
                    }
                    let name = self.intern(name);

                    let mut explicit_value = None;
                    let mut description = None;
                    let mut reference = None;
                    let mut status = Status::default();
                    let mut status_seen = false;
                    for sub in &child.children {
                        match &sub.keyword {
                            Keyword::Value => {
                                let arg = require_arg(sub)?;
                                let parsed: i64 = arg.parse().map_err(|_| invalid(sub))?;
                                if parsed < i32::MIN as i64 || parsed > i32::MAX as i64 {
                                    return Err(Error::new(ErrorKind::EnumValueOverflow)
                                        .with_loc(sub.loc));
                                }
                                set_once(&mut explicit_value, parsed as i32, sub)?;
                            }
                            Keyword::Description => {
                                let sym = self.intern_arg(sub)?;
                                set_once(&mut description, sym, sub)?;
                            }
                            Keyword::Reference => {
                                let sym = self.intern_arg(sub)?;
                                set_once(&mut reference, sym, sub)?;
                            }
                            Keyword::Status => {
                                status = self.parse_status(sub, &mut status_seen)?;
                            }
                            Keyword::Unknown(_) => {}
                            _ => return Err(unexpected(sub)),
                        }
                    }

                    let (value, explicit) = match explicit_value {
                        Some(v) => (v, true),
                        None => {
                            if next_value > i32::MAX as i64 {
                                return Err(Error::new(ErrorKind::EnumValueOverflow)
                                    .with_loc(child.loc));
                            }
                            (next_value as i32, false)
                        }
                    };
                    if enums.iter().any(|e| e.value == value) {
                        return Err(Error::new(ErrorKind::InvalidValue {
                            keyword: "value".to_string(),
                            value: value.to_string(),
                        })
                        .with_loc(child.loc));
                    }
                    next_value = value as i64 + 1;
                    enums.push(EnumValue {
                        name,
                        value,
                        explicit,
                        description,
                        reference,
                        status,
                    });
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        if enums.is_empty() {
            return Err(missing(statement, "enum"));
        }
        Ok(TypeSpec::Enumeration { enums })
    }

    // ------------------------------------------------------------------
    // Schema nodes
    // ------------------------------------------------------------------

    /// Build a schema node and link it under `parent`. `config_ctx` is the
    /// parent's effective config, or `None` under groupings and augments
    /// where config is settled at instantiation.
    fn build_node(
        &mut self,
        statement: &Statement,
        parent: Parent,
        parent_config: bool,
        deferred_config: bool,
    ) -> Result<NodeId> {
        let kind = match &statement.keyword {
            Keyword::Container => NodeKind::Container(Container::default()),
            Keyword::List => NodeKind::List(List::default()),
            Keyword::Leaf => NodeKind::Leaf(Leaf {
                ty: TypeId::new(0),
                units: None,
                default: None,
                musts: Vec::new(),
                backlinks: Vec::new(),
            }),
            Keyword::LeafList => NodeKind::LeafList(LeafList {
                ty: TypeId::new(0),
                units: None,
                musts: Vec::new(),
                min_elements: 0,
                max_elements: None,
                backlinks: Vec::new(),
            }),
            Keyword::Choice => NodeKind::Choice(Choice::default()),
            Keyword::Case => NodeKind::Case,
            Keyword::Anyxml => NodeKind::Anyxml(Anyxml::default()),
            Keyword::Uses => NodeKind::Uses(Uses {
                grouping_arg: self.intern_arg(statement)?,
                grouping: None,
                refines: Vec::new(),
                augments: Vec::new(),
                expanded: false,
            }),
            Keyword::Grouping => NodeKind::Grouping(Grouping::default()),
            Keyword::Rpc => NodeKind::Rpc(Rpc::default()),
            Keyword::Input => NodeKind::Input(RpcIo::default()),
            Keyword::Output => NodeKind::Output(RpcIo::default()),
            Keyword::Notification => NodeKind::Notification(Notification::default()),
            _ => return Err(unexpected(statement)),
        };

        let name = match &statement.keyword {
            // input/output have no argument; uses is named by its grouping.
            Keyword::Input => "input".to_string(),
            Keyword::Output => "output".to_string(),
            Keyword::Uses => {
                let arg = require_arg(statement)?;
                path::split_reference(arg).1.to_string()
            }
            _ => {
                let arg = require_arg(statement)?;
                if !is_identifier(arg) {
                    return Err(invalid(statement));
                }
                arg.to_string()
            }
        };

        // Sibling uniqueness: data nodes and groupings live in separate
        // identifier namespaces.
        let grouping = matches!(kind, NodeKind::Grouping(_));
        let clash = self.ctx.raw_children(parent).any(|sibling| {
            let s = self.ctx.node(sibling);
            !matches!(s.kind, NodeKind::Augment(_))
                && matches!(s.kind, NodeKind::Grouping(_)) == grouping
                && self.ctx.str(s.name) == name
        });
        if clash && !matches!(kind, NodeKind::Uses(_)) {
            return Err(Error::new(ErrorKind::DuplicateIdentifier { name })
                .with_loc(statement.loc));
        }

        let name = self.intern(&name);
        let node = self.ctx.nodes.alloc(SchemaNode {
            name,
            description: None,
            reference: None,
            status: Status::default(),
            flags: NodeFlags::empty(),
            nacm: NacmFlags::empty(),
            if_features: Vec::new(),
            when: None,
            module: self.module,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            kind,
        });
        self.ctx.link_child(parent, node);

        let in_grouping_scope = deferred_config || grouping;
        self.parse_node_substatements(statement, node, parent_config, in_grouping_scope)?;
        self.build_node_children(statement, node, in_grouping_scope)?;

        Ok(node)
    }

    fn parse_node_substatements(
        &mut self,
        statement: &Statement,
        node: NodeId,
        parent_config: bool,
        deferred_config: bool,
    ) -> Result<()> {
        let mut config: Option<bool> = None;
        let mut mandatory: Option<bool> = None;
        let mut status_seen = false;
        let mut ordered_seen = false;

        for child in &statement.children {
            match &child.keyword {
                Keyword::Description => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut self.ctx.node_mut(node).description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut self.ctx.node_mut(node).reference, sym, child)?;
                }
                Keyword::Status => {
                    let status = self.parse_status(child, &mut status_seen)?;
                    self.ctx.node_mut(node).status = status;
                }
                Keyword::When => {
                    if !node_allows_when(&self.ctx.node(node).kind) {
                        return Err(unexpected(child));
                    }
                    let sym = self.intern_arg(child)?;
                    set_once(&mut self.ctx.node_mut(node).when, sym, child)?;
                }
                Keyword::IfFeature => {
                    let sym = self.intern_arg(child)?;
                    let index = self.ctx.node(node).if_features.len();
                    self.ctx.node_mut(node).if_features.push(FeatureRef {
                        name: sym,
                        resolved: None,
                    });
                    self.unres.push(
                        self.module,
                        Some(node),
                        child.loc,
                        UnresKind::Iffeat {
                            site: IffeatSite::Node { node, index },
                        },
                    );
                }
                Keyword::Config => {
                    if !node_allows_config(&self.ctx.node(node).kind) {
                        return Err(unexpected(child));
                    }
                    let parsed = parse_bool(child)?;
                    set_once(&mut config, parsed, child)?;
                }
                Keyword::Mandatory => {
                    if !node_allows_mandatory(&self.ctx.node(node).kind) {
                        return Err(unexpected(child));
                    }
                    let parsed = parse_bool(child)?;
                    set_once(&mut mandatory, parsed, child)?;
                }
                Keyword::OrderedBy => {
                    if !matches!(
                        self.ctx.node(node).kind,
                        NodeKind::List(_) | NodeKind::LeafList(_)
                    ) {
                        return Err(unexpected(child));
                    }
                    if ordered_seen {
                        return Err(duplicate(child));
                    }
                    ordered_seen = true;
                    match require_arg(child)? {
                        "system" => {}
                        "user" => {
                            self.ctx.node_mut(node).flags |= NodeFlags::USER_ORDERED;
                        }
                        _ => return Err(invalid(child)),
                    }
                }
                Keyword::Unknown(name) => {
                    // NACM annotations are the one extension the loader
                    // understands; everything else passes through.
                    let local = path::split_reference(name).1;
                    match local {
                        "default-deny-write" => {
                            self.ctx.node_mut(node).nacm |= NacmFlags::DEFAULT_DENY_WRITE;
                        }
                        "default-deny-all" => {
                            self.ctx.node_mut(node).nacm |= NacmFlags::DEFAULT_DENY_ALL;
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        // Effective config: inherited downward unless written on the node.
        let flags = &mut self.ctx.node_mut(node).flags;
        match config {
            Some(true) => *flags |= NodeFlags::CONFIG | NodeFlags::CONFIG_SET,
            Some(false) => *flags |= NodeFlags::CONFIG_SET,
            None => {
                if parent_config || deferred_config {
                    *flags |= NodeFlags::CONFIG;
                }
            }
        }
        if mandatory == Some(true) {
            *flags |= NodeFlags::MANDATORY;
        }
        if !deferred_config && config == Some(true) && !parent_config {
            return Err(Error::new(ErrorKind::InvalidValue {
                keyword: "config".to_string(),
                value: "true".to_string(),
            })
            .with_path(self.ctx.schema_path(node))
            .with_loc(statement.loc));
        }

        self.parse_kind_substatements(statement, node, deferred_config)
    }

    fn parse_kind_substatements(
        &mut self,
        statement: &Statement,
        node: NodeId,
        deferred_config: bool,
    ) -> Result<()> {
        match &self.ctx.node(node).kind {
            NodeKind::Container(_) => {
                let mut presence = None;
                let mut musts = Vec::new();
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Presence => {
                            let sym = self.intern_arg(child)?;
                            set_once(&mut presence, sym, child)?;
                        }
                        Keyword::Must => musts.push(self.parse_must(child)?),
                        _ => {}
                    }
                }
                if let NodeKind::Container(c) = &mut self.ctx.node_mut(node).kind {
                    c.presence = presence;
                    c.musts = musts;
                }
            }
            NodeKind::List(_) => {
                let mut keys_arg = None;
                let mut uniques = Vec::new();
                let mut min = None;
                let mut max = None;
                let mut musts = Vec::new();
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Key => {
                            let sym = self.intern_arg(child)?;
                            set_once(&mut keys_arg, sym, child)?;
                        }
                        Keyword::Unique => {
                            let sym = self.intern_arg(child)?;
                            uniques.push(Unique {
                                arg: sym,
                                leaves: Vec::new(),
                            });
                        }
                        Keyword::MinElements => {
                            let parsed = parse_u32(child)?;
                            set_once(&mut min, parsed, child)?;
                        }
                        Keyword::MaxElements => {
                            let parsed = parse_max_elements(child)?;
                            set_once(&mut max, parsed, child)?;
                        }
                        Keyword::Must => musts.push(self.parse_must(child)?),
                        _ => {}
                    }
                }
                let unique_count = uniques.len();
                if let NodeKind::List(l) = &mut self.ctx.node_mut(node).kind {
                    l.keys_arg = keys_arg;
                    l.uniques = uniques;
                    l.min_elements = min.unwrap_or(0);
                    l.max_elements = max.unwrap_or(None);
                    l.musts = musts;
                }
                // Key and unique paths inside a grouping are settled against
                // the instantiated copy, never against the definition.
                if !self.in_grouping(node) {
                    if keys_arg.is_some() {
                        self.unres.push(
                            self.module,
                            Some(node),
                            statement.loc,
                            UnresKind::ListKeys { node },
                        );
                    }
                    for index in 0..unique_count {
                        self.unres.push(
                            self.module,
                            Some(node),
                            statement.loc,
                            UnresKind::ListUnique { node, index },
                        );
                    }
                }
            }
            NodeKind::Leaf(_) => {
                if statement.children_of(&Keyword::Type).count() > 1 {
                    return Err(duplicate(statement.children_of(&Keyword::Type).nth(1).unwrap()));
                }
                let type_stmt = statement
                    .child(&Keyword::Type)
                    .ok_or_else(|| missing(statement, "type"))?;
                let ty = self.build_type(type_stmt, Some(node), Some(node), TypeRole::Leaf)?;

                let mut units = None;
                let mut default = None;
                let mut musts = Vec::new();
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Units => {
                            let sym = self.intern_arg(child)?;
                            set_once(&mut units, sym, child)?;
                        }
                        Keyword::Default => {
                            let sym = self.intern_arg(child)?;
                            set_once(&mut default, sym, child)?;
                        }
                        Keyword::Must => musts.push(self.parse_must(child)?),
                        _ => {}
                    }
                }
                if self.ctx.node(node).mandatory() && default.is_some() {
                    return Err(Error::new(ErrorKind::MandatoryWithDefault)
                        .with_path(self.ctx.schema_path(node))
                        .with_loc(statement.loc));
                }
                if let Some(default) = default {
                    self.unres.push(
                        self.module,
                        Some(node),
                        statement.loc,
                        UnresKind::TypeDefault { ty, value: default },
                    );
                }
                if let NodeKind::Leaf(l) = &mut self.ctx.node_mut(node).kind {
                    l.ty = ty;
                    l.units = units;
                    l.default = default;
                    l.musts = musts;
                }
            }
            NodeKind::LeafList(_) => {
                if statement.children_of(&Keyword::Type).count() > 1 {
                    return Err(duplicate(statement.children_of(&Keyword::Type).nth(1).unwrap()));
                }
                let type_stmt = statement
                    .child(&Keyword::Type)
                    .ok_or_else(|| missing(statement, "type"))?;
                let ty = self.build_type(type_stmt, Some(node), Some(node), TypeRole::Leaf)?;

                let mut units = None;
                let mut min = None;
                let mut max = None;
                let mut musts = Vec::new();
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Units => {
                            let sym = self.intern_arg(child)?;
                            set_once(&mut units, sym, child)?;
                        }
                        Keyword::MinElements => {
                            let parsed = parse_u32(child)?;
                            set_once(&mut min, parsed, child)?;
                        }
                        Keyword::MaxElements => {
                            let parsed = parse_max_elements(child)?;
                            set_once(&mut max, parsed, child)?;
                        }
                        Keyword::Must => musts.push(self.parse_must(child)?),
                        _ => {}
                    }
                }
                if let NodeKind::LeafList(l) = &mut self.ctx.node_mut(node).kind {
                    l.ty = ty;
                    l.units = units;
                    l.min_elements = min.unwrap_or(0);
                    l.max_elements = max.unwrap_or(None);
                    l.musts = musts;
                }
            }
            NodeKind::Choice(_) => {
                let mut default = None;
                for child in &statement.children {
                    if child.keyword == Keyword::Default {
                        let sym = self.intern_arg(child)?;
                        set_once(&mut default, sym, child)?;
                    }
                }
                if let Some(default) = default {
                    if self.ctx.node(node).mandatory() {
                        return Err(Error::new(ErrorKind::MandatoryWithDefault)
                            .with_path(self.ctx.schema_path(node))
                            .with_loc(statement.loc));
                    }
                    if let NodeKind::Choice(c) = &mut self.ctx.node_mut(node).kind {
                        c.default_arg = Some(default);
                    }
                    if !self.in_grouping(node) {
                        self.unres.push(
                            self.module,
                            Some(node),
                            statement.loc,
                            UnresKind::ChoiceDefault { node },
                        );
                    }
                }
            }
            NodeKind::Anyxml(_) => {
                let mut musts = Vec::new();
                for child in &statement.children {
                    if child.keyword == Keyword::Must {
                        musts.push(self.parse_must(child)?);
                    }
                }
                if let NodeKind::Anyxml(a) = &mut self.ctx.node_mut(node).kind {
                    a.musts = musts;
                }
            }
            NodeKind::Uses(_) => {
                let mut refines = Vec::new();
                let mut augments = Vec::new();
                for child in &statement.children {
                    match &child.keyword {
                        Keyword::Refine => refines.push(self.parse_refine(child)?),
                        Keyword::Augment => {
                            let augment =
                                self.build_augment(child, Parent::Node(node), true)?;
                            augments.push(augment);
                        }
                        _ => {}
                    }
                }
                if let NodeKind::Uses(u) = &mut self.ctx.node_mut(node).kind {
                    u.refines = refines;
                    u.augments = augments;
                }
                if !self.in_grouping(node) {
                    self.unres.push(
                        self.module,
                        Some(node),
                        statement.loc,
                        UnresKind::Uses { node, depth: 0 },
                    );
                }
            }
            NodeKind::Case
            | NodeKind::Grouping(_)
            | NodeKind::Rpc(_)
            | NodeKind::Input(_)
            | NodeKind::Output(_)
            | NodeKind::Notification(_)
            | NodeKind::Augment(_) => {}
        }

        let _ = deferred_config;
        Ok(())
    }

    fn build_node_children(
        &mut self,
        statement: &Statement,
        node: NodeId,
        deferred_config: bool,
    ) -> Result<()> {
        let parent_config = self.ctx.node(node).config();
        let deferred = deferred_config || matches!(self.ctx.node(node).kind, NodeKind::Grouping(_));

        // Typedefs and groupings first: scoped definitions used by siblings.
        for child in &statement.children {
            if child.keyword == Keyword::Typedef {
                if !node_has_typedefs(&self.ctx.node(node).kind) {
                    return Err(unexpected(child));
                }
                let td = self.build_typedef(child, Some(node))?;
                push_node_typedef(&mut self.ctx.node_mut(node).kind, td);
            }
        }

        for child in &statement.children {
            if child_allowed(&self.ctx.node(node).kind, &child.keyword) {
                self.build_node(child, Parent::Node(node), parent_config, deferred)?;
            }
        }
        Ok(())
    }

    fn build_augment(
        &mut self,
        statement: &Statement,
        parent: Parent,
        relative: bool,
    ) -> Result<NodeId> {
        let arg = require_arg(statement)?;
        let parsed = path::parse(arg).map_err(|_| invalid(statement))?;
        if relative {
            if parsed.absolute || parsed.up > 0 {
                return Err(invalid(statement));
            }
        } else if !parsed.absolute {
            return Err(invalid(statement));
        }
        let target_arg = self.intern(arg);
        let name = self.intern(arg);

        let node = self.ctx.nodes.alloc(SchemaNode {
            name,
            description: None,
            reference: None,
            status: Status::default(),
            flags: NodeFlags::CONFIG,
            nacm: NacmFlags::empty(),
            if_features: Vec::new(),
            when: None,
            module: self.module,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            kind: NodeKind::Augment(crate::schema::Augment {
                target_arg,
                target: None,
                applied: Vec::new(),
            }),
        });
        // Anchor relative augments under their uses so scope walks work;
        // module-level augments stay parentless until applied.
        if let Parent::Node(uses) = parent {
            self.ctx.node_mut(node).parent = Some(uses);
        }

        let mut status_seen = false;
        for child in &statement.children {
            match &child.keyword {
                Keyword::Description => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut self.ctx.node_mut(node).description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut self.ctx.node_mut(node).reference, sym, child)?;
                }
                Keyword::Status => {
                    let status = self.parse_status(child, &mut status_seen)?;
                    self.ctx.node_mut(node).status = status;
                }
                Keyword::When => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut self.ctx.node_mut(node).when, sym, child)?;
                }
                Keyword::IfFeature => {
                    let sym = self.intern_arg(child)?;
                    let index = self.ctx.node(node).if_features.len();
                    self.ctx.node_mut(node).if_features.push(FeatureRef {
                        name: sym,
                        resolved: None,
                    });
                    self.unres.push(
                        self.module,
                        Some(node),
                        child.loc,
                        UnresKind::Iffeat {
                            site: IffeatSite::Node { node, index },
                        },
                    );
                }
                Keyword::Container
                | Keyword::Leaf
                | Keyword::LeafList
                | Keyword::List
                | Keyword::Choice
                | Keyword::Case
                | Keyword::Anyxml
                | Keyword::Uses => {
                    self.build_node(child, Parent::Node(node), true, true)?;
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }

        Ok(node)
    }

    fn parse_refine(&mut self, statement: &Statement) -> Result<Refine> {
        let arg = require_arg(statement)?;
        path::parse_descendant(arg).map_err(|_| invalid(statement))?;
        let target_arg = self.intern(arg);

        let mut refine = Refine {
            target_arg,
            description: None,
            reference: None,
            default: None,
            config: None,
            mandatory: None,
            presence: None,
            min_elements: None,
            max_elements: None,
            musts: Vec::new(),
        };
        for child in &statement.children {
            match &child.keyword {
                Keyword::Description => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut refine.description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut refine.reference, sym, child)?;
                }
                Keyword::Default => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut refine.default, sym, child)?;
                }
                Keyword::Config => {
                    let parsed = parse_bool(child)?;
                    set_once(&mut refine.config, parsed, child)?;
                }
                Keyword::Mandatory => {
                    let parsed = parse_bool(child)?;
                    set_once(&mut refine.mandatory, parsed, child)?;
                }
                Keyword::Presence => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut refine.presence, sym, child)?;
                }
                Keyword::MinElements => {
                    let parsed = parse_u32(child)?;
                    set_once(&mut refine.min_elements, parsed, child)?;
                }
                Keyword::MaxElements => {
                    let parsed = parse_max_elements(child)?;
                    set_once(&mut refine.max_elements, parsed, child)?;
                }
                Keyword::Must => refine.musts.push(self.parse_must(child)?),
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        Ok(refine)
    }

    fn build_deviation(&mut self, statement: &Statement) -> Result<()> {
        let arg = require_arg(statement)?;
        let parsed = path::parse(arg).map_err(|_| invalid(statement))?;
        if !parsed.absolute {
            return Err(invalid(statement));
        }
        let target_arg = self.intern(arg);

        let mut deviation = Deviation {
            target_arg,
            target: None,
            description: None,
            reference: None,
            deviates: Vec::new(),
            snapshot: None,
            active: false,
        };
        for child in &statement.children {
            match &child.keyword {
                Keyword::Description => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut deviation.description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut deviation.reference, sym, child)?;
                }
                Keyword::Deviate => deviation.deviates.push(self.parse_deviate(child)?),
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        if deviation.deviates.is_empty() {
            return Err(missing(statement, "deviate"));
        }
        // `not-supported` stands alone.
        if deviation
            .deviates
            .iter()
            .any(|d| matches!(d, Deviate::NotSupported))
            && deviation.deviates.len() > 1
        {
            return Err(Error::new(ErrorKind::UnexpectedStatementInContext {
                keyword: "deviate".to_string(),
            })
            .with_loc(statement.loc));
        }

        let index = self.ctx.module(self.module).deviations.len();
        self.ctx.module_mut(self.module).deviations.push(deviation);
        self.unres.push(
            self.module,
            None,
            statement.loc,
            UnresKind::Deviation {
                module: self.module,
                index,
            },
        );
        Ok(())
    }

    fn parse_deviate(&mut self, statement: &Statement) -> Result<Deviate> {
        let arg = require_arg(statement)?;
        if arg == "not-supported" {
            if !statement.children.is_empty() {
                return Err(unexpected(&statement.children[0]));
            }
            return Ok(Deviate::NotSupported);
        }

        let mut props = DeviateProps::default();
        for child in &statement.children {
            match &child.keyword {
                Keyword::Units => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut props.units, sym, child)?;
                }
                Keyword::Must => props.musts.push(self.parse_must(child)?),
                Keyword::Unique => {
                    let sym = self.intern_arg(child)?;
                    props.uniques.push(sym);
                }
                Keyword::Default => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut props.default, sym, child)?;
                }
                Keyword::Config => {
                    let parsed = parse_bool(child)?;
                    set_once(&mut props.config, parsed, child)?;
                }
                Keyword::Mandatory => {
                    let parsed = parse_bool(child)?;
                    set_once(&mut props.mandatory, parsed, child)?;
                }
                Keyword::MinElements => {
                    let parsed = parse_u32(child)?;
                    set_once(&mut props.min_elements, parsed, child)?;
                }
                Keyword::MaxElements => {
                    let parsed = parse_max_elements(child)?;
                    set_once(&mut props.max_elements, parsed, child)?;
                }
                Keyword::Type => {
                    let ty = self.build_type(child, None, None, TypeRole::Leaf)?;
                    if props.ty.is_some() {
                        return Err(duplicate(child));
                    }
                    props.ty = Some(ty);
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }

        match arg {
            "add" => Ok(Deviate::Add(props)),
            "replace" => Ok(Deviate::Replace(props)),
            "delete" => Ok(Deviate::Delete(props)),
            _ => Err(invalid(statement)),
        }
    }

    fn parse_must(&mut self, statement: &Statement) -> Result<Must> {
        let expr = self.intern_arg(statement)?;
        let mut must = Must {
            expr,
            error_message: None,
            error_app_tag: None,
            description: None,
            reference: None,
        };
        for child in &statement.children {
            match &child.keyword {
                Keyword::ErrorMessage => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut must.error_message, sym, child)?;
                }
                Keyword::ErrorAppTag => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut must.error_app_tag, sym, child)?;
                }
                Keyword::Description => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut must.description, sym, child)?;
                }
                Keyword::Reference => {
                    let sym = self.intern_arg(child)?;
                    set_once(&mut must.reference, sym, child)?;
                }
                Keyword::Unknown(_) => {}
                _ => return Err(unexpected(child)),
            }
        }
        Ok(must)
    }

    fn parse_status(&mut self, statement: &Statement, seen: &mut bool) -> Result<Status> {
        if *seen {
            return Err(duplicate(statement));
        }
        *seen = true;
        match require_arg(statement)? {
            "current" => Ok(Status::Current),
            "deprecated" => Ok(Status::Deprecated),
            "obsolete" => Ok(Status::Obsolete),
            _ => Err(invalid(statement)),
        }
    }

    /// Whether a node sits inside a grouping definition (its leafrefs and
    /// uses are settled at instantiation).
    fn in_grouping(&self, node: NodeId) -> bool {
        let mut current = self.ctx.node(node).parent;
        while let Some(id) = current {
            match self.ctx.node(id).kind {
                NodeKind::Grouping(_) => return true,
                NodeKind::Augment(_) => {
                    // Uses-level augments resolve with their uses.
                    if self.ctx.node(id).parent.is_some() {
                        return true;
                    }
                    return false;
                }
                _ => current = self.ctx.node(id).parent,
            }
        }
        false
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TypeRole {
    Leaf,
    Typedef,
    UnionMember,
}

/// Which schema-node statements may nest under a given node kind.
fn child_allowed(kind: &NodeKind, keyword: &Keyword) -> bool {
    match kind {
        NodeKind::Container(_) | NodeKind::List(_) | NodeKind::Grouping(_) => matches!(
            keyword,
            Keyword::Container
                | Keyword::Leaf
                | Keyword::LeafList
                | Keyword::List
                | Keyword::Choice
                | Keyword::Anyxml
                | Keyword::Uses
                | Keyword::Grouping
        ),
        NodeKind::Choice(_) => matches!(
            keyword,
            Keyword::Case
                | Keyword::Container
                | Keyword::Leaf
                | Keyword::LeafList
                | Keyword::List
                | Keyword::Anyxml
        ),
        NodeKind::Case => matches!(
            keyword,
            Keyword::Container
                | Keyword::Leaf
                | Keyword::LeafList
                | Keyword::List
                | Keyword::Choice
                | Keyword::Anyxml
                | Keyword::Uses
        ),
        NodeKind::Rpc(_) => matches!(
            keyword,
            Keyword::Input | Keyword::Output | Keyword::Grouping
        ),
        NodeKind::Input(_) | NodeKind::Output(_) | NodeKind::Notification(_) => matches!(
            keyword,
            Keyword::Container
                | Keyword::Leaf
                | Keyword::LeafList
                | Keyword::List
                | Keyword::Choice
                | Keyword::Anyxml
                | Keyword::Uses
                | Keyword::Grouping
        ),
        NodeKind::Leaf(_)
        | NodeKind::LeafList(_)
        | NodeKind::Anyxml(_)
        | NodeKind::Uses(_)
        | NodeKind::Augment(_) => false,
    }
}

pub(crate) fn node_typedefs(kind: &NodeKind) -> &[TypedefId] {
    match kind {
        NodeKind::Container(c) => &c.typedefs,
        NodeKind::List(l) => &l.typedefs,
        NodeKind::Grouping(g) => &g.typedefs,
        NodeKind::Rpc(r) => &r.typedefs,
        NodeKind::Input(io) | NodeKind::Output(io) => &io.typedefs,
        NodeKind::Notification(n) => &n.typedefs,
        _ => &[],
    }
}

fn node_has_typedefs(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Container(_)
            | NodeKind::List(_)
            | NodeKind::Grouping(_)
            | NodeKind::Rpc(_)
            | NodeKind::Input(_)
            | NodeKind::Output(_)
            | NodeKind::Notification(_)
    )
}

fn push_node_typedef(kind: &mut NodeKind, td: TypedefId) {
    match kind {
        NodeKind::Container(c) => c.typedefs.push(td),
        NodeKind::List(l) => l.typedefs.push(td),
        NodeKind::Grouping(g) => g.typedefs.push(td),
        NodeKind::Rpc(r) => r.typedefs.push(td),
        NodeKind::Input(io) | NodeKind::Output(io) => io.typedefs.push(td),
        NodeKind::Notification(n) => n.typedefs.push(td),
        _ => {}
    }
}

fn node_allows_when(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Container(_)
            | NodeKind::List(_)
            | NodeKind::Leaf(_)
            | NodeKind::LeafList(_)
            | NodeKind::Choice(_)
            | NodeKind::Case
            | NodeKind::Anyxml(_)
            | NodeKind::Uses(_)
            | NodeKind::Augment(_)
    )
}

fn node_allows_config(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Container(_)
            | NodeKind::List(_)
            | NodeKind::Leaf(_)
            | NodeKind::LeafList(_)
            | NodeKind::Choice(_)
            | NodeKind::Anyxml(_)
    )
}

fn node_allows_mandatory(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Leaf(_) | NodeKind::Choice(_) | NodeKind::Anyxml(_)
    )
}

fn require_arg(statement: &Statement) -> Result<&str> {
    match statement.arg.as_deref() {
        Some(arg) => Ok(arg),
        None => Err(Error::new(ErrorKind::InvalidValue {
            keyword: statement.keyword.as_str().to_string(),
            value: "<missing argument>".to_string(),
        })
        .with_loc(statement.loc)),
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, statement: &Statement) -> Result<()> {
    if slot.is_some() {
        return Err(duplicate(statement));
    }
    *slot = Some(value);
    Ok(())
}

fn duplicate(statement: &Statement) -> Error {
    Error::new(ErrorKind::DuplicateStatement {
        keyword: statement.keyword.as_str().to_string(),
    })
    .with_loc(statement.loc)
}

fn unexpected(statement: &Statement) -> Error {
    Error::new(ErrorKind::UnexpectedStatementInContext {
        keyword: statement.keyword.as_str().to_string(),
    })
    .with_loc(statement.loc)
}

fn missing(statement: &Statement, keyword: &str) -> Error {
    Error::new(ErrorKind::MissingRequiredChild {
        parent: statement.keyword.as_str().to_string(),
        keyword: keyword.to_string(),
    })
    .with_loc(statement.loc)
}

fn invalid(statement: &Statement) -> Error {
    Error::new(ErrorKind::InvalidValue {
        keyword: statement.keyword.as_str().to_string(),
        value: statement.arg.clone().unwrap_or_default(),
    })
    .with_loc(statement.loc)
}

fn parse_bool(statement: &Statement) -> Result<bool> {
    match require_arg(statement)? {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(statement)),
    }
}

fn parse_u32(statement: &Statement) -> Result<u32> {
    require_arg(statement)?
        .parse()
        .map_err(|_| invalid(statement))
}

fn parse_max_elements(statement: &Statement) -> Result<Option<u32>> {
    match require_arg(statement)? {
        "unbounded" => Ok(None),
        other => {
            let parsed: u32 = other.parse().map_err(|_| invalid(statement))?;
            if parsed == 0 {
                return Err(invalid(statement));
            }
            Ok(Some(parsed))
        }
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn is_revision_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit())
}
