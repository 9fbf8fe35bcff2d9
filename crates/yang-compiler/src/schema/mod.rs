//! The in-memory schema graph.
//!
//! A loaded module is a graph of [`SchemaNode`]s held in repository-wide
//! arenas; nodes refer to parents, siblings and resolution targets by stable
//! ids. Sibling lists are intrusive and doubly linked, with the first
//! sibling's `prev` pointing at the last so appending is O(1).

use bitflags::bitflags;

use crate::arena::Id;
use crate::dict::Sym;

pub(crate) mod build;
mod info;
mod serialize;
mod tree;

pub use serialize::SchemaOutputFormat;

/// Handle to a loaded (sub)module within its [`Context`](crate::Context).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ModuleId(pub(crate) u32);

pub type NodeId = Id<SchemaNode>;
pub type TypeId = Id<Type>;
pub type TypedefId = Id<Typedef>;
pub type IdentityId = Id<Identity>;

/// Schema input formats accepted by [`Context::parse_module`](crate::Context::parse_module).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaFormat {
    Yang,
    Yin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Current,
    Deprecated,
    Obsolete,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct NodeFlags: u16 {
        /// Effective `config` value; set means `config true`.
        const CONFIG = 0x0001;
        /// `config` was written on the node rather than inherited.
        const CONFIG_SET = 0x0002;
        const MANDATORY = 0x0004;
        /// Leaf is a list key.
        const KEY = 0x0008;
        /// `ordered-by user`.
        const USER_ORDERED = 0x0010;
        /// Node was unlinked by `deviate not-supported`.
        const DEVIATED_AWAY = 0x0020;
    }
}

bitflags! {
    /// NETCONF access-control annotations, inherited down the data tree.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct NacmFlags: u8 {
        const DEFAULT_DENY_WRITE = 0x01;
        const DEFAULT_DENY_ALL = 0x02;
    }
}

/// An `if-feature` reference: the name as written plus, once the resolver has
/// run, the feature it names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureRef {
    pub name: Sym,
    pub resolved: Option<(ModuleId, usize)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feature {
    pub name: Sym,
    pub enabled: bool,
    pub if_features: Vec<FeatureRef>,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportOrigin {
    /// Written in the module text.
    Local,
    /// Added when a foreign module deviated this one.
    ViaDeviation,
    /// Added when a foreign module augmented this one.
    ViaAugment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Import {
    pub name: Sym,
    pub prefix: Sym,
    pub revision: Option<Sym>,
    pub module: Option<ModuleId>,
    pub origin: ImportOrigin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Revision {
    pub date: Sym,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub module: ModuleId,
    pub name: Sym,
    pub base_arg: Option<Sym>,
    pub base: Option<IdentityId>,
    /// Identities directly derived from this one.
    pub derived: Vec<IdentityId>,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Typedef {
    pub module: ModuleId,
    pub name: Sym,
    pub ty: TypeId,
    pub units: Option<Sym>,
    pub default: Option<Sym>,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeBase {
    /// Named reference still awaiting resolution.
    Unknown,
    Binary,
    Bits,
    Boolean,
    Decimal64,
    Empty,
    Enumeration,
    Identityref,
    InstanceIdentifier,
    Int8,
    Int16,
    Int32,
    Int64,
    Leafref,
    String,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Union,
}

impl TypeBase {
    pub fn from_builtin(name: &str) -> Option<Self> {
        Some(match name {
            "binary" => Self::Binary,
            "bits" => Self::Bits,
            "boolean" => Self::Boolean,
            "decimal64" => Self::Decimal64,
            "empty" => Self::Empty,
            "enumeration" => Self::Enumeration,
            "identityref" => Self::Identityref,
            "instance-identifier" => Self::InstanceIdentifier,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "leafref" => Self::Leafref,
            "string" => Self::String,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "union" => Self::Union,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Binary => "binary",
            Self::Bits => "bits",
            Self::Boolean => "boolean",
            Self::Decimal64 => "decimal64",
            Self::Empty => "empty",
            Self::Enumeration => "enumeration",
            Self::Identityref => "identityref",
            Self::InstanceIdentifier => "instance-identifier",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Leafref => "leafref",
            Self::String => "string",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Union => "union",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Uint8
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
        )
    }
}

/// One bound of a range or length part; integer bounds cover the full
/// int64/uint64 span, decimal bounds serve `decimal64` ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RangeBound {
    Min,
    Max,
    Int(i128),
    Dec(f64),
}

/// A parsed `range` or `length` restriction.
#[derive(Clone, Debug, PartialEq)]
pub struct Restriction {
    /// The expression as written, for printing.
    pub arg: Sym,
    pub parts: Vec<(RangeBound, RangeBound)>,
    pub error_message: Option<Sym>,
    pub error_app_tag: Option<Sym>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    pub expr: Sym,
    pub error_message: Option<Sym>,
    pub error_app_tag: Option<Sym>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bit {
    pub name: Sym,
    pub position: u32,
    pub explicit: bool,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValue {
    pub name: Sym,
    pub value: i32,
    pub explicit: bool,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Type {
    pub module: ModuleId,
    /// The type name as written (`string`, `t:port-number`, …); `None` for
    /// types synthesized by expansion.
    pub name: Option<Sym>,
    /// Resolved base, following the derivation chain to a built-in.
    pub base: TypeBase,
    /// The typedef this type derives from, when the name is not a built-in.
    pub derived: Option<TypedefId>,
    pub spec: TypeSpec,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum TypeSpec {
    #[default]
    None,
    String {
        length: Option<Restriction>,
        patterns: Vec<Pattern>,
    },
    Binary {
        length: Option<Restriction>,
    },
    Number {
        range: Option<Restriction>,
    },
    Decimal64 {
        digits: u8,
        divisor: i64,
        range: Option<Restriction>,
    },
    Bits {
        bits: Vec<Bit>,
    },
    Enumeration {
        enums: Vec<EnumValue>,
    },
    Leafref {
        path: Sym,
        target: Option<NodeId>,
        require_instance: Option<bool>,
    },
    Identityref {
        base_arg: Sym,
        base: Option<IdentityId>,
    },
    InstanceIdentifier {
        require_instance: Option<bool>,
    },
    Union {
        types: Vec<TypeId>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Must {
    pub expr: Sym,
    pub error_message: Option<Sym>,
    pub error_app_tag: Option<Sym>,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
}

/// A `refine` carried by a `uses` statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Refine {
    pub target_arg: Sym,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
    pub default: Option<Sym>,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub presence: Option<Sym>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<Option<u32>>,
    pub musts: Vec<Must>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Container {
    pub presence: Option<Sym>,
    pub typedefs: Vec<TypedefId>,
    pub musts: Vec<Must>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Unique {
    /// The whitespace-separated descendant paths as written.
    pub arg: Sym,
    pub leaves: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct List {
    pub keys_arg: Option<Sym>,
    pub keys: Vec<NodeId>,
    pub uniques: Vec<Unique>,
    pub min_elements: u32,
    pub max_elements: Option<u32>,
    pub typedefs: Vec<TypedefId>,
    pub musts: Vec<Must>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub ty: TypeId,
    pub units: Option<Sym>,
    pub default: Option<Sym>,
    pub musts: Vec<Must>,
    /// Leafs whose leafref type targets this leaf.
    pub backlinks: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LeafList {
    pub ty: TypeId,
    pub units: Option<Sym>,
    pub musts: Vec<Must>,
    pub min_elements: u32,
    pub max_elements: Option<u32>,
    pub backlinks: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Choice {
    pub default_arg: Option<Sym>,
    pub default: Option<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Anyxml {
    pub musts: Vec<Must>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Uses {
    pub grouping_arg: Sym,
    pub grouping: Option<NodeId>,
    pub refines: Vec<Refine>,
    /// `augment` substatements, as augment nodes with relative targets.
    pub augments: Vec<NodeId>,
    pub expanded: bool,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Grouping {
    pub typedefs: Vec<TypedefId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Augment {
    pub target_arg: Sym,
    pub target: Option<NodeId>,
    /// Children spliced into the target, in splice order; used for printing
    /// and for teardown when the owning module goes away.
    pub applied: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Rpc {
    pub typedefs: Vec<TypedefId>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct RpcIo {
    pub typedefs: Vec<TypedefId>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Notification {
    pub typedefs: Vec<TypedefId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Container(Container),
    List(List),
    Leaf(Leaf),
    LeafList(LeafList),
    Choice(Choice),
    Case,
    Anyxml(Anyxml),
    Uses(Uses),
    Grouping(Grouping),
    Augment(Augment),
    Rpc(Rpc),
    Input(RpcIo),
    Output(RpcIo),
    Notification(Notification),
}

impl NodeKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            NodeKind::Container(_) => "container",
            NodeKind::List(_) => "list",
            NodeKind::Leaf(_) => "leaf",
            NodeKind::LeafList(_) => "leaf-list",
            NodeKind::Choice(_) => "choice",
            NodeKind::Case => "case",
            NodeKind::Anyxml(_) => "anyxml",
            NodeKind::Uses(_) => "uses",
            NodeKind::Grouping(_) => "grouping",
            NodeKind::Augment(_) => "augment",
            NodeKind::Rpc(_) => "rpc",
            NodeKind::Input(_) => "input",
            NodeKind::Output(_) => "output",
            NodeKind::Notification(_) => "notification",
        }
    }
}

/// One schema node: the common header plus the node-kind body.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaNode {
    pub name: Sym,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
    pub status: Status,
    pub flags: NodeFlags,
    pub nacm: NacmFlags,
    pub if_features: Vec<FeatureRef>,
    pub when: Option<Sym>,
    pub module: ModuleId,
    pub parent: Option<NodeId>,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub kind: NodeKind,
}

impl SchemaNode {
    /// Whether the node can appear in a data document. Groupings, uses,
    /// augments, choices and cases organize the schema but are invisible in
    /// instance data.
    pub fn is_data(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Container(_)
                | NodeKind::List(_)
                | NodeKind::Leaf(_)
                | NodeKind::LeafList(_)
                | NodeKind::Anyxml(_)
        )
    }

    /// Whether child lookup sees through this node: `uses` after expansion,
    /// and `choice`/`case` layers for data-path addressing.
    pub fn is_transparent(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Uses(_) | NodeKind::Choice(_) | NodeKind::Case
        )
    }

    pub fn config(&self) -> bool {
        self.flags.contains(NodeFlags::CONFIG)
    }

    pub fn mandatory(&self) -> bool {
        self.flags.contains(NodeFlags::MANDATORY)
    }

    pub fn type_id(&self) -> Option<TypeId> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf.ty),
            NodeKind::LeafList(leaf_list) => Some(leaf_list.ty),
            _ => None,
        }
    }
}

/// The per-deviation record of what was changed, making
/// [`Context::switch_deviations`](crate::Context::switch_deviations) its own
/// inverse.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviationSnapshot {
    /// `deviate not-supported`: the target is unlinked and parked here.
    Unlinked {
        node: NodeId,
        parent: Option<NodeId>,
        prev: Option<NodeId>,
    },
    /// The target as it was before the first property deviate; currently
    /// linked in, waiting to be removed again on the next switch.
    Linked {
        node: NodeId,
        parent: Option<NodeId>,
        prev: Option<NodeId>,
    },
    /// Shallow copy of the target's deviable properties.
    Properties {
        flags: NodeFlags,
        kind: Box<NodeKind>,
    },
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct DeviateProps {
    pub units: Option<Sym>,
    pub musts: Vec<Must>,
    pub uniques: Vec<Sym>,
    pub default: Option<Sym>,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
    pub min_elements: Option<u32>,
    pub max_elements: Option<Option<u32>>,
    pub ty: Option<TypeId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Deviate {
    NotSupported,
    Add(DeviateProps),
    Replace(DeviateProps),
    Delete(DeviateProps),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Deviation {
    pub target_arg: Sym,
    pub target: Option<NodeId>,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
    pub deviates: Vec<Deviate>,
    pub snapshot: Option<DeviationSnapshot>,
    /// Whether the transform is currently applied to the target.
    pub active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    Module,
    Submodule,
}

/// A loaded module or submodule.
#[derive(Debug)]
pub struct Module {
    pub name: Sym,
    pub prefix: Sym,
    /// `None` for submodules, which live in their owner's namespace.
    pub namespace: Option<Sym>,
    pub yang_version: Option<Sym>,
    pub organization: Option<Sym>,
    pub contact: Option<Sym>,
    pub description: Option<Sym>,
    pub reference: Option<Sym>,
    /// Most recent revision first, by `YYYY-MM-DD` string comparison.
    pub revisions: Vec<Revision>,
    pub imports: Vec<Import>,
    pub includes: Vec<ModuleId>,
    pub belongs_to: Option<ModuleId>,
    pub identities: Vec<IdentityId>,
    pub features: Vec<Feature>,
    pub typedefs: Vec<TypedefId>,
    /// Module-level augment nodes, kept for printing and teardown.
    pub augments: Vec<NodeId>,
    pub deviations: Vec<Deviation>,
    /// Head of the top-level data sibling chain.
    pub data: Option<NodeId>,
    pub kind: ModuleKind,
    pub implemented: bool,
    pub deviated: bool,
    /// Dict references acquired while building this module; released on
    /// destruction, one release per acquisition.
    pub(crate) strings: Vec<Sym>,
}

impl Module {
    pub fn revision(&self) -> Option<Sym> {
        self.revisions.first().map(|r| r.date)
    }

    pub fn is_submodule(&self) -> bool {
        self.kind == ModuleKind::Submodule
    }
}
