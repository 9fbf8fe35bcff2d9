//! A loader, linker and validator for YANG (RFC 6020) schemas and the data
//! documents that conform to them.
//!
//! The [`Context`] is the repository of loaded modules: it owns the string
//! pool, the schema arenas and the registry. Loading a module parses its
//! text (YANG or YIN), drains the queue of forward references to a fixed
//! point, applies `uses`/`augment`/`deviation` rewriting, and registers the
//! sealed result; any failure rolls the repository back.
//!
//! ## Example
//!
//! ```rust
//! use yang_compiler::{Context, SchemaFormat, SchemaOutputFormat};
//!
//! let input = r#"
//! module system {
//!   namespace "urn:example:system";
//!   prefix sys;
//!
//!   container system {
//!     leaf hostname { type string; }
//!   }
//! }
//! "#;
//!
//! let mut ctx = Context::new();
//! let module = ctx.parse_module(input, SchemaFormat::Yang).unwrap();
//!
//! assert_eq!(ctx.str(ctx.module(module).name), "system");
//! let tree = ctx.print_module(module, SchemaOutputFormat::Tree);
//! assert!(tree.contains("+--rw hostname?   string"));
//! ```

mod arena;
mod context;
pub mod data;
mod dict;
pub mod diagnostic;
mod error;
mod path;
mod resolver;
mod rewrite;
pub mod schema;
mod value;

pub use crate::arena::Id;
pub use crate::context::{Context, ModuleCallback};
pub use crate::data::{DataNode, DataPrintOptions, DataTree};
pub use crate::dict::Sym;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::schema::build::check_id;
pub use crate::schema::{
    Module, ModuleId, NodeId, NodeKind, SchemaFormat, SchemaNode, SchemaOutputFormat,
};
