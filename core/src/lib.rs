//! Schema types for declarative command-line interfaces.
//!
//! This crate defines the data-only description of a program's command
//! surface that `command-spec-compiler` turns into a working parser:
//!
//! - [`ParserSpec`]: the root, with program metadata, top-level options, groups,
//!   mutex groups, parent bundles, and the subcommand tree.
//! - [`OptionSpec`]: one flag declaration (positional name or switch
//!   aliases plus keyword arguments such as `action`, `type`, `nargs`).
//! - [`GroupSpec`] / [`MutexGroupSpec`]: named option buckets, the latter
//!   allowing at most one (or exactly one) member per invocation.
//! - [`ParentParserSpec`]: reusable option bundles inherited by commands.
//! - [`SubcommandsSpec`] / [`CommandSpec`]: one level of subcommands, each
//!   bound to a `module.symbol` manager reference.
//!
//! Schemas decode from JSON ([`ParserSpec::from_json_str`],
//! [`ParserSpec::load`]); every sequence field also accepts a JSON string
//! holding the array ([`SpecSeq`]). [`validate_schema`] reports structural
//! problems without compiling.
//!
//! # Example
//!
//! ```
//! use command_spec_core::*;
//!
//! let spec = ParserSpec::new("oil")
//!     .with_parent(
//!         ParentParserSpec::new("common")
//!             .with_option(OptionSpec::new(["--dry-run"]).with_action(ActionKind::StoreTrue)),
//!     )
//!     .with_subcommands(
//!         SubcommandsSpec::new("command").required().with_command(
//!             CommandSpec::new("init", "oil.handlers.init").with_parent("common"),
//!         ),
//!     );
//!
//! assert!(validate_schema(&spec).is_empty());
//! let json = serde_json::to_string(&spec).unwrap();
//! assert_eq!(ParserSpec::from_json_str(&json).unwrap(), spec);
//! ```

mod error;
mod input;
mod types;
mod validate;

pub use error::{Result, SchemaError};
pub use input::{SpecSeq, seq_or_json};
pub use types::*;
pub use validate::{split_manager, validate_schema};
