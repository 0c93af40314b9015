//! Compiles declarative command schemas into working command-line parsers.
//!
//! A [`ParserSpec`](command_spec_core::ParserSpec) describes a program's
//! options, groups, mutually-exclusive sets, reusable parent bundles and one
//! level of subcommands. [`Compiler::compile`] turns it into a
//! [`CompiledParser`] plus a [`CommandRegistry`] mapping each command to the
//! `module.symbol` of its handler. [`Client`] ties the two together: parse,
//! look up the selected command, resolve its handler lazily from a
//! [`ModuleTable`], invoke it, and return its exit status.
//!
//! The builders ([`add_option`], [`add_groups`], [`add_mutex_groups`],
//! [`resolve_parents`], [`build_subcommands`]) populate a backend-neutral
//! [`ParserDecl`] through the [`ArgumentTarget`] capability; clap is only
//! used to match tokens against the finished declaration.
//!
//! # Example
//!
//! ```
//! use command_spec_compiler::{Compiler, ParseErrorKind};
//!
//! let compiled = Compiler::new()
//!     .compile_json(r#"{
//!         "prog": "tool",
//!         "subparsers": {"required": true, "commands": [{
//!             "name": "pick",
//!             "manager": "tool.cmds.pick",
//!             "mutually_exclusive_groups": [{"title": "which", "required": true, "options": [
//!                 {"flag": ["-f"], "action": "store_true"},
//!                 {"flag": ["-g"], "action": "store_true"}
//!             ]}]
//!         }]}
//!     }"#)
//!     .unwrap();
//!
//! let parser = &compiled.parser;
//! assert_eq!(parser.parse(["pick", "-f"]).unwrap().get_bool("f"), Some(true));
//! assert_eq!(
//!     parser.parse(["pick", "-f", "-g"]).unwrap_err().kind(),
//!     ParseErrorKind::Conflict
//! );
//! assert_eq!(
//!     parser.parse(["pick"]).unwrap_err().kind(),
//!     ParseErrorKind::MissingRequired
//! );
//! ```

mod backend;
mod client;
mod compiler;
mod config;
mod convert;
mod decl;
mod error;
mod groups;
mod options;
mod parents;
mod parsed;
mod parser;
mod registry;
mod subcommands;

pub use client::Client;
pub use compiler::{Compiled, Compiler};
pub use config::{CompilerConfig, ConfigError, ConflictPolicy, TopLevelOptions};
pub use convert::{Converter, TypeRegistry};
pub use decl::{
    ArgDecl, ArgNames, ArgOrigin, ArgumentTarget, GroupDecl, GroupTarget, MutexGroupDecl,
    MutexTarget, ParserDecl, SubcommandsDecl,
};
pub use error::{
    CompileError, ExecuteError, HandlerContractError, HandlerFailure, ParseError, ParseErrorKind,
    RegistryError, ResolutionError, Result,
};
pub use groups::{add_groups, add_mutex_groups};
pub use options::{add_option, add_options};
pub use parents::{ParentMap, resolve_parents};
pub use parsed::ParsedArgs;
pub use parser::CompiledParser;
pub use registry::{CommandRegistry, Handler, ManagerBinding, Module, ModuleTable, invoke};
pub use subcommands::build_subcommands;
