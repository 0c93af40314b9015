//! Structural schema errors.
//!
//! Every malformed-schema condition the compiler can detect maps to one
//! [`SchemaError`] variant. These are compile-time errors: they abort the
//! build of a parser and are never recovered.

use thiserror::Error;

/// Malformed schema structure.
///
/// The `scope` fields name the parser the problem was found in, as a
/// space-separated path (`"oil"` for the root, `"oil load"` for a command).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The schema (or a JSON-string sequence inside it) failed to decode.
    #[error("invalid schema JSON: {0}")]
    Decode(String),

    /// A schema file could not be read.
    #[error("failed to read schema '{path}': {message}")]
    Read {
        /// Path that was being read.
        path: String,
        /// Underlying I/O message.
        message: String,
    },

    /// A program, command, group, or parent name is empty.
    #[error("{what} name cannot be empty in {scope}")]
    EmptyName {
        /// Kind of thing that was unnamed (`"command"`, `"group"`, ...).
        what: &'static str,
        /// Parser the empty name was found in.
        scope: String,
    },

    /// An option declares no flags at all.
    #[error("option in {scope} declares no flags")]
    EmptyFlags {
        /// Parser the option belongs to.
        scope: String,
    },

    /// A flag string is neither a positional name nor a valid switch.
    #[error("invalid flag format: {0}")]
    InvalidFlag(String),

    /// An option mixes a positional name with switches, or lists several
    /// positional names.
    #[error("option mixes positional and switch forms: {0}")]
    MixedFlagShapes(String),

    /// Two declared options in the same parser share a switch or destination.
    #[error("duplicate flag '{flag}' in {scope}")]
    DuplicateFlag {
        /// The colliding switch or destination.
        flag: String,
        /// Parser the collision was found in.
        scope: String,
    },

    /// An option collides with a flag inherited from a parent bundle while
    /// inherited overrides are disabled.
    #[error("flag '{flag}' in {scope} collides with parent '{parent}'")]
    InheritedConflict {
        /// The colliding switch or destination.
        flag: String,
        /// Parent bundle that introduced the flag first.
        parent: String,
        /// Parser the collision was found in.
        scope: String,
    },

    /// A switch is reserved by the parser's built-in help flag.
    #[error("flag '{flag}' in {scope} conflicts with the help flag")]
    ReservedFlag {
        /// The reserved switch.
        flag: String,
        /// Parser the collision was found in.
        scope: String,
    },

    /// Two groups (or two mutex groups) in the same parser share a title.
    #[error("duplicate group title '{title}' in {scope}")]
    DuplicateGroup {
        /// The repeated title.
        title: String,
        /// Parser the groups belong to.
        scope: String,
    },

    /// A group title is also used as an argument destination.
    #[error("group title '{title}' in {scope} is also an argument destination")]
    GroupNameConflict {
        /// The clashing title.
        title: String,
        /// Parser the group belongs to.
        scope: String,
    },

    /// Two parent bundles share a `prog` name.
    #[error("duplicate parent parser: {0}")]
    DuplicateParent(String),

    /// A parent bundle asks for its own help flag.
    #[error("parent parser '{0}' cannot add a help flag")]
    ParentWithHelp(String),

    /// A command references a parent bundle that was never declared.
    #[error("command '{command}' references unknown parent '{parent}'")]
    UnknownParent {
        /// The missing parent name.
        parent: String,
        /// Command that referenced it.
        command: String,
    },

    /// Two commands (or a command and an alias) share a name.
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),

    /// A command has no manager reference.
    #[error("command '{0}' has no manager")]
    MissingManager(String),

    /// A manager reference has no `module.symbol` separator.
    #[error("command '{command}' has invalid manager '{manager}': expected 'module.symbol'")]
    InvalidManager {
        /// Command declaring the manager.
        command: String,
        /// The offending reference.
        manager: String,
    },

    /// A subcommand tree was nested inside another one.
    #[error("nested subcommands are not supported (found under {0})")]
    NestedSubcommands(String),

    /// An option combines keyword arguments that cannot work together.
    #[error("option '{option}' in {scope}: {reason}")]
    IncompatibleOption {
        /// Destination of the option.
        option: String,
        /// Parser the option belongs to.
        scope: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Positional arguments are declared in an order the parser cannot match.
    #[error("positional '{name}' in {scope}: {reason}")]
    PositionalOrder {
        /// Destination of the offending positional.
        name: String,
        /// Parser the positional belongs to.
        scope: String,
        /// What is wrong with the ordering.
        reason: String,
    },

    /// A default or choice value does not convert through the option's type.
    #[error("option '{option}' has invalid {what} {value}: {reason}")]
    InvalidValue {
        /// Destination of the option.
        option: String,
        /// `"default"` or `"choice"`.
        what: &'static str,
        /// The value as written in the schema.
        value: String,
        /// Conversion failure message.
        reason: String,
    },
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Decode(err.to_string())
    }
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
