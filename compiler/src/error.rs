//! Error types for compilation, parsing, and handler dispatch.
//!
//! Compile-time failures ([`CompileError`]) abort building a parser. Parse
//! failures ([`ParseError`]) are the only class expected during normal use.
//! [`RegistryError`], [`ResolutionError`] and [`HandlerContractError`] signal
//! schema, deployment, or handler defects at invocation time.

use command_spec_core::SchemaError;
use thiserror::Error;

/// Failure to compile a schema into a parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Malformed schema structure.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A type descriptor is not in the type registry.
    #[error("option '{option}' has unknown type '{descriptor}'")]
    TypeResolution {
        /// The unresolved descriptor.
        descriptor: String,
        /// Destination of the option declaring it.
        option: String,
    },
}

/// Convenience alias for results with [`CompileError`].
pub type Result<T> = std::result::Result<T, CompileError>;

/// Category of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// `-h/--help` was requested; the message is the rendered help.
    DisplayHelp,
    /// A required option, positional, or mutex group was not supplied.
    MissingRequired,
    /// A required subcommand was not supplied.
    MissingSubcommand,
    /// Two members of a mutex group were supplied together.
    Conflict,
    /// A value failed type conversion or is not among the choices.
    InvalidValue,
    /// An unknown switch, extra positional, or unknown subcommand.
    UnknownArgument,
    /// Any other usage error.
    Usage,
}

/// User input does not match the compiled parser.
///
/// The message is the fully rendered usage error (or help text for
/// [`ParseErrorKind::DisplayHelp`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    kind: ParseErrorKind,
    message: String,
    exit_code: i32,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, message: String, exit_code: i32) -> Self {
        Self {
            kind,
            message,
            exit_code,
        }
    }

    /// Category of the failure.
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Rendered usage message or help text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Process exit status for this error: `0` for help display, `2` for
    /// usage errors.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns `true` if this is a help request rather than a failure.
    pub fn is_help(&self) -> bool {
        self.kind == ParseErrorKind::DisplayHelp
    }
}

/// Failed registry lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No binding is registered under the name.
    #[error("no command registered under '{0}'")]
    NotFound(String),
}

/// A manager binding could not be resolved to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The module path is not registered.
    #[error("module '{0}' is not registered")]
    ModuleNotFound(String),

    /// The module does not export the symbol.
    #[error("module '{module}' has no symbol '{symbol}'")]
    SymbolNotFound {
        /// Module that was searched.
        module: String,
        /// Missing symbol.
        symbol: String,
    },
}

/// Error value a handler may return instead of an exit status.
pub type HandlerFailure = Box<dyn std::error::Error + Send + Sync>;

/// A handler failed instead of returning an exit status.
#[derive(Debug, Error)]
#[error("handler '{binding}' failed: {failure}")]
pub struct HandlerContractError {
    /// The `module.symbol` binding that was invoked.
    pub binding: String,
    /// What the handler returned.
    pub failure: HandlerFailure,
}

/// Any failure of [`Client::execute`](crate::Client::execute).
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Arguments did not parse (or help was requested).
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The parse result names no command.
    #[error("no command selected (destination '{0}' is empty)")]
    NoCommand(String),

    /// The selected command has no binding.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The binding's module or symbol is missing.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The handler failed.
    #[error(transparent)]
    Handler(#[from] HandlerContractError),
}

impl ExecuteError {
    /// Process exit status for this failure.
    ///
    /// Parse errors keep their own status (help display is `0`); every other
    /// class maps to `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecuteError::Parse(err) => err.exit_code(),
            _ => 1,
        }
    }
}
