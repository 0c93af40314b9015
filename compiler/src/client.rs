//! Parse-and-dispatch entry point.

use command_spec_core::DEFAULT_COMMAND_DEST;
use tracing::debug;

use crate::compiler::Compiled;
use crate::error::ExecuteError;
use crate::parsed::ParsedArgs;
use crate::parser::CompiledParser;
use crate::registry::{CommandRegistry, ModuleTable, invoke};

/// Runs a compiled schema against command-line tokens.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::{Client, Compiler, Module, ModuleTable};
///
/// let compiled = Compiler::new()
///     .compile_json(r#"{"prog": "tool", "subparsers": {"required": true, "commands": [
///         {"name": "greet", "manager": "tool.cmds.greet",
///          "options": [{"flag": ["--times"], "type": "int", "default": 1}]}
///     ]}}"#)
///     .unwrap();
///
/// let mut modules = ModuleTable::new();
/// modules.register("tool.cmds", || {
///     Module::new().with("greet", |args| Ok(args.get_i64("times").unwrap_or(0) as i32))
/// });
///
/// let client = Client::new(compiled, modules);
/// assert_eq!(client.execute(["greet", "--times", "3"]).unwrap(), 3);
/// ```
#[derive(Debug)]
pub struct Client {
    parser: CompiledParser,
    registry: CommandRegistry,
    modules: ModuleTable,
}

impl Client {
    /// Wraps a compiled schema and the modules its managers live in.
    pub fn new(compiled: Compiled, modules: ModuleTable) -> Self {
        Self {
            parser: compiled.parser,
            registry: compiled.registry,
            modules,
        }
    }

    /// The compiled parser.
    pub fn parser(&self) -> &CompiledParser {
        &self.parser
    }

    /// The command registry.
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Parses `tokens`, dispatches to the selected command's handler, and
    /// returns its exit status.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError`] when parsing fails (including help display),
    /// no command was selected, or the handler cannot be found or fails.
    pub fn execute<I, T>(&self, tokens: I) -> Result<i32, ExecuteError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let args = self.parser.parse(tokens)?;
        self.dispatch(&args)
    }

    /// Dispatches an already-parsed result.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn dispatch(&self, args: &ParsedArgs) -> Result<i32, ExecuteError> {
        let dest = self.parser.subcommand_dest().unwrap_or(DEFAULT_COMMAND_DEST);
        let name = args
            .command(dest)
            .ok_or_else(|| ExecuteError::NoCommand(dest.to_string()))?;

        let binding = self.registry.lookup(name)?;
        let handler = self.modules.resolve(binding)?;
        let status = invoke(&handler, binding, args)?;
        debug!(command = name, status, "command finished");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::error::{ParseErrorKind, RegistryError, ResolutionError};
    use crate::registry::Module;

    const SCHEMA: &str = r#"{
        "prog": "tool",
        "subparsers": {"commands": [
            {"name": "a", "manager": "pkg.mod.handle_a"},
            {"name": "b", "manager": "pkg.mod.handle_b"},
            {"name": "c", "manager": "pkg.other.handle_c"}
        ]}
    }"#;

    fn client() -> Client {
        let compiled = Compiler::new().compile_json(SCHEMA).unwrap();
        let mut modules = ModuleTable::new();
        modules.register("pkg.mod", || {
            Module::new()
                .with("handle_a", |_| Ok(0))
                .with("handle_b", |_| Err("boom".into()))
        });
        Client::new(compiled, modules)
    }

    #[test]
    fn test_execute_returns_handler_status() {
        assert_eq!(client().execute(["a"]).unwrap(), 0);
    }

    #[test]
    fn test_handler_failure_is_contract_error() {
        let err = client().execute(["b"]).unwrap_err();
        assert!(matches!(err, ExecuteError::Handler(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_module_is_resolution_error() {
        let err = client().execute(["c"]).unwrap_err();
        assert!(matches!(
            err,
            ExecuteError::Resolution(ResolutionError::ModuleNotFound(ref module)) if module == "pkg.other"
        ));
    }

    #[test]
    fn test_optional_tree_without_command() {
        let err = client().execute(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, ExecuteError::NoCommand(ref dest) if dest == "command"));
    }

    #[test]
    fn test_parse_errors_keep_their_exit_code() {
        let err = client().execute(["zzz"]).unwrap_err();
        match &err {
            ExecuteError::Parse(parse) => assert_eq!(parse.kind(), ParseErrorKind::UnknownArgument),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert_eq!(err.exit_code(), 2);

        let help = client().execute(["--help"]).unwrap_err();
        assert_eq!(help.exit_code(), 0);
    }

    #[test]
    fn test_dispatch_unregistered_name() {
        let args: ParsedArgs = [("command", serde_json::json!("ghost"))].into_iter().collect();
        let err = client().dispatch(&args).unwrap_err();
        assert!(matches!(
            err,
            ExecuteError::Registry(RegistryError::NotFound(ref name)) if name == "ghost"
        ));
    }
}
