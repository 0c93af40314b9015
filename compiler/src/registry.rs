//! Command registry and lazy handler resolution.
//!
//! Compiling a schema records, per command, a [`ManagerBinding`]: the module
//! path and symbol of its handler. Nothing is resolved at that point. A
//! [`ModuleTable`] maps module paths to loaders; a module's loader runs the
//! first time one of its symbols is resolved, and the loaded module is cached
//! for later resolutions.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use command_spec_core::split_manager;
use serde::Serialize;
use tracing::debug;

use crate::error::{HandlerContractError, HandlerFailure, RegistryError, ResolutionError};
use crate::parsed::ParsedArgs;

/// Module path and symbol of a command handler.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::ManagerBinding;
///
/// let binding = ManagerBinding::parse("oil.handlers.load").unwrap();
/// assert_eq!(binding.module(), "oil.handlers");
/// assert_eq!(binding.symbol(), "load");
/// assert_eq!(binding.to_string(), "oil.handlers.load");
/// assert!(ManagerBinding::parse("load").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ManagerBinding {
    module: String,
    symbol: String,
}

impl ManagerBinding {
    /// Creates a binding from its parts.
    pub fn new(module: &str, symbol: &str) -> Self {
        Self {
            module: module.to_string(),
            symbol: symbol.to_string(),
        }
    }

    /// Splits a `module.path.symbol` reference on its final separator.
    pub fn parse(reference: &str) -> Option<Self> {
        split_manager(reference).map(|(module, symbol)| Self::new(module, symbol))
    }

    /// Module path.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Symbol within the module.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl fmt::Display for ManagerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.symbol)
    }
}

/// Command name to handler binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandRegistry {
    bindings: BTreeMap<String, ManagerBinding>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &str, binding: ManagerBinding) {
        self.bindings.insert(name.to_string(), binding);
    }

    /// Looks up the binding of a command.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no command of that name was
    /// compiled.
    pub fn lookup(&self, name: &str) -> Result<&ManagerBinding, RegistryError> {
        self.bindings
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Number of bound commands.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no command is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings ordered by command name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManagerBinding)> {
        self.bindings.iter().map(|(name, binding)| (name.as_str(), binding))
    }
}

/// A resolved command handler.
///
/// Receives the structured parse result and returns the process exit status.
pub type Handler = Arc<dyn Fn(&ParsedArgs) -> Result<i32, HandlerFailure> + Send + Sync>;

/// A loaded module: named handlers.
#[derive(Clone, Default)]
pub struct Module {
    symbols: HashMap<String, Handler>,
}

impl Module {
    /// Creates an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports a handler under `symbol`, builder style.
    pub fn with<F>(mut self, symbol: &str, handler: F) -> Self
    where
        F: Fn(&ParsedArgs) -> Result<i32, HandlerFailure> + Send + Sync + 'static,
    {
        self.symbols.insert(symbol.to_string(), Arc::new(handler));
        self
    }

    /// Looks up an exported handler.
    pub fn get(&self, symbol: &str) -> Option<Handler> {
        self.symbols.get(symbol).cloned()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut symbols: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        f.debug_struct("Module").field("symbols", &symbols).finish()
    }
}

type Loader = Box<dyn Fn() -> Module + Send + Sync>;

struct ModuleSlot {
    loader: Loader,
    loaded: OnceLock<Module>,
}

/// Module paths available to handler resolution.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::{ManagerBinding, Module, ModuleTable};
///
/// let mut modules = ModuleTable::new();
/// modules.register("oil.handlers", || Module::new().with("init", |_| Ok(0)));
/// assert!(!modules.is_loaded("oil.handlers"));
///
/// let handler = modules.resolve(&ManagerBinding::new("oil.handlers", "init")).unwrap();
/// assert!(modules.is_loaded("oil.handlers"));
/// assert!(modules.resolve(&ManagerBinding::new("oil.handlers", "drop")).is_err());
/// # let _ = handler;
/// ```
#[derive(Default)]
pub struct ModuleTable {
    modules: HashMap<String, ModuleSlot>,
}

impl ModuleTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module whose contents are produced by `loader` on first
    /// use. Re-registering a path replaces it.
    pub fn register<F>(&mut self, path: &str, loader: F) -> &mut Self
    where
        F: Fn() -> Module + Send + Sync + 'static,
    {
        self.modules.insert(
            path.to_string(),
            ModuleSlot {
                loader: Box::new(loader),
                loaded: OnceLock::new(),
            },
        );
        self
    }

    /// Registers an already-built module.
    pub fn register_module(&mut self, path: &str, module: Module) -> &mut Self {
        let loaded = OnceLock::new();
        let _ = loaded.set(module);
        self.modules.insert(
            path.to_string(),
            ModuleSlot {
                loader: Box::new(Module::new),
                loaded,
            },
        );
        self
    }

    /// Returns `true` once the module at `path` has been loaded.
    pub fn is_loaded(&self, path: &str) -> bool {
        self.modules
            .get(path)
            .is_some_and(|slot| slot.loaded.get().is_some())
    }

    /// Resolves a binding to its handler, loading the module if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::ModuleNotFound`] for an unregistered module
    /// path, or [`ResolutionError::SymbolNotFound`] when the loaded module
    /// does not export the symbol.
    pub fn resolve(&self, binding: &ManagerBinding) -> Result<Handler, ResolutionError> {
        let slot = self
            .modules
            .get(binding.module())
            .ok_or_else(|| ResolutionError::ModuleNotFound(binding.module().to_string()))?;
        let module = slot.loaded.get_or_init(|| {
            debug!(module = binding.module(), "loading handler module");
            (slot.loader)()
        });
        module
            .get(binding.symbol())
            .ok_or_else(|| ResolutionError::SymbolNotFound {
                module: binding.module().to_string(),
                symbol: binding.symbol().to_string(),
            })
    }
}

impl fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        paths.sort_unstable();
        f.debug_struct("ModuleTable").field("modules", &paths).finish()
    }
}

/// Calls a handler with the parse result and returns its exit status.
///
/// # Errors
///
/// Returns [`HandlerContractError`] when the handler fails instead of
/// returning a status.
pub fn invoke(
    handler: &Handler,
    binding: &ManagerBinding,
    args: &ParsedArgs,
) -> Result<i32, HandlerContractError> {
    debug!(%binding, "invoking handler");
    handler(args).map_err(|failure| HandlerContractError {
        binding: binding.to_string(),
        failure,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn handler<F>(f: F) -> Handler
    where
        F: Fn(&ParsedArgs) -> Result<i32, HandlerFailure> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    #[test]
    fn test_lookup_known_and_unknown() {
        let mut registry = CommandRegistry::new();
        registry.insert("a", ManagerBinding::new("pkg.mod", "handle_a"));
        registry.insert("b", ManagerBinding::new("pkg.mod", "handle_b"));

        assert_eq!(registry.lookup("a").unwrap(), &ManagerBinding::new("pkg.mod", "handle_a"));
        assert_eq!(registry.lookup("b").unwrap().symbol(), "handle_b");
        assert_eq!(
            registry.lookup("c").unwrap_err(),
            RegistryError::NotFound("c".to_string())
        );
    }

    #[test]
    fn test_registry_serializes_as_map() {
        let mut registry = CommandRegistry::new();
        registry.insert("init", ManagerBinding::new("oil.handlers", "init"));
        assert_eq!(
            serde_json::to_value(&registry).unwrap(),
            serde_json::json!({"init": {"module": "oil.handlers", "symbol": "init"}})
        );
    }

    #[test]
    fn test_loader_runs_once_on_first_resolve() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let mut modules = ModuleTable::new();
        modules.register("heavy.mod", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Module::new().with("run", |_| Ok(0))
        });
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        let binding = ManagerBinding::new("heavy.mod", "run");
        modules.resolve(&binding).unwrap();
        modules.resolve(&binding).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_reports_missing_module_and_symbol() {
        let mut modules = ModuleTable::new();
        modules.register_module("pkg.mod", Module::new().with("handle_a", |_| Ok(0)));

        assert_eq!(
            modules.resolve(&ManagerBinding::new("pkg.other", "x")).map(|_| ()).unwrap_err(),
            ResolutionError::ModuleNotFound("pkg.other".to_string())
        );
        assert_eq!(
            modules.resolve(&ManagerBinding::new("pkg.mod", "handle_b")).map(|_| ()).unwrap_err(),
            ResolutionError::SymbolNotFound {
                module: "pkg.mod".to_string(),
                symbol: "handle_b".to_string(),
            }
        );
    }

    #[test]
    fn test_invoke_returns_status_verbatim() {
        let binding = ManagerBinding::new("pkg.mod", "status");
        let handler = handler(|_| Ok(3));
        assert_eq!(invoke(&handler, &binding, &ParsedArgs::default()).unwrap(), 3);
    }

    #[test]
    fn test_invoke_wraps_handler_failure() {
        let binding = ManagerBinding::new("pkg.mod", "broken");
        let handler = handler(|_| Err("database is locked".into()));
        let err = invoke(&handler, &binding, &ParsedArgs::default()).unwrap_err();
        assert_eq!(err.binding, "pkg.mod.broken");
        assert_eq!(err.to_string(), "handler 'pkg.mod.broken' failed: database is locked");
    }
}
