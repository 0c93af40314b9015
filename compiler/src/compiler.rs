//! Top-level compiler.

use std::path::Path;

use command_spec_core::{ParserSpec, SchemaError};
use tracing::{debug, warn};

use crate::config::{CompilerConfig, TopLevelOptions};
use crate::convert::TypeRegistry;
use crate::decl::ParserDecl;
use crate::error::Result;
use crate::groups::{add_groups, add_mutex_groups};
use crate::options::add_options;
use crate::parents::resolve_parents;
use crate::parser::CompiledParser;
use crate::registry::CommandRegistry;
use crate::subcommands::build_subcommands;

/// A compiled parser and the handler bindings of its commands.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// The parser.
    pub parser: CompiledParser,
    /// Command name to handler binding.
    pub registry: CommandRegistry,
}

/// Compiles schemas into parsers.
///
/// Compilation is pure: the same schema compiled twice yields parsers that
/// accept and reject the same inputs.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::Compiler;
///
/// let compiled = Compiler::new()
///     .compile_json(r#"{
///         "prog": "tools",
///         "parent_parsers": [{"prog": "common", "options": [
///             {"flag": ["--verbose"], "action": "store_true"}
///         ]}],
///         "subparsers": {"required": true, "commands": [{
///             "name": "build",
///             "parents": ["common"],
///             "manager": "tools.handlers.build",
///             "options": [{"flag": ["--target"], "default": "release"}]
///         }]}
///     }"#)
///     .unwrap();
///
/// let args = compiled.parser.parse(["build"]).unwrap();
/// assert_eq!(args.get_str("target"), Some("release"));
/// assert_eq!(args.get_bool("verbose"), Some(false));
/// assert_eq!(args.command("command"), Some("build"));
/// assert_eq!(compiled.registry.lookup("build").unwrap().to_string(), "tools.handlers.build");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    types: TypeRegistry,
    config: CompilerConfig,
}

impl Compiler {
    /// Compiler with the built-in types and default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the type registry.
    pub fn with_types(mut self, types: TypeRegistry) -> Self {
        self.types = types;
        self
    }

    /// Replaces the policy configuration.
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Type registry used to resolve `type` descriptors.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Mutable access for registering converters.
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// Policy configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles a schema.
    ///
    /// Steps run in a fixed order: parent bundles, the subcommand tree (and
    /// its registry), then top-level options, groups and mutex groups.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompileError`](crate::CompileError) encountered.
    pub fn compile(&self, spec: &ParserSpec) -> Result<Compiled> {
        let prog = spec.prog.trim();
        if prog.is_empty() {
            return Err(SchemaError::EmptyName {
                what: "program",
                scope: "<root>".to_string(),
            }
            .into());
        }

        let conflicts = self.config.inherited_conflicts;
        let parents = resolve_parents(&spec.parent_parsers, &self.types)?;

        let mut root = ParserDecl::new(prog).with_conflict_policy(conflicts);
        root.add_help = spec.add_help;
        root.about = spec.description.clone();
        root.epilog = spec.epilog.clone();

        let registry = match &spec.subparsers {
            Some(tree) => build_subcommands(&mut root, tree, &parents, &self.types, conflicts)?,
            None => CommandRegistry::new(),
        };

        let tree_required = spec.subparsers.as_ref().is_some_and(|tree| tree.required);
        let has_top_level = !spec.options.is_empty()
            || !spec.groups.is_empty()
            || !spec.mutually_exclusive_groups.is_empty();

        if tree_required && self.config.top_level_options == TopLevelOptions::SuppressWhenRequired {
            if has_top_level {
                warn!(
                    prog,
                    options = spec.options.len(),
                    groups = spec.groups.len(),
                    mutex_groups = spec.mutually_exclusive_groups.len(),
                    "subcommand is required; ignoring top-level options"
                );
            }
        } else {
            add_options(&mut root, &spec.options, &self.types)?;
            add_groups(&mut root, &spec.groups, &self.types)?;
            add_mutex_groups(&mut root, &spec.mutually_exclusive_groups, &self.types)?;
        }
        root.check_positionals()?;

        debug!(
            prog,
            parents = parents.len(),
            commands = registry.len(),
            options = root.args().len(),
            "compiled parser"
        );

        let parent_names = spec
            .parent_parsers
            .iter()
            .map(|parent| parent.prog.trim().to_string())
            .collect();
        let parser = CompiledParser::new(root, parent_names);
        Ok(Compiled { parser, registry })
    }

    /// Decodes and compiles a JSON schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Decode`] (wrapped) for malformed JSON, then any
    /// compile error.
    pub fn compile_json(&self, raw: &str) -> Result<Compiled> {
        let spec = ParserSpec::from_json_str(raw)?;
        self.compile(&spec)
    }

    /// Loads and compiles a JSON schema file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Read`] (wrapped) if the file cannot be read,
    /// then any decode or compile error.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<Compiled> {
        let spec = ParserSpec::load(path)?;
        self.compile(&spec)
    }
}

#[cfg(test)]
mod tests {
    use command_spec_core::{
        ActionKind, CommandSpec, MutexGroupSpec, OptionSpec, SubcommandsSpec,
    };

    use super::*;
    use crate::error::{CompileError, ParseErrorKind};

    fn spec_with_required_tree() -> ParserSpec {
        ParserSpec::new("tool")
            .with_option(OptionSpec::new(["-x"]))
            .with_mutex_group(
                MutexGroupSpec::new("mode")
                    .with_option(OptionSpec::new(["-n"]))
                    .with_option(OptionSpec::new(["-m"]).with_action(ActionKind::StoreTrue)),
            )
            .with_subcommands(
                SubcommandsSpec::new("command")
                    .required()
                    .with_command(CommandSpec::new("run", "tool.run")),
            )
    }

    #[test]
    fn test_top_level_options_coexist_with_required_tree() {
        let compiled = Compiler::new().compile(&spec_with_required_tree()).unwrap();
        let args = compiled.parser.parse(["-x", "1", "run"]).unwrap();
        assert_eq!(args.get_str("x"), Some("1"));
        assert_eq!(args.command("command"), Some("run"));
        assert_eq!(compiled.parser.mutex_groups(), vec!["mode"]);
    }

    #[test]
    fn test_legacy_policy_suppresses_top_level_options() {
        let config = CompilerConfig {
            top_level_options: TopLevelOptions::SuppressWhenRequired,
            ..CompilerConfig::default()
        };
        let compiled = Compiler::new()
            .with_config(config)
            .compile(&spec_with_required_tree())
            .unwrap();
        assert!(compiled.parser.decl().args().is_empty());
        assert!(compiled.parser.mutex_groups().is_empty());

        let err = compiled.parser.parse(["-x", "1", "run"]).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::UnknownArgument);
    }

    #[test]
    fn test_without_tree_only_top_level_applies() {
        let spec = ParserSpec::new("tool").with_option(OptionSpec::new(["-x"]));
        let compiled = Compiler::new().compile(&spec).unwrap();
        assert!(compiled.registry.is_empty());
        assert_eq!(compiled.parser.subcommand_dest(), None);
        let args = compiled.parser.parse(Vec::<String>::new()).unwrap();
        assert_eq!(args.len(), 1);
        assert!(!args.contains("command"));
    }

    #[test]
    fn test_empty_program_name_is_rejected() {
        assert!(matches!(
            Compiler::new().compile(&ParserSpec::new("  ")),
            Err(CompileError::Schema(SchemaError::EmptyName { what: "program", .. }))
        ));
    }

    #[test]
    fn test_custom_type_registry() {
        let spec = ParserSpec::new("tool").with_option(OptionSpec::new(["--port"]).with_type("int"));
        let err = Compiler::new()
            .with_types(TypeRegistry::empty())
            .compile(&spec)
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::TypeResolution {
                descriptor: "int".to_string(),
                option: "port".to_string(),
            }
        );
    }

    #[test]
    fn test_root_option_cannot_shadow_tree_dest() {
        let spec = ParserSpec::new("tool")
            .with_option(OptionSpec::new(["--command"]))
            .with_subcommands(
                SubcommandsSpec::new("command").with_command(CommandSpec::new("run", "tool.run")),
            );
        assert!(matches!(
            Compiler::new().compile(&spec),
            Err(CompileError::Schema(SchemaError::DuplicateFlag { .. }))
        ));
    }
}
