//! Subcommand tree builder.
//!
//! Each command gets its own parser: parent bundles are spliced in first (in
//! the order the command lists them), then the command's own options,
//! groups and mutex groups. Commands never share groups.

use std::collections::HashSet;

use command_spec_core::{CommandSpec, SchemaError, SubcommandsSpec};
use tracing::debug;

use crate::config::ConflictPolicy;
use crate::convert::TypeRegistry;
use crate::decl::{ParserDecl, SubcommandsDecl};
use crate::error::Result;
use crate::groups::{add_groups, add_mutex_groups};
use crate::options::add_options;
use crate::parents::ParentMap;
use crate::registry::{CommandRegistry, ManagerBinding};

/// Attaches the subcommand tree to `target` and returns the command
/// registry.
///
/// # Errors
///
/// Returns a [`SchemaError`] for nested trees, empty or duplicate command
/// names, unknown parents, missing or malformed manager references, and any
/// error of the command's options and groups.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::{build_subcommands, resolve_parents, ConflictPolicy, ParserDecl, TypeRegistry};
/// use command_spec_core::{CommandSpec, OptionSpec, ParentParserSpec, SubcommandsSpec};
///
/// let types = TypeRegistry::builtin();
/// let parents = resolve_parents(
///     vec![ParentParserSpec::new("common").with_option(OptionSpec::new(["--verbose"]))],
///     &types,
/// )
/// .unwrap();
///
/// let tree = SubcommandsSpec::new("command")
///     .with_command(CommandSpec::new("build", "tools.handlers.build").with_parent("common"));
/// let mut root = ParserDecl::new("tools");
/// let registry =
///     build_subcommands(&mut root, &tree, &parents, &types, ConflictPolicy::Override).unwrap();
///
/// assert_eq!(registry.lookup("build").unwrap().symbol(), "build");
/// let build = root.subcommands().unwrap().find("build").unwrap();
/// assert!(build.arg("verbose").is_some());
/// ```
pub fn build_subcommands(
    target: &mut ParserDecl,
    spec: &SubcommandsSpec,
    parents: &ParentMap,
    types: &TypeRegistry,
    conflicts: ConflictPolicy,
) -> Result<CommandRegistry> {
    if spec.subparsers.as_ref().is_some_and(|v| !v.is_null()) {
        return Err(SchemaError::NestedSubcommands(target.scope.clone()).into());
    }

    let mut registry = CommandRegistry::new();
    let mut tokens: HashSet<&str> = HashSet::new();
    let mut commands = Vec::with_capacity(spec.commands.len());

    for command in &spec.commands {
        let name = command.name.trim();
        if name.is_empty() {
            return Err(SchemaError::EmptyName {
                what: "command",
                scope: target.scope.clone(),
            }
            .into());
        }
        for token in std::iter::once(name).chain(command.aliases.iter().map(String::as_str)) {
            if !tokens.insert(token) {
                return Err(SchemaError::DuplicateCommand(token.to_string()).into());
            }
        }

        let (parser, binding) =
            compile_command(command, &target.scope, &spec.dest, parents, types, conflicts)?;
        debug!(
            command = name,
            %binding,
            options = parser.args().len(),
            "compiled command"
        );
        registry.insert(name, binding);
        commands.push(parser);
    }

    target.set_subcommands(SubcommandsDecl {
        dest: spec.dest.clone(),
        required: spec.required,
        title: spec.title.clone(),
        description: spec.description.clone(),
        help: spec.help.clone(),
        metavar: spec.metavar.clone(),
        commands,
    });
    Ok(registry)
}

fn compile_command(
    command: &CommandSpec,
    parent_scope: &str,
    tree_dest: &str,
    parents: &ParentMap,
    types: &TypeRegistry,
    conflicts: ConflictPolicy,
) -> Result<(ParserDecl, ManagerBinding)> {
    let name = command.name.trim();
    let mut parser = ParserDecl::command(name, parent_scope).with_conflict_policy(conflicts);
    if command.has_nested_subcommands() {
        return Err(SchemaError::NestedSubcommands(parser.scope.clone()).into());
    }

    parser.add_help = command.add_help;
    parser.about = command.help.clone();
    parser.long_about = command.description.clone();
    parser.aliases = command.aliases.clone();

    for parent in &command.parents {
        let bundle = parents.get(parent).ok_or_else(|| SchemaError::UnknownParent {
            parent: parent.clone(),
            command: name.to_string(),
        })?;
        parser.inherit(bundle)?;
    }

    add_options(&mut parser, &command.options, types)?;
    add_groups(&mut parser, &command.groups, types)?;
    add_mutex_groups(&mut parser, &command.mutually_exclusive_groups, types)?;
    parser.check_positionals()?;

    if parser.arg(tree_dest).is_some() {
        return Err(SchemaError::DuplicateFlag {
            flag: tree_dest.to_string(),
            scope: parser.scope.clone(),
        }
        .into());
    }

    let manager = command
        .manager
        .as_deref()
        .ok_or_else(|| SchemaError::MissingManager(name.to_string()))?;
    let binding = ManagerBinding::parse(manager).ok_or_else(|| SchemaError::InvalidManager {
        command: name.to_string(),
        manager: manager.to_string(),
    })?;

    Ok((parser, binding))
}
