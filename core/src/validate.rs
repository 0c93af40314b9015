//! Whole-schema validation.
//!
//! Walks a [`ParserSpec`] and collects every structural problem the compiler
//! would stop at, without building a parser: flag shapes, duplicate flags,
//! titles, commands and parents, unknown parent references, missing or
//! malformed manager references, and nested subcommand trees.
//!
//! The compiler performs the same checks as it goes and stops at the first
//! failure; this pass reports all of them at once.
//!
//! # Examples
//!
//! ```
//! use command_spec_core::*;
//!
//! let spec = ParserSpec::new("tool").with_subcommands(
//!     SubcommandsSpec::new("command")
//!         .with_command(CommandSpec::new("run", "tool.handlers.run")),
//! );
//! assert!(validate_schema(&spec).is_empty());
//!
//! // Manager reference without a module separator
//! let bad = ParserSpec::new("tool").with_subcommands(
//!     SubcommandsSpec::new("command").with_command(CommandSpec::new("run", "run")),
//! );
//! let errors = validate_schema(&bad);
//! assert!(matches!(errors[0], SchemaError::InvalidManager { .. }));
//! ```

use std::collections::HashSet;

use crate::error::SchemaError;
use crate::types::{FlagShape, GroupSpec, MutexGroupSpec, OptionSpec, ParserSpec};

/// Splits a `module.path.symbol` reference on its final separator.
///
/// Returns `None` when there is no separator or either side is empty.
///
/// # Examples
///
/// ```
/// use command_spec_core::split_manager;
///
/// assert_eq!(split_manager("pkg.mod.handle_a"), Some(("pkg.mod", "handle_a")));
/// assert_eq!(split_manager("handle_a"), None);
/// assert_eq!(split_manager("pkg."), None);
/// ```
pub fn split_manager(reference: &str) -> Option<(&str, &str)> {
    reference
        .rsplit_once('.')
        .filter(|(module, symbol)| !module.is_empty() && !symbol.is_empty())
}

/// Validates a full schema, returning every problem found.
pub fn validate_schema(spec: &ParserSpec) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let root = spec.prog.trim();

    if root.is_empty() {
        errors.push(SchemaError::EmptyName {
            what: "program",
            scope: "<root>".to_string(),
        });
        return errors;
    }

    let mut parents: HashSet<&str> = HashSet::new();
    for parent in &spec.parent_parsers {
        if parent.prog.trim().is_empty() {
            errors.push(SchemaError::EmptyName {
                what: "parent",
                scope: root.to_string(),
            });
            continue;
        }
        if !parents.insert(parent.prog.as_str()) {
            errors.push(SchemaError::DuplicateParent(parent.prog.clone()));
        }
        if parent.add_help {
            errors.push(SchemaError::ParentWithHelp(parent.prog.clone()));
        }
        let mut scope = ScopeCheck::new(&parent.prog);
        scope.options(&parent.options, &mut errors);
    }

    if let Some(tree) = &spec.subparsers {
        if tree.subparsers.as_ref().is_some_and(|v| !v.is_null()) {
            errors.push(SchemaError::NestedSubcommands(root.to_string()));
        }

        let mut names: HashSet<&str> = HashSet::new();
        for command in &tree.commands {
            let name = command.name.trim();
            if name.is_empty() {
                errors.push(SchemaError::EmptyName {
                    what: "command",
                    scope: root.to_string(),
                });
                continue;
            }
            for token in std::iter::once(name).chain(command.aliases.iter().map(String::as_str)) {
                if !names.insert(token) {
                    errors.push(SchemaError::DuplicateCommand(token.to_string()));
                }
            }

            let scope_name = format!("{root} {name}");
            if command.has_nested_subcommands() {
                errors.push(SchemaError::NestedSubcommands(scope_name.clone()));
            }

            match command.manager.as_deref() {
                None => errors.push(SchemaError::MissingManager(name.to_string())),
                Some(manager) if split_manager(manager).is_none() => {
                    errors.push(SchemaError::InvalidManager {
                        command: name.to_string(),
                        manager: manager.to_string(),
                    });
                }
                Some(_) => {}
            }

            for parent in &command.parents {
                if !parents.contains(parent.as_str()) {
                    errors.push(SchemaError::UnknownParent {
                        parent: parent.clone(),
                        command: name.to_string(),
                    });
                }
            }

            let mut scope = ScopeCheck::new(&scope_name);
            scope.options(&command.options, &mut errors);
            scope.groups(&command.groups, &mut errors);
            scope.mutex_groups(&command.mutually_exclusive_groups, &mut errors);
        }
    }

    let mut scope = ScopeCheck::new(root);
    scope.options(&spec.options, &mut errors);
    scope.groups(&spec.groups, &mut errors);
    scope.mutex_groups(&spec.mutually_exclusive_groups, &mut errors);

    errors
}

/// Per-parser bookkeeping of switches, destinations, and titles.
struct ScopeCheck<'a> {
    scope: &'a str,
    flags: HashSet<String>,
    dests: HashSet<String>,
    titles: HashSet<String>,
    mutex_titles: HashSet<String>,
}

impl<'a> ScopeCheck<'a> {
    fn new(scope: &'a str) -> Self {
        Self {
            scope,
            flags: HashSet::new(),
            dests: HashSet::new(),
            titles: HashSet::new(),
            mutex_titles: HashSet::new(),
        }
    }

    fn options(&mut self, options: &[OptionSpec], errors: &mut Vec<SchemaError>) {
        for option in options {
            self.option(option, errors);
        }
    }

    fn option(&mut self, option: &OptionSpec, errors: &mut Vec<SchemaError>) {
        let shape = match option.shape(self.scope) {
            Ok(shape) => shape,
            Err(err) => {
                errors.push(err);
                return;
            }
        };

        if let FlagShape::Switches { .. } = shape {
            for flag in &option.flags {
                if !self.flags.insert(flag.clone()) {
                    errors.push(self.duplicate(flag));
                }
            }
        }

        if let Ok(dest) = option.dest() {
            if !self.dests.insert(dest.clone()) {
                errors.push(self.duplicate(&dest));
            }
        }
    }

    fn groups(&mut self, groups: &[GroupSpec], errors: &mut Vec<SchemaError>) {
        for group in groups {
            if self.title(&group.title, false, errors) {
                self.options(&group.options, errors);
            }
        }
    }

    fn mutex_groups(&mut self, groups: &[MutexGroupSpec], errors: &mut Vec<SchemaError>) {
        for group in groups {
            if self.title(&group.title, true, errors) {
                self.options(&group.options, errors);
            }
        }
    }

    fn title(&mut self, title: &str, mutex: bool, errors: &mut Vec<SchemaError>) -> bool {
        if title.trim().is_empty() {
            errors.push(SchemaError::EmptyName {
                what: "group",
                scope: self.scope.to_string(),
            });
            return false;
        }
        let seen = if mutex {
            &mut self.mutex_titles
        } else {
            &mut self.titles
        };
        if !seen.insert(title.to_string()) {
            errors.push(SchemaError::DuplicateGroup {
                title: title.to_string(),
                scope: self.scope.to_string(),
            });
        }
        true
    }

    fn duplicate(&self, flag: &str) -> SchemaError {
        SchemaError::DuplicateFlag {
            flag: flag.to_string(),
            scope: self.scope.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandSpec, ParentParserSpec, SubcommandsSpec};

    fn tree(command: CommandSpec) -> ParserSpec {
        ParserSpec::new("tool").with_subcommands(SubcommandsSpec::new("command").with_command(command))
    }

    #[test]
    fn test_validate_accepts_valid_schema() {
        let spec = ParserSpec::new("tool")
            .with_parent(ParentParserSpec::new("common").with_option(OptionSpec::new(["--dry-run"])))
            .with_subcommands(
                SubcommandsSpec::new("command").with_command(
                    CommandSpec::new("run", "tool.run")
                        .with_parent("common")
                        .with_option(OptionSpec::new(["--dry-run"])),
                ),
            )
            .with_option(OptionSpec::new(["-x"]));
        assert!(validate_schema(&spec).is_empty());
    }

    #[test]
    fn test_validate_rejects_missing_manager() {
        let mut command = CommandSpec::new("run", "tool.run");
        command.manager = None;
        assert_eq!(
            validate_schema(&tree(command)),
            vec![SchemaError::MissingManager("run".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_unknown_parent() {
        let command = CommandSpec::new("run", "tool.run").with_parent("ghost");
        assert_eq!(
            validate_schema(&tree(command)),
            vec![SchemaError::UnknownParent {
                parent: "ghost".to_string(),
                command: "run".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_group_titles() {
        let spec = ParserSpec::new("tool")
            .with_group(GroupSpec::new("io"))
            .with_group(GroupSpec::new("io"));
        assert_eq!(
            validate_schema(&spec),
            vec![SchemaError::DuplicateGroup {
                title: "io".to_string(),
                scope: "tool".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_allows_group_and_mutex_with_same_title() {
        let spec = ParserSpec::new("tool")
            .with_group(GroupSpec::new("io"))
            .with_mutex_group(MutexGroupSpec::new("io"));
        assert!(validate_schema(&spec).is_empty());
    }

    #[test]
    fn test_validate_rejects_duplicate_switch_across_groups() {
        let spec = ParserSpec::new("tool")
            .with_option(OptionSpec::new(["-v", "--verbose"]))
            .with_group(GroupSpec::new("extra").with_option(OptionSpec::new(["-v"]).with_dest("v2")));
        assert_eq!(
            validate_schema(&spec),
            vec![SchemaError::DuplicateFlag {
                flag: "-v".to_string(),
                scope: "tool".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_rejects_nested_subcommands() {
        let mut command = CommandSpec::new("remote", "tool.remote");
        command.subparsers = Some(serde_json::json!({"commands": []}));
        assert_eq!(
            validate_schema(&tree(command)),
            vec![SchemaError::NestedSubcommands("tool remote".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_alias_shadowing_command() {
        let spec = ParserSpec::new("tool").with_subcommands(
            SubcommandsSpec::new("command")
                .with_command(CommandSpec::new("status", "tool.status"))
                .with_command(CommandSpec::new("stat", "tool.stat").with_alias("status")),
        );
        assert_eq!(
            validate_schema(&spec),
            vec![SchemaError::DuplicateCommand("status".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_parent_with_help() {
        let mut parent = ParentParserSpec::new("common");
        parent.add_help = true;
        let spec = ParserSpec::new("tool").with_parent(parent);
        assert_eq!(
            validate_schema(&spec),
            vec![SchemaError::ParentWithHelp("common".to_string())]
        );
    }
}
