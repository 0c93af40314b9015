//! Backend-neutral parser declarations.
//!
//! The builders never talk to the argument-parsing library directly. They
//! populate a [`ParserDecl`] tree through the [`ArgumentTarget`] capability;
//! the backend turns the finished tree into a real parser. Replacing the
//! backend does not touch any builder.

use command_spec_core::{ActionKind, Nargs, SchemaError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ConflictPolicy;
use crate::convert::Converter;

/// Id the backend gives the built-in help switch.
const HELP_ID: &str = "help";

/// How an argument is matched on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgNames {
    /// Matched by position.
    Positional(String),
    /// Matched by any of its switches.
    Switches {
        /// Short switch characters.
        shorts: Vec<char>,
        /// Long switch names without `--`.
        longs: Vec<String>,
    },
}

/// Where an argument declaration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgOrigin {
    /// Declared directly on the parser (or one of its groups).
    Declared,
    /// Spliced in from the named parent bundle.
    Inherited(String),
}

/// One compiled argument.
#[derive(Debug, Clone)]
pub struct ArgDecl {
    pub(crate) dest: String,
    pub(crate) names: ArgNames,
    pub(crate) option_strings: Vec<String>,
    pub(crate) action: ActionKind,
    pub(crate) nargs: Option<Nargs>,
    pub(crate) converter: Option<Converter>,
    pub(crate) default: Value,
    pub(crate) const_value: Value,
    pub(crate) choices: Option<Vec<Value>>,
    pub(crate) required: bool,
    pub(crate) help: Option<String>,
    pub(crate) metavar: Option<String>,
    pub(crate) heading: Option<String>,
    pub(crate) origin: ArgOrigin,
}

impl ArgDecl {
    /// Destination key in the parse result.
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Positional name or switches.
    pub fn names(&self) -> &ArgNames {
        &self.names
    }

    /// Switch strings as declared (empty for positionals).
    pub fn option_strings(&self) -> &[String] {
        &self.option_strings
    }

    /// Store action.
    pub fn action(&self) -> ActionKind {
        self.action
    }

    /// Declared number of values.
    pub fn nargs(&self) -> Option<Nargs> {
        self.nargs
    }

    /// Value used when the argument is not supplied.
    pub fn default(&self) -> &Value {
        &self.default
    }

    /// Whether the argument must be supplied.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns `true` for positional arguments.
    pub fn is_positional(&self) -> bool {
        matches!(self.names, ArgNames::Positional(_))
    }

    /// Help text.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Group title the argument is listed under in help, if any.
    pub fn heading(&self) -> Option<&str> {
        self.heading.as_deref()
    }

    /// Where the declaration came from.
    pub fn origin(&self) -> &ArgOrigin {
        &self.origin
    }

    /// Name of the converter applied to values, if a type was declared.
    pub fn type_name(&self) -> Option<&str> {
        self.converter.as_ref().map(Converter::name)
    }

    /// First switch (else the destination) shared with `other`.
    fn overlaps(&self, other: &ArgDecl) -> Option<String> {
        self.option_strings
            .iter()
            .find(|flag| other.option_strings.contains(flag))
            .cloned()
            .or_else(|| (self.dest == other.dest).then(|| self.dest.clone()))
    }
}

/// A non-exclusive option group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDecl {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) members: Vec<String>,
}

impl GroupDecl {
    /// Group title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Group description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Member destinations, in declaration order.
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// A mutually-exclusive option set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexGroupDecl {
    pub(crate) title: String,
    pub(crate) required: bool,
    pub(crate) members: Vec<String>,
}

impl MutexGroupDecl {
    /// Group title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether exactly one member must be supplied.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Member destinations, in declaration order.
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// The subcommand tree attached to a parser.
#[derive(Debug, Clone)]
pub struct SubcommandsDecl {
    pub(crate) dest: String,
    pub(crate) required: bool,
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) help: Option<String>,
    pub(crate) metavar: Option<String>,
    pub(crate) commands: Vec<ParserDecl>,
}

impl SubcommandsDecl {
    /// Destination recording the selected command.
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Whether a command must be selected.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Command parsers, in declaration order.
    pub fn commands(&self) -> &[ParserDecl] {
        &self.commands
    }

    /// Finds a command by name or alias.
    pub fn find(&self, token: &str) -> Option<&ParserDecl> {
        self.commands
            .iter()
            .find(|cmd| cmd.name == token || cmd.aliases.iter().any(|a| a == token))
    }
}

/// Anything that accepts argument declarations: a parser, or one of its
/// groups.
pub trait ArgumentTarget {
    /// Space-separated path of the parser being built, for error messages.
    fn scope(&self) -> &str;

    /// Registers one argument.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when the argument cannot coexist with the
    /// parser's existing arguments.
    fn add_argument(&mut self, arg: ArgDecl) -> Result<(), SchemaError>;
}

/// A parser under construction (or finished).
#[derive(Debug, Clone)]
pub struct ParserDecl {
    pub(crate) name: String,
    pub(crate) scope: String,
    pub(crate) about: Option<String>,
    pub(crate) long_about: Option<String>,
    pub(crate) epilog: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) add_help: bool,
    pub(crate) conflicts: ConflictPolicy,
    pub(crate) args: Vec<ArgDecl>,
    pub(crate) groups: Vec<GroupDecl>,
    pub(crate) mutex_groups: Vec<MutexGroupDecl>,
    pub(crate) subcommands: Option<SubcommandsDecl>,
}

impl ParserDecl {
    /// Creates an empty parser named `name` with help enabled.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scope: name.to_string(),
            about: None,
            long_about: None,
            epilog: None,
            aliases: Vec::new(),
            add_help: true,
            conflicts: ConflictPolicy::default(),
            args: Vec::new(),
            groups: Vec::new(),
            mutex_groups: Vec::new(),
            subcommands: None,
        }
    }

    /// Creates a help-less option bundle.
    pub fn bundle(name: &str) -> Self {
        Self {
            add_help: false,
            ..Self::new(name)
        }
    }

    /// Creates a command parser nested under `parent_scope`.
    pub fn command(name: &str, parent_scope: &str) -> Self {
        Self {
            scope: format!("{parent_scope} {name}"),
            ..Self::new(name)
        }
    }

    pub(crate) fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflicts = policy;
        self
    }

    /// Parser (or command) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command aliases.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether the parser has `-h/--help`.
    pub fn has_help(&self) -> bool {
        self.add_help
    }

    /// One-line description.
    pub fn about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    /// Arguments, in declaration order.
    pub fn args(&self) -> &[ArgDecl] {
        &self.args
    }

    /// Finds an argument by destination.
    pub fn arg(&self, dest: &str) -> Option<&ArgDecl> {
        self.args.iter().find(|arg| arg.dest == dest)
    }

    /// Option groups.
    pub fn groups(&self) -> &[GroupDecl] {
        &self.groups
    }

    /// Mutex groups.
    pub fn mutex_groups(&self) -> &[MutexGroupDecl] {
        &self.mutex_groups
    }

    /// Subcommand tree, if any.
    pub fn subcommands(&self) -> Option<&SubcommandsDecl> {
        self.subcommands.as_ref()
    }

    pub(crate) fn set_subcommands(&mut self, subcommands: SubcommandsDecl) {
        self.subcommands = Some(subcommands);
    }

    /// Splices every argument of `bundle` into this parser.
    ///
    /// Arguments already inherited from an earlier bundle are replaced by
    /// later ones sharing a switch or destination.
    pub fn inherit(&mut self, bundle: &ParserDecl) -> Result<(), SchemaError> {
        for arg in &bundle.args {
            let mut arg = arg.clone();
            arg.origin = ArgOrigin::Inherited(bundle.name.clone());
            arg.heading = None;
            self.insert(arg)?;
        }
        Ok(())
    }

    /// Opens a new option group and returns a target for its members.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateGroup`] if the title is taken, or
    /// [`SchemaError::EmptyName`] if it is blank.
    pub fn add_group(
        &mut self,
        title: &str,
        description: Option<&str>,
    ) -> Result<GroupTarget<'_>, SchemaError> {
        self.check_title(title, self.groups.iter().map(|g| g.title.as_str()))?;
        self.groups.push(GroupDecl {
            title: title.to_string(),
            description: description.map(str::to_string),
            members: Vec::new(),
        });
        let index = self.groups.len() - 1;
        Ok(GroupTarget {
            parser: self,
            index,
        })
    }

    /// Opens a new mutex group and returns a target for its members.
    ///
    /// # Errors
    ///
    /// Same as [`add_group`](Self::add_group), plus
    /// [`SchemaError::GroupNameConflict`] when the title equals an argument
    /// destination.
    pub fn add_mutex_group(
        &mut self,
        title: &str,
        required: bool,
    ) -> Result<MutexTarget<'_>, SchemaError> {
        self.check_title(title, self.mutex_groups.iter().map(|g| g.title.as_str()))?;
        if self.add_help && title == HELP_ID {
            return Err(SchemaError::ReservedFlag {
                flag: title.to_string(),
                scope: self.scope.clone(),
            });
        }
        if self.arg(title).is_some() {
            return Err(SchemaError::GroupNameConflict {
                title: title.to_string(),
                scope: self.scope.clone(),
            });
        }
        self.mutex_groups.push(MutexGroupDecl {
            title: title.to_string(),
            required,
            members: Vec::new(),
        });
        let index = self.mutex_groups.len() - 1;
        Ok(MutexTarget {
            parser: self,
            index,
        })
    }

    /// Checks that positionals can be matched in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::PositionalOrder`] when a required positional
    /// follows an optional one, or a variadic positional is not last.
    pub fn check_positionals(&self) -> Result<(), SchemaError> {
        let positionals: Vec<&ArgDecl> = self.args.iter().filter(|a| a.is_positional()).collect();
        let mut seen_optional = false;

        for (i, arg) in positionals.iter().enumerate() {
            if arg.required && seen_optional {
                return Err(self.positional_error(arg, "required positional follows an optional one"));
            }
            if !arg.required {
                seen_optional = true;
            }
            let variadic = arg.nargs.is_some_and(Nargs::is_variadic);
            if variadic && i + 1 != positionals.len() {
                return Err(self.positional_error(
                    arg,
                    "only the last positional may take a variable number of values",
                ));
            }
        }
        Ok(())
    }

    fn positional_error(&self, arg: &ArgDecl, reason: &str) -> SchemaError {
        SchemaError::PositionalOrder {
            name: arg.dest.clone(),
            scope: self.scope.clone(),
            reason: reason.to_string(),
        }
    }

    fn check_title<'t>(
        &self,
        title: &str,
        mut existing: impl Iterator<Item = &'t str>,
    ) -> Result<(), SchemaError> {
        if title.trim().is_empty() {
            return Err(SchemaError::EmptyName {
                what: "group",
                scope: self.scope.clone(),
            });
        }
        if existing.any(|t| t == title) {
            return Err(SchemaError::DuplicateGroup {
                title: title.to_string(),
                scope: self.scope.clone(),
            });
        }
        Ok(())
    }

    /// Inserts an argument, applying the inheritance rules.
    ///
    /// A collision with an inherited argument replaces it in place (or is
    /// rejected under [`ConflictPolicy::Reject`]); a collision between two
    /// declared arguments is always an error.
    fn insert(&mut self, arg: ArgDecl) -> Result<(), SchemaError> {
        if self.add_help {
            let reserved = arg
                .option_strings
                .iter()
                .find(|f| *f == "-h" || *f == "--help")
                .or((arg.dest == HELP_ID).then_some(&arg.dest));
            if let Some(flag) = reserved {
                return Err(SchemaError::ReservedFlag {
                    flag: flag.clone(),
                    scope: self.scope.clone(),
                });
            }
        }
        if self.mutex_groups.iter().any(|g| g.title == arg.dest) {
            return Err(SchemaError::GroupNameConflict {
                title: arg.dest.clone(),
                scope: self.scope.clone(),
            });
        }
        if self.subcommands.as_ref().is_some_and(|tree| tree.dest == arg.dest) {
            return Err(SchemaError::DuplicateFlag {
                flag: arg.dest.clone(),
                scope: self.scope.clone(),
            });
        }

        let mut replaced = Vec::new();
        for (index, existing) in self.args.iter().enumerate() {
            let Some(flag) = existing.overlaps(&arg) else {
                continue;
            };
            match &existing.origin {
                ArgOrigin::Declared => {
                    return Err(SchemaError::DuplicateFlag {
                        flag,
                        scope: self.scope.clone(),
                    });
                }
                ArgOrigin::Inherited(parent) if self.conflicts == ConflictPolicy::Reject => {
                    return Err(SchemaError::InheritedConflict {
                        flag,
                        parent: parent.clone(),
                        scope: self.scope.clone(),
                    });
                }
                ArgOrigin::Inherited(parent) => {
                    match &arg.origin {
                        ArgOrigin::Inherited(next) => debug!(
                            scope = %self.scope,
                            %flag,
                            from = %parent,
                            to = %next,
                            "later parent overrides inherited flag"
                        ),
                        ArgOrigin::Declared => warn!(
                            scope = %self.scope,
                            %flag,
                            parent = %parent,
                            "declared option replaces inherited flag"
                        ),
                    }
                    replaced.push(index);
                }
            }
        }

        let position = replaced.first().copied().unwrap_or(self.args.len());
        for index in replaced.into_iter().rev() {
            let removed = self.args.remove(index);
            self.forget_member(&removed.dest);
        }
        let position = position.min(self.args.len());
        self.args.insert(position, arg);
        Ok(())
    }

    fn forget_member(&mut self, dest: &str) {
        for group in &mut self.groups {
            group.members.retain(|m| m != dest);
        }
        for group in &mut self.mutex_groups {
            group.members.retain(|m| m != dest);
        }
    }
}

impl ArgumentTarget for ParserDecl {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn add_argument(&mut self, arg: ArgDecl) -> Result<(), SchemaError> {
        self.insert(arg)
    }
}

/// Adds members to one option group of a parser.
#[derive(Debug)]
pub struct GroupTarget<'p> {
    parser: &'p mut ParserDecl,
    index: usize,
}

impl GroupTarget<'_> {
    /// Index of the group within its parser.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl ArgumentTarget for GroupTarget<'_> {
    fn scope(&self) -> &str {
        &self.parser.scope
    }

    fn add_argument(&mut self, mut arg: ArgDecl) -> Result<(), SchemaError> {
        let group = &self.parser.groups[self.index];
        arg.heading = Some(group.title.clone());
        let dest = arg.dest.clone();
        self.parser.insert(arg)?;
        self.parser.groups[self.index].members.push(dest);
        Ok(())
    }
}

/// Adds members to one mutex group of a parser.
#[derive(Debug)]
pub struct MutexTarget<'p> {
    parser: &'p mut ParserDecl,
    index: usize,
}

impl MutexTarget<'_> {
    /// Index of the mutex group within its parser.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl ArgumentTarget for MutexTarget<'_> {
    fn scope(&self) -> &str {
        &self.parser.scope
    }

    fn add_argument(&mut self, arg: ArgDecl) -> Result<(), SchemaError> {
        if arg.required {
            return Err(SchemaError::IncompatibleOption {
                option: arg.dest.clone(),
                scope: self.parser.scope.clone(),
                reason: "mutually exclusive arguments must be optional".to_string(),
            });
        }
        let dest = arg.dest.clone();
        self.parser.insert(arg)?;
        self.parser.mutex_groups[self.index].members.push(dest);
        Ok(())
    }
}
