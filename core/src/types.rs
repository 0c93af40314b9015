//! Schema type definitions for declarative command surfaces.
//!
//! A schema is a nested, data-only description of a program's command line:
//! global options, option groups, mutually-exclusive sets, reusable parent
//! bundles, and one level of subcommands. The types here are plain serde
//! values; they are read, never mutated, by the compiler.

use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::input::seq_or_json;

/// Default destination recorded for the selected subcommand.
pub const DEFAULT_COMMAND_DEST: &str = "command";

fn default_true() -> bool {
    true
}

fn default_command_dest() -> String {
    DEFAULT_COMMAND_DEST.to_string()
}

fn is_default_action(action: &ActionKind) -> bool {
    *action == ActionKind::Store
}

/// What the parser does when an option is encountered.
///
/// # Examples
///
/// ```
/// use command_spec_core::ActionKind;
///
/// let action: ActionKind = serde_json::from_str(r#""store_true""#).unwrap();
/// assert_eq!(action, ActionKind::StoreTrue);
/// assert!(!action.takes_value());
/// assert!(ActionKind::default().takes_value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Store the supplied value (the default).
    #[default]
    Store,
    /// Store `true` when present.
    StoreTrue,
    /// Store `false` when present.
    StoreFalse,
    /// Store the option's `const` value when present.
    StoreConst,
    /// Append each supplied value to a list.
    Append,
    /// Count occurrences.
    Count,
}

impl ActionKind {
    /// Returns `true` if the action consumes values from the command line.
    pub fn takes_value(self) -> bool {
        matches!(self, ActionKind::Store | ActionKind::Append)
    }

    /// Name as written in a schema.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Store => "store",
            ActionKind::StoreTrue => "store_true",
            ActionKind::StoreFalse => "store_false",
            ActionKind::StoreConst => "store_const",
            ActionKind::Append => "append",
            ActionKind::Count => "count",
        }
    }
}

/// Number of values an option consumes.
///
/// Written as `"?"`, `"*"`, `"+"`, or a positive integer.
///
/// # Examples
///
/// ```
/// use command_spec_core::Nargs;
///
/// let n: Nargs = serde_json::from_str(r#""+""#).unwrap();
/// assert_eq!(n, Nargs::OneOrMore);
/// let n: Nargs = serde_json::from_str("2").unwrap();
/// assert_eq!(n, Nargs::Exactly(2));
/// assert!(serde_json::from_str::<Nargs>("0").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NargsRepr", into = "NargsRepr")]
pub enum Nargs {
    /// `?`: zero or one value.
    Optional,
    /// `*`: any number of values.
    ZeroOrMore,
    /// `+`: at least one value.
    OneOrMore,
    /// A fixed, positive number of values.
    Exactly(usize),
}

impl Nargs {
    /// Returns `true` if the option may be satisfied by zero values.
    pub fn allows_none(self) -> bool {
        matches!(self, Nargs::Optional | Nargs::ZeroOrMore)
    }

    /// Returns `true` if the number of values is unbounded.
    pub fn is_variadic(self) -> bool {
        matches!(self, Nargs::ZeroOrMore | Nargs::OneOrMore)
    }

    /// Returns `true` if the parsed value is a list rather than a scalar.
    pub fn is_list(self) -> bool {
        !matches!(self, Nargs::Optional)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NargsRepr {
    Count(usize),
    Symbol(String),
}

impl TryFrom<NargsRepr> for Nargs {
    type Error = String;

    fn try_from(repr: NargsRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            NargsRepr::Count(0) => Err("nargs must be positive".to_string()),
            NargsRepr::Count(n) => Ok(Nargs::Exactly(n)),
            NargsRepr::Symbol(s) => match s.as_str() {
                "?" => Ok(Nargs::Optional),
                "*" => Ok(Nargs::ZeroOrMore),
                "+" => Ok(Nargs::OneOrMore),
                other => other
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .map(Nargs::Exactly)
                    .ok_or_else(|| format!("invalid nargs: {other}")),
            },
        }
    }
}

impl From<Nargs> for NargsRepr {
    fn from(nargs: Nargs) -> Self {
        match nargs {
            Nargs::Optional => NargsRepr::Symbol("?".to_string()),
            Nargs::ZeroOrMore => NargsRepr::Symbol("*".to_string()),
            Nargs::OneOrMore => NargsRepr::Symbol("+".to_string()),
            Nargs::Exactly(n) => NargsRepr::Count(n),
        }
    }
}

/// Classified form of an option's `flags`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagShape<'a> {
    /// A single positional name (no leading dash).
    Positional(&'a str),
    /// One or more switch aliases for the same destination.
    Switches {
        /// Single-character short switches, without the dash.
        shorts: Vec<char>,
        /// Long switches, without the leading `--`.
        longs: Vec<&'a str>,
    },
}

/// One flag declaration.
///
/// `flags` holds either a single positional name or one-to-many switch
/// aliases; every other field is a keyword argument for the underlying
/// argument parser. The schema key `flag` is accepted as an alias.
///
/// # Examples
///
/// ```
/// use command_spec_core::{ActionKind, FlagShape, OptionSpec};
///
/// let spec: OptionSpec = serde_json::from_str(
///     r#"{"flag": ["-c", "--config-file"], "type": "path", "help": "config"}"#,
/// ).unwrap();
/// assert_eq!(spec.dest().unwrap(), "config_file");
/// assert_eq!(spec.action, ActionKind::Store);
/// assert_eq!(
///     spec.shape("oil").unwrap(),
///     FlagShape::Switches { shorts: vec!['c'], longs: vec!["config-file"] },
/// );
///
/// let input = OptionSpec::new(["input_file"]);
/// assert_eq!(input.shape("oil").unwrap(), FlagShape::Positional("input_file"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionSpec {
    /// Positional name or switch aliases.
    #[serde(alias = "flag")]
    pub flags: Vec<String>,
    /// Help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Store action.
    #[serde(default, skip_serializing_if = "is_default_action")]
    pub action: ActionKind,
    /// Type descriptor naming a value converter (e.g. `"int"`, `"path"`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Value used when the option is not supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Value stored by `store_const`, or by a `?` option given without a value.
    #[serde(default, rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    /// Closed set of accepted values, compared after type conversion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,
    /// Whether a switch must be supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Number of values consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nargs: Option<Nargs>,
    /// Explicit destination name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    /// Placeholder shown in usage and help.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
}

impl OptionSpec {
    /// Creates an option with the given flags and default keyword arguments.
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Sets the store action.
    pub fn with_action(mut self, action: ActionKind) -> Self {
        self.action = action;
        self
    }

    /// Sets the type descriptor.
    pub fn with_type(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the const value.
    pub fn with_const(mut self, value: impl Into<Value>) -> Self {
        self.const_value = Some(value.into());
        self
    }

    /// Restricts accepted values.
    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Marks a switch as required.
    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    /// Sets the number of consumed values.
    pub fn with_nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = Some(nargs);
        self
    }

    /// Sets an explicit destination.
    pub fn with_dest(mut self, dest: &str) -> Self {
        self.dest = Some(dest.to_string());
        self
    }

    /// Sets the metavar.
    pub fn with_metavar(mut self, metavar: &str) -> Self {
        self.metavar = Some(metavar.to_string());
        self
    }

    /// Classifies `flags` as a positional name or a set of switches.
    ///
    /// `scope` names the parser the option belongs to and is only used in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyFlags`] for an empty list,
    /// [`SchemaError::MixedFlagShapes`] when a positional name is combined
    /// with other entries, and [`SchemaError::InvalidFlag`] for switches the
    /// parser cannot express (`-`, `--`, `-long`, embedded `=` or spaces).
    pub fn shape(&self, scope: &str) -> Result<FlagShape<'_>> {
        let Some(first) = self.flags.first() else {
            return Err(SchemaError::EmptyFlags {
                scope: scope.to_string(),
            });
        };

        if !first.starts_with('-') {
            if self.flags.len() != 1 {
                return Err(SchemaError::MixedFlagShapes(self.flags.join(", ")));
            }
            if first.trim().is_empty() || first.chars().any(char::is_whitespace) {
                return Err(SchemaError::InvalidFlag(first.clone()));
            }
            return Ok(FlagShape::Positional(first));
        }

        let mut shorts = Vec::new();
        let mut longs = Vec::new();
        for flag in &self.flags {
            if let Some(long) = flag.strip_prefix("--") {
                if long.is_empty()
                    || long.starts_with('-')
                    || long.contains('=')
                    || long.chars().any(char::is_whitespace)
                {
                    return Err(SchemaError::InvalidFlag(flag.clone()));
                }
                longs.push(long);
            } else if let Some(short) = flag.strip_prefix('-') {
                let mut chars = short.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c != '-' && !c.is_whitespace() => shorts.push(c),
                    _ => return Err(SchemaError::InvalidFlag(flag.clone())),
                }
            } else {
                return Err(SchemaError::MixedFlagShapes(self.flags.join(", ")));
            }
        }

        Ok(FlagShape::Switches { shorts, longs })
    }

    /// Returns `true` if `flags` names a positional argument.
    pub fn is_positional(&self) -> bool {
        self.flags.first().is_some_and(|f| !f.starts_with('-'))
    }

    /// Resolves the destination this option stores into.
    ///
    /// Explicit `dest` wins; otherwise a positional keeps its name, and a
    /// switch uses its first long form (else its first short form) with the
    /// dashes stripped and inner dashes turned into underscores.
    ///
    /// # Errors
    ///
    /// Propagates [`shape`](Self::shape) errors.
    pub fn dest(&self) -> Result<String> {
        if let Some(dest) = &self.dest {
            return Ok(dest.clone());
        }
        match self.shape("")? {
            FlagShape::Positional(name) => Ok(name.to_string()),
            FlagShape::Switches { shorts, longs } => Ok(match longs.first() {
                Some(long) => long.replace('-', "_"),
                None => shorts.first().map(char::to_string).unwrap_or_default(),
            }),
        }
    }
}

/// A named, non-exclusive bucket of options.
///
/// Groups only affect help rendering and introspection, never matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    /// Title, unique within its parser.
    pub title: String,
    /// Optional description shown with the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Member options.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub options: Vec<OptionSpec>,
}

impl GroupSpec {
    /// Creates an empty group.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Adds a member option.
    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }
}

/// A set of options of which at most one (exactly one if `required`) may be
/// supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MutexGroupSpec {
    /// Title, unique within its parser.
    pub title: String,
    /// Whether exactly one member must be supplied.
    #[serde(default)]
    pub required: bool,
    /// Member options.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub options: Vec<OptionSpec>,
}

impl MutexGroupSpec {
    /// Creates an empty, optional mutex group.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Requires exactly one member.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Adds a member option.
    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }
}

/// A freestanding option bundle inherited by commands that list it in their
/// `parents`. Never parsed directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParentParserSpec {
    /// Name, unique across the schema.
    pub prog: String,
    /// Optional description (not rendered).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Must be `false`: parent bundles contribute no help flag.
    #[serde(default)]
    pub add_help: bool,
    /// Bundled options.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub options: Vec<OptionSpec>,
}

impl ParentParserSpec {
    /// Creates an empty bundle.
    pub fn new(prog: &str) -> Self {
        Self {
            prog: prog.to_string(),
            ..Self::default()
        }
    }

    /// Adds a bundled option.
    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }
}

/// One subcommand and the handler it is bound to.
///
/// # Examples
///
/// ```
/// use command_spec_core::{CommandSpec, OptionSpec};
///
/// let build = CommandSpec::new("build", "tools.handlers.build")
///     .with_help("build the project")
///     .with_parent("common")
///     .with_option(OptionSpec::new(["--target"]).with_default("release"));
/// assert_eq!(build.parents, vec!["common"]);
/// assert_eq!(build.manager.as_deref(), Some("tools.handlers.build"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    /// Command token, unique within the subcommand tree.
    pub name: String,
    /// One-line help shown in the parent's command list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Longer description shown in the command's own help.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Alternative tokens selecting this command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Whether the command parser gets `-h/--help`.
    #[serde(default = "default_true")]
    pub add_help: bool,
    /// Parent bundle names, applied in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    /// Command options.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub options: Vec<OptionSpec>,
    /// Command option groups.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub groups: Vec<GroupSpec>,
    /// Command mutex groups.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub mutually_exclusive_groups: Vec<MutexGroupSpec>,
    /// Handler reference of the form `module.path.symbol`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    /// Nested subcommand tree; must be absent or null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subparsers: Option<Value>,
}

impl CommandSpec {
    /// Creates a command bound to `manager`.
    pub fn new(name: &str, manager: &str) -> Self {
        Self {
            name: name.to_string(),
            help: None,
            description: None,
            aliases: Vec::new(),
            add_help: true,
            parents: Vec::new(),
            options: Vec::new(),
            groups: Vec::new(),
            mutually_exclusive_groups: Vec::new(),
            manager: Some(manager.to_string()),
            subparsers: None,
        }
    }

    /// Sets the one-line help.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Sets the long description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Adds an alias.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Appends a parent bundle name.
    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parents.push(parent.to_string());
        self
    }

    /// Adds an option.
    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    /// Adds an option group.
    pub fn with_group(mut self, group: GroupSpec) -> Self {
        self.groups.push(group);
        self
    }

    /// Adds a mutex group.
    pub fn with_mutex_group(mut self, group: MutexGroupSpec) -> Self {
        self.mutually_exclusive_groups.push(group);
        self
    }

    /// Returns `true` if a nested subcommand tree was declared.
    pub fn has_nested_subcommands(&self) -> bool {
        self.subparsers.as_ref().is_some_and(|v| !v.is_null())
    }
}

/// The (single-level) subcommand tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubcommandsSpec {
    /// Destination recording the selected command name.
    #[serde(default = "default_command_dest")]
    pub dest: String,
    /// Whether a command must be selected.
    #[serde(default)]
    pub required: bool,
    /// Heading for the command list in help.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description of the command list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Help for the command placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Placeholder for the command token in usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    /// Commands, in declaration order.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub commands: Vec<CommandSpec>,
    /// Nested subcommand tree; must be absent or null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subparsers: Option<Value>,
}

impl Default for SubcommandsSpec {
    fn default() -> Self {
        Self {
            dest: default_command_dest(),
            required: false,
            title: None,
            description: None,
            help: None,
            metavar: None,
            commands: Vec::new(),
            subparsers: None,
        }
    }
}

impl SubcommandsSpec {
    /// Creates an empty, optional tree recording into `dest`.
    pub fn new(dest: &str) -> Self {
        Self {
            dest: dest.to_string(),
            ..Self::default()
        }
    }

    /// Requires a command to be selected.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Adds a command.
    pub fn with_command(mut self, command: CommandSpec) -> Self {
        self.commands.push(command);
        self
    }
}

/// Root of a schema.
///
/// # Examples
///
/// ```
/// use command_spec_core::ParserSpec;
///
/// let spec = ParserSpec::from_json_str(r#"{
///     "parser": {
///         "prog": "tool",
///         "options": [{"flag": ["-x"]}],
///         "subparsers": {"required": true, "commands": [
///             {"name": "run", "manager": "tool.handlers.run"}
///         ]}
///     }
/// }"#).unwrap();
/// assert_eq!(spec.prog, "tool");
/// assert!(spec.add_help);
/// let tree = spec.subparsers.as_ref().unwrap();
/// assert_eq!(tree.dest, "command");
/// assert_eq!(tree.commands[0].name, "run");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserSpec {
    /// Program name used in usage and help.
    pub prog: String,
    /// Program description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Text shown after the help body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epilog: Option<String>,
    /// Whether the root parser gets `-h/--help`.
    #[serde(default = "default_true")]
    pub add_help: bool,
    /// Reusable option bundles.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub parent_parsers: Vec<ParentParserSpec>,
    /// Subcommand tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subparsers: Option<SubcommandsSpec>,
    /// Top-level options.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub options: Vec<OptionSpec>,
    /// Top-level option groups.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub groups: Vec<GroupSpec>,
    /// Top-level mutex groups.
    #[serde(default, deserialize_with = "seq_or_json")]
    pub mutually_exclusive_groups: Vec<MutexGroupSpec>,
}

impl ParserSpec {
    /// Creates an empty schema for `prog`.
    pub fn new(prog: &str) -> Self {
        Self {
            prog: prog.to_string(),
            description: None,
            epilog: None,
            add_help: true,
            parent_parsers: Vec::new(),
            subparsers: None,
            options: Vec::new(),
            groups: Vec::new(),
            mutually_exclusive_groups: Vec::new(),
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Adds a parent bundle.
    pub fn with_parent(mut self, parent: ParentParserSpec) -> Self {
        self.parent_parsers.push(parent);
        self
    }

    /// Sets the subcommand tree.
    pub fn with_subcommands(mut self, subcommands: SubcommandsSpec) -> Self {
        self.subparsers = Some(subcommands);
        self
    }

    /// Adds a top-level option.
    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    /// Adds a top-level group.
    pub fn with_group(mut self, group: GroupSpec) -> Self {
        self.groups.push(group);
        self
    }

    /// Adds a top-level mutex group.
    pub fn with_mutex_group(mut self, group: MutexGroupSpec) -> Self {
        self.mutually_exclusive_groups.push(group);
        self
    }

    /// Decodes a schema from a JSON value.
    ///
    /// Accepts both a bare parser object and the `{"parser": {...}}`
    /// wrapper form.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Decode`] if the value does not match the
    /// schema shape.
    pub fn from_value(value: Value) -> Result<Self> {
        let value = match value {
            Value::Object(mut map) if map.len() == 1 => match map.remove("parser") {
                Some(inner) => inner,
                None => Value::Object(map),
            },
            other => other,
        };
        Ok(serde_json::from_value(value)?)
    }

    /// Decodes a schema from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Decode`] on malformed JSON or schema shape.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Loads a schema from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Read`] if the file cannot be opened, or
    /// [`SchemaError::Decode`] if it is not a valid schema.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|err| SchemaError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let value: Value = serde_json::from_reader(BufReader::new(file))?;
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_option_dest_prefers_first_long_switch() {
        let spec = OptionSpec::new(["-n", "--dry-run", "--noop"]);
        assert_eq!(spec.dest().unwrap(), "dry_run");
    }

    #[test]
    fn test_option_dest_falls_back_to_short() {
        assert_eq!(OptionSpec::new(["-o"]).dest().unwrap(), "o");
    }

    #[test]
    fn test_option_dest_explicit_wins() {
        let spec = OptionSpec::new(["--lsf"]).with_dest("scheduler");
        assert_eq!(spec.dest().unwrap(), "scheduler");
    }

    #[test]
    fn test_shape_rejects_positional_with_aliases() {
        let spec = OptionSpec::new(["input", "--input"]);
        assert_eq!(
            spec.shape("tool"),
            Err(SchemaError::MixedFlagShapes("input, --input".to_string()))
        );
    }

    #[test]
    fn test_shape_rejects_multi_char_single_dash() {
        let spec = OptionSpec::new(["-foo"]);
        assert_eq!(
            spec.shape("tool"),
            Err(SchemaError::InvalidFlag("-foo".to_string()))
        );
    }

    #[test]
    fn test_shape_rejects_empty_flags() {
        let spec = OptionSpec::default();
        assert_eq!(
            spec.shape("tool load"),
            Err(SchemaError::EmptyFlags {
                scope: "tool load".to_string()
            })
        );
    }

    #[test]
    fn test_option_rejects_unknown_keyword() {
        let raw = json!({"flag": ["-x"], "halp": "typo"});
        assert!(serde_json::from_value::<OptionSpec>(raw).is_err());
    }

    #[test]
    fn test_option_rejects_unknown_action() {
        let raw = json!({"flag": ["-x"], "action": "extend"});
        assert!(serde_json::from_value::<OptionSpec>(raw).is_err());
    }

    #[test]
    fn test_sequences_accept_json_strings_and_null() {
        let raw = json!({
            "prog": "tool",
            "options": "[{\"flag\": [\"-x\"]}]",
            "groups": null
        });
        let spec = ParserSpec::from_value(raw).unwrap();
        assert_eq!(spec.options.len(), 1);
        assert!(spec.groups.is_empty());
    }

    #[test]
    fn test_wrapper_and_bare_forms_are_equivalent() {
        let bare = json!({"prog": "tool", "description": "d"});
        let wrapped = json!({"parser": bare.clone()});
        assert_eq!(
            ParserSpec::from_value(bare).unwrap(),
            ParserSpec::from_value(wrapped).unwrap()
        );
    }

    #[test]
    fn test_command_defaults() {
        let command: CommandSpec = serde_json::from_value(json!({"name": "init"})).unwrap();
        assert!(command.add_help);
        assert!(command.manager.is_none());
        assert!(!command.has_nested_subcommands());
    }

    #[test]
    fn test_command_nested_null_is_not_nested() {
        let command: CommandSpec =
            serde_json::from_value(json!({"name": "init", "subparsers": null})).unwrap();
        assert!(!command.has_nested_subcommands());
    }

    #[test]
    fn test_nargs_serialization_roundtrip() {
        let spec = OptionSpec::new(["files"]).with_nargs(Nargs::OneOrMore);
        let raw = serde_json::to_value(&spec).unwrap();
        assert_eq!(raw, json!({"flags": ["files"], "nargs": "+"}));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = ParserSpec::load("/nonexistent/schema.json").unwrap_err();
        assert!(matches!(err, SchemaError::Read { .. }));
    }
}
