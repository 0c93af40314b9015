//! clap backend: turns a [`ParserDecl`] tree into a `clap::Command` and
//! clap matches back into [`ParsedArgs`].

use std::ffi::{OsStr, OsString};

use clap::builder::{PossibleValue, TypedValueParser};
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use command_spec_core::{ActionKind, Nargs};
use serde_json::Value;

use crate::convert::Converter;
use crate::decl::{ArgDecl, ArgNames, ParserDecl};
use crate::error::{ParseError, ParseErrorKind};
use crate::parsed::ParsedArgs;

/// Converts and checks each raw value against an argument's type and
/// choices.
#[derive(Clone)]
struct SpecValueParser {
    converter: Option<Converter>,
    choices: Option<Vec<Value>>,
}

impl TypedValueParser for SpecValueParser {
    type Value = Value;

    fn parse_ref(
        &self,
        cmd: &Command,
        arg: Option<&Arg>,
        value: &OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let Some(raw) = value.to_str() else {
            return Err(clap::Error::new(ErrorKind::InvalidUtf8).with_cmd(cmd));
        };
        let converted = match &self.converter {
            Some(converter) => converter
                .convert(raw)
                .map_err(|reason| invalid_value(cmd, arg, &reason))?,
            None => Value::String(raw.to_string()),
        };
        if let Some(choices) = &self.choices {
            if !choices.contains(&converted) {
                let listed: Vec<String> = choices.iter().map(display_value).collect();
                let reason = format!(
                    "invalid choice: '{raw}' (choose from {})",
                    listed.join(", ")
                );
                return Err(invalid_value(cmd, arg, &reason));
            }
        }
        Ok(converted)
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        let choices = self.choices.as_ref()?;
        Some(Box::new(
            choices.iter().map(|choice| PossibleValue::new(display_value(choice))),
        ))
    }
}

fn invalid_value(cmd: &Command, arg: Option<&Arg>, reason: &str) -> clap::Error {
    let name = arg.map(display_arg).unwrap_or_else(|| "value".to_string());
    clap::Error::raw(ErrorKind::ValueValidation, format!("argument {name}: {reason}\n"))
        .with_cmd(cmd)
}

fn display_arg(arg: &Arg) -> String {
    match (arg.get_long(), arg.get_short()) {
        (Some(long), _) => format!("--{long}"),
        (None, Some(short)) => format!("-{short}"),
        (None, None) => arg.get_id().to_string(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the clap command for a parser and, recursively, its commands.
pub(crate) fn build_command(decl: &ParserDecl) -> Command {
    let mut cmd = Command::new(decl.name.clone())
        .args_override_self(true)
        .disable_help_flag(!decl.add_help)
        .disable_version_flag(true)
        .color(clap::ColorChoice::Never);

    if let Some(about) = &decl.about {
        cmd = cmd.about(about.clone());
    }
    if let Some(long_about) = &decl.long_about {
        cmd = cmd.long_about(long_about.clone());
    }
    let tree_description = decl.subcommands.as_ref().and_then(|t| t.description.as_deref());
    let after_help: Vec<&str> = tree_description
        .into_iter()
        .chain(decl.epilog.as_deref())
        .collect();
    if !after_help.is_empty() {
        cmd = cmd.after_help(after_help.join("\n\n"));
    }
    if !decl.aliases.is_empty() {
        cmd = cmd.visible_aliases(decl.aliases.clone());
    }

    for arg in &decl.args {
        cmd = cmd.arg(build_arg(arg));
    }
    for group in decl.mutex_groups.iter().filter(|g| !g.members.is_empty()) {
        cmd = cmd.group(
            ArgGroup::new(group.title.clone())
                .args(group.members.clone())
                .multiple(false),
        );
    }

    if let Some(tree) = &decl.subcommands {
        cmd = cmd
            .subcommand_required(tree.required)
            .disable_help_subcommand(true);
        if let Some(metavar) = &tree.metavar {
            cmd = cmd.subcommand_value_name(metavar.clone());
        }
        let heading = match (&tree.title, &tree.help) {
            (Some(title), Some(help)) => Some(format!("{title} ({help})")),
            (None, Some(help)) => Some(format!("Commands ({help})")),
            (Some(title), None) => Some(title.clone()),
            (None, None) => None,
        };
        if let Some(heading) = heading {
            cmd = cmd.subcommand_help_heading(heading);
        }
        for command in &tree.commands {
            cmd = cmd.subcommand(build_command(command));
        }
    }
    cmd
}

fn build_arg(decl: &ArgDecl) -> Arg {
    let mut arg = Arg::new(decl.dest.clone());

    match &decl.names {
        ArgNames::Positional(name) => {
            arg = arg.value_name(decl.metavar.clone().unwrap_or_else(|| name.clone()));
        }
        ArgNames::Switches { shorts, longs } => {
            if let Some((first, rest)) = shorts.split_first() {
                arg = arg.short(*first).visible_short_aliases(rest.to_vec());
            }
            if let Some((first, rest)) = longs.split_first() {
                arg = arg.long(first.clone()).visible_aliases(rest.to_vec());
            }
            if decl.action.takes_value() {
                let value_name = decl
                    .metavar
                    .clone()
                    .unwrap_or_else(|| decl.dest.to_uppercase());
                arg = arg.value_name(value_name);
            }
        }
    }

    if let Some(help) = &decl.help {
        arg = arg.help(help.clone());
    }
    if let Some(heading) = &decl.heading {
        arg = arg.help_heading(heading.clone());
    }

    match decl.action {
        ActionKind::Store | ActionKind::Append => {
            let action = if decl.action == ActionKind::Store {
                ArgAction::Set
            } else {
                ArgAction::Append
            };
            arg = arg
                .action(action)
                .required(decl.required)
                .value_parser(SpecValueParser {
                    converter: decl.converter.clone(),
                    choices: decl.choices.clone(),
                });
            arg = match decl.nargs {
                None => arg.num_args(1),
                Some(Nargs::Optional) if decl.is_positional() => arg.num_args(1),
                Some(Nargs::Optional) => arg.num_args(0..=1),
                Some(Nargs::ZeroOrMore) => arg.num_args(0..),
                Some(Nargs::OneOrMore) => arg.num_args(1..),
                Some(Nargs::Exactly(n)) => arg.num_args(n),
            };
            if decl.converter.as_ref().is_some_and(Converter::is_numeric) {
                arg = arg.allow_negative_numbers(true);
            }
        }
        // Required flags are checked after matching.
        ActionKind::StoreTrue | ActionKind::StoreFalse | ActionKind::StoreConst => {
            arg = arg.action(ArgAction::SetTrue);
        }
        ActionKind::Count => {
            arg = arg.action(ArgAction::Count);
        }
    }
    arg
}

/// Runs `tokens` through `cmd` and extracts the values of every declared
/// destination.
pub(crate) fn parse(
    decl: &ParserDecl,
    cmd: &Command,
    tokens: Vec<String>,
) -> Result<ParsedArgs, ParseError> {
    let argv = std::iter::once(OsString::from(&decl.name))
        .chain(tokens.into_iter().map(OsString::from));
    let matches = cmd.clone().try_get_matches_from(argv).map_err(from_clap)?;

    let mut parsed = ParsedArgs::default();
    check_required(decl, &matches, || cmd.clone())?;
    extract(decl, &matches, &mut parsed);

    if let Some(tree) = &decl.subcommands {
        match matches.subcommand() {
            Some((name, sub_matches)) => {
                if let Some(command) = tree.find(name) {
                    check_required(command, sub_matches, || {
                        let mut root = cmd.clone();
                        root.build();
                        root.find_subcommand_mut(name)
                            .map(|sub| sub.clone())
                            .unwrap_or_else(|| Command::new(name.to_string()))
                    })?;
                    extract(command, sub_matches, &mut parsed);
                }
                parsed.insert(&tree.dest, Value::String(name.to_string()));
            }
            None => parsed.insert(&tree.dest, Value::Null),
        }
    }
    Ok(parsed)
}

fn supplied(matches: &ArgMatches, dest: &str) -> bool {
    matches.value_source(dest) == Some(ValueSource::CommandLine)
}

/// Enforces requirements clap is not asked to check: required mutex groups
/// and required flag-style switches.
fn check_required(
    decl: &ParserDecl,
    matches: &ArgMatches,
    command: impl FnOnce() -> Command,
) -> Result<(), ParseError> {
    let missing_group = decl
        .mutex_groups
        .iter()
        .filter(|group| group.required)
        .find(|group| !group.members.iter().any(|m| supplied(matches, m)));
    if let Some(group) = missing_group {
        let names: Vec<String> = group
            .members
            .iter()
            .filter_map(|m| decl.arg(m))
            .map(display_decl)
            .collect();
        let message = format!("one of the arguments {} is required", names.join(" "));
        return Err(from_clap(command().error(ErrorKind::MissingRequiredArgument, message)));
    }

    let missing: Vec<String> = decl
        .args
        .iter()
        .filter(|arg| arg.required && !arg.action.takes_value() && !supplied(matches, &arg.dest))
        .map(display_decl)
        .collect();
    if !missing.is_empty() {
        let message = format!("the following arguments are required: {}", missing.join(", "));
        return Err(from_clap(command().error(ErrorKind::MissingRequiredArgument, message)));
    }
    Ok(())
}

fn display_decl(arg: &ArgDecl) -> String {
    if arg.option_strings.is_empty() {
        arg.dest.clone()
    } else {
        arg.option_strings.join("/")
    }
}

fn extract(decl: &ParserDecl, matches: &ArgMatches, parsed: &mut ParsedArgs) {
    for arg in &decl.args {
        parsed.insert(&arg.dest, extract_arg(arg, matches));
    }
}

fn extract_arg(arg: &ArgDecl, matches: &ArgMatches) -> Value {
    if !supplied(matches, &arg.dest) {
        return arg.default.clone();
    }

    match arg.action {
        ActionKind::StoreTrue => Value::Bool(true),
        ActionKind::StoreFalse => Value::Bool(false),
        ActionKind::StoreConst => arg.const_value.clone(),
        ActionKind::Count => {
            let base = arg.default.as_i64().unwrap_or(0);
            Value::from(base + i64::from(matches.get_count(&arg.dest)))
        }
        ActionKind::Store => {
            let values: Vec<Value> = matches
                .get_many::<Value>(&arg.dest)
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            shape_values(arg, values)
        }
        ActionKind::Append => {
            let mut list = match &arg.default {
                Value::Array(items) => items.clone(),
                _ => Vec::new(),
            };
            if let Some(occurrences) = matches.get_occurrences::<Value>(&arg.dest) {
                for occurrence in occurrences {
                    let values: Vec<Value> = occurrence.cloned().collect();
                    match arg.nargs {
                        None => list.extend(values),
                        _ => list.push(shape_values(arg, values)),
                    }
                }
            }
            Value::Array(list)
        }
    }
}

/// Values of one occurrence: a scalar, the `?` fallback, or a list.
fn shape_values(arg: &ArgDecl, values: Vec<Value>) -> Value {
    match arg.nargs {
        Some(nargs) if nargs.is_list() => Value::Array(values),
        Some(_) => values.into_iter().next().unwrap_or_else(|| arg.const_value.clone()),
        None => values.into_iter().next().unwrap_or(Value::Null),
    }
}

pub(crate) fn from_clap(err: clap::Error) -> ParseError {
    let kind = match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ParseErrorKind::DisplayHelp,
        ErrorKind::MissingRequiredArgument => ParseErrorKind::MissingRequired,
        ErrorKind::MissingSubcommand => ParseErrorKind::MissingSubcommand,
        ErrorKind::ArgumentConflict => ParseErrorKind::Conflict,
        ErrorKind::InvalidValue | ErrorKind::ValueValidation | ErrorKind::InvalidUtf8 => {
            ParseErrorKind::InvalidValue
        }
        ErrorKind::UnknownArgument | ErrorKind::InvalidSubcommand => ParseErrorKind::UnknownArgument,
        _ => ParseErrorKind::Usage,
    };
    ParseError::new(kind, err.render().to_string(), err.exit_code())
}

#[cfg(test)]
mod tests {
    use command_spec_core::OptionSpec;
    use serde_json::json;

    use super::*;
    use crate::convert::TypeRegistry;
    use crate::decl::{ArgumentTarget, SubcommandsDecl};
    use crate::options::build_arg as compile_arg;

    fn parser(options: Vec<OptionSpec>) -> ParserDecl {
        let types = TypeRegistry::builtin();
        let mut decl = ParserDecl::new("tool");
        for option in options {
            let arg = compile_arg(option, &types, "tool").unwrap();
            decl.add_argument(arg).unwrap();
        }
        decl
    }

    fn run(decl: &ParserDecl, tokens: &[&str]) -> Result<ParsedArgs, ParseError> {
        let cmd = build_command(decl);
        parse(decl, &cmd, tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_optional_nargs_uses_const_without_value() {
        let decl = parser(vec![
            OptionSpec::new(["--log"])
                .with_nargs(Nargs::Optional)
                .with_const("stderr")
                .with_default("off"),
        ]);
        assert_eq!(run(&decl, &[]).unwrap().get("log"), Some(&json!("off")));
        assert_eq!(run(&decl, &["--log"]).unwrap().get("log"), Some(&json!("stderr")));
        assert_eq!(run(&decl, &["--log", "file"]).unwrap().get("log"), Some(&json!("file")));
    }

    #[test]
    fn test_append_with_fixed_nargs_collects_lists() {
        let decl = parser(vec![
            OptionSpec::new(["--pair"])
                .with_action(ActionKind::Append)
                .with_nargs(Nargs::Exactly(2)),
        ]);
        let parsed = run(&decl, &["--pair", "a", "b", "--pair", "c", "d"]).unwrap();
        assert_eq!(parsed.get("pair"), Some(&json!([["a", "b"], ["c", "d"]])));
    }

    #[test]
    fn test_count_adds_to_default() {
        let decl = parser(vec![
            OptionSpec::new(["-v"]).with_action(ActionKind::Count),
            OptionSpec::new(["-q"]).with_action(ActionKind::Count).with_default(1),
        ]);
        let parsed = run(&decl, &["-vv", "-q"]).unwrap();
        assert_eq!(parsed.get("v"), Some(&json!(2)));
        assert_eq!(parsed.get("q"), Some(&json!(2)));
        assert_eq!(run(&decl, &[]).unwrap().get("v"), Some(&Value::Null));
    }

    #[test]
    fn test_negative_numbers_for_numeric_types() {
        let decl = parser(vec![OptionSpec::new(["--offset"]).with_type("int")]);
        assert_eq!(run(&decl, &["--offset", "-3"]).unwrap().get_i64("offset"), Some(-3));
    }

    #[test]
    fn test_invalid_choice_is_value_error() {
        let decl = parser(vec![OptionSpec::new(["--mode"]).with_choices(["fast", "slow"])]);
        let err = run(&decl, &["--mode", "medium"]).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::InvalidValue);
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("invalid choice"));
    }

    #[test]
    fn test_required_flag_is_enforced() {
        let decl = parser(vec![
            OptionSpec::new(["--yes"])
                .with_action(ActionKind::StoreTrue)
                .required(),
        ]);
        let err = run(&decl, &[]).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::MissingRequired);
        assert!(err.message().contains("--yes"));
        assert_eq!(run(&decl, &["--yes"]).unwrap().get_bool("yes"), Some(true));
    }

    #[test]
    fn test_unknown_switch() {
        let decl = parser(vec![OptionSpec::new(["-o"])]);
        let err = run(&decl, &["--nope"]).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::UnknownArgument);
    }

    #[test]
    fn test_tree_help_and_description_are_rendered() {
        let mut root = parser(Vec::new());
        root.epilog = Some("see the manual".to_string());
        root.set_subcommands(SubcommandsDecl {
            dest: "command".to_string(),
            required: false,
            title: Some("Tools".to_string()),
            description: Some("valid subcommands".to_string()),
            help: Some("oil utilities".to_string()),
            metavar: None,
            commands: vec![ParserDecl::command("init", "tool")],
        });
        let help = build_command(&root).render_help().to_string();
        assert!(help.contains("Tools (oil utilities):"), "{help}");
        assert!(help.contains("valid subcommands\n\nsee the manual"), "{help}");
    }

    #[test]
    fn test_help_is_not_a_failure() {
        let decl = parser(vec![OptionSpec::new(["-o"]).with_help("output file")]);
        let err = run(&decl, &["--help"]).unwrap_err();
        assert!(err.is_help());
        assert_eq!(err.exit_code(), 0);
        assert!(err.message().contains("output file"));
    }
}
