//! Option builder: one [`OptionSpec`] in, one registered argument out.

use command_spec_core::{ActionKind, FlagShape, Nargs, OptionSpec, SchemaError, SpecSeq};
use serde_json::Value;

use crate::convert::{Converter, TypeRegistry};
use crate::decl::{ArgDecl, ArgNames, ArgOrigin, ArgumentTarget};
use crate::error::{CompileError, Result};

/// Registers one option on `target`.
///
/// The option is taken by value: once registered, its flags belong to the
/// target parser.
///
/// # Errors
///
/// Returns [`CompileError::TypeResolution`] when the `type` descriptor is not
/// in `types`, and [`CompileError::Schema`] for malformed flags, keyword
/// combinations the parser cannot express, or collisions with arguments the
/// target already has.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::{add_option, ParserDecl, TypeRegistry};
/// use command_spec_core::OptionSpec;
/// use serde_json::json;
///
/// let mut parser = ParserDecl::new("tool");
/// let types = TypeRegistry::builtin();
/// add_option(&mut parser, OptionSpec::new(["--limit"]).with_type("int").with_default("1000"), &types)
///     .unwrap();
/// assert_eq!(parser.arg("limit").unwrap().default(), &json!(1000));
///
/// let err = add_option(&mut parser, OptionSpec::new(["--when"]).with_type("datetime"), &types);
/// assert!(err.is_err());
/// ```
pub fn add_option<T>(target: &mut T, option: OptionSpec, types: &TypeRegistry) -> Result<()>
where
    T: ArgumentTarget + ?Sized,
{
    let arg = build_arg(option, types, target.scope())?;
    target.add_argument(arg)?;
    Ok(())
}

/// Registers every option of a sequence, in order.
///
/// # Errors
///
/// Stops at the first failing option; see [`add_option`].
pub fn add_options<'a, T>(
    target: &mut T,
    options: impl Into<SpecSeq<'a, OptionSpec>>,
    types: &TypeRegistry,
) -> Result<()>
where
    T: ArgumentTarget + ?Sized,
{
    for option in options.into().decode()?.into_owned() {
        add_option(target, option, types)?;
    }
    Ok(())
}

/// Turns an option declaration into a backend-neutral argument.
pub(crate) fn build_arg(option: OptionSpec, types: &TypeRegistry, scope: &str) -> Result<ArgDecl> {
    let dest = option.dest()?;
    let incompatible = |reason: &str| SchemaError::IncompatibleOption {
        option: dest.clone(),
        scope: scope.to_string(),
        reason: reason.to_string(),
    };

    let names = match option.shape(scope)? {
        FlagShape::Positional(name) => {
            if !option.action.takes_value() {
                return Err(incompatible("positionals must store a value").into());
            }
            if option.required.is_some() {
                return Err(incompatible("'required' does not apply to positionals").into());
            }
            if option.dest.is_some() {
                return Err(incompatible("positionals take their destination from their name").into());
            }
            ArgNames::Positional(name.to_string())
        }
        FlagShape::Switches { shorts, longs } => ArgNames::Switches {
            shorts,
            longs: longs.into_iter().map(str::to_string).collect(),
        },
    };

    if !option.action.takes_value() {
        let offending = [
            ("type", option.type_name.is_some()),
            ("nargs", option.nargs.is_some()),
            ("choices", option.choices.is_some()),
            ("metavar", option.metavar.is_some()),
        ];
        if let Some((key, _)) = offending.iter().find(|(_, set)| *set) {
            let reason = format!("'{key}' requires an action that takes a value");
            return Err(incompatible(&reason).into());
        }
    }
    match option.action {
        ActionKind::StoreConst if option.const_value.is_none() => {
            return Err(incompatible("store_const requires 'const'").into());
        }
        ActionKind::Store | ActionKind::Append
            if option.const_value.is_some() && option.nargs != Some(Nargs::Optional) =>
        {
            return Err(incompatible("'const' requires nargs '?'").into());
        }
        ActionKind::StoreTrue | ActionKind::StoreFalse | ActionKind::Count
            if option.const_value.is_some() =>
        {
            return Err(incompatible("'const' requires store_const or nargs '?'").into());
        }
        _ => {}
    }

    let converter = match option.type_name.as_deref() {
        Some(descriptor) => Some(types.resolve(descriptor).cloned().ok_or_else(|| {
            CompileError::TypeResolution {
                descriptor: descriptor.to_string(),
                option: dest.clone(),
            }
        })?),
        None => None,
    };

    let choices = match option.choices {
        Some(choices) => Some(
            choices
                .into_iter()
                .map(|choice| convert_value(choice, converter.as_ref(), &dest, "choice"))
                .collect::<std::result::Result<Vec<_>, _>>()?,
        ),
        None => None,
    };

    let default = match option.default {
        Some(value) => convert_value(value, converter.as_ref(), &dest, "default")?,
        None => implicit_default(option.action, option.nargs, &names),
    };
    if option.action == ActionKind::Append && !(default.is_null() || default.is_array()) {
        return Err(SchemaError::InvalidValue {
            option: dest,
            what: "default",
            value: default.to_string(),
            reason: "append needs a list default".to_string(),
        }
        .into());
    }

    let required = match names {
        ArgNames::Positional(_) => !option.nargs.is_some_and(Nargs::allows_none),
        ArgNames::Switches { .. } => option.required.unwrap_or(false),
    };

    Ok(ArgDecl {
        option_strings: match names {
            ArgNames::Positional(_) => Vec::new(),
            ArgNames::Switches { .. } => option.flags,
        },
        dest,
        names,
        action: option.action,
        nargs: option.nargs,
        converter,
        default,
        const_value: option.const_value.unwrap_or(Value::Null),
        choices,
        required,
        help: option.help,
        metavar: option.metavar,
        heading: None,
        origin: ArgOrigin::Declared,
    })
}

fn implicit_default(action: ActionKind, nargs: Option<Nargs>, names: &ArgNames) -> Value {
    match action {
        ActionKind::StoreTrue => Value::Bool(false),
        ActionKind::StoreFalse => Value::Bool(true),
        _ if matches!(names, ArgNames::Positional(_)) && nargs == Some(Nargs::ZeroOrMore) => {
            Value::Array(Vec::new())
        }
        _ => Value::Null,
    }
}

/// Runs string literals (and strings inside lists) through the converter.
fn convert_value(
    value: Value,
    converter: Option<&Converter>,
    dest: &str,
    what: &'static str,
) -> std::result::Result<Value, SchemaError> {
    let Some(converter) = converter else {
        return Ok(value);
    };
    match value {
        Value::String(raw) => converter.convert(&raw).map_err(|reason| SchemaError::InvalidValue {
            option: dest.to_string(),
            what,
            value: raw,
            reason,
        }),
        Value::Array(items) => items
            .into_iter()
            .map(|item| convert_value(item, Some(converter), dest, what))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other),
    }
}
