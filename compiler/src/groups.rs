//! Group and mutex-group builders.
//!
//! Groups are presentational: members are listed under the group title in
//! help. Mutex groups additionally restrict a single invocation to at most
//! one member (exactly one when required); the restriction is checked at
//! parse time.

use std::collections::BTreeMap;

use command_spec_core::{GroupSpec, MutexGroupSpec, SpecSeq};

use crate::convert::TypeRegistry;
use crate::decl::{GroupDecl, MutexGroupDecl, ParserDecl};
use crate::error::Result;
use crate::options::add_option;

/// Creates each group on `parser` and populates it.
///
/// Returns the created groups keyed by title. A title already used by
/// another group of the same parser (including one earlier in `groups`) is
/// an error.
///
/// # Errors
///
/// Returns [`SchemaError::DuplicateGroup`](command_spec_core::SchemaError::DuplicateGroup)
/// for a reused title, and any error of the member options.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::{add_groups, ParserDecl, TypeRegistry};
/// use command_spec_core::{GroupSpec, OptionSpec};
///
/// let mut parser = ParserDecl::new("tool");
/// let groups = vec![GroupSpec::new("output").with_option(OptionSpec::new(["-o"]))];
/// let created = add_groups(&mut parser, &groups, &TypeRegistry::builtin()).unwrap();
/// assert_eq!(created["output"].members(), ["o".to_string()]);
/// ```
pub fn add_groups<'a>(
    parser: &mut ParserDecl,
    groups: impl Into<SpecSeq<'a, GroupSpec>>,
    types: &TypeRegistry,
) -> Result<BTreeMap<String, GroupDecl>> {
    let mut created = BTreeMap::new();
    for group in groups.into().decode()?.into_owned() {
        let index = {
            let mut target = parser.add_group(&group.title, group.description.as_deref())?;
            for option in group.options {
                add_option(&mut target, option, types)?;
            }
            target.index()
        };
        created.insert(group.title, parser.groups()[index].clone());
    }
    Ok(created)
}

/// Creates each mutex group on `parser` and populates it.
///
/// # Errors
///
/// Same as [`add_groups`]; additionally, members may not be `required`.
pub fn add_mutex_groups<'a>(
    parser: &mut ParserDecl,
    groups: impl Into<SpecSeq<'a, MutexGroupSpec>>,
    types: &TypeRegistry,
) -> Result<BTreeMap<String, MutexGroupDecl>> {
    let mut created = BTreeMap::new();
    for group in groups.into().decode()?.into_owned() {
        let index = {
            let mut target = parser.add_mutex_group(&group.title, group.required)?;
            for option in group.options {
                add_option(&mut target, option, types)?;
            }
            target.index()
        };
        created.insert(group.title, parser.mutex_groups()[index].clone());
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use command_spec_core::{ActionKind, OptionSpec, SchemaError};

    use super::*;
    use crate::error::CompileError;

    #[test]
    fn test_groups_keep_member_order() {
        let mut parser = ParserDecl::new("tool");
        let groups = vec![
            GroupSpec::new("group1")
                .with_option(OptionSpec::new(["-y"]).with_action(ActionKind::StoreTrue))
                .with_option(OptionSpec::new(["-z"]).with_action(ActionKind::StoreTrue)),
            GroupSpec::new("group2")
                .with_description("second")
                .with_option(OptionSpec::new(["-c"]).with_action(ActionKind::StoreFalse)),
        ];
        let created = add_groups(&mut parser, &groups, &TypeRegistry::builtin()).unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(created["group1"].members(), ["y".to_string(), "z".to_string()]);
        assert_eq!(created["group2"].description(), Some("second"));
        assert_eq!(parser.args().len(), 3);
    }

    #[test]
    fn test_duplicate_titles_in_one_call_are_rejected() {
        let mut parser = ParserDecl::new("tool");
        let groups = vec![GroupSpec::new("io"), GroupSpec::new("io")];
        let err = add_groups(&mut parser, groups, &TypeRegistry::builtin()).unwrap_err();
        assert_eq!(
            err,
            CompileError::Schema(SchemaError::DuplicateGroup {
                title: "io".to_string(),
                scope: "tool".to_string(),
            })
        );
    }

    #[test]
    fn test_mutex_groups_record_required() {
        let mut parser = ParserDecl::new("tool");
        let groups = vec![
            MutexGroupSpec::new("load_input_group")
                .required()
                .with_option(OptionSpec::new(["-e", "--entry-name"]))
                .with_option(OptionSpec::new(["-f", "--entries-file"]).with_type("path")),
        ];
        let created = add_mutex_groups(&mut parser, &groups, &TypeRegistry::builtin()).unwrap();
        let group = &created["load_input_group"];
        assert!(group.is_required());
        assert_eq!(group.members(), ["entry_name".to_string(), "entries_file".to_string()]);
    }

    #[test]
    fn test_mutex_groups_from_json_string() {
        let mut parser = ParserDecl::new("tool");
        let raw = r#"[{"title": "mode", "options": [{"flag": ["-n"]}, {"flag": ["-m"], "action": "store_true"}]}]"#;
        let created = add_mutex_groups(&mut parser, raw, &TypeRegistry::builtin()).unwrap();
        assert!(!created["mode"].is_required());
        assert_eq!(parser.mutex_groups().len(), 1);
    }
}
