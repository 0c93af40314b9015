//! Parent parser resolver.

use std::collections::BTreeMap;

use command_spec_core::{ParentParserSpec, SchemaError, SpecSeq};
use tracing::debug;

use crate::convert::TypeRegistry;
use crate::decl::ParserDecl;
use crate::error::Result;
use crate::options::add_options;

/// Parent bundles keyed by `prog`.
pub type ParentMap = BTreeMap<String, ParserDecl>;

/// Builds a help-less option bundle for each parent spec.
///
/// Bundles are independent of each other; commands look them up by name.
///
/// # Errors
///
/// Returns [`SchemaError::EmptyName`], [`SchemaError::DuplicateParent`], or
/// [`SchemaError::ParentWithHelp`] for malformed parent specs, and any error
/// of the bundled options.
///
/// # Examples
///
/// ```
/// use command_spec_compiler::{resolve_parents, TypeRegistry};
/// use command_spec_core::{OptionSpec, ParentParserSpec};
///
/// let specs = vec![ParentParserSpec::new("common").with_option(OptionSpec::new(["--dry-run"]))];
/// let parents = resolve_parents(&specs, &TypeRegistry::builtin()).unwrap();
/// assert!(!parents["common"].has_help());
/// assert!(parents["common"].arg("dry_run").is_some());
/// ```
pub fn resolve_parents<'a>(
    parents: impl Into<SpecSeq<'a, ParentParserSpec>>,
    types: &TypeRegistry,
) -> Result<ParentMap> {
    let mut resolved = ParentMap::new();
    for parent in parents.into().decode()?.into_owned() {
        let name = parent.prog.trim();
        if name.is_empty() {
            return Err(SchemaError::EmptyName {
                what: "parent",
                scope: "<parents>".to_string(),
            }
            .into());
        }
        if resolved.contains_key(name) {
            return Err(SchemaError::DuplicateParent(name.to_string()).into());
        }
        if parent.add_help {
            return Err(SchemaError::ParentWithHelp(name.to_string()).into());
        }

        let mut bundle = ParserDecl::bundle(name);
        add_options(&mut bundle, parent.options, types)?;
        debug!(parent = name, options = bundle.args().len(), "resolved parent bundle");
        resolved.insert(name.to_string(), bundle);
    }
    Ok(resolved)
}
