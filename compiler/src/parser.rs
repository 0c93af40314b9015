//! The compiled, ready-to-use parser.

use std::fmt;

use clap::Command;

use crate::backend;
use crate::decl::ParserDecl;
use crate::error::ParseError;
use crate::parsed::ParsedArgs;

/// A parser compiled from a schema.
///
/// Parsing never mutates the parser; it can be shared and reused.
#[derive(Debug, Clone)]
pub struct CompiledParser {
    decl: ParserDecl,
    command: Command,
    parents: Vec<String>,
}

impl CompiledParser {
    pub(crate) fn new(decl: ParserDecl, parents: Vec<String>) -> Self {
        let command = backend::build_command(&decl);
        Self {
            decl,
            command,
            parents,
        }
    }

    /// Parses command-line tokens (without the program name).
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the tokens do not match, or when help
    /// was requested ([`ParseError::is_help`]).
    pub fn parse<I, T>(&self, tokens: I) -> Result<ParsedArgs, ParseError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens = tokens.into_iter().map(Into::into).collect();
        backend::parse(&self.decl, &self.command, tokens)
    }

    /// Program name.
    pub fn prog(&self) -> &str {
        self.decl.name()
    }

    /// Rendered root help.
    pub fn render_help(&self) -> String {
        self.command.clone().render_help().to_string()
    }

    /// Rendered root usage line.
    pub fn render_usage(&self) -> String {
        self.command.clone().render_usage().to_string()
    }

    /// Rendered help of one command, by name or alias.
    pub fn render_command_help(&self, name: &str) -> Option<String> {
        let primary = self.decl.subcommands()?.find(name)?.name().to_string();
        let mut root = self.command.clone();
        root.build();
        root.find_subcommand_mut(&primary)
            .map(|command| command.render_help().to_string())
    }

    /// Titles of the root parser's option groups.
    pub fn groups(&self) -> Vec<&str> {
        self.decl.groups().iter().map(|g| g.title()).collect()
    }

    /// Titles of the root parser's mutex groups.
    pub fn mutex_groups(&self) -> Vec<&str> {
        self.decl.mutex_groups().iter().map(|g| g.title()).collect()
    }

    /// Names of the resolved parent bundles.
    pub fn parent_names(&self) -> &[String] {
        &self.parents
    }

    /// Destination of the subcommand tree, if one was declared.
    pub fn subcommand_dest(&self) -> Option<&str> {
        self.decl.subcommands().map(|tree| tree.dest())
    }

    /// Command names, in declaration order.
    pub fn commands(&self) -> Vec<&str> {
        self.decl
            .subcommands()
            .map(|tree| tree.commands().iter().map(ParserDecl::name).collect())
            .unwrap_or_default()
    }

    /// The backend-neutral declaration the parser was built from.
    pub fn decl(&self) -> &ParserDecl {
        &self.decl
    }
}

impl fmt::Display for CompiledParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_help())
    }
}
