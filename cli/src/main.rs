use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use command_spec_compiler::{Compiled, Compiler, CompilerConfig, ParsedArgs};
use command_spec_core::{ParserSpec, validate_schema};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format for parse results.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "spec-cli")]
#[command(about = "Check, render and try out declarative command schemas")]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Compiler policy file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log compiler decisions to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate and compile a schema file.
    Check(CheckArgs),
    /// Parse tokens against a schema and print the result.
    Parse(ParseArgs),
    /// Render the help of a schema or one of its commands.
    Help(HelpArgs),
    /// List commands and their handler bindings.
    Commands(CommandsArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Schema JSON file.
    schema: PathBuf,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Schema JSON file.
    schema: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// Tokens to parse, after `--`.
    #[arg(last = true)]
    tokens: Vec<String>,
}

#[derive(Debug, Args)]
struct HelpArgs {
    /// Schema JSON file.
    schema: PathBuf,
    /// Command to render instead of the root parser.
    command: Option<String>,
}

#[derive(Debug, Args)]
struct CommandsArgs {
    /// Schema JSON file.
    schema: PathBuf,
}

/// Parse output: the values plus the selected command's binding.
#[derive(Debug, Serialize)]
struct ParseReport<'a> {
    command: Option<&'a str>,
    binding: Option<String>,
    args: &'a ParsedArgs,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = build_compiler(cli.config.as_deref()).and_then(|compiler| match cli.command {
        Command::Check(args) => run_check(args, &compiler).map(|()| 0),
        Command::Parse(args) => run_parse(args, &compiler),
        Command::Help(args) => run_help(args, &compiler).map(|()| 0),
        Command::Commands(args) => run_commands(args, &compiler).map(|()| 0),
    });

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_compiler(config: Option<&Path>) -> Result<Compiler, String> {
    let Some(path) = config else {
        return Ok(Compiler::new());
    };
    let config = CompilerConfig::load(path)
        .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?;
    debug!(?config, "loaded compiler config");
    Ok(Compiler::new().with_config(config))
}

fn compile(path: &Path, compiler: &Compiler) -> Result<Compiled, String> {
    compiler
        .compile_file(path)
        .map_err(|err| format!("Failed to compile '{}': {err}", path.display()))
}

fn run_check(args: CheckArgs, compiler: &Compiler) -> Result<(), String> {
    let spec = ParserSpec::load(&args.schema).map_err(|err| err.to_string())?;

    let problems = validate_schema(&spec);
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("  {problem}");
        }
        return Err(format!(
            "{} problem(s) in '{}'",
            problems.len(),
            args.schema.display()
        ));
    }

    let compiled = compiler
        .compile(&spec)
        .map_err(|err| format!("Failed to compile '{}': {err}", args.schema.display()))?;
    println!(
        "Compiled '{}': {} command(s), {} top-level option(s), {} parent bundle(s).",
        compiled.parser.prog(),
        compiled.registry.len(),
        compiled.parser.decl().args().len(),
        compiled.parser.parent_names().len()
    );
    Ok(())
}

fn run_parse(args: ParseArgs, compiler: &Compiler) -> Result<i32, String> {
    let compiled = compile(&args.schema, compiler)?;

    let parsed = match compiled.parser.parse(args.tokens) {
        Ok(parsed) => parsed,
        Err(err) if err.is_help() => {
            print!("{}", err.message());
            return Ok(0);
        }
        Err(err) => {
            eprint!("{}", err.message());
            return Ok(err.exit_code());
        }
    };

    let command = compiled
        .parser
        .subcommand_dest()
        .and_then(|dest| parsed.command(dest));
    let binding = command
        .map(|name| compiled.registry.lookup(name).map(ToString::to_string))
        .transpose()
        .map_err(|err| err.to_string())?;
    let report = ParseReport {
        command,
        binding,
        args: &parsed,
    };

    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|err| format!("Failed to serialize parse result: {err}"))?,
        OutputFormat::Yaml => serde_yaml::to_string(&report)
            .map_err(|err| format!("Failed to serialize parse result: {err}"))?,
    };
    println!("{}", rendered.trim_end());
    Ok(0)
}

fn run_help(args: HelpArgs, compiler: &Compiler) -> Result<(), String> {
    let compiled = compile(&args.schema, compiler)?;
    let help = match &args.command {
        Some(name) => compiled
            .parser
            .render_command_help(name)
            .ok_or_else(|| format!("Unknown command '{name}'"))?,
        None => compiled.parser.render_help(),
    };
    print!("{help}");
    Ok(())
}

fn run_commands(args: CommandsArgs, compiler: &Compiler) -> Result<(), String> {
    let compiled = compile(&args.schema, compiler)?;
    if compiled.registry.is_empty() {
        println!("No commands declared.");
        return Ok(());
    }
    for (name, binding) in compiled.registry.iter() {
        println!("{name} -> {binding}");
    }
    Ok(())
}
