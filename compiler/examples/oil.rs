//! Runs the `oil` schema from the test fixtures against the process arguments.
//!
//! ```text
//! cargo run -p command-spec-compiler --example oil -- load -e emd_1234 --limit 10
//! ```

use command_spec_compiler::{
    Client, Compiler, ExecuteError, HandlerFailure, Module, ModuleTable, ParsedArgs,
};

const SCHEMA: &str = include_str!("../tests/fixtures/oil.json");

fn load(args: &ParsedArgs) -> Result<i32, HandlerFailure> {
    let entries: Vec<String> = match (args.get_str("entry_name"), args.get_strings("entry_path")) {
        (Some(name), _) => vec![name.to_string()],
        (None, Some(paths)) => paths.into_iter().map(str::to_string).collect(),
        (None, None) => return Err("one of -e/-p/-f is needed".into()),
    };
    let limit = args.get_i64("limit").unwrap_or(0);
    let memory = args.get_i64("lsf_memory").unwrap_or(0);
    for entry in &entries {
        println!("loading {entry} (limit {limit}, memory {memory} MiB)");
    }
    Ok(0)
}

fn main() {
    let compiled = match Compiler::new().compile_json(SCHEMA) {
        Ok(compiled) => compiled,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let mut modules = ModuleTable::new();
    modules.register("oil.handlers", || {
        Module::new()
            .with("init", |_| {
                println!("initialised");
                Ok(0)
            })
            .with("status", |args| {
                println!("dry run: {}", args.get_bool("dry_run").unwrap_or(false));
                Ok(0)
            })
            .with("load", load)
    });

    let client = Client::new(compiled, modules);
    match client.execute(std::env::args().skip(1)) {
        Ok(status) => std::process::exit(status),
        Err(ExecuteError::Parse(err)) if err.is_help() => print!("{}", err.message()),
        Err(ExecuteError::Parse(err)) => {
            eprint!("{}", err.message());
            std::process::exit(err.exit_code());
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}
