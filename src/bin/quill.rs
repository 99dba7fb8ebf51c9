use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quill::{ExecutionContext, Interpreter, QuillError, Repl, runtime::DEFAULT_MAX_DEPTH};

#[derive(Parser)]
#[command(author, version, about = "Quill S-expression interpreter")]
struct Args {
    /// Maximum evaluation depth before a program is stopped with a stack overflow
    #[arg(long, global = true, env = "QUILL_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Quill program file and print its result
    Run { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a snippet of Quill code and print its result
    Eval { source: String },
}

fn main() -> ExitCode {
    init_tracing();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), QuillError> {
    let context = ExecutionContext {
        max_depth: args.max_depth,
    };
    match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => {
            let bytes = fs::read(&script)?;
            Interpreter::with_context(context).run_bytes(&bytes)?;
        }
        Command::Repl => Repl::with_context(context).run()?,
        Command::Eval { source } => {
            Interpreter::with_context(context).run(&source)?;
        }
    }
    Ok(())
}

/// Logs go to stderr, filtered by `RUST_LOG`; nothing is installed when it is unset.
fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(EnvFilter::from_default_env())
        .init();
}
