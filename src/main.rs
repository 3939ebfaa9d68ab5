use clap::{Parser as ClapParser, Subcommand};
use clove_script::cli::{self, CliError, RunOptions};
use clove_script::context::LogCrateSink;
use clove_script::ScriptEngine;
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "clove-script")]
#[command(about = "Clove Script - apply add/set/remove/merge/compare scripts to JSON documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script against a JSON document
    Run {
        /// Script file, or the script itself if it starts with '['
        script: String,

        /// JSON input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Treat unknown commands as warnings and skip them
        #[arg(long)]
        allow_unknown: bool,

        /// Stop at the first command that fails its own validation
        #[arg(long)]
        stop_on_error: bool,

        /// Print the run log to stderr
        #[arg(long)]
        show_log: bool,
    },

    /// Validate a script without running it
    Validate {
        /// Script file, or the script itself if it starts with '['
        script: String,

        /// Treat unknown commands as warnings
        #[arg(long)]
        allow_unknown: bool,
    },

    /// List available commands and functions
    Commands,
}

fn main() {
    let cli = Cli::parse();

    let show_log = matches!(cli.command, Commands::Run { show_log: true, .. });
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if show_log { "info" } else { "warn" }),
    )
    .init();

    let result = match cli.command {
        Commands::Run {
            script,
            input,
            pretty,
            allow_unknown,
            stop_on_error,
            show_log: _,
        } => run_script(script, input, pretty, allow_unknown, stop_on_error),
        Commands::Validate {
            script,
            allow_unknown,
        } => validate_script(script, allow_unknown),
        Commands::Commands => {
            print!("{}", cli::get_command_listing(&ScriptEngine::default()));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_script(
    script: String,
    input: Option<String>,
    pretty: bool,
    allow_unknown: bool,
    stop_on_error: bool,
) -> Result<(), CliError> {
    let input = match input {
        Some(path) => Some(std::fs::read_to_string(path)?),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = RunOptions {
        script: cli::load_script(&script)?,
        input,
        allow_unknown,
        stop_on_error,
    };

    let outcome = cli::execute_run(&options, &LogCrateSink)?;
    let json = if pretty {
        serde_json::to_string_pretty(&outcome.document)
    } else {
        serde_json::to_string(&outcome.document)
    }?;
    println!("{}", json);

    if outcome.success {
        Ok(())
    } else {
        Err(CliError::RunFailed)
    }
}

fn validate_script(script: String, allow_unknown: bool) -> Result<(), CliError> {
    let result = cli::execute_validate(&cli::load_script(&script)?, allow_unknown);
    if !result.success() {
        return Err(CliError::Invalid(result));
    }
    if !result.issues.is_empty() {
        println!("{}", cli::format_issues(&result));
    }
    println!("Script is valid");
    Ok(())
}
