use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use plinth_core::Plan;
use plinth_parser::ParserConfig;
use tracing_subscriber::EnvFilter;

use plinth::{
    build_plan, error_code, evaluate_outputs, load_config, load_input_values, render, summary,
    Format,
};

#[derive(Parser)]
#[command(name = "plinth")]
#[command(about = "Resolve and validate deployment blueprints", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Parser configuration file (TOML)
    #[arg(short, long, global = true, env = "PLINTH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct BlueprintArgs {
    /// Blueprint file path
    blueprint: PathBuf,

    /// Input values file (YAML or JSON mapping)
    #[arg(short, long)]
    inputs: Option<PathBuf>,

    /// Input value as NAME=VALUE, may be repeated
    #[arg(short, long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a blueprint and report whether it is valid
    Validate {
        #[command(flatten)]
        blueprint: BlueprintArgs,
    },

    /// Resolve a blueprint and print the plan
    Plan {
        #[command(flatten)]
        blueprint: BlueprintArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },

    /// Evaluate a blueprint's outputs against deployed node instances
    Outputs {
        #[command(flatten)]
        blueprint: BlueprintArgs,

        /// Node instances file (YAML or JSON sequence)
        #[arg(long)]
        instances: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::TRACE
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) if !cli.debug && !cli.verbose => filter,
        _ => EnvFilter::new(level.to_string()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match error_code(&error) {
                Some(code) => eprintln!("error[{}]: {:#}", code, error),
                None => eprintln!("error: {:#}", error),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate { blueprint } => {
            let plan = resolve(&blueprint, config)?;
            println!("{}", summary(&plan));
        }
        Commands::Plan { blueprint, format } => {
            let plan = resolve(&blueprint, config)?;
            println!("{}", render(&plan, format)?);
        }
        Commands::Outputs {
            blueprint,
            instances,
            format,
        } => {
            let plan = resolve(&blueprint, config)?;
            let outputs = evaluate_outputs(&plan, instances.as_deref())?;
            println!("{}", render(&outputs, format)?);
        }
    }
    Ok(())
}

fn resolve(args: &BlueprintArgs, config: ParserConfig) -> Result<Plan> {
    let inputs = load_input_values(args.inputs.as_deref(), &args.set)?;
    build_plan(&args.blueprint.to_string_lossy(), config, inputs)
}
