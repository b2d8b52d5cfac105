//! FHIR invariant command-line interface

use clap::{Args, Parser, Subcommand};
use octofhir_invariant::cli::collect::{self, CollectConfig};
use octofhir_invariant::cli::engine::EngineOptions;
use octofhir_invariant::cli::evaluate::{self, EvaluateConfig};
use octofhir_invariant::cli::output::{self, OutputFormat};
use octofhir_invariant::cli::resolver::BatchSource;
use octofhir_invariant::cli::validate::{self, ValidateConfig};
use std::path::PathBuf;

/// FHIR invariant command-line tool
#[derive(Parser)]
#[command(name = "fhir-invariant")]
#[command(author, version, about = "Evaluate FHIR invariants (FHIRPath constraints)", long_about = None)]
struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format (json, table, pretty)
    #[arg(short = 'f', long, global = true)]
    format: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    /// Report errors, including failed validations, but exit with status 0
    #[arg(long, global = true)]
    no_exit_on_error: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EngineArgs {
    /// Evaluator program (default: node)
    #[arg(long)]
    engine: Option<String>,

    /// Evaluator program argument (repeatable; replaces the bridge script,
    /// which is found via FHIR_INVARIANT_BRIDGE or next to the executable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Working directory for the evaluator program
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// FHIR version of the type model (r4, r4b, r5)
    #[arg(short, long)]
    model: Option<String>,

    /// Record engine failures per constraint instead of stopping the batch
    #[arg(long)]
    isolate_failures: bool,
}

impl From<EngineArgs> for EngineOptions {
    fn from(args: EngineArgs) -> Self {
        Self {
            program: args.engine,
            args: args.engine_args,
            working_dir: args.working_dir,
            model: args.model,
            isolate_failures: args.isolate_failures,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a batch of constraint requests
    Evaluate {
        /// JSON array of constraint requests
        batch: Option<String>,

        /// Read the batch from a file
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print the constraint batch for a resource
    Collect {
        /// Resource file (JSON)
        resource: PathBuf,

        /// StructureDefinition files, bundles or directories
        #[arg(short = 'd', long = "definitions", required = true)]
        definitions: Vec<PathBuf>,

        /// Constraint key to skip (repeatable)
        #[arg(long = "exclude-key")]
        excluded_keys: Vec<String>,
    },

    /// Validate a resource against its constraints
    Validate {
        /// Resource file (JSON)
        resource: PathBuf,

        /// StructureDefinition files, bundles or directories
        #[arg(short = 'd', long = "definitions", required = true)]
        definitions: Vec<PathBuf>,

        /// Constraint key to skip (repeatable)
        #[arg(long = "exclude-key")]
        excluded_keys: Vec<String>,

        /// Report constraints that produced no value as failures
        #[arg(long)]
        treat_absent_as_failure: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);
    init_logging(cli.verbose);

    let output_format = OutputFormat::parse(cli.format.as_deref());

    let result = match cli.command {
        Commands::Evaluate {
            batch,
            input,
            engine,
        } => evaluate::evaluate(EvaluateConfig {
            source: BatchSource::select(batch, input),
            engine: engine.into(),
            output_format,
            output_file: cli.output.clone(),
        }),

        Commands::Collect {
            resource,
            definitions,
            excluded_keys,
        } => collect::collect(CollectConfig {
            resource,
            definitions,
            excluded_keys,
            output_format,
            output_file: cli.output.clone(),
        }),

        Commands::Validate {
            resource,
            definitions,
            excluded_keys,
            treat_absent_as_failure,
            engine,
        } => validate::validate(ValidateConfig {
            resource,
            definitions,
            excluded_keys,
            engine: engine.into(),
            treat_absent_as_failure,
            output_format,
            output_file: cli.output.clone(),
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        if !cli.no_exit_on_error {
            std::process::exit(1);
        }
    }
}
