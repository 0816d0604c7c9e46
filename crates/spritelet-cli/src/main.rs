mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{CliError, GeneratorArgs, EXIT_FAILURE};
use spritelet_core::{Engine, InitOptions};
use spritelet_schema::DEFAULT_PROMPT_STYLE;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "spritelet",
    version,
    about = "Identity-locked mascot state store with staleness-aware regeneration"
)]
struct Cli {
    /// Path to the Spritelet identity root.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Initialize a store: profile, empty catalog, empty signal.
    Init {
        /// Base reference image, relative to the root unless absolute.
        #[arg(long, default_value = "assets/base.png")]
        base_image: String,
        #[arg(long, default_value = DEFAULT_PROMPT_STYLE)]
        prompt_style: String,
    },
    /// Reset a store, deleting all assets and states and restarting the event log.
    Reinit {
        #[arg(long, default_value = "assets/base.png")]
        base_image: String,
        #[arg(long, default_value = DEFAULT_PROMPT_STYLE)]
        prompt_style: String,
        /// Confirm the reset.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Generate the base avatar from an identity brief.
    GenerateBase {
        /// Short description of the mascot's identity.
        #[arg(long)]
        identity: String,
        /// Output path inside the root.
        #[arg(long)]
        output: Option<String>,
        #[command(flatten)]
        generator: GeneratorArgs,
    },
    /// Print the generation request payload for a state without sending it.
    BuildRequest {
        simple_name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Base image to attach instead of the profile's.
        #[arg(long)]
        base_image: Option<String>,
        /// Output file, or - for stdout.
        #[arg(long, default_value = "-")]
        output: PathBuf,
        #[command(flatten)]
        generator: GeneratorArgs,
    },
    /// Look up a state and report its staleness.
    Find { simple_name: String },
    /// Register an existing artifact under states/ in the catalog.
    Register {
        simple_name: String,
        /// Artifact path, e.g. states/focused-coding.png.
        spritelet_path: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Point the current signal at an artifact.
    Signal {
        /// Artifact path under states/.
        spritelet_path: String,
    },
    /// Publish a state, reusing its artifact unless the base image changed.
    Publish {
        simple_name: String,
        #[arg(long)]
        description: String,
        /// Regenerate even if the existing artifact is fresh or missing.
        #[arg(long, default_value_t = false)]
        force: bool,
        #[command(flatten)]
        generator: GeneratorArgs,
    },
    /// Show the event log.
    Events {
        /// Show only the most recent N events.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check that every document parses and every referenced file exists.
    Verify,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SPRITELET_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.code)
        }
    }
}

fn run(cli: Cli) -> Result<u8, CliError> {
    let json = cli.json;
    let command = match cli.command {
        Commands::Completions { shell } => return commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => return commands::man_pages::run::<Cli>(&dir),
        other => other,
    };

    let root = cli.root.ok_or_else(|| CliError {
        code: EXIT_FAILURE,
        message: "--root <dir> is required".to_owned(),
    })?;
    let engine = Engine::new(root);

    match command {
        Commands::Init {
            base_image,
            prompt_style,
        } => commands::init::run(
            &engine,
            &InitOptions {
                base_image_path: base_image,
                prompt_style,
            },
            json,
        ),
        Commands::Reinit {
            base_image,
            prompt_style,
            yes,
        } => commands::reinit::run(
            &engine,
            &InitOptions {
                base_image_path: base_image,
                prompt_style,
            },
            yes,
            json,
        ),
        Commands::GenerateBase {
            identity,
            output,
            generator,
        } => commands::generate_base::run(&engine, &identity, output.as_deref(), &generator, json),
        Commands::BuildRequest {
            simple_name,
            description,
            base_image,
            output,
            generator,
        } => commands::build_request::run(
            &engine,
            &simple_name,
            &description,
            base_image.as_deref(),
            &output,
            &generator,
        ),
        Commands::Find { simple_name } => commands::find::run(&engine, &simple_name, json),
        Commands::Register {
            simple_name,
            spritelet_path,
            description,
        } => commands::register::run(&engine, &simple_name, &spritelet_path, &description, json),
        Commands::Signal { spritelet_path } => {
            commands::signal::run(&engine, &spritelet_path, json)
        }
        Commands::Publish {
            simple_name,
            description,
            force,
            generator,
        } => commands::publish::run(&engine, &simple_name, &description, force, &generator, json),
        Commands::Events { limit } => commands::events::run(&engine, limit, json),
        Commands::Verify => commands::verify::run(&engine, json),
        Commands::Completions { .. } | Commands::ManPages { .. } => Ok(commands::EXIT_SUCCESS),
    }
}
