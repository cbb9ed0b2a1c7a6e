//! examforge CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "examforge", version, about = "Coverage-driven test assembly engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble an examination from a coverage plan
    Assemble {
        /// Path to the coverage plan TOML
        #[arg(long)]
        plan: PathBuf,

        /// Path to the item bank JSON file
        #[arg(long)]
        bank: PathBuf,

        /// Total items to assemble
        #[arg(long)]
        items: u32,

        /// Parallel forms to produce (1-5)
        #[arg(long, default_value = "1")]
        versions: usize,

        /// Keep slot order instead of shuffling items per form
        #[arg(long)]
        no_shuffle_items: bool,

        /// Keep option order instead of shuffling choices per form
        #[arg(long)]
        no_shuffle_choices: bool,

        /// Fixed shuffle seed for reproducible forms
        #[arg(long)]
        seed: Option<u64>,

        /// Allow unapproved bank items
        #[arg(long)]
        allow_unapproved: bool,

        /// Skip the generative fallback entirely
        #[arg(long)]
        offline: bool,

        /// Exam title printed on rendered forms
        #[arg(long, default_value = "Examination")]
        title: String,

        /// Output directory
        #[arg(long, default_value = "./examforge-output")]
        output: PathBuf,

        /// Config file path (providers)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate coverage plan TOML files
    Validate {
        /// Path to a plan file or directory
        #[arg(long)]
        plan: PathBuf,
    },

    /// Create starter config, plan, and bank files
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examforge=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assemble {
            plan,
            bank,
            items,
            versions,
            no_shuffle_items,
            no_shuffle_choices,
            seed,
            allow_unapproved,
            offline,
            title,
            output,
            config,
        } => {
            commands::assemble::execute(commands::assemble::AssembleArgs {
                plan,
                bank,
                items,
                versions,
                shuffle_items: !no_shuffle_items,
                shuffle_choices: !no_shuffle_choices,
                seed,
                allow_unapproved,
                offline,
                title,
                output,
                config,
            })
            .await
        }
        Commands::Validate { plan } => commands::validate::execute(plan),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
