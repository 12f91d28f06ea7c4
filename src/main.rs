use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// NPyM - Serve the NPM registry to Python package managers
#[derive(Parser)]
#[command(name = "npym")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the full NPM name list into the distribution namespace
    ImportNames,

    /// Resolve the dependency tree for a package version and persist it
    Resolve {
        /// NPM package name (e.g. express)
        package: String,

        /// NPM version (e.g. 4.18.2)
        version: String,

        /// Only build and print the tree, without saving synthetic
        /// distributions
        #[arg(long)]
        dry_run: bool,
    },

    /// Synthesize the wheel for a package version
    Translate {
        /// NPM package name (e.g. express)
        package: String,

        /// NPM version (e.g. 4.18.2)
        version: String,
    },

    /// Look up the Python name mapped to an NPM package
    Search {
        /// Exact NPM package name
        package: String,
    },

    /// Delete cached archives
    PurgeArchives,

    /// Delete synthetic distributions and reset resolutions
    PurgeDerivates,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::ImportNames => commands::import_names::run(),
        Commands::Resolve {
            package,
            version,
            dry_run,
        } => commands::resolve::run(&package, &version, dry_run),
        Commands::Translate { package, version } => commands::translate::run(&package, &version),
        Commands::Search { package } => commands::search::run(&package),
        Commands::PurgeArchives => commands::purge::run_archives(),
        Commands::PurgeDerivates => commands::purge::run_derivates(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
