//! CLI entry point for cms-ssg

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cms_ssg::{commands, Site};

#[derive(Parser)]
#[command(name = "cms-ssg")]
#[command(version)]
#[command(about = "Builds a static site from a CMS content snapshot", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every page of the site
    #[command(alias = "b")]
    Build {
        /// Output directory (overrides the settings)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Content locale (overrides settings and CONTENTFUL_LOCALE)
        #[arg(short, long)]
        locale: Option<String>,
    },

    /// Remove the output directory
    Clean,

    /// List snapshot entries
    List {
        /// Type of entries to list (post, author, page, collection, config)
        r#type: Option<String>,
    },

    /// Read or write the web config
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print one value of a persisted web config
    Get {
        /// Key to read, e.g. webHost
        key: String,

        /// Config file to read
        #[arg(short, long, default_value = "build/config.json")]
        file: PathBuf,
    },

    /// Write the web config as JSON
    Dump {
        /// File to write (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "cms_ssg=debug,info"
    } else {
        "cms_ssg=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run(cli) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    match cli.command {
        Commands::Build { output, locale } => {
            let mut site = Site::new(&base_dir)?;
            if let Some(output) = output {
                site.set_output_dir(output);
            }
            if let Some(locale) = locale {
                site.set_locale(&locale);
            }
            tracing::info!("Building site in {:?}", site.base_dir);
            let report = site.build()?;
            println!("Built {} files into {:?}", report.written.len(), site.output_dir);
        }

        Commands::Clean => {
            let site = Site::new(&base_dir)?;
            tracing::info!("Cleaning output folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let site = Site::new(&base_dir)?;
            commands::list::run(&site, r#type.as_deref())?;
        }

        Commands::Config { command } => match command {
            ConfigCommand::Get { key, file } => {
                let value = commands::config::get(base_dir.join(file), &key)?;
                print!("{}", value);
            }
            ConfigCommand::Dump { output } => {
                let site = Site::new(&base_dir)?;
                let output = output.map(|path| base_dir.join(path));
                commands::config::dump(&site, output.as_deref())?;
            }
        },

        Commands::Version => {
            println!("cms-ssg version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
