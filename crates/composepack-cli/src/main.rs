//! Composepack CLI - Helm-style charts for Docker Compose

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use composepack_core::CancelToken;
use miette::Result;

mod app;
mod commands;
mod config;
mod display;

use app::{Application, RenderOptions};

#[derive(Parser)]
#[command(name = "composepack")]
#[command(version)]
#[command(about = "Helm-style charts for Docker Compose", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Base directory for release runtime directories
    #[arg(long, global = true, env = "COMPOSEPACK_RELEASE_DIR")]
    release_dir: Option<PathBuf>,
}

#[derive(clap::Args, Clone)]
struct RenderArgs {
    /// Release name
    name: String,

    /// Chart source: directory, archive, or URL
    chart: String,

    /// Values file(s) to merge, in order
    #[arg(short = 'f', long = "values")]
    values: Vec<PathBuf>,

    /// Set values on the command line (key.path=value)
    #[arg(long = "set")]
    set: Vec<String>,

    /// Explicit runtime directory (basename must equal the release name)
    #[arg(long)]
    runtime_dir: Option<PathBuf>,
}

impl RenderArgs {
    fn into_options(self) -> RenderOptions {
        RenderOptions {
            release_name: self.name,
            chart_source: Some(self.chart),
            value_files: self.values,
            set_values: self.set,
            runtime_path: self.runtime_dir,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Install a release: render the chart and start its services
    Install {
        #[command(flatten)]
        render: RenderArgs,

        /// Start services after rendering
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        auto_start: bool,
    },

    /// Apply a release: re-render the chart and restart its services
    Apply {
        #[command(flatten)]
        render: RenderArgs,

        /// Start services after rendering
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        auto_start: bool,
    },

    /// Render a chart into its runtime directory without starting anything
    Template {
        #[command(flatten)]
        render: RenderArgs,

        /// Print only the runtime directory path
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show what would change if a chart were applied
    Diff {
        /// Release name
        name: String,

        /// Chart source; defaults to the one recorded in release metadata
        #[arg(long)]
        chart: Option<String>,

        /// Values file(s) to merge, in order
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on the command line (key.path=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Explicit runtime directory (basename must equal the release name)
        #[arg(long)]
        runtime_dir: Option<PathBuf>,

        /// Show line diffs for modified files
        #[arg(long)]
        show_files: bool,
    },

    /// Start a release's services
    Up {
        /// Release name
        name: String,

        /// Explicit runtime directory
        #[arg(long)]
        runtime_dir: Option<PathBuf>,
    },

    /// Stop a release's services
    Down {
        /// Release name
        name: String,

        /// Explicit runtime directory
        #[arg(long)]
        runtime_dir: Option<PathBuf>,
    },

    /// Show logs for a release's services
    Logs {
        /// Release name
        name: String,

        /// Follow log output
        #[arg(short = 'F', long)]
        follow: bool,

        /// Limit to a single service
        #[arg(short, long)]
        service: Option<String>,

        /// Explicit runtime directory
        #[arg(long)]
        runtime_dir: Option<PathBuf>,
    },

    /// List a release's containers
    Ps {
        /// Release name
        name: String,

        /// Explicit runtime directory
        #[arg(long)]
        runtime_dir: Option<PathBuf>,
    },

    /// Package a chart directory into a .cpack.tgz archive
    Package {
        /// Chart directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Destination directory
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// Output filename (defaults to <name>-<version>.cpack.tgz)
        #[arg(short, long)]
        output: Option<String>,

        /// Overwrite an existing archive
        #[arg(long)]
        force: bool,
    },

    /// Scaffold a new chart
    Init {
        /// Chart name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    if cli.debug {
        // SAFETY: We're the only thread at this point (start of main)
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }

    let cancel = CancelToken::new();
    let env: BTreeMap<String, String> = std::env::vars().collect();

    // Package and init never touch the releases directory
    match &cli.command {
        Commands::Package {
            path,
            destination,
            output,
            force,
        } => {
            return commands::package::run(
                path,
                destination.clone(),
                output.clone(),
                *force,
                &cancel,
            );
        }
        Commands::Init { name, output } => return commands::init::run(name, output),
        _ => {}
    }

    let base_dir = config::resolve_base_dir(cli.release_dir.clone())?;
    let app = Application::new(base_dir, env);

    match cli.command {
        Commands::Install { render, auto_start } => {
            commands::install::run(&app, &render.into_options(), auto_start, &cancel)
        }

        Commands::Apply { render, auto_start } => {
            commands::apply::run(&app, &render.into_options(), auto_start, &cancel)
        }

        Commands::Template { render, quiet } => {
            commands::template::run(&app, &render.into_options(), quiet, &cancel)
        }

        Commands::Diff {
            name,
            chart,
            values,
            set,
            runtime_dir,
            show_files,
        } => {
            let opts = RenderOptions {
                release_name: name,
                chart_source: chart,
                value_files: values,
                set_values: set,
                runtime_path: runtime_dir,
            };
            commands::diff::run(&app, &opts, show_files, &cancel)
        }

        Commands::Up { name, runtime_dir } => {
            commands::compose::up(&app, &name, runtime_dir.as_deref(), &cancel)
        }

        Commands::Down { name, runtime_dir } => {
            commands::compose::down(&app, &name, runtime_dir.as_deref(), &cancel)
        }

        Commands::Logs {
            name,
            follow,
            service,
            runtime_dir,
        } => commands::compose::logs(
            &app,
            &name,
            runtime_dir.as_deref(),
            follow,
            service.as_deref(),
            &cancel,
        ),

        Commands::Ps { name, runtime_dir } => {
            commands::compose::ps(&app, &name, runtime_dir.as_deref(), &cancel)
        }

        Commands::Package { .. } | Commands::Init { .. } => unreachable!(),
    }
}
