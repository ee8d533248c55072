use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod picker;

#[derive(Parser)]
#[command(name = "swarmer")]
#[command(about = "Terminal front-end for the Locust load-testing tool", long_about = None)]
struct Cli {
    /// Workspace root to operate in (defaults to the current directory)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a locustfile with the Locust web UI and open it in the browser
    Run {
        /// Locustfile to run (picked interactively when omitted)
        file: Option<PathBuf>,
        /// Open the pre-run configuration form instead of the live dashboard
        #[arg(long)]
        form: bool,
    },
    /// Run a locustfile headless, streaming Locust's own output raw
    Headless {
        /// Locustfile to run (picked interactively when omitted)
        file: Option<PathBuf>,
        /// Extra arguments appended to the locust invocation
        #[arg(last = true)]
        extra: Vec<String>,
    },
    /// Run a single task headless via Locust's tag filter
    Task {
        /// Tag name of the task to run
        name: String,
        /// Locustfile to run (picked interactively when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Stop the most recently started run
    Stop,
    /// Discover locustfiles and print their users and tasks
    List {
        /// Keep watching the workspace and re-list on changes
        #[arg(long)]
        watch: bool,
    },
    /// Create a new locustfile from the template
    New {
        /// Directory to create it in (defaults to the workspace root)
        dir: Option<PathBuf>,
    },
    /// Convert a HAR capture into a locustfile with har2locust
    Convert {
        /// HAR file to convert
        har: PathBuf,
        /// Destination path (defaults to the HAR name with a .py extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let config = swarmer_core::Config::load()?;

    match cli.command {
        Commands::Run { file, form } => {
            commands::run_ui(&config, &workspace, file.as_deref(), form).await
        }
        Commands::Headless { file, extra } => {
            commands::run_headless(&config, &workspace, file.as_deref(), &extra).await
        }
        Commands::Task { name, file } => {
            commands::run_task(&config, &workspace, file.as_deref(), &name).await
        }
        Commands::Stop => commands::stop(&workspace).await,
        Commands::List { watch } => commands::list(&config, &workspace, watch).await,
        Commands::New { dir } => commands::new_locustfile(&workspace, dir.as_deref()),
        Commands::Convert { har, output } => commands::convert(&config, &har, output).await,
    }
}
