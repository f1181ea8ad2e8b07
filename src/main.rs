use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use taskboard::{Backend, Config, TaskStatus, TaskStore, render, task};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "TaskBoard - a two-column to-do board with weekly statistics")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/taskboard/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the board's data
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show both columns (default)
    Board,

    /// Add a task to the To Do column
    Add {
        /// Task title
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Move a task to the Done column
    Done {
        /// Task id or unique prefix
        id: String,
    },

    /// Move a task back to the To Do column
    Todo {
        /// Task id or unique prefix
        id: String,
    },

    /// Move a task to the named column
    Move {
        /// Task id or unique prefix
        id: String,
        /// Target column: todo or done
        status: TaskStatus,
    },

    /// Change a task's title
    Rename {
        /// Task id or unique prefix
        id: String,
        /// New title
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Delete a task
    Rm {
        /// Task id or unique prefix
        id: String,
    },

    /// Show statistics for the last 7 days
    Stats,
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    // Open store
    let mut store = TaskStore::new(config.open_blob()?).with_key(&config.key)?;
    store.load()?;

    // Re-render whenever a command changes the board
    store.subscribe(|tasks| {
        let todo = task::column(tasks, TaskStatus::Todo);
        let done = task::column(tasks, TaskStatus::Done);
        print!("{}", render::board(&todo, &done));
    });

    match cli.command.unwrap_or(Commands::Board) {
        Commands::Board => {
            let todo = store.column(TaskStatus::Todo);
            let done = store.column(TaskStatus::Done);
            print!("{}", render::board(&todo, &done));
        }
        Commands::Add { title } => {
            let title = title.join(" ");
            if title.trim().is_empty() {
                return Err(eyre!("Task title cannot be blank"));
            }
            store.add(&title);
        }
        Commands::Done { id } => {
            let id = store.resolve_id(&id)?;
            store.update_status(&id, TaskStatus::Done);
        }
        Commands::Todo { id } => {
            let id = store.resolve_id(&id)?;
            store.update_status(&id, TaskStatus::Todo);
        }
        Commands::Move { id, status } => {
            let id = store.resolve_id(&id)?;
            store.update_status(&id, status);
        }
        Commands::Rename { id, title } => {
            let id = store.resolve_id(&id)?;
            store.rename(&id, &title.join(" "));
        }
        Commands::Rm { id } => {
            let id = store.resolve_id(&id)?;
            store.delete(&id);
        }
        Commands::Stats => print!("{}", render::weekly(&store.weekly_stats())),
    }

    if let Some(warning) = store.save_warning() {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    Ok(())
}
