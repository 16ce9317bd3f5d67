use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{diff, export, reapply, revert, status};

#[derive(Parser)]
#[command(name = "aitrack")]
#[command(version, about = "Review and export AI-made changes", long_about = None)]
struct Cli {
    /// Installation root containing the tracked directory trees
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Comma-separated root kinds to scan
    #[arg(short, long, default_value = "plugins,themes", global = true)]
    kinds: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show active trackers and their recorded changes
    Status,

    /// Show the diff for one tracked directory
    Diff {
        /// Tracked directory, e.g. plugins/my-plugin
        dir: String,
    },

    /// Restore a tracked file's original content on disk
    Revert {
        /// Installation-root-relative file path
        path: String,
    },

    /// Restore a tracked file's latest recorded content on disk
    Reapply {
        /// Installation-root-relative file path
        path: String,
    },

    /// Export a tracked directory as a standalone repository
    Export {
        /// Tracked directory, e.g. plugins/my-plugin
        dir: String,

        /// Location for the new repository
        target: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut manager = commands::build_manager(&cli.root, &cli.kinds);

    match cli.command {
        Commands::Status => status::run(&mut manager)?,
        Commands::Diff { dir } => diff::run(&mut manager, &dir)?,
        Commands::Revert { path } => revert::run(&mut manager, &path)?,
        Commands::Reapply { path } => reapply::run(&mut manager, &path)?,
        Commands::Export { dir, target } => export::run(&mut manager, &dir, &target)?,
    }

    Ok(())
}
