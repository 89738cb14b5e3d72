// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The CLI is a thin transport over the engine: each subcommand maps to one
//! engine operation and prints plain text.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::dag::TaskStatus;

/// Command-line arguments for `taskgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskgraph",
    version,
    about = "Manage personal projects as task DAGs and see what to work on next.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Taskgraph.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override `[storage].root_path`.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create, list, rename or delete projects.
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Insert, edit or remove tasks.
    #[command(subcommand)]
    Task(TaskCommand),

    /// Add or remove dependency edges.
    #[command(subcommand)]
    Dep(DepCommand),

    /// List the tasks that can be picked up right now.
    Available { project: String },

    /// Mark an active task done and show what it unlocked.
    Done(TaskRef),

    /// Interrupt an active task until an external event resumes it.
    Interrupt(TaskRef),

    /// Resume a snoozed task straight into work.
    Resume(TaskRef),

    /// List tasks with the given status across all projects.
    ByStatus { status: TaskStatus },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProjectCommand {
    New { name: String },
    List,
    Rm { project: String },
    Rename { project: String, name: String },
    /// Print every task with its status and dependencies.
    Show { project: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum TaskCommand {
    Add {
        project: String,
        name: String,
        #[arg(long)]
        detail: Option<String>,
        /// Insert as a dependency of this task.
        #[arg(long, value_name = "TASK", conflicts_with = "super_of")]
        sub_of: Option<String>,
        /// Insert as a task that depends on this one.
        #[arg(long, value_name = "TASK")]
        super_of: Option<String>,
    },
    Rm(TaskRef),
    Rename {
        #[command(flatten)]
        task: TaskRef,
        name: String,
    },
    Status {
        #[command(flatten)]
        task: TaskRef,
        status: TaskStatus,
    },
    /// Set a non-reserved metadata key.
    Meta {
        #[command(flatten)]
        task: TaskRef,
        key: String,
        value: String,
    },
    /// Remove a non-reserved metadata key.
    Unset {
        #[command(flatten)]
        task: TaskRef,
        key: String,
    },
    Show(TaskRef),
}

#[derive(Debug, Clone, Subcommand)]
pub enum DepCommand {
    Add {
        project: String,
        dependent: String,
        dependency: String,
    },
    Rm {
        project: String,
        dependent: String,
        dependency: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct TaskRef {
    pub project: String,
    pub task: String,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
