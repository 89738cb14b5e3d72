// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod store;
pub mod types;

use std::sync::Arc;

use tracing::debug;

use crate::cli::{CliArgs, Command, DepCommand, ProjectCommand, TaskCommand, TaskRef};
use crate::config::{default_config_path, load_or_default};
use crate::dag::{Attach, dispatcher};
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::store::{Project, Workspace};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (plus `--data-dir` override)
/// - the project catalog and repositories
/// - one engine operation per invocation
pub fn run(args: CliArgs) -> Result<()> {
    let (config_path, explicit) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (default_config_path(), false),
    };
    let mut cfg = load_or_default(&config_path, explicit)?;
    if let Some(dir) = args.data_dir {
        cfg.storage.root_path = dir;
    }
    debug!(root = ?cfg.storage.root_path, "using storage root");

    let mut ws = Workspace::open(Arc::new(RealFileSystem), &cfg)?;

    match args.command {
        Command::Project(cmd) => run_project(&mut ws, cmd),
        Command::Task(cmd) => run_task(&mut ws, cmd),
        Command::Dep(cmd) => run_dep(&mut ws, cmd),
        Command::Available { project } => {
            let snapshot = ws.project(&project)?.snapshot()?;
            for id in dispatcher::available_tasks(&snapshot.graph) {
                print_task_line(&snapshot, &id);
            }
            Ok(())
        }
        Command::Done(TaskRef { project, task }) => {
            let step = ws.with_retry(&project, |p| dispatcher::on_task_done(&mut p.graph, &task))?;
            let snapshot = ws.project(&project)?.snapshot()?;
            println!("done: {task}");
            for id in &step.newly_available {
                print!("unlocked: ");
                print_task_line(&snapshot, id);
            }
            Ok(())
        }
        Command::Interrupt(TaskRef { project, task }) => {
            ws.with_retry(&project, |p| dispatcher::interrupt(&mut p.graph, &task))?;
            println!("snoozed: {task}");
            Ok(())
        }
        Command::Resume(TaskRef { project, task }) => {
            let resumed =
                ws.with_retry(&project, |p| dispatcher::resume_on_event(&mut p.graph, &task))?;
            println!("active: {} {}", resumed.id, resumed.metadata.name());
            Ok(())
        }
        Command::ByStatus { status } => {
            for (project, tasks) in ws.tasks_with_status(status) {
                for task in tasks {
                    println!("{project} {task}");
                }
            }
            Ok(())
        }
    }
}

fn run_project(ws: &mut Workspace, cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::New { name } => {
            let id = ws.create_project(&name)?;
            println!("{id}");
        }
        ProjectCommand::List => {
            for entry in ws.index().list() {
                println!("{} {}", entry.id, entry.name);
            }
        }
        ProjectCommand::Rm { project } => ws.delete_project(&project)?,
        ProjectCommand::Rename { project, name } => ws.rename_project(&project, &name)?,
        ProjectCommand::Show { project } => {
            let snapshot = ws.project(&project)?.snapshot()?;
            println!("project: {}", snapshot.name);
            for id in snapshot.graph.tasks() {
                print_task_line(&snapshot, &id);
                for dep in snapshot.graph.dependencies_of(&id)? {
                    println!("    after: {dep}");
                }
            }
        }
    }
    Ok(())
}

fn run_task(ws: &mut Workspace, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Add {
            project,
            name,
            detail,
            sub_of,
            super_of,
        } => {
            let attach = match (sub_of, super_of) {
                (Some(parent), _) => Attach::SubTaskOf(parent),
                (None, Some(child)) => Attach::SuperTaskOf(child),
                (None, None) => Attach::TopLevel,
            };
            let id = ws.with_retry(&project, |p| {
                p.graph.insert_task(&name, detail.as_deref(), attach.clone())
            })?;
            println!("{id}");
        }
        TaskCommand::Rm(TaskRef { project, task }) => {
            ws.with_retry(&project, |p| p.graph.remove_task(&task).map(|_| ()))?;
        }
        TaskCommand::Rename { task, name } => {
            ws.with_retry(&task.project, |p| p.graph.rename_task(&task.task, &name))?;
        }
        TaskCommand::Status { task, status } => {
            ws.with_retry(&task.project, |p| p.graph.set_status(&task.task, status))?;
        }
        TaskCommand::Meta { task, key, value } => {
            ws.with_retry(&task.project, |p| {
                p.graph.set_metadata(&task.task, &key, &value)
            })?;
        }
        TaskCommand::Unset { task, key } => {
            ws.with_retry(&task.project, |p| {
                p.graph.remove_metadata(&task.task, &key).map(|_| ())
            })?;
        }
        TaskCommand::Show(TaskRef { project, task }) => {
            let meta = ws.project(&project)?.snapshot()?.graph.metadata(&task)?;
            for (key, value) in meta.to_map() {
                println!("{key}: {value}");
            }
        }
    }
    Ok(())
}

fn run_dep(ws: &mut Workspace, cmd: DepCommand) -> Result<()> {
    match cmd {
        DepCommand::Add {
            project,
            dependent,
            dependency,
        } => {
            let added =
                ws.with_retry(&project, |p| p.graph.add_dependency(&dependent, &dependency))?;
            if !added {
                println!("dependency already present");
            }
        }
        DepCommand::Rm {
            project,
            dependent,
            dependency,
        } => {
            let removed = ws.with_retry(&project, |p| {
                Ok(p.graph.remove_dependency(&dependent, &dependency))
            })?;
            if !removed {
                println!("no such dependency");
            }
        }
    }
    Ok(())
}

fn print_task_line(project: &Project, id: &str) {
    match project.graph.metadata(id) {
        Ok(meta) => println!("{id} [{}] {}", meta.status(), meta.name()),
        Err(_) => println!("{id}"),
    }
}
