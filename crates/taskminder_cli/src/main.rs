//! Operator CLI for Taskminder.
//!
//! # Responsibility
//! - Map subcommands onto task lifecycle and reminder dispatch operations.
//! - Print results as JSON so output can be piped into other tools.
//!
//! # Invariants
//! - Configuration comes from an optional TOML file, then `.env`, then the
//!   process environment.
//! - Delivery goes through the log-backed transport; logs go to files when
//!   `logging.log_dir` is set and to stderr otherwise.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use taskminder_core::db::open_db;
use taskminder_core::{
    init_from_config, init_stderr_logging, spawn_daily_trigger, LogTransport, NewTask,
    ReminderCoordinator, SqliteTaskStore, SystemClock, TaskListQuery, TaskPatch, TaskService,
    TaskStatus, TaskminderConfig,
};
use uuid::Uuid;

type Service = TaskService<SqliteTaskStore>;

/// Task tracking with scheduled reminder digests.
#[derive(Parser)]
#[command(name = "taskminder", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "TASKMINDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Health check against the core crate.
    Ping,

    /// Print the core crate version.
    Version,

    /// Create a task; it always starts in `todo`.
    Add {
        description: String,
        /// Personal, Work or Fitness.
        #[arg(long, default_value = "Personal")]
        category: String,
        /// low, medium or high.
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Deadline as Unix epoch milliseconds.
        #[arg(long)]
        deadline: Option<i64>,
    },

    /// List tasks, optionally filtered.
    List {
        /// Repeatable: todo, in-progress, done.
        #[arg(long = "status")]
        statuses: Vec<String>,
        /// Only unresolved tasks (todo and in-progress).
        #[arg(long, conflicts_with = "statuses")]
        pending: bool,
        #[arg(long)]
        category: Option<String>,
    },

    /// Set a task's status.
    Status { id: Uuid, status: String },

    /// Move a task one step along todo -> in-progress -> done.
    Advance { id: Uuid },

    /// Change description, category, priority or deadline.
    Edit {
        id: Uuid,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<i64>,
        #[arg(long)]
        clear_deadline: bool,
    },

    /// Delete a task permanently.
    Delete { id: Uuid },

    /// Board progress and this month's completions.
    Stats,

    /// Trigger a reminder digest for all pending tasks.
    Remind {
        /// Wait for delivery and report the outcome.
        #[arg(long)]
        wait: bool,
        /// Trigger token; defaults to the configured secret.
        #[arg(long, env = "TASKMINDER_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Send a fixed test message through the transport.
    Probe {
        #[arg(long, env = "TASKMINDER_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Fire the reminder digest every day at the configured time until Ctrl-C.
    Daemon,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Ping => {
            println!("taskminder_core ping={}", taskminder_core::ping());
            return Ok(());
        }
        Command::Version => {
            println!("taskminder_core version={}", taskminder_core::core_version());
            return Ok(());
        }
        _ => {}
    }

    let config = TaskminderConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if !init_from_config(&config.logging).context("starting file logging")? {
        init_stderr_logging(&config.logging.level).context("starting stderr logging")?;
    }

    let conn = open_db(&config.database_path).with_context(|| {
        format!("opening database {}", config.database_path.display())
    })?;
    let service = Arc::new(TaskService::new(
        SqliteTaskStore::new(conn),
        Arc::new(SystemClock),
    ));

    run(cli.command, config, service).await
}

async fn run(command: Command, config: TaskminderConfig, service: Arc<Service>) -> Result<()> {
    match command {
        Command::Ping | Command::Version => Ok(()),
        Command::Add {
            description,
            category,
            priority,
            deadline,
        } => {
            let mut input = NewTask::new(description, category, priority);
            input.deadline = deadline;
            print_json(&service.create(&input)?)
        }
        Command::List {
            statuses,
            pending,
            category,
        } => {
            let mut query = if pending {
                TaskListQuery::by_status(&TaskStatus::PENDING)
            } else if statuses.is_empty() {
                TaskListQuery::default()
            } else {
                let parsed = statuses
                    .iter()
                    .map(|value| value.parse::<TaskStatus>())
                    .collect::<Result<Vec<_>, _>>()?;
                TaskListQuery::by_status(&parsed)
            };
            if let Some(category) = category {
                query = query.with_category(category.parse()?);
            }
            print_task_table(&service, &service.list(&query)?)
        }
        Command::Status { id, status } => print_json(&service.set_status(id, &status)?),
        Command::Advance { id } => print_json(&service.advance(id)?),
        Command::Edit {
            id,
            description,
            category,
            priority,
            deadline,
            clear_deadline,
        } => {
            let patch = TaskPatch {
                description,
                category,
                priority,
                deadline: if clear_deadline {
                    Some(None)
                } else {
                    deadline.map(Some)
                },
            };
            print_json(&service.update_fields(id, &patch)?)
        }
        Command::Delete { id } => {
            service.delete(id)?;
            print_json(&json!({ "deleted": id }))
        }
        Command::Stats => print_json(&json!({
            "board": service.board_stats()?,
            "month": service.monthly_stats()?,
        })),
        Command::Remind { wait, token } => {
            let token = token.unwrap_or_else(|| config.reminder.trigger_secret.clone());
            let coordinator = coordinator(&config, service);
            if wait {
                return print_json(&coordinator.trigger_sync(&token).await?);
            }
            let ack = coordinator.trigger_async(&token)?;
            print_json(&ack.response())?;
            // The process must outlive the background dispatch.
            ack.release().await.context("reminder dispatch task")??;
            Ok(())
        }
        Command::Probe { token } => {
            let token = token.unwrap_or_else(|| config.reminder.trigger_secret.clone());
            print_json(&coordinator(&config, service).send_probe(&token).await?)
        }
        Command::Daemon => run_daemon(config, service).await,
    }
}

async fn run_daemon(config: TaskminderConfig, service: Arc<Service>) -> Result<()> {
    if config.reminder.trigger_secret.is_empty() {
        bail!("daemon needs reminder.trigger_secret (or TASKMINDER_TRIGGER_SECRET)");
    }
    let schedule = config.reminder.daily_schedule()?;
    let token = config.reminder.trigger_secret.clone();
    let handle = spawn_daily_trigger(coordinator(&config, service), schedule, token);

    println!("taskminder daemon: daily digest at {schedule} UTC. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("event=daemon_stop module=cli status=ok");
    handle.abort();
    Ok(())
}

fn coordinator(
    config: &TaskminderConfig,
    service: Arc<Service>,
) -> ReminderCoordinator<SqliteTaskStore, LogTransport> {
    ReminderCoordinator::new(service, Arc::new(LogTransport), config.reminder.clone())
}

fn print_task_table(service: &Service, tasks: &[taskminder_core::Task]) -> Result<()> {
    let now = service.now_ms();
    let rows: Vec<_> = tasks
        .iter()
        .map(|task| {
            let remaining = task.time_remaining(now);
            json!({
                "task": task,
                "overdue": remaining.is_overdue(),
                "time_remaining": remaining.label(),
            })
        })
        .collect();
    print_json(&rows)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
