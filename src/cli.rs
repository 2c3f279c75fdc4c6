//! Timely - CLI Tool
//!
//! Command-line interface over the task API client.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use timely_client::api::{EffortLevel, NewTask, Task, TaskStatus, TaskType, TaskUpdate};
use timely_client::filters::TaskFilters;
use timely_client::{AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "timely")]
#[command(about = "CLI for the Timely task planner")]
struct Cli {
    /// API server URL (overrides config.yaml)
    #[arg(long, env = "TIMELY_API_URL")]
    server: Option<String>,

    /// Path to the YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks
    List(ListArgs),

    /// Show task details
    Show {
        /// Task ID
        id: i64,
    },

    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Task type (deadline, chore, streak)
        #[arg(short = 't', long = "type", default_value = "chore")]
        task_type: TaskType,

        #[arg(short, long)]
        desc: Option<String>,

        /// Effort (S, M, L, XL)
        #[arg(short, long)]
        effort: Option<EffortLevel>,

        /// Scheduled "do date" (YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        scheduled: Option<NaiveDateTime>,

        /// Hard deadline (YYYY-MM-DDTHH:MM:SS), required for root deadlines
        #[arg(long)]
        deadline: Option<NaiveDateTime>,

        /// Parent task ID for subtasks
        #[arg(long)]
        parent: Option<i64>,

        /// Chores: days after completion until the task comes back
        #[arg(long)]
        every: Option<u32>,
    },

    /// Mark a task done
    Done {
        /// Task ID
        id: i64,
    },

    /// Mark a task as not done
    Undone {
        /// Task ID
        id: i64,
    },

    /// Update task fields
    Update {
        /// Task ID
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        desc: Option<String>,

        #[arg(short, long)]
        effort: Option<EffortLevel>,

        #[arg(long)]
        scheduled: Option<NaiveDateTime>,

        #[arg(long)]
        deadline: Option<NaiveDateTime>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Status filter (repeatable)
    #[arg(short, long)]
    status: Vec<TaskStatus>,

    /// Task type filter (repeatable)
    #[arg(short = 't', long = "type")]
    task_types: Vec<TaskType>,

    /// Effort filter (repeatable)
    #[arg(short, long)]
    effort: Vec<EffortLevel>,

    /// Only tasks scheduled for today
    #[arg(long, conflicts_with = "overdue")]
    today: bool,

    /// Only overdue tasks
    #[arg(long)]
    overdue: bool,

    /// Scheduled on or after (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Scheduled on or before (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Text search
    #[arg(short = 'q', long)]
    search: Option<String>,

    /// Only tasks with (true) or without (false) a deadline
    #[arg(long)]
    has_deadline: Option<bool>,

    /// Only subtasks of this task
    #[arg(long)]
    parent: Option<i64>,
}

/// Build filters through the store so list fields collapse to absent when empty
fn apply_list_args(state: &AppState, args: ListArgs) -> TaskFilters {
    let store = &state.filters;
    store.set_statuses(args.status);
    store.set_task_types(args.task_types);
    store.set_efforts(args.effort);
    if args.today {
        store.show_only_today();
    } else if args.overdue {
        store.show_only_overdue();
    }
    store.set_date_range(args.from, args.to);
    if let Some(search) = args.search {
        store.set_search_query(search);
    }
    store.set_has_deadline(args.has_deadline);
    store.set_parent_id(args.parent);
    store.current()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,timely_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_yaml_and_env(Some(&cli.config))?;
    if let Some(server) = cli.server {
        config.api.base_url = server;
    }
    let state = AppState::new(config)?;

    match cli.command {
        Commands::List(args) => handle_list(&state, args).await,
        Commands::Show { id } => print_json(&state.queries.task(id).await?),
        Commands::Add {
            title,
            task_type,
            desc,
            effort,
            scheduled,
            deadline,
            parent,
            every,
        } => {
            let task = NewTask {
                title,
                task_type,
                description: desc,
                scheduled_date: scheduled,
                effort,
                parent_id: parent,
                deadline,
                recurrence_interval_days: every,
            };
            let created = state.mutations.create(&task).await?;
            println!("Created task: {}", created.id.unwrap_or_default());
            Ok(())
        }
        Commands::Done { id } => {
            let task = state.mutations.complete(id).await?;
            println!("Completed: {} ({})", task.title, describe_progress(&task));
            Ok(())
        }
        Commands::Undone { id } => {
            let task = state.mutations.uncomplete(id).await?;
            println!("Reopened: {}", task.title);
            Ok(())
        }
        Commands::Update {
            id,
            title,
            desc,
            effort,
            scheduled,
            deadline,
        } => {
            let updates = TaskUpdate {
                title,
                description: desc,
                effort,
                scheduled_date: scheduled,
                deadline,
                ..Default::default()
            };
            if updates.is_empty() {
                anyhow::bail!("Nothing to update");
            }
            print_json(&state.mutations.update(id, &updates).await?)
        }
        Commands::Delete { id } => {
            state.mutations.delete(id).await?;
            println!("Deleted task {}", id);
            Ok(())
        }
    }
}

async fn handle_list(state: &AppState, args: ListArgs) -> Result<()> {
    let filters = apply_list_args(state, args);
    let tasks = state.queries.tasks(&filters).await?;

    println!(
        "{:<6} {:<9} {:<5} {:<3} {:<17} {}",
        "ID", "TYPE", "STAT", "EFF", "SCHEDULED", "TITLE"
    );
    println!("{}", "-".repeat(80));
    for task in &tasks {
        print_row(task, 0);
    }
    if tasks.is_empty() && state.filters.has_active_filters() {
        println!("No tasks match the current filters");
    }
    Ok(())
}

fn print_row(task: &Task, depth: usize) {
    println!(
        "{:<6} {:<9} {:<5} {:<3} {:<17} {}{}",
        task.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
        task.task_type,
        task.status,
        task.effort.map(|e| e.to_string()).unwrap_or_else(|| "-".into()),
        task.scheduled_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".into()),
        "  ".repeat(depth),
        task.title
    );
    for child in &task.children {
        print_row(child, depth + 1);
    }
}

fn describe_progress(task: &Task) -> String {
    match task.task_type {
        TaskType::Streak => format!(
            "streak {} / best {}",
            task.current_streak, task.best_streak
        ),
        TaskType::Chore => match task.scheduled_date {
            Some(next) if task.status == TaskStatus::Todo => {
                format!("next on {}", next.format("%Y-%m-%d"))
            }
            _ => task.status.to_string(),
        },
        TaskType::Deadline => task.status.to_string(),
    }
}

fn print_json(task: &Task) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(task)?);
    Ok(())
}
