//! CLI command definitions and handlers

pub mod ai;
pub mod board;
pub mod config;
pub mod data;
pub mod watch;

use crate::config::Config;
use crate::store::FileStore;
use crate::task::{Priority, TaskStatus};
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// PlanAI - kanban board with OKR tracking and an AI assistant
#[derive(Parser, Debug)]
#[command(name = "planai")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding workspace data (overrides config)
    #[arg(long, global = true, env = "PLANAI_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, value_parser = ["DEBUG", "INFO", "WARN", "ERROR"])]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage tasks on the board
    #[command(subcommand)]
    Task(TaskCommand),

    /// Manage objectives
    #[command(subcommand)]
    Goal(GoalCommand),

    /// Manage key results
    #[command(subcommand)]
    Kr(KrCommand),

    /// Manage the team roster
    #[command(subcommand)]
    Member(MemberCommand),

    /// Show board statistics and goal overview
    Stats,

    /// Write a backup of all data
    Export(ExportArgs),

    /// Restore data from a backup file
    Import(ImportArgs),

    /// Delete all data except reminder settings
    Clear(ClearArgs),

    /// Due-date reminders
    #[command(subcommand)]
    Notify(NotifyCommand),

    /// Run reminder checks on a timer until interrupted
    Watch,

    /// AI assistant
    #[command(subcommand)]
    Ai(AiCommand),

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task
    Add(TaskAddArgs),

    /// List tasks, optionally filtered
    List(TaskListArgs),

    /// Move a task to another column
    Move {
        /// Task id (or unique prefix)
        id: String,
        /// TODO, IN_PROGRESS, REVIEW or DONE
        status: TaskStatus,
    },

    /// Edit task fields
    Edit(TaskEditArgs),

    /// Delete a task
    Delete {
        /// Task id (or unique prefix)
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct TaskAddArgs {
    pub title: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    #[arg(short, long, default_value = "TODO")]
    pub status: TaskStatus,

    #[arg(short, long, default_value = "MEDIUM")]
    pub priority: Priority,

    /// Assignee name
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<NaiveDate>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Key result this task contributes to
    #[arg(long)]
    pub kr: Option<String>,

    /// Amount added to the key result when DONE
    #[arg(long, requires = "kr")]
    pub contribution: Option<f64>,

    /// Subtask titles
    #[arg(long = "subtask")]
    pub subtasks: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct TaskListArgs {
    /// Text to search in title, description, tags and assignee
    #[arg(short = 'q', long)]
    pub search: Option<String>,

    #[arg(short, long)]
    pub assignee: Option<String>,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    #[arg(short, long)]
    pub status: Option<TaskStatus>,

    /// Due on or after this day (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Due on or before this day (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<NaiveDate>,

    /// Output format
    #[arg(long, default_value = "default", value_parser = ["default", "json"])]
    pub format: String,
}

#[derive(Args, Debug, Default)]
pub struct TaskEditArgs {
    /// Task id (or unique prefix)
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub status: Option<TaskStatus>,

    #[arg(long)]
    pub priority: Option<Priority>,

    /// Assignee name (empty to unassign)
    #[arg(long)]
    pub assignee: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<NaiveDate>,

    /// Key result id (empty to unlink)
    #[arg(long)]
    pub kr: Option<String>,

    #[arg(long)]
    pub contribution: Option<f64>,

    #[arg(long)]
    pub outcome: Option<String>,

    #[arg(long)]
    pub note: Option<String>,

    /// Add a subtask
    #[arg(long = "subtask")]
    pub subtasks: Vec<String>,

    /// Mark the subtask at this 1-based position complete
    #[arg(long)]
    pub complete_subtask: Option<usize>,

    /// Cover image URL (empty to remove)
    #[arg(long, conflicts_with = "image_prompt")]
    pub image_url: Option<String>,

    /// Generate a cover image from this prompt
    #[arg(long)]
    pub image_prompt: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    /// Create an objective
    Add {
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: NaiveDate,
    },

    /// List objectives with their key results
    List,

    /// Delete an objective (linked tasks keep their links)
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum KrCommand {
    /// Add a key result to an objective
    Add {
        /// Objective id (or unique prefix)
        goal: String,

        title: String,

        #[arg(long)]
        target: f64,

        #[arg(long, default_value = "%")]
        unit: String,

        #[arg(long, default_value_t = 0.0)]
        current: f64,
    },

    /// Set a key result's current value
    Set {
        /// Key result id
        id: String,

        value: f64,
    },
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// Add a team member
    Add {
        name: String,

        /// Phone number for reminders
        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        role: Option<String>,
    },

    /// List team members with completed task counts
    List,

    /// Remove a team member
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Backup file to read
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Confirm deletion
    #[arg(long)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommand {
    /// Show or change reminder settings
    Settings(NotifySettingsArgs),

    /// Run one reminder check now
    Check,
}

#[derive(Args, Debug, Default)]
pub struct NotifySettingsArgs {
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    #[arg(long)]
    pub disable: bool,

    /// Messaging channel account id
    #[arg(long)]
    pub oa_id: Option<String>,

    /// Minutes between checks
    #[arg(long)]
    pub interval: Option<u32>,

    #[arg(long)]
    pub upcoming: Option<bool>,

    #[arg(long)]
    pub overdue: Option<bool>,
}

#[derive(Subcommand, Debug)]
pub enum AiCommand {
    /// Analyze how tasks support the objectives
    Strategy,

    /// Find bottlenecks on the board
    Workflow,

    /// Ask the assistant a question
    Chat {
        /// Message (can be multiple words)
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Reset the chat history
    ClearChat,

    /// Suggest subtasks for a task
    Subtasks {
        id: String,

        /// Add the suggestions to the task
        #[arg(long)]
        apply: bool,
    },

    /// Suggest a description for a task
    Describe {
        id: String,

        /// Replace the task description with the suggestion
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Initialize default configuration
    #[arg(long)]
    pub init: bool,

    /// Set a configuration value
    #[arg(long)]
    pub set: Option<String>,
}

/// Dispatch a parsed command
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = Config::load().await?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    match cli.command {
        Command::Config(args) => config::execute(args).await,
        Command::Task(command) => {
            let mut workspace = match &command {
                TaskCommand::Edit(args) if args.image_prompt.is_some() => {
                    open_with_ai(&config).await?
                }
                _ => open(&config).await?,
            };
            board::task(&mut workspace, command).await
        }
        Command::Goal(command) => board::goal(&mut open(&config).await?, command).await,
        Command::Kr(command) => board::key_result(&mut open(&config).await?, command).await,
        Command::Member(command) => board::member(&mut open(&config).await?, command).await,
        Command::Stats => board::stats(&open(&config).await?),
        Command::Export(args) => data::export(&open(&config).await?, args).await,
        Command::Import(args) => data::import(&mut open(&config).await?, args).await,
        Command::Clear(args) => data::clear(&mut open(&config).await?, args).await,
        Command::Notify(command) => data::notify(&mut open(&config).await?, command).await,
        Command::Watch => watch::execute(open(&config).await?).await,
        Command::Ai(command) => ai::execute(open_with_ai(&config).await?, command).await,
    }
}

async fn open(config: &Config) -> Result<Workspace> {
    let store = FileStore::from_config(config).await?;
    Workspace::open(Arc::new(store)).await
}

async fn open_with_ai(config: &Config) -> Result<Workspace> {
    let workspace = open(config).await?;
    let registry = crate::provider::ProviderRegistry::from_config(config)?;
    Ok(match registry.default_provider(config) {
        Some(provider) => workspace.with_assistant(crate::assistant::Assistant::new(
            provider,
            config.models.clone(),
        )),
        None => {
            tracing::warn!(
                provider = %config.default_provider,
                "No API key configured for provider; AI features disabled"
            );
            workspace
        }
    })
}

/// Start of `date` in UTC
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Find the single item whose id equals or starts with `prefix`
pub fn resolve_id<'a, T>(
    items: &'a [T],
    prefix: &str,
    id: impl Fn(&T) -> &str,
    kind: &str,
) -> Result<&'a T> {
    if let Some(exact) = items.iter().find(|&item| id(item) == prefix) {
        return Ok(exact);
    }
    let mut matches = items.iter().filter(|&item| id(item).starts_with(prefix));
    let first = matches
        .next()
        .with_context(|| format!("No {kind} matches id `{prefix}`"))?;
    if matches.next().is_some() {
        anyhow::bail!("Id `{prefix}` matches more than one {kind}; use more characters");
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_task_add() {
        let cli = Cli::parse_from([
            "planai", "task", "add", "Close deal", "--status", "done", "--kr", "kr1",
            "--contribution", "2.5", "--due", "2025-03-01",
        ]);
        let Command::Task(TaskCommand::Add(args)) = cli.command else {
            panic!("expected task add");
        };
        assert_eq!(args.status, TaskStatus::Done);
        assert_eq!(args.contribution, Some(2.5));
        assert_eq!(
            day_start(args.due.unwrap()).to_rfc3339(),
            "2025-03-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_parse_task_edit_image() {
        let cli = Cli::parse_from([
            "planai", "task", "edit", "abc", "--image-prompt", "harbour at dawn",
        ]);
        let Command::Task(TaskCommand::Edit(args)) = cli.command else {
            panic!("expected task edit");
        };
        assert_eq!(args.image_prompt.as_deref(), Some("harbour at dawn"));
        assert_eq!(args.image_url, None);

        let both = Cli::try_parse_from([
            "planai", "task", "edit", "abc", "--image-prompt", "x", "--image-url", "y",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn test_resolve_id() {
        let mut a = Task::new("a");
        a.id = "abc123".to_string();
        let mut b = Task::new("b");
        b.id = "abd456".to_string();
        let tasks = vec![a, b];

        let found = resolve_id(&tasks, "abc", |t| t.id.as_str(), "task").unwrap();
        assert_eq!(found.title, "a");
        assert!(resolve_id(&tasks, "ab", |t| t.id.as_str(), "task").is_err());
        assert!(resolve_id(&tasks, "zz", |t| t.id.as_str(), "task").is_err());
    }
}
