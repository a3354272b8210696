use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::task::{Category, Priority, TaskId};
use crate::views::{CategoryFilter, StatusFilter};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "studydesk",
    version,
    about = "Study Desk: a student's task list with today's focus",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "studydeskrc", global = true)]
    pub rc_file: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Summary, today's focus and the task list
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// List tasks matching the status and category filters
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Add a new task
    Add {
        /// Task title
        title: String,
        /// Subject or course (defaults to General)
        #[arg(long, short = 's')]
        subject: Option<String>,
        /// Study, Homework, Exam, Project or Personal
        #[arg(
            long,
            short = 'c',
            value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Category>())
        )]
        category: Option<Category>,
        /// Low, Medium or High
        #[arg(
            long,
            short = 'p',
            value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Priority>())
        )]
        priority: Option<Priority>,
        /// Due date: YYYY-MM-DD, today, tomorrow, +N, Nd, Nw or a weekday
        #[arg(long, conflicts_with = "no_due")]
        due: Option<String>,
        /// Add the task without a due date
        #[arg(long)]
        no_due: bool,
    },
    /// Toggle a task between pending and completed
    Done { id: TaskId },
    /// Delete a task
    Delete { id: TaskId },
    /// Replace a task's notes (no text clears them)
    Note {
        id: TaskId,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Remove every completed task
    Clear,
    /// Totals and completion percentage
    Stats,
    /// The top pending tasks by priority and due date
    Focus,
    /// Print the stored task collection as JSON
    Export,
    /// Print the effective configuration
    Show,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// all, active or completed
    #[arg(
        long,
        default_value = "all",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<StatusFilter>())
    )]
    pub status: StatusFilter,

    /// all or a category name
    #[arg(
        long,
        default_value = "all",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<CategoryFilter>())
    )]
    pub category: CategoryFilter,
}

impl Command {
    /// The command to run when none is given on the command line.
    pub fn from_default_name(name: &str) -> anyhow::Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Ok(Command::Dashboard {
                filters: FilterArgs::default(),
            }),
            "list" => Ok(Command::List {
                filters: FilterArgs::default(),
            }),
            "stats" => Ok(Command::Stats),
            "focus" => Ok(Command::Focus),
            other => Err(anyhow!(
                "invalid default.command: {other} (expected dashboard, list, stats or focus)"
            )),
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
