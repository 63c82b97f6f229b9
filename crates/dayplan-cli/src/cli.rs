use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dayplan")]
#[command(about = "Plan your days from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new task
    #[command(alias = "new")]
    Add {
        /// Task title
        title: Vec<String>,
        /// Day to plan the task for (defaults to today)
        #[arg(short, long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
        /// Priority: low, normal, high or critical
        #[arg(short, long)]
        priority: Option<dayplan_core::models::Priority>,
        /// Estimated duration in minutes
        #[arg(long, value_name = "MINUTES")]
        estimate: Option<i64>,
        /// Display color (hex)
        #[arg(long)]
        color: Option<String>,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
    },
    /// List tasks for a day, a range, or everything
    List {
        /// Day to list (defaults to today)
        #[arg(short, long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
        /// Start of an inclusive day range
        #[arg(long, value_name = "YYYY-MM-DD", requires = "to")]
        from: Option<NaiveDate>,
        /// End of an inclusive day range
        #[arg(long, value_name = "YYYY-MM-DD", requires = "from")]
        to: Option<NaiveDate>,
        /// Include every task regardless of day
        #[arg(long, conflicts_with_all = ["date", "from", "to"])]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a task between open and completed
    Done {
        /// Task ID
        id: String,
    },
    /// Move a task to another day
    Postpone {
        /// Task ID
        id: String,
        /// Target day (defaults to the day after the task's current day)
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: Option<NaiveDate>,
    },
    /// Delete a task
    #[command(alias = "rm")]
    Delete {
        /// Task ID
        id: String,
    },
    /// Run one sync cycle against the remote store
    Sync {
        /// Principal to sync as (defaults to $DAYPLAN_USER)
        #[arg(long, value_name = "USER")]
        user: Option<String>,
    },
    /// Show the sync state of the local store
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
