//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use okr_core::dashboard::StatusFilter;
use okr_core::model::{Category, Quarter};

pub mod commands;

/// Track objectives and key results, locally first, synced per owner
#[derive(Parser, Debug)]
#[command(name = "okr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Signed-in owner id (default: $OKR_OWNER or $OKR_USER; unset works offline)
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Local data directory (default: $OKR_DATA_DIR or ~/.okr)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Remote store database (default: $OKR_REMOTE or <data-dir>/remote.db)
    #[arg(long, global = true)]
    pub remote: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage objectives
    #[command(subcommand, visible_alias = "obj")]
    Objectives(ObjectivesCommands),

    /// Manage key results of an objective
    #[command(subcommand)]
    Kr(KrCommands),

    /// Record and list progress logs
    #[command(subcommand)]
    Log(LogCommands),

    /// Show dashboard stats
    Stats {
        /// Only count objectives in this quarter
        #[arg(long)]
        quarter: Option<Quarter>,
    },

    /// Reconcile local data with the remote store for the signed-in owner
    Sync,
}

// ============================================================================
// Objectives subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ObjectivesCommands {
    /// Create an objective
    Add {
        #[arg(long)]
        title: String,

        /// Due date, YYYY-MM-DD (default: end of the current quarter)
        #[arg(long)]
        deadline: Option<String>,

        /// Quarter (default: the current quarter)
        #[arg(long)]
        quarter: Option<Quarter>,

        #[arg(long, default_value = "work")]
        category: Category,

        /// Key result as TITLE=TARGET[:UNIT]; repeatable
        #[arg(long = "kr", value_name = "TITLE=TARGET[:UNIT]")]
        key_results: Vec<String>,
    },

    /// List objectives
    List {
        #[arg(long)]
        quarter: Option<Quarter>,

        #[arg(long, default_value = "all")]
        status: StatusFilter,
    },

    /// Show one objective with its key results
    Show { objective_id: String },

    /// Change objective fields
    Update {
        objective_id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        deadline: Option<String>,

        #[arg(long)]
        quarter: Option<Quarter>,

        #[arg(long)]
        category: Option<Category>,
    },

    /// Delete an objective (its logs are kept)
    Delete { objective_id: String },
}

// ============================================================================
// Key result subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum KrCommands {
    /// Add a key result to an objective
    Add {
        objective_id: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        target: f64,

        #[arg(long, default_value_t = 0.0)]
        current: f64,

        #[arg(long, default_value = "")]
        unit: String,
    },

    /// Edit a key result
    Edit {
        objective_id: String,
        kr_id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        target: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        current: Option<f64>,

        #[arg(long)]
        unit: Option<String>,
    },

    /// Remove a key result (linked logs are kept)
    Delete { objective_id: String, kr_id: String },
}

// ============================================================================
// Log subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Record a log entry, optionally advancing a key result
    Add {
        content: String,

        /// Key result this entry counts toward
        #[arg(long = "kr")]
        kr_id: Option<String>,

        /// Amount to add to the key result's current value
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        delta: f64,

        /// Display date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List log entries, newest first
    List,
}
