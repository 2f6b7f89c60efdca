//! okr - objectives and key results tracker

use std::env;

use anyhow::Result;
use clap::Parser;
use tracing::metadata::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use okr_cli::cli::commands::helpers::{flush_outbox, open_tracker, sign_in};
use okr_cli::cli::commands::{
    run_kr_add, run_kr_delete, run_kr_edit, run_log_add, run_log_list, run_objectives_add,
    run_objectives_delete, run_objectives_list, run_objectives_show, run_objectives_update,
    run_stats, run_sync,
};
use okr_cli::cli::{Cli, Commands, KrCommands, LogCommands, ObjectivesCommands};
use okr_cli::output::OutputFormat;
use okr_core::model::{KeyResultDraft, KeyResultPatch, ObjectivePatch};

const LOG_ENV_VAR: &str = "OKR_LOG";

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let env_var = if env::var_os(LOG_ENV_VAR).is_some() {
        LOG_ENV_VAR
    } else {
        EnvFilter::DEFAULT_ENV
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(env_var)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let tracker = open_tracker(cli.data_dir, cli.remote)?;

    // Starting a signed-in run is a sign-in: it syncs once before any command.
    // Only `okr sync` treats a failed sync as fatal.
    let startup = sign_in(&tracker, cli.owner.as_deref());
    let is_sync = matches!(cli.command, Commands::Sync);
    let startup = match startup {
        Some(Err(e)) if !is_sync => {
            warn!(error = %e, "Sign-in sync failed; continuing with local data");
            None
        }
        other => other,
    };

    let result = match cli.command {
        Commands::Objectives(cmd) => match cmd {
            ObjectivesCommands::Add {
                title,
                deadline,
                quarter,
                category,
                key_results,
            } => run_objectives_add(
                &tracker,
                &title,
                deadline,
                quarter,
                category,
                &key_results,
                format,
            ),
            ObjectivesCommands::List { quarter, status } => {
                run_objectives_list(&tracker, quarter, status, format)
            }
            ObjectivesCommands::Show { objective_id } => {
                run_objectives_show(&tracker, &objective_id, format)
            }
            ObjectivesCommands::Update {
                objective_id,
                title,
                deadline,
                quarter,
                category,
            } => {
                let patch = ObjectivePatch {
                    title,
                    quarter,
                    deadline,
                    category,
                    key_results: None,
                };
                run_objectives_update(&tracker, &objective_id, patch, format)
            }
            ObjectivesCommands::Delete { objective_id } => {
                run_objectives_delete(&tracker, &objective_id, format)
            }
        },

        Commands::Kr(cmd) => match cmd {
            KrCommands::Add {
                objective_id,
                title,
                target,
                current,
                unit,
            } => {
                let draft = KeyResultDraft {
                    title,
                    current,
                    target,
                    unit,
                };
                run_kr_add(&tracker, &objective_id, draft, format)
            }
            KrCommands::Edit {
                objective_id,
                kr_id,
                title,
                target,
                current,
                unit,
            } => {
                let patch = KeyResultPatch {
                    title,
                    current,
                    target,
                    unit,
                };
                run_kr_edit(&tracker, &objective_id, &kr_id, patch, format)
            }
            KrCommands::Delete {
                objective_id,
                kr_id,
            } => run_kr_delete(&tracker, &objective_id, &kr_id, format),
        },

        Commands::Log(cmd) => match cmd {
            LogCommands::Add {
                content,
                kr_id,
                delta,
                date,
            } => run_log_add(&tracker, &content, kr_id, delta, date, format),
            LogCommands::List => run_log_list(&tracker, format),
        },

        Commands::Stats { quarter } => run_stats(&tracker, quarter, format),

        Commands::Sync => run_sync(&tracker, startup, format),
    };

    // Mirror whatever the command changed, even if it then failed
    flush_outbox(&tracker);
    result
}
