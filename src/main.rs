use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use integ_campaign::checkpoint::{CampaignState, CheckpointError, CheckpointStore};
use integ_campaign::driver::{
    CampaignError, CampaignStatus, ResumeAdjustments, apply_adjustments, run_campaign,
    select_task_client,
};
use integ_campaign::pipeline::rollback_active_change;
use integ_campaign::tasklist::{self, TaskList};
use integ_campaign::types::TaskIndex;
use integ_campaign::vcs::CliVcs;

/// Drives a multi-branch integration campaign with resumable checkpoints.
#[derive(Parser)]
#[command(name = "integ-campaign", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Task-list definition file.
    #[arg(long, default_value = "tasks.json")]
    tasks: PathBuf,

    /// Checkpoint file location.
    #[arg(long, default_value = "campaign.checkpoint.json")]
    checkpoint: PathBuf,

    /// Version-control command-line binary to invoke.
    #[arg(long, default_value = "p4")]
    vcs_bin: String,

    /// Submit immediately after resolve instead of pausing for review.
    #[arg(long)]
    unsafe_submit: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a fresh campaign. Fails if a checkpoint already exists.
    Start {
        #[command(flatten)]
        common: CommonArgs,

        /// Discard an existing checkpoint (rolling back its active change)
        /// and start over.
        #[arg(long)]
        force: bool,
    },

    /// Resume an interrupted campaign from its checkpoint.
    Resume {
        #[command(flatten)]
        common: CommonArgs,

        /// Proceed even if the task list changed since the checkpoint was
        /// written.
        #[arg(long)]
        ignore_fingerprint: bool,

        /// Restart the checkpointed task from its first stage, rolling
        /// back any active change.
        #[arg(long)]
        restart_task: bool,

        /// Jump to the given 1-based task index, rolling back any active
        /// change.
        #[arg(long, conflicts_with = "restart_task")]
        jump_to: Option<u32>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "integ_campaign=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(CampaignStatus::Completed { report }) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Ok(CampaignStatus::Paused { change }) => {
            // An intentional pause is a successful exit; the operator
            // reviews the pending change and resumes to submit it.
            println!(
                "Paused before submit. Review pending change {change}, then run \
                 `integ-campaign resume` to submit it."
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<CampaignStatus, CampaignError> {
    match command {
        Commands::Start { common, force } => {
            let loaded = tasklist::load(&common.tasks)?;
            let store = CheckpointStore::new(&common.checkpoint);
            let mut vcs = CliVcs::new(&common.vcs_bin);

            if store.exists() {
                if !force {
                    return Err(CheckpointError::AlreadyExists {
                        path: common.checkpoint.clone(),
                    }
                    .into());
                }
                discard_previous_campaign(&store, &loaded.list, &mut vcs)?;
            }

            let mut state = CampaignState::new(&loaded.source, &loaded.fingerprint);
            store.save(&mut state)?;

            run_campaign(
                &mut state,
                &loaded.list,
                !common.unsafe_submit,
                &mut vcs,
                &store,
            )
        }

        Commands::Resume {
            common,
            ignore_fingerprint,
            restart_task,
            jump_to,
        } => {
            let loaded = tasklist::load(&common.tasks)?;
            let store = CheckpointStore::new(&common.checkpoint);
            let mut vcs = CliVcs::new(&common.vcs_bin);

            let mut state = store.load_validated(&loaded.fingerprint, ignore_fingerprint)?;

            apply_adjustments(
                &mut state,
                ResumeAdjustments {
                    restart_task,
                    jump_to: jump_to.map(TaskIndex),
                },
                &loaded.list,
                &mut vcs,
                &store,
            )?;

            run_campaign(
                &mut state,
                &loaded.list,
                !common.unsafe_submit,
                &mut vcs,
                &store,
            )
        }
    }
}

/// Rolls back whatever the abandoned campaign left pending, then removes
/// its checkpoint so the fresh one starts clean.
fn discard_previous_campaign(
    store: &CheckpointStore,
    definition: &TaskList,
    vcs: &mut CliVcs,
) -> Result<(), CampaignError> {
    match store.load() {
        Ok(mut old) => {
            // The abandoned change lives in the old task's workspace.
            select_task_client(&old, definition, vcs);
            rollback_active_change(&mut old, vcs, store)?;
        }
        Err(err) => {
            tracing::warn!(error = %err, "existing checkpoint unreadable; discarding as-is");
        }
    }
    store.delete()?;
    Ok(())
}

fn report_error(err: &dyn std::error::Error) {
    eprintln!("error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("caused by: {cause}");
        source = cause.source();
    }
}
