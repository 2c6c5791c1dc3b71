//! Tests for the campaign driver.

use tempfile::tempdir;

use super::{
    CampaignError, CampaignStatus, ResumeAdjustments, apply_adjustments, render_report,
    run_campaign, select_task_client,
};
use crate::checkpoint::{CampaignState, CheckpointStore};
use crate::tasklist::TaskList;
use crate::test_utils::FakeVcs;
use crate::types::{Check, ChangeId, IntegrationTask, Stage, TaskIndex};
use crate::vcs::Preview;

fn task(title: &str, source: &str, target: &str, checks: Vec<Check>) -> IntegrationTask {
    IntegrationTask {
        source: source.to_string(),
        target: target.to_string(),
        title: title.to_string(),
        client: "ws".to_string(),
        checks,
    }
}

fn two_branch_definition() -> TaskList {
    TaskList {
        view: vec!["//depot/...".to_string()],
        tasks: vec![
            task(
                "A",
                "//depot/a",
                "//depot/b",
                vec![Check::AlreadyIntegrated {
                    from: "//depot/b".to_string(),
                    to: "//depot/a".to_string(),
                }],
            ),
            task(
                "B",
                "//depot/b",
                "//depot/c",
                vec![Check::AlreadyIntegrated {
                    from: "//depot/c".to_string(),
                    to: "//depot/b".to_string(),
                }],
            ),
        ],
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: CheckpointStore,
    state: CampaignState,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let store = CheckpointStore::new(dir.path().join("campaign.json"));
    let mut state = CampaignState::new("tasks.json", "fp");
    store.save(&mut state).unwrap();
    Fixture {
        _dir: dir,
        store,
        state,
    }
}

#[test]
fn end_to_end_skip_then_submit() {
    // Task A's precondition fails (pending files), task B's passes.
    let mut fx = fixture();
    let definition = two_branch_definition();

    let mut vcs = FakeVcs::new();
    vcs.preview_results.push_back(Preview::Pending(vec![
        "//depot/a/x.c#2 - integrate".to_string(),
    ]));
    vcs.preview_results.push_back(Preview::AllIntegrated);

    let status =
        run_campaign(&mut fx.state, &definition, false, &mut vcs, &fx.store).unwrap();

    let CampaignStatus::Completed { report } = status else {
        panic!("expected completion");
    };

    let skipped: Vec<&str> = report.lines().filter(|l| l.starts_with("Skipped: A")).collect();
    let submitted: Vec<&str> = report
        .lines()
        .filter(|l| l.starts_with("Latest changes: B"))
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(submitted.len(), 1);

    // Checkpoint deleted: the campaign is over.
    assert!(!fx.store.exists());
    assert_eq!(vcs.submitted.len(), 1);
}

#[test]
fn safe_mode_pause_keeps_checkpoint_and_resume_finishes() {
    let mut fx = fixture();
    let definition = TaskList {
        view: vec![],
        tasks: vec![task("A", "//depot/a", "//depot/b", vec![])],
    };

    let mut vcs = FakeVcs::new();
    let status = run_campaign(&mut fx.state, &definition, true, &mut vcs, &fx.store).unwrap();
    assert_eq!(status, CampaignStatus::Paused { change: ChangeId(1000) });
    assert!(fx.store.exists());

    let mut resumed = fx.store.load().unwrap();
    assert_eq!(resumed.stage, Stage::Submit);

    // Plain resume goes straight to submission.
    let status = run_campaign(&mut resumed, &definition, true, &mut vcs, &fx.store).unwrap();
    assert!(matches!(status, CampaignStatus::Completed { .. }));
    assert_eq!(vcs.count("resolve"), 1);
    assert_eq!(vcs.submitted, vec![ChangeId(1000)]);
    assert!(!fx.store.exists());
}

#[test]
fn completed_tasks_are_not_rerun_on_resume() {
    let mut fx = fixture();
    let definition = two_branch_definition();

    // Checkpoint says task 1 finished in an earlier process.
    fx.state.resume_task = TaskIndex(2);
    fx.state.push_report("Skipped: A (recorded earlier)");

    let mut vcs = FakeVcs::new();
    let status =
        run_campaign(&mut fx.state, &definition, false, &mut vcs, &fx.store).unwrap();

    let CampaignStatus::Completed { report } = status else {
        panic!("expected completion");
    };

    // Task 1's preview was never re-issued: only task 2 ran.
    assert_eq!(vcs.count("integrate_preview"), 1);
    // The earlier report line survived verbatim.
    assert!(report.contains("Skipped: A (recorded earlier)"));
    assert!(report.contains("Latest changes: B"));
}

#[test]
fn terminal_stage_at_entry_advances_without_rerunning() {
    // Crash happened between a task reaching End and the campaign
    // advancing to the next index.
    let mut fx = fixture();
    let definition = two_branch_definition();
    fx.state.resume_task = TaskIndex(2);
    fx.state.stage = Stage::End;
    fx.state.push_report("Latest changes: B (change 900 submitted)");

    let mut vcs = FakeVcs::new();
    let status =
        run_campaign(&mut fx.state, &definition, false, &mut vcs, &fx.store).unwrap();

    assert!(matches!(status, CampaignStatus::Completed { .. }));
    assert!(vcs.calls.is_empty(), "no server command should run");
    assert!(!fx.store.exists());
}

#[test]
fn restart_rolls_back_active_change_first() {
    let mut fx = fixture();
    fx.state.stage = Stage::Resolve;
    fx.state.active_change = ChangeId(444);

    let mut vcs = FakeVcs::new();
    apply_adjustments(
        &mut fx.state,
        ResumeAdjustments {
            restart_task: true,
            jump_to: None,
        },
        &two_branch_definition(),
        &mut vcs,
        &fx.store,
    )
    .unwrap();

    assert_eq!(vcs.reverted, vec![ChangeId(444)]);
    assert_eq!(vcs.deleted, vec![ChangeId(444)]);
    assert_eq!(fx.state.active_change, ChangeId::NONE);
    assert_eq!(fx.state.stage, Stage::Start);
}

#[test]
fn restart_selects_the_tasks_workspace_before_rolling_back() {
    // The abandoned change was opened under the second task's client; the
    // revert and delete must address that workspace, not a default one.
    let mut fx = fixture();
    fx.state.resume_task = TaskIndex(2);
    fx.state.stage = Stage::Resolve;
    fx.state.active_change = ChangeId(555);

    let mut definition = two_branch_definition();
    definition.tasks[0].client = "ws-first".to_string();
    definition.tasks[1].client = "ws-second".to_string();

    let mut vcs = FakeVcs::new();
    apply_adjustments(
        &mut fx.state,
        ResumeAdjustments {
            restart_task: true,
            jump_to: None,
        },
        &definition,
        &mut vcs,
        &fx.store,
    )
    .unwrap();

    assert_eq!(vcs.clients_used, vec!["ws-second".to_string()]);
    assert_eq!(vcs.reverted, vec![ChangeId(555)]);
    assert_eq!(vcs.deleted, vec![ChangeId(555)]);
}

#[test]
fn client_selection_tolerates_a_shrunken_definition() {
    // The checkpointed index no longer exists; selection stays as-is and
    // the caller decides what to do with the rollback.
    let mut fx = fixture();
    fx.state.resume_task = TaskIndex(9);

    let mut vcs = FakeVcs::new();
    select_task_client(&fx.state, &two_branch_definition(), &mut vcs);
    assert!(vcs.clients_used.is_empty());
}

#[test]
fn jump_rolls_back_and_moves_the_resume_point() {
    let mut fx = fixture();
    fx.state.stage = Stage::Integrate;
    fx.state.active_change = ChangeId(444);

    let mut vcs = FakeVcs::new();
    apply_adjustments(
        &mut fx.state,
        ResumeAdjustments {
            restart_task: false,
            jump_to: Some(TaskIndex(2)),
        },
        &two_branch_definition(),
        &mut vcs,
        &fx.store,
    )
    .unwrap();

    // The first task's client was selected for the rollback commands.
    assert_eq!(vcs.clients_used, vec!["ws".to_string()]);
    assert_eq!(vcs.deleted, vec![ChangeId(444)]);
    assert_eq!(fx.state.resume_task, TaskIndex(2));
    assert_eq!(fx.state.stage, Stage::Start);
    assert_eq!(fx.state.active_change, ChangeId::NONE);
}

#[test]
fn jump_out_of_range_is_rejected_before_rollback() {
    let mut fx = fixture();
    fx.state.active_change = ChangeId(444);
    fx.state.stage = Stage::Integrate;

    let mut vcs = FakeVcs::new();
    let err = apply_adjustments(
        &mut fx.state,
        ResumeAdjustments {
            restart_task: false,
            jump_to: Some(TaskIndex(9)),
        },
        &two_branch_definition(),
        &mut vcs,
        &fx.store,
    )
    .unwrap_err();

    assert!(matches!(err, CampaignError::IndexOutOfRange { .. }));
    // Nothing was rolled back or selected for a rejected jump.
    assert!(vcs.calls.is_empty());
    assert!(vcs.clients_used.is_empty());
    assert_eq!(fx.state.active_change, ChangeId(444));
}

#[test]
fn adjustments_without_flags_change_nothing() {
    let mut fx = fixture();
    fx.state.stage = Stage::Submit;
    fx.state.active_change = ChangeId(7);

    let mut vcs = FakeVcs::new();
    apply_adjustments(
        &mut fx.state,
        ResumeAdjustments::default(),
        &two_branch_definition(),
        &mut vcs,
        &fx.store,
    )
    .unwrap();

    assert!(vcs.calls.is_empty());
    assert_eq!(fx.state.stage, Stage::Submit);
    assert_eq!(fx.state.active_change, ChangeId(7));
}

#[test]
fn stage_failure_propagates_and_checkpoint_survives() {
    let mut fx = fixture();
    let definition = TaskList {
        view: vec![],
        tasks: vec![task("A", "//depot/a", "//depot/b", vec![])],
    };

    let mut vcs = FakeVcs::new();
    vcs.fail("submit", "Merges still pending -- use 'resolve' to merge files.");

    let err =
        run_campaign(&mut fx.state, &definition, false, &mut vcs, &fx.store).unwrap_err();
    assert!(matches!(err, CampaignError::Pipeline(_)));

    let persisted = fx.store.load().unwrap();
    assert_eq!(persisted.stage, Stage::Submit);
    assert_eq!(persisted.active_change, ChangeId(1000));
}

#[test]
fn report_rendering_preserves_order() {
    let mut state = CampaignState::new("tasks.json", "fp");
    state.push_report("Skipped: A (frozen)");
    state.push_report("Latest changes: B (change 12 submitted)");

    let report = render_report(&state);
    let a = report.find("Skipped: A").unwrap();
    let b = report.find("Latest changes: B").unwrap();
    assert!(a < b);
}
