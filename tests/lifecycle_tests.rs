//! End-to-end walks through the shift lifecycle, replaying each transition
//! outcome onto an in-memory snapshot between steps.

use pretty_assertions::assert_eq;
use uuid::Uuid;

use stationplan::database::models::{ApplicationStatus, ShiftStatus, UserRole};
use stationplan::error::AppError;
use stationplan::services::lifecycle::{self, Actor, ShiftSnapshot};

mod common;

fn user() -> Actor {
    Actor::new(Uuid::new_v4(), UserRole::User)
}

fn admin() -> Actor {
    Actor::new(Uuid::new_v4(), UserRole::Admin)
}

#[test]
fn full_staffing_flow_apply_approve_reopen() {
    common::setup_test_env();

    let mut snapshot = ShiftSnapshot {
        shift: common::open_shift(),
        applications: vec![],
    };
    let alice = user();
    let bob = user();
    let planner = admin();

    // Alice applies first; the open shift goes pending.
    let outcome = lifecycle::apply_to_shift(&snapshot, &alice).unwrap();
    common::apply_outcome(&mut snapshot, &outcome);
    assert_eq!(snapshot.shift.status, ShiftStatus::Pending);
    assert_eq!(snapshot.applications.len(), 1);

    // Bob applies second; no further status change.
    let outcome = lifecycle::apply_to_shift(&snapshot, &bob).unwrap();
    assert!(outcome.event.is_none());
    common::apply_outcome(&mut snapshot, &outcome);
    assert_eq!(snapshot.shift.status, ShiftStatus::Pending);
    assert_eq!(snapshot.applications.len(), 2);

    // The planner approves Alice. Bob is rejected in the same transition.
    let alice_application = snapshot
        .applications
        .iter()
        .find(|a| a.applicant_id == alice.user_id)
        .unwrap()
        .id;
    let outcome = lifecycle::approve_applicant(&snapshot, alice_application, &planner).unwrap();
    common::apply_outcome(&mut snapshot, &outcome);

    assert_eq!(snapshot.shift.status, ShiftStatus::Filled);
    let statuses: Vec<ApplicationStatus> = snapshot
        .applications
        .iter()
        .map(|a| {
            if a.applicant_id == alice.user_id {
                assert_eq!(a.decided_by, Some(planner.user_id));
            }
            a.status
        })
        .collect();
    assert!(statuses.contains(&ApplicationStatus::Assigned));
    assert!(statuses.contains(&ApplicationStatus::Rejected));
    assert_eq!(snapshot.active_applications().count(), 1);

    // Alice calls in sick; the planner reopens. Her application stays
    // assigned and the shift is open for new applicants.
    let outcome = lifecycle::reopen_shift(&snapshot, &planner).unwrap();
    common::apply_outcome(&mut snapshot, &outcome);

    assert_eq!(snapshot.shift.status, ShiftStatus::Open);
    let alice_status = snapshot
        .applications
        .iter()
        .find(|a| a.applicant_id == alice.user_id)
        .unwrap()
        .status;
    assert_eq!(alice_status, ApplicationStatus::Assigned);

    // Bob can apply again: his earlier application was rejected, not active.
    assert!(lifecycle::apply_to_shift(&snapshot, &bob).is_ok());
}

#[test]
fn withdraw_reverts_shift_and_allows_reapplication() {
    common::setup_test_env();

    let mut snapshot = ShiftSnapshot {
        shift: common::open_shift(),
        applications: vec![],
    };
    let alice = user();

    let outcome = lifecycle::apply_to_shift(&snapshot, &alice).unwrap();
    common::apply_outcome(&mut snapshot, &outcome);
    assert_eq!(snapshot.shift.status, ShiftStatus::Pending);

    // A second application from the same user is refused while the first
    // is still active.
    assert!(matches!(
        lifecycle::apply_to_shift(&snapshot, &alice),
        Err(AppError::Conflict(_))
    ));

    let application_id = snapshot.applications[0].id;
    let outcome = lifecycle::withdraw_application(&snapshot, application_id, &alice).unwrap();
    common::apply_outcome(&mut snapshot, &outcome);

    assert_eq!(snapshot.shift.status, ShiftStatus::Open);
    assert_eq!(
        snapshot.applications[0].status,
        ApplicationStatus::Withdrawn
    );

    // After withdrawing, Alice may apply again.
    let outcome = lifecycle::apply_to_shift(&snapshot, &alice).unwrap();
    common::apply_outcome(&mut snapshot, &outcome);
    assert_eq!(snapshot.shift.status, ShiftStatus::Pending);
    assert_eq!(snapshot.applications.len(), 2);
}

#[test]
fn cancellation_is_terminal_and_rejects_active_applications() {
    common::setup_test_env();

    let mut snapshot = ShiftSnapshot {
        shift: common::open_shift(),
        applications: vec![],
    };
    let alice = user();
    let planner = admin();

    let outcome = lifecycle::apply_to_shift(&snapshot, &alice).unwrap();
    common::apply_outcome(&mut snapshot, &outcome);

    let outcome = lifecycle::cancel_shift(&snapshot, &planner).unwrap();
    common::apply_outcome(&mut snapshot, &outcome);

    assert_eq!(snapshot.shift.status, ShiftStatus::Cancelled);
    assert_eq!(
        snapshot.applications[0].status,
        ApplicationStatus::Rejected
    );

    // Nothing moves a cancelled shift.
    assert!(matches!(
        lifecycle::apply_to_shift(&snapshot, &alice),
        Err(AppError::State(_))
    ));
    assert!(matches!(
        lifecycle::reopen_shift(&snapshot, &planner),
        Err(AppError::State(_))
    ));
    assert!(matches!(
        lifecycle::mark_filled(&snapshot, &planner),
        Err(AppError::State(_))
    ));
    assert!(matches!(
        lifecycle::cancel_shift(&snapshot, &planner),
        Err(AppError::State(_))
    ));
}

#[test]
fn admin_only_transitions_refuse_regular_users() {
    common::setup_test_env();

    let mut snapshot = ShiftSnapshot {
        shift: common::open_shift(),
        applications: vec![],
    };
    let alice = user();

    let outcome = lifecycle::apply_to_shift(&snapshot, &alice).unwrap();
    common::apply_outcome(&mut snapshot, &outcome);
    let application_id = snapshot.applications[0].id;

    assert!(matches!(
        lifecycle::approve_applicant(&snapshot, application_id, &alice),
        Err(AppError::PermissionDenied(_))
    ));
    assert!(matches!(
        lifecycle::reject_applicant(&snapshot, application_id, &alice),
        Err(AppError::PermissionDenied(_))
    ));
    assert!(matches!(
        lifecycle::mark_filled(&snapshot, &alice),
        Err(AppError::PermissionDenied(_))
    ));
    assert!(matches!(
        lifecycle::reopen_shift(&snapshot, &alice),
        Err(AppError::PermissionDenied(_))
    ));
    assert!(matches!(
        lifecycle::cancel_shift(&snapshot, &alice),
        Err(AppError::PermissionDenied(_))
    ));
}
