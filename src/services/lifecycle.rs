//! The shift lifecycle engine.
//!
//! Stateless, pure functions over a snapshot of a shift plus its
//! applications. Each operation validates the caller and the current state,
//! then returns the statuses to persist; it performs no I/O itself. The
//! repository layer applies the returned outcome in a single transaction.
//!
//! State graph: `open → pending → filled`, with `pending → open` and
//! `filled → open` (reopen), and any non-cancelled state → `cancelled`.
//! `cancelled` is terminal.

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{
    Application, ApplicationStatus, Shift, ShiftInput, ShiftStatus, UserRole,
};
use crate::error::AppError;

/// Resolved caller identity, passed explicitly into every operation.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    fn require_admin(&self) -> Result<(), AppError> {
        if self.role.can_manage_shifts() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "This action requires administrator rights".to_string(),
            ))
        }
    }
}

/// A shift and its applications as read in one consistent view,
/// applications ordered by applied-at, earliest first.
#[derive(Debug, Clone)]
pub struct ShiftSnapshot {
    pub shift: Shift,
    pub applications: Vec<Application>,
}

impl ShiftSnapshot {
    pub fn active_applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.iter().filter(|a| a.is_active())
    }

    fn find_application(&self, application_id: Uuid) -> Result<&Application, AppError> {
        self.applications
            .iter()
            .find(|a| a.id == application_id)
            .ok_or_else(|| {
                AppError::NotFound("Application not found on this shift".to_string())
            })
    }

    fn has_active_application_from(&self, user_id: Uuid) -> bool {
        self.active_applications()
            .any(|a| a.applicant_id == user_id)
    }
}

/// Shift status change record, consumed by the notification dispatcher and
/// the live feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub shift_id: Uuid,
    pub station_id: Uuid,
    pub from_status: ShiftStatus,
    pub to_status: ShiftStatus,
    pub actor_id: Uuid,
    pub occurred_at: NaiveDateTime,
}

/// A new application to insert alongside the shift update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDraft {
    pub shift_id: Uuid,
    pub applicant_id: Uuid,
}

/// A status change on an existing application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationUpdate {
    pub application_id: Uuid,
    pub status: ApplicationStatus,
    pub decided_by: Option<Uuid>,
}

/// Everything a lifecycle operation wants persisted, atomically.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub shift_id: Uuid,
    pub shift_status: ShiftStatus,
    pub new_application: Option<ApplicationDraft>,
    pub application_updates: Vec<ApplicationUpdate>,
    pub event: Option<LifecycleEvent>,
}

impl TransitionOutcome {
    fn new(snapshot: &ShiftSnapshot, to_status: ShiftStatus, actor: &Actor) -> Self {
        let from_status = snapshot.shift.status;
        let event = (from_status != to_status).then(|| LifecycleEvent {
            shift_id: snapshot.shift.id,
            station_id: snapshot.shift.station_id,
            from_status,
            to_status,
            actor_id: actor.user_id,
            occurred_at: Utc::now().naive_utc(),
        });

        Self {
            shift_id: snapshot.shift.id,
            shift_status: to_status,
            new_application: None,
            application_updates: Vec::new(),
            event,
        }
    }
}

/// Validate new-shift input. Station existence is the caller's concern
/// (checked against the station repository before this runs).
pub fn validate_shift_input(input: &ShiftInput) -> Result<(), AppError> {
    if input.end_time <= input.start_time {
        return Err(AppError::Validation(
            "Shift end time must be after its start time".to_string(),
        ));
    }
    Ok(())
}

/// A user applies to an open or pending shift. The shift's first
/// application moves it from open to pending.
pub fn apply_to_shift(
    snapshot: &ShiftSnapshot,
    actor: &Actor,
) -> Result<TransitionOutcome, AppError> {
    match snapshot.shift.status {
        ShiftStatus::Open | ShiftStatus::Pending => {}
        status => {
            return Err(AppError::State(format!(
                "Cannot apply to a {} shift",
                status
            )));
        }
    }

    if snapshot.has_active_application_from(actor.user_id) {
        return Err(AppError::Conflict(
            "You already have an active application for this shift".to_string(),
        ));
    }

    let to_status = match snapshot.shift.status {
        ShiftStatus::Open => ShiftStatus::Pending,
        other => other,
    };

    let mut outcome = TransitionOutcome::new(snapshot, to_status, actor);
    outcome.new_application = Some(ApplicationDraft {
        shift_id: snapshot.shift.id,
        applicant_id: actor.user_id,
    });
    Ok(outcome)
}

/// The applicant withdraws their own application while it is still
/// undecided. Withdrawing the last active application reopens the shift.
pub fn withdraw_application(
    snapshot: &ShiftSnapshot,
    application_id: Uuid,
    actor: &Actor,
) -> Result<TransitionOutcome, AppError> {
    let application = snapshot.find_application(application_id)?;

    if application.applicant_id != actor.user_id {
        return Err(AppError::PermissionDenied(
            "Only the applicant can withdraw an application".to_string(),
        ));
    }
    if application.status != ApplicationStatus::Applied {
        return Err(AppError::State(format!(
            "Cannot withdraw a {} application",
            application.status
        )));
    }

    let remaining_active = snapshot
        .active_applications()
        .filter(|a| a.id != application_id)
        .count();

    let to_status = if remaining_active == 0 && snapshot.shift.status == ShiftStatus::Pending {
        ShiftStatus::Open
    } else {
        snapshot.shift.status
    };

    let mut outcome = TransitionOutcome::new(snapshot, to_status, actor);
    outcome.application_updates.push(ApplicationUpdate {
        application_id,
        status: ApplicationStatus::Withdrawn,
        decided_by: None,
    });
    Ok(outcome)
}

/// An admin assigns the shift to one applicant. All other active
/// applications are rejected; the shift has exactly one assignee.
pub fn approve_applicant(
    snapshot: &ShiftSnapshot,
    application_id: Uuid,
    actor: &Actor,
) -> Result<TransitionOutcome, AppError> {
    actor.require_admin()?;

    match snapshot.shift.status {
        ShiftStatus::Open | ShiftStatus::Pending => {}
        status => {
            return Err(AppError::State(format!(
                "Cannot approve an applicant on a {} shift",
                status
            )));
        }
    }

    let application = snapshot.find_application(application_id)?;
    if application.status != ApplicationStatus::Applied {
        return Err(AppError::State(format!(
            "Cannot approve a {} application",
            application.status
        )));
    }

    let mut outcome = TransitionOutcome::new(snapshot, ShiftStatus::Filled, actor);
    outcome.application_updates.push(ApplicationUpdate {
        application_id,
        status: ApplicationStatus::Assigned,
        decided_by: Some(actor.user_id),
    });
    for sibling in snapshot
        .active_applications()
        .filter(|a| a.id != application_id)
    {
        outcome.application_updates.push(ApplicationUpdate {
            application_id: sibling.id,
            status: ApplicationStatus::Rejected,
            decided_by: Some(actor.user_id),
        });
    }
    Ok(outcome)
}

/// An admin rejects a single application. When the last active application
/// goes, a pending shift reverts to open.
pub fn reject_applicant(
    snapshot: &ShiftSnapshot,
    application_id: Uuid,
    actor: &Actor,
) -> Result<TransitionOutcome, AppError> {
    actor.require_admin()?;

    let application = snapshot.find_application(application_id)?;
    if application.status != ApplicationStatus::Applied {
        return Err(AppError::State(format!(
            "Cannot reject a {} application",
            application.status
        )));
    }

    let remaining_active = snapshot
        .active_applications()
        .filter(|a| a.id != application_id)
        .count();

    let to_status = if remaining_active == 0 && snapshot.shift.status == ShiftStatus::Pending {
        ShiftStatus::Open
    } else {
        snapshot.shift.status
    };

    let mut outcome = TransitionOutcome::new(snapshot, to_status, actor);
    outcome.application_updates.push(ApplicationUpdate {
        application_id,
        status: ApplicationStatus::Rejected,
        decided_by: Some(actor.user_id),
    });
    Ok(outcome)
}

/// Manual override: force the shift to filled for an out-of-band
/// assignment. Applications are left untouched.
pub fn mark_filled(snapshot: &ShiftSnapshot, actor: &Actor) -> Result<TransitionOutcome, AppError> {
    actor.require_admin()?;

    match snapshot.shift.status {
        ShiftStatus::Open | ShiftStatus::Pending => {}
        status => {
            return Err(AppError::State(format!(
                "Cannot mark a {} shift as filled",
                status
            )));
        }
    }

    Ok(TransitionOutcome::new(snapshot, ShiftStatus::Filled, actor))
}

/// Reopen a filled or pending shift. Applications are not resurrected or
/// demoted; an assigned application stays assigned. Cancelled shifts stay
/// cancelled.
pub fn reopen_shift(snapshot: &ShiftSnapshot, actor: &Actor) -> Result<TransitionOutcome, AppError> {
    actor.require_admin()?;

    match snapshot.shift.status {
        ShiftStatus::Filled | ShiftStatus::Pending => {}
        status => {
            return Err(AppError::State(format!(
                "Cannot reopen a {} shift",
                status
            )));
        }
    }

    Ok(TransitionOutcome::new(snapshot, ShiftStatus::Open, actor))
}

/// Cancel a shift from any non-cancelled state. Terminal: all active
/// applications are rejected and no transition leaves cancelled.
pub fn cancel_shift(snapshot: &ShiftSnapshot, actor: &Actor) -> Result<TransitionOutcome, AppError> {
    actor.require_admin()?;

    if snapshot.shift.status == ShiftStatus::Cancelled {
        return Err(AppError::State(
            "Shift is already cancelled".to_string(),
        ));
    }

    let mut outcome = TransitionOutcome::new(snapshot, ShiftStatus::Cancelled, actor);
    for application in snapshot.active_applications() {
        outcome.application_updates.push(ApplicationUpdate {
            application_id: application.id,
            status: ApplicationStatus::Rejected,
            decided_by: Some(actor.user_id),
        });
    }
    Ok(outcome)
}
