use std::env;

use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use stationplan::database::models::{Application, ApplicationStatus, Shift, ShiftStatus, Urgency};
use stationplan::services::lifecycle::{ShiftSnapshot, TransitionOutcome};

pub fn setup_test_env() {
    unsafe {
        env::set_var("RUST_LOG", "debug");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn open_shift() -> Shift {
    let now = Utc::now().naive_utc();
    Shift {
        id: Uuid::new_v4(),
        station_id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
        start_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        urgency: Urgency::High,
        notes: Some("Early shift, dispatch desk".to_string()),
        posted_by: Uuid::new_v4(),
        status: ShiftStatus::Open,
        created_at: now,
        updated_at: now,
    }
}

/// Replays a transition outcome onto an in-memory snapshot the way the
/// repository layer replays it onto the database.
#[allow(dead_code)]
pub fn apply_outcome(snapshot: &mut ShiftSnapshot, outcome: &TransitionOutcome) {
    let now = Utc::now().naive_utc();
    snapshot.shift.status = outcome.shift_status;
    snapshot.shift.updated_at = now;

    for update in &outcome.application_updates {
        if let Some(application) = snapshot
            .applications
            .iter_mut()
            .find(|a| a.id == update.application_id)
        {
            application.status = update.status;
            if update.decided_by.is_some() {
                application.decided_by = update.decided_by;
            }
            application.updated_at = now;
        }
    }

    if let Some(draft) = &outcome.new_application {
        snapshot.applications.push(Application {
            id: Uuid::new_v4(),
            shift_id: draft.shift_id,
            applicant_id: draft.applicant_id,
            status: ApplicationStatus::Applied,
            decided_by: None,
            applied_at: now,
            updated_at: now,
        });
    }
}
