use std::sync::Arc;

use uuid::Uuid;

use crate::database::models::User;
use crate::database::repositories::user as user_repo;
use crate::error::AppError;
use crate::services::lifecycle::LifecycleEvent;

/// Delivery side of the notification boundary. The transport (push, mail)
/// lives outside this service; implementations only receive resolved
/// recipients.
pub trait LifecycleEventSink: Send + Sync {
    fn deliver(&self, event: &LifecycleEvent, recipient: &User);
}

/// Default sink: records deliveries in the log.
pub struct LogSink;

impl LifecycleEventSink for LogSink {
    fn deliver(&self, event: &LifecycleEvent, recipient: &User) {
        log::info!(
            "Notifying {} ({}): shift {} moved {} -> {}",
            recipient.name,
            recipient.id,
            event.shift_id,
            event.from_status,
            event.to_status
        );
    }
}

/// A user gets notified when they opted in globally and subscribed to the
/// shift's station.
pub fn should_notify(user: &User, station_id: Uuid) -> bool {
    user.notify_global_enable && user.notify_station_ids.contains(&station_id)
}

/// Consumes lifecycle events and fans them out to subscribed users.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn LifecycleEventSink>,
}

impl NotificationDispatcher {
    pub fn new(sink: Arc<dyn LifecycleEventSink>) -> Self {
        Self { sink }
    }

    pub fn log_only() -> Self {
        Self::new(Arc::new(LogSink))
    }

    pub async fn dispatch(&self, event: &LifecycleEvent) -> Result<(), AppError> {
        let recipients = user_repo::find_station_subscribers(event.station_id).await?;

        for recipient in recipients
            .iter()
            .filter(|user| should_notify(user, event.station_id))
        {
            self.sink.deliver(event, recipient);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::UserRole;
    use chrono::Utc;

    fn user_with_prefs(global_enable: bool, stations: Vec<Uuid>) -> User {
        let now = Utc::now().naive_utc();
        User {
            id: Uuid::new_v4(),
            email: "subscriber@example.com".to_string(),
            password_hash: "hash".to_string(),
            name: "subscriber".to_string(),
            role: UserRole::User,
            language: "de".to_string(),
            notify_global_enable: global_enable,
            notify_station_ids: stations,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn notifies_only_subscribed_stations() {
        let station = Uuid::new_v4();
        let other_station = Uuid::new_v4();
        let user = user_with_prefs(true, vec![station]);

        assert!(should_notify(&user, station));
        assert!(!should_notify(&user, other_station));
    }

    #[test]
    fn global_opt_out_silences_everything() {
        let station = Uuid::new_v4();
        let user = user_with_prefs(false, vec![station]);

        assert!(!should_notify(&user, station));
    }
}
