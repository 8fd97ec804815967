use serde::Serialize;
use tokio::sync::broadcast;

use crate::database::models::Shift;
use crate::services::lifecycle::LifecycleEvent;

const DEFAULT_CAPACITY: usize = 256;

/// One push on the live feed: the shift snapshot after a mutation, plus the
/// lifecycle event when the status changed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedUpdate {
    pub shift: Shift,
    pub event: Option<LifecycleEvent>,
}

/// Live subscription feed over shift mutations. Push-based and eventually
/// consistent: subscribers that fall behind lose intermediate snapshots,
/// never the stream itself. Dropping a subscription unsubscribes it.
#[derive(Clone)]
pub struct ShiftFeed {
    sender: broadcast::Sender<FeedUpdate>,
}

impl ShiftFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a fresh snapshot. A feed without subscribers drops updates
    /// silently; that is not an error.
    pub fn publish(&self, shift: Shift, event: Option<LifecycleEvent>) {
        let _ = self.sender.send(FeedUpdate { shift, event });
    }

    pub fn subscribe(&self) -> ShiftFeedSubscription {
        ShiftFeedSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ShiftFeed {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ShiftFeedSubscription {
    receiver: broadcast::Receiver<FeedUpdate>,
}

impl ShiftFeedSubscription {
    /// Next update, skipping over anything the subscriber was too slow to
    /// see. Returns None once the feed itself is gone.
    pub async fn next(&mut self) -> Option<FeedUpdate> {
        loop {
            match self.receiver.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("Feed subscriber lagged, skipped {} updates", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ShiftStatus, Urgency};
    use chrono::{NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    fn sample_shift() -> Shift {
        let now = Utc::now().naive_utc();
        Shift {
            id: Uuid::new_v4(),
            station_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            urgency: Urgency::Medium,
            notes: None,
            posted_by: Uuid::new_v4(),
            status: ShiftStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn subscribers_see_published_updates() {
        let feed = ShiftFeed::new();
        let mut subscription = feed.subscribe();

        let shift = sample_shift();
        feed.publish(shift.clone(), None);

        let update = subscription.next().await.expect("update delivered");
        assert_eq!(update.shift.id, shift.id);
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_to_fresh_updates() {
        let feed = ShiftFeed::with_capacity(1);
        let mut subscription = feed.subscribe();

        let first = sample_shift();
        let second = sample_shift();
        feed.publish(first, None);
        feed.publish(second.clone(), None);

        // Capacity 1: the first update is overwritten; the subscriber
        // tolerates the gap and gets the latest snapshot.
        let update = subscription.next().await.expect("update delivered");
        assert_eq!(update.shift.id, second.id);
    }

    #[tokio::test]
    async fn dropping_a_subscription_unsubscribes_it() {
        let feed = ShiftFeed::new();
        let subscription = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn feed_without_subscribers_accepts_publishes() {
        let feed = ShiftFeed::new();
        feed.publish(sample_shift(), None);
    }
}
