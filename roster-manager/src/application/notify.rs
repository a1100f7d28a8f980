use chrono::NaiveDateTime;
use roster_engine::MemberId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Change summaries pushed to real-time listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ScheduleEvent {
    ScheduleGenerated { services: Vec<NaiveDateTime>, fully_staffed: bool },
    ScheduleConfirmed { services: Vec<NaiveDateTime>, assignments: u64 },
    ScheduleEdited { original: NaiveDateTime, replacement: NaiveDateTime, assignments: u64 },
    ServiceDeleted { service_at: NaiveDateTime, removed: u64 },
    AbsenceRecorded { absence_id: i64, member_id: MemberId, removed: usize },
    AbsenceUpdated { absence_id: i64, member_id: MemberId, removed: usize },
    AbsenceRemoved { absence_id: i64, member_id: MemberId },
    MemberChanged { member_id: MemberId },
    MemberDeleted { member_id: MemberId },
}

/// Fire-and-forget publisher. Nothing here affects the outcome of the
/// operation that triggered the event.
#[derive(Debug, Clone)]
pub struct ScheduleNotifier {
    sender: broadcast::Sender<ScheduleEvent>,
}

impl ScheduleNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScheduleEvent> {
        self.sender.subscribe()
    }

    /// Returns how many listeners got the event.
    pub fn publish(&self, event: ScheduleEvent) -> usize {
        match self.sender.send(event) {
            Ok(listeners) => listeners,
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "no listeners");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listeners_receive_published_events() {
        let notifier = ScheduleNotifier::new(8);
        let mut rx = notifier.subscribe();

        let sent = notifier.publish(ScheduleEvent::MemberDeleted { member_id: 3 });

        assert_eq!(sent, 1);
        assert_eq!(rx.recv().await.unwrap(), ScheduleEvent::MemberDeleted { member_id: 3 });
    }

    #[test]
    fn publishing_without_listeners_is_fine() {
        let notifier = ScheduleNotifier::new(0);
        assert_eq!(notifier.publish(ScheduleEvent::MemberChanged { member_id: 1 }), 0);
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let json = serde_json::to_value(ScheduleEvent::MemberChanged { member_id: 1 }).unwrap();
        assert_eq!(json["event"], "member-changed");
    }
}
