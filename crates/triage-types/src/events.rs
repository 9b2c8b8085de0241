use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, TicketStatus};

/// Events pushed over the WebSocket gateway. These replace interval
/// polling: a client subscribes to the tickets it is viewing and the
/// server pushes changes as they happen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, name: String, role: Role },

    /// A new ticket was filed
    TicketCreate {
        ticket_id: Uuid,
        owner_id: Uuid,
        title: String,
        status: TicketStatus,
        created_at: chrono::DateTime<chrono::Utc>,
    },

    /// An admin moved a ticket to a new status
    TicketStatusUpdate {
        ticket_id: Uuid,
        owner_id: Uuid,
        status: TicketStatus,
        updated_at: chrono::DateTime<chrono::Utc>,
    },

    /// A new message was appended to a ticket's thread
    MessageCreate {
        id: Uuid,
        ticket_id: Uuid,
        ticket_owner_id: Uuid,
        author_id: Uuid,
        author_name: String,
        body: String,
        is_internal: bool,
        created_at: chrono::DateTime<chrono::Utc>,
    },
}

impl GatewayEvent {
    /// Returns the ticket this event is scoped to, if any. Ticket-scoped
    /// events are only delivered to connections subscribed to that ticket.
    pub fn ticket_id(&self) -> Option<Uuid> {
        match self {
            Self::TicketCreate { ticket_id, .. } => Some(*ticket_id),
            Self::TicketStatusUpdate { ticket_id, .. } => Some(*ticket_id),
            Self::MessageCreate { ticket_id, .. } => Some(*ticket_id),
            Self::Ready { .. } => None,
        }
    }

    /// The same ownership rule as reads, applied at the push boundary:
    /// admins see everything, everyone else only events for tickets they
    /// own. Internal notes are never pushed to non-admins.
    pub fn visible_to(&self, viewer_id: Uuid, viewer_is_admin: bool) -> bool {
        if viewer_is_admin {
            return true;
        }
        match self {
            Self::Ready { user_id, .. } => *user_id == viewer_id,
            Self::TicketCreate { owner_id, .. } => *owner_id == viewer_id,
            Self::TicketStatusUpdate { owner_id, .. } => *owner_id == viewer_id,
            Self::MessageCreate { ticket_owner_id, is_internal, .. } => {
                *ticket_owner_id == viewer_id && !is_internal
            }
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Subscribe to events for specific tickets. Replaces any previous
    /// subscription set; authorization is enforced at delivery time.
    Subscribe { ticket_ids: Vec<Uuid> },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_event(owner: Uuid) -> GatewayEvent {
        GatewayEvent::TicketStatusUpdate {
            ticket_id: Uuid::new_v4(),
            owner_id: owner,
            status: TicketStatus::InProgress,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn ticket_events_hidden_from_non_owners() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let event = status_event(owner);

        assert!(event.visible_to(owner, false));
        assert!(!event.visible_to(stranger, false));
        assert!(event.visible_to(stranger, true));
    }

    #[test]
    fn internal_notes_never_pushed_to_owners() {
        let owner = Uuid::new_v4();
        let event = GatewayEvent::MessageCreate {
            id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
            ticket_owner_id: owner,
            author_id: Uuid::new_v4(),
            author_name: "support".to_string(),
            body: "internal escalation note".to_string(),
            is_internal: true,
            created_at: chrono::Utc::now(),
        };

        assert!(!event.visible_to(owner, false));
        assert!(event.visible_to(Uuid::new_v4(), true));
    }
}
