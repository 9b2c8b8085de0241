//! Ticket status lifecycle. Every direction is permitted — admins can
//! reopen closed tickets — and re-applying the current status is a
//! successful no-op, not an error.

use triage_types::models::TicketStatus;

/// Status every ticket is created with, regardless of caller input.
pub const INITIAL_STATUS: TicketStatus = TicketStatus::Open;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Requested status equals the current one; nothing to persist
    /// beyond the updated-at touch.
    Unchanged(TicketStatus),
    Moved {
        from: TicketStatus,
        to: TicketStatus,
    },
}

pub fn transition(current: TicketStatus, requested: TicketStatus) -> StatusChange {
    if current == requested {
        StatusChange::Unchanged(current)
    } else {
        StatusChange::Moved {
            from: current,
            to: requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_status_is_a_noop() {
        assert_eq!(
            transition(TicketStatus::Open, TicketStatus::Open),
            StatusChange::Unchanged(TicketStatus::Open)
        );
    }

    #[test]
    fn closed_tickets_may_reopen() {
        assert_eq!(
            transition(TicketStatus::Closed, TicketStatus::Open),
            StatusChange::Moved {
                from: TicketStatus::Closed,
                to: TicketStatus::Open,
            }
        );
    }
}
