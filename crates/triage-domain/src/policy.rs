//! The authorization policy, defined once. Handlers build an [`Actor`]
//! from the verified session claims and call these guards; the same
//! rules gate gateway event delivery and the SQL listing scope.

use uuid::Uuid;

use triage_types::models::Role;

use crate::error::{Error, Result};

/// The authenticated principal behind a request. Passed explicitly into
/// every guarded operation instead of living in ambient state.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Only admins may mutate ticket status or manage roles.
pub fn ensure_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(Error::Authorization(
            "admin role required".to_string(),
        ))
    }
}

/// The "owner or admin" rule: a ticket and its thread are visible and
/// writable to the ticket's owner and to admins, nobody else.
pub fn ensure_participant(actor: &Actor, ticket_owner_id: Uuid) -> Result<()> {
    if actor.is_admin() || actor.id == ticket_owner_id {
        Ok(())
    } else {
        Err(Error::Authorization(
            "not a participant of this ticket".to_string(),
        ))
    }
}

/// Listing scope, enforced at the data-access boundary: `None` means
/// unrestricted (admin); `Some(id)` restricts the query to that owner.
pub fn list_scope(actor: &Actor) -> Option<Uuid> {
    if actor.is_admin() { None } else { Some(actor.id) }
}

/// Internal notes may only be written and read by admins.
pub fn can_use_internal_notes(actor: &Actor) -> bool {
    actor.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Actor {
        Actor::new(Uuid::new_v4(), Role::User)
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    #[test]
    fn only_admins_pass_admin_guard() {
        assert!(ensure_admin(&admin()).is_ok());
        assert!(matches!(
            ensure_admin(&user()),
            Err(Error::Authorization(_))
        ));
    }

    #[test]
    fn owner_and_admin_are_participants() {
        let owner = user();
        assert!(ensure_participant(&owner, owner.id).is_ok());
        assert!(ensure_participant(&admin(), owner.id).is_ok());

        let stranger = user();
        assert!(matches!(
            ensure_participant(&stranger, owner.id),
            Err(Error::Authorization(_))
        ));
    }

    #[test]
    fn admins_list_unscoped_users_list_their_own() {
        assert_eq!(list_scope(&admin()), None);
        let actor = user();
        assert_eq!(list_scope(&actor), Some(actor.id));
    }
}
