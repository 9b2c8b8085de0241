use crate::models::{FileRow, MessageRow, TicketRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// New accounts always get the least-privileged role; admin is
    /// granted later via `set_user_role`. Returns false when the email
    /// is already taken, so two racing signups resolve to one account
    /// and one conflict instead of a raw constraint error.
    pub fn create_user(&self, id: &str, name: &str, email: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (id, name, email, password, role) VALUES (?1, ?2, ?3, ?4, 'user')",
                (id, name, email, password_hash),
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Returns false when no such user exists.
    pub fn set_user_role(&self, id: &str, role: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE users SET role = ?2 WHERE id = ?1",
                (id, role),
            )?;
            Ok(affected > 0)
        })
    }

    // -- Tickets --

    /// Status is forced to 'open' here regardless of caller input.
    pub fn insert_ticket(
        &self,
        id: &str,
        title: &str,
        description: &str,
        owner_id: &str,
        screenshot_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tickets (id, title, description, status, owner_id, screenshot_id)
                 VALUES (?1, ?2, ?3, 'open', ?4, ?5)",
                (id, title, description, owner_id, screenshot_id),
            )?;
            Ok(())
        })
    }

    pub fn get_ticket(&self, id: &str) -> Result<Option<TicketRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{TICKET_SELECT} WHERE t.id = ?1"))?;
            let row = stmt.query_row([id], ticket_from_row).optional()?;
            Ok(row)
        })
    }

    /// Listing scope is enforced here, not in presentation: `Some(owner)`
    /// restricts the query so a non-admin can never receive a foreign
    /// ticket, `None` is the unrestricted admin view.
    pub fn list_tickets(&self, owner: Option<&str>) -> Result<Vec<TicketRow>> {
        self.with_conn(|conn| {
            let sql = match owner {
                Some(_) => format!(
                    "{TICKET_SELECT} WHERE t.owner_id = ?1 ORDER BY t.created_at DESC, t.rowid DESC"
                ),
                None => format!("{TICKET_SELECT} ORDER BY t.created_at DESC, t.rowid DESC"),
            };
            let mut stmt = conn.prepare(&sql)?;

            let rows = match owner {
                Some(owner_id) => stmt
                    .query_map([owner_id], ticket_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?,
                None => stmt
                    .query_map([], ticket_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?,
            };

            Ok(rows)
        })
    }

    /// Returns false when the ticket does not exist. Re-applying the
    /// current status still counts as an update (touches updated_at).
    pub fn update_ticket_status(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE tickets SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
                (id, status),
            )?;
            Ok(affected > 0)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        ticket_id: &str,
        author_id: &str,
        body: &str,
        is_internal: bool,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, ticket_id, author_id, body, is_internal)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, ticket_id, author_id, body, is_internal],
            )?;
            Ok(())
        })
    }

    /// Thread order: created_at ascending, rowid breaking ties so equal
    /// timestamps fall back to insertion order. Internal notes are
    /// filtered out here unless the caller is allowed to see them.
    pub fn list_messages(&self, ticket_id: &str, include_internal: bool) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT m.id, m.ticket_id, m.author_id, u.name, m.body, m.is_internal, m.created_at
                 FROM messages m
                 LEFT JOIN users u ON m.author_id = u.id
                 WHERE m.ticket_id = ?1 {}
                 ORDER BY m.created_at ASC, m.rowid ASC",
                if include_internal { "" } else { "AND m.is_internal = 0" }
            );
            let mut stmt = conn.prepare(&sql)?;

            let rows = stmt
                .query_map([ticket_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        ticket_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_name: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        body: row.get(4)?,
                        is_internal: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Files --

    pub fn insert_file(&self, id: &str, uploader_id: &str, kind: &str, size: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO files (id, uploader_id, kind, size) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, uploader_id, kind, size],
            )?;
            Ok(())
        })
    }

    pub fn get_file(&self, id: &str) -> Result<Option<FileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, uploader_id, kind, size, created_at FROM files WHERE id = ?1",
            )?;

            let row = stmt
                .query_row([id], |row| {
                    Ok(FileRow {
                        id: row.get(0)?,
                        uploader_id: row.get(1)?,
                        kind: row.get(2)?,
                        size: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    /// Owner of the ticket a screenshot is attached to, if any. Used to
    /// extend file read access to that ticket's participants.
    pub fn ticket_owner_for_file(&self, file_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let owner = conn
                .query_row(
                    "SELECT owner_id FROM tickets WHERE screenshot_id = ?1",
                    [file_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(owner)
        })
    }
}

const TICKET_SELECT: &str =
    "SELECT t.id, t.title, t.description, t.status, t.owner_id, u.name,
            t.screenshot_id, t.created_at, t.updated_at
     FROM tickets t
     LEFT JOIN users u ON t.owner_id = u.id";

fn ticket_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<TicketRow, rusqlite::Error> {
    Ok(TicketRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        owner_id: row.get(4)?,
        owner_name: row
            .get::<_, Option<String>>(5)?
            .unwrap_or_else(|| "unknown".to_string()),
        screenshot_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is a compile-time constant at every call site.
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, email, password, role, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users() -> (Database, String, String, String) {
        let db = Database::open_in_memory().unwrap();
        let (a, b, admin) = ("user-a", "user-b", "admin-1");
        db.create_user(a, "Alice", "alice@example.com", "hash-a").unwrap();
        db.create_user(b, "Bob", "bob@example.com", "hash-b").unwrap();
        db.create_user(admin, "Support", "support@example.com", "hash-s").unwrap();
        db.set_user_role(admin, "admin").unwrap();
        (db, a.to_string(), b.to_string(), admin.to_string())
    }

    #[test]
    fn new_users_default_to_least_privilege() {
        let (db, a, _, admin) = db_with_users();
        assert_eq!(db.get_user_by_id(&a).unwrap().unwrap().role, "user");
        assert_eq!(db.get_user_by_id(&admin).unwrap().unwrap().role, "admin");
    }

    #[test]
    fn duplicate_email_reports_conflict_not_error() {
        let (db, a, _, _) = db_with_users();
        assert!(!db
            .create_user("user-c", "Alice II", "alice@example.com", "hash-c")
            .unwrap());

        // The original account is untouched.
        let existing = db.get_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(existing.id, a);
        assert_eq!(existing.name, "Alice");
        assert!(db.get_user_by_id("user-c").unwrap().is_none());
    }

    #[test]
    fn tickets_are_created_open_and_owned_by_creator() {
        let (db, a, _, _) = db_with_users();
        db.insert_ticket("t-1", "Printer broken", "No power", &a, None).unwrap();

        let ticket = db.get_ticket("t-1").unwrap().unwrap();
        assert_eq!(ticket.status, "open");
        assert_eq!(ticket.owner_id, a);
        assert_eq!(ticket.owner_name, "Alice");
    }

    #[test]
    fn owner_scoped_listing_never_leaks_foreign_tickets() {
        let (db, a, b, _) = db_with_users();
        db.insert_ticket("t-1", "Printer broken", "No power", &a, None).unwrap();
        db.insert_ticket("t-2", "Screen flickers", "Every morning", &b, None).unwrap();

        let bs_view = db.list_tickets(Some(&b)).unwrap();
        assert_eq!(bs_view.len(), 1);
        assert!(bs_view.iter().all(|t| t.owner_id == b));

        let admin_view = db.list_tickets(None).unwrap();
        assert_eq!(admin_view.len(), 2);
    }

    #[test]
    fn status_update_touches_only_status_and_updated_at() {
        let (db, a, _, _) = db_with_users();
        db.insert_ticket("t-1", "Printer broken", "No power", &a, None).unwrap();
        let before = db.get_ticket("t-1").unwrap().unwrap();

        assert!(db.update_ticket_status("t-1", "in-progress").unwrap());
        let after = db.get_ticket("t-1").unwrap().unwrap();

        assert_eq!(after.status, "in-progress");
        assert_eq!(after.title, before.title);
        assert_eq!(after.description, before.description);
        assert_eq!(after.owner_id, before.owner_id);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn updating_a_missing_ticket_reports_not_found() {
        let (db, _, _, _) = db_with_users();
        assert!(!db.update_ticket_status("no-such", "closed").unwrap());
    }

    #[test]
    fn thread_order_is_creation_time_then_insertion_order() {
        let (db, a, _, admin) = db_with_users();
        db.insert_ticket("t-1", "Printer broken", "No power", &a, None).unwrap();

        db.insert_message("m-1", "t-1", &a, "It's still broken", false).unwrap();
        db.insert_message("m-2", "t-1", &admin, "Looking into it", false).unwrap();
        db.insert_message("m-3", "t-1", &a, "Thanks", false).unwrap();

        // Collapse timestamps so only the rowid tie-break decides.
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET created_at = '2026-01-01 12:00:00'",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let thread = db.list_messages("t-1", true).unwrap();
        let ids: Vec<&str> = thread.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m-1", "m-2", "m-3"]);
    }

    #[test]
    fn internal_notes_hidden_without_permission() {
        let (db, a, _, admin) = db_with_users();
        db.insert_ticket("t-1", "Printer broken", "No power", &a, None).unwrap();
        db.insert_message("m-1", "t-1", &a, "It's still broken", false).unwrap();
        db.insert_message("m-2", "t-1", &admin, "vendor escalation pending", true).unwrap();

        let visible = db.list_messages("t-1", false).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "m-1");

        let full = db.list_messages("t-1", true).unwrap();
        assert_eq!(full.len(), 2);
    }

    #[test]
    fn empty_thread_is_an_empty_list() {
        let (db, a, _, _) = db_with_users();
        db.insert_ticket("t-1", "Printer broken", "No power", &a, None).unwrap();
        assert!(db.list_messages("t-1", true).unwrap().is_empty());
    }

    #[test]
    fn screenshot_reference_resolves_to_stored_file() {
        let (db, a, _, _) = db_with_users();
        db.insert_file("f-1", &a, "screenshot", 1024).unwrap();
        db.insert_ticket("t-1", "Printer broken", "No power", &a, Some("f-1")).unwrap();

        let ticket = db.get_ticket("t-1").unwrap().unwrap();
        assert_eq!(ticket.screenshot_id.as_deref(), Some("f-1"));
        assert_eq!(db.ticket_owner_for_file("f-1").unwrap().as_deref(), Some(&*a));

        // Dangling references are refused by the schema.
        assert!(db
            .insert_ticket("t-2", "Other", "Body", &a, Some("missing-file"))
            .is_err());
    }
}
