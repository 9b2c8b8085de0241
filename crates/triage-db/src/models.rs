/// Database row types — these map directly to SQLite rows.
/// Distinct from triage-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct TicketRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub owner_id: String,
    pub owner_name: String,
    pub screenshot_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub ticket_id: String,
    pub author_id: String,
    pub author_name: String,
    pub body: String,
    pub is_internal: bool,
    pub created_at: String,
}

pub struct FileRow {
    pub id: String,
    pub uploader_id: String,
    pub kind: String,
    pub size: i64,
    pub created_at: String,
}
