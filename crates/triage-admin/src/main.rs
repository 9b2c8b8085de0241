//! One-shot provisioning tool. `init` creates the database schema;
//! `grant`/`revoke` flip an account's admin role by email. This is the
//! bootstrap path for the first admin — the signup flow never creates
//! one.

use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::info;

use triage_db::Database;
use triage_types::models::Role;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triage=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let db_path = std::env::var("TRIAGE_DB_PATH").unwrap_or_else(|_| "triage.db".into());

    match args.as_slice() {
        [cmd] if cmd == "init" => {
            Database::open(&PathBuf::from(&db_path))?;
            info!("Schema provisioned at {}", db_path);
            Ok(())
        }
        [cmd, email] if cmd == "grant" => set_role(&db_path, email, Role::Admin),
        [cmd, email] if cmd == "revoke" => set_role(&db_path, email, Role::User),
        _ => {
            bail!("usage: triage-admin <init | grant <email> | revoke <email>>");
        }
    }
}

fn set_role(db_path: &str, email: &str, role: Role) -> anyhow::Result<()> {
    let db = Database::open(&PathBuf::from(db_path))?;

    let user = db
        .get_user_by_email(email)?
        .with_context(|| format!("no account with email {email}"))?;

    db.set_user_role(&user.id, role.as_str())?;
    info!("{} ({}) now has role {}", user.name, email, role.as_str());

    Ok(())
}
