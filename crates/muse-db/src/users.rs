use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::models::UserRow;
use crate::{Database, OptionalExt, format_timestamp, parse_timestamp};

const USER_COLUMNS: &str = "id, name, email, password, phone, created_at";

impl Database {
    /// Fails with a UNIQUE violation (see [`crate::is_unique_violation`]) when
    /// the email is taken.
    pub fn create_user(&self, user: &UserRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, phone, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.email,
                    user.password,
                    user.phone,
                    format_timestamp(user.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;
    stmt.query_row([value], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        phone: row.get(4)?,
        created_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
    })
}
