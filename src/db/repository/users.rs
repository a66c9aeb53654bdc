use std::str::FromStr;

use rusqlite::params;

use super::{count, parse_timestamp};
use crate::db::{DatabaseError, Store};
use crate::models::*;

/// A user row together with its stored credential (hash or legacy plaintext).
pub(crate) struct UserCredentials {
    pub user: User,
    pub stored_password: String,
}

type UserColumns = (i64, String, String, Option<String>);

fn user_from_columns((id, email, role, created_at): UserColumns) -> Result<User, DatabaseError> {
    Ok(User {
        id,
        email,
        role: Role::from_str(&role)?,
        created_at: created_at.as_deref().and_then(parse_timestamp),
    })
}

pub(crate) fn find_credentials_by_email(
    store: &mut Store,
    email: &str,
) -> Result<Option<UserCredentials>, DatabaseError> {
    let row = store.query_first(
        "SELECT id, email, role, created_at, password FROM users WHERE email = ?1",
        params![email],
        |row| {
            Ok((
                (
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ),
                row.get::<_, String>(4)?,
            ))
        },
    )?;

    let Some((columns, stored_password)) = row else {
        return Ok(None);
    };
    Ok(Some(UserCredentials {
        user: user_from_columns(columns)?,
        stored_password,
    }))
}

pub fn get_user(store: &mut Store, id: i64) -> Result<Option<User>, DatabaseError> {
    store
        .query_first(
            "SELECT id, email, role, created_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )?
        .map(user_from_columns)
        .transpose()
}

pub fn count_users(store: &mut Store) -> Result<i64, DatabaseError> {
    count(store, "SELECT COUNT(*) FROM users", [])
}

/// Replace a user's stored credential with an already-hashed value.
pub fn update_user_password_hash(
    store: &mut Store,
    user_id: i64,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    store.execute(
        "UPDATE users SET password = ?1 WHERE id = ?2",
        params![password_hash, user_id],
    )?;
    Ok(())
}
