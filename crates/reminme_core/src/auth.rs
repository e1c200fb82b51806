//! Bearer token issuance and resolution.
//!
//! # Responsibility
//! - Create users and issue opaque API tokens for them.
//! - Resolve a presented token to its owner.
//!
//! # Invariants
//! - Plaintext tokens are returned once at issue time and never stored;
//!   `api_tokens` holds only the SHA-256 hex digest.
//! - Unknown and revoked tokens are indistinguishable to callers
//!   (`AuthError::InvalidToken`).

use crate::db::DbError;
use crate::model::UserId;
use log::info;
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Prefix of every issued token.
pub const TOKEN_PREFIX: &str = "rm_";
const TOKEN_RANDOM_BYTES: usize = 32;

pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and account administration failures.
#[derive(Debug)]
pub enum AuthError {
    /// Token is malformed, unknown or revoked.
    InvalidToken,
    InvalidEmail,
    DuplicateEmail(String),
    UnknownUser(String),
    Db(DbError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "invalid or revoked token"),
            Self::InvalidEmail => write!(f, "email must contain `@`"),
            Self::DuplicateEmail(email) => write!(f, "user with email `{email}` already exists"),
            Self::UnknownUser(user) => write!(f, "unknown user `{user}`"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for AuthError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: i64,
}

/// Freshly issued token. `token` is the only copy of the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: UserId,
}

/// Creates a user. Email is stored lowercase and must be unique.
pub fn create_user(
    conn: &Connection,
    email: &str,
    display_name: Option<&str>,
) -> AuthResult<User> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(AuthError::InvalidEmail);
    }
    if find_user_by_email(conn, &email)?.is_some() {
        return Err(AuthError::DuplicateEmail(email));
    }

    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO users (id, email, display_name) VALUES (?1, ?2, ?3);",
        params![
            id.to_string(),
            email,
            display_name.map(str::trim).filter(|name| !name.is_empty()),
        ],
    )?;
    info!("event=user_create module=auth status=ok");
    find_user_by_email(conn, &email)?.ok_or(AuthError::UnknownUser(email))
}

/// Looks up a user by email (case-insensitive).
pub fn find_user_by_email(conn: &Connection, email: &str) -> AuthResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, display_name, created_at FROM users WHERE email = ?1;",
            params![email.trim().to_lowercase()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((id, email, display_name, created_at)) = user else {
        return Ok(None);
    };
    let id = Uuid::parse_str(&id).map_err(|_| AuthError::UnknownUser(email.clone()))?;
    Ok(Some(User {
        id,
        email,
        display_name,
        created_at,
    }))
}

/// Issues a new token for `user_id` and stores its digest.
pub fn issue_token(
    conn: &Connection,
    user_id: UserId,
    label: Option<&str>,
) -> AuthResult<IssuedToken> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
        params![user_id.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(AuthError::UnknownUser(user_id.to_string()));
    }

    let token = generate_token();
    conn.execute(
        "INSERT INTO api_tokens (token_hash, user_id, label) VALUES (?1, ?2, ?3);",
        params![hash_token(&token), user_id.to_string(), label],
    )?;
    info!("event=token_issue module=auth status=ok");
    Ok(IssuedToken { token, user_id })
}

/// Resolves a presented bearer token to its owner.
pub fn resolve_token(conn: &Connection, token: &str) -> AuthResult<UserId> {
    let token = token.trim();
    if !token.starts_with(TOKEN_PREFIX) {
        return Err(AuthError::InvalidToken);
    }

    let row = conn
        .query_row(
            "SELECT user_id, revoked FROM api_tokens WHERE token_hash = ?1;",
            params![hash_token(token)],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;

    match row {
        Some((user_id, 0)) => Uuid::parse_str(&user_id).map_err(|_| AuthError::InvalidToken),
        _ => Err(AuthError::InvalidToken),
    }
}

/// Marks a token revoked. Revoking an unknown token fails with `InvalidToken`.
pub fn revoke_token(conn: &Connection, token: &str) -> AuthResult<()> {
    let changed = conn.execute(
        "UPDATE api_tokens SET revoked = 1 WHERE token_hash = ?1;",
        params![hash_token(token.trim())],
    )?;
    if changed == 0 {
        return Err(AuthError::InvalidToken);
    }
    info!("event=token_revoke module=auth status=ok");
    Ok(())
}

/// Returns the lowercase hex SHA-256 digest stored for a token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{TOKEN_PREFIX}{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::{generate_token, hash_token, TOKEN_PREFIX};

    #[test]
    fn generated_tokens_are_prefixed_and_unique() {
        let first = generate_token();
        let second = generate_token();
        assert!(first.starts_with(TOKEN_PREFIX));
        assert_eq!(first.len(), TOKEN_PREFIX.len() + 64);
        assert_ne!(first, second);
    }

    #[test]
    fn token_hash_is_hex_sha256() {
        let digest = hash_token("rm_example");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_eq!(digest, hash_token("rm_example"));
    }
}
