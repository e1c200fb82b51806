//! Administrative entry point.
//!
//! # Responsibility
//! - Bootstrap accounts and API tokens; there is no sign-up route.
//! - Apply schema migrations ahead of a server start.
//!
//! # Invariants
//! - A plaintext token is printed once at issue time and never stored.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reminme_core::auth::{create_user, find_user_by_email, issue_token, revoke_token};
use reminme_core::db::migrations::{current_user_version, latest_version};
use reminme_core::{default_log_level, init_logging, open_db, AuthError};
use rusqlite::Connection;

const DB_PATH_ENV: &str = "REMINME_DB_PATH";
const DEFAULT_DB_PATH: &str = "reminme.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "reminme", about = "ReminMe administration", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database path (default: ./reminme.sqlite3)
    #[arg(long, global = true, env = "REMINME_DB_PATH")]
    db: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Check core linkage
    Ping,
    /// Print the core version
    Version,
    /// Apply pending schema migrations
    Migrate,
    /// Create an account
    CreateUser {
        email: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Issue an API token for an existing account
    IssueToken {
        email: String,

        /// Label shown next to the token
        #[arg(long)]
        label: Option<String>,
    },
    /// Revoke an API token
    RevokeToken { token: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Ok(log_dir) = std::env::var("REMINME_LOG_DIR") {
        init_logging(default_log_level(), &log_dir, false).context("failed to init logging")?;
    }

    match cli.command {
        Command::Ping => println!("reminme_core ping={}", reminme_core::ping()),
        Command::Version => println!("reminme_core version={}", reminme_core::core_version()),
        command => {
            let db_path = resolve_db_path(cli.db, std::env::var(DB_PATH_ENV).ok());
            let conn = open_db(&db_path)
                .with_context(|| format!("failed to open database `{db_path}`"))?;
            execute(&conn, command, &db_path)?;
        }
    }
    Ok(())
}

/// Picks the first non-blank of the flag and the environment value.
fn resolve_db_path(explicit: Option<String>, from_env: Option<String>) -> String {
    explicit
        .filter(|value| !value.trim().is_empty())
        .or_else(|| from_env.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
}

fn execute(conn: &Connection, command: Command, db_path: &str) -> Result<()> {
    match command {
        Command::Ping | Command::Version => {}
        Command::Migrate => {
            println!(
                "{db_path}: schema version {} (latest {})",
                current_user_version(conn)?,
                latest_version()
            );
        }
        Command::CreateUser { email, name } => {
            let user = create_user(conn, &email, name.as_deref())?;
            println!("created user {} <{}>", user.id, user.email);
        }
        Command::IssueToken { email, label } => {
            let user = find_user_by_email(conn, &email)?
                .ok_or_else(|| AuthError::UnknownUser(email.clone()))?;
            let issued = issue_token(conn, user.id, label.as_deref())?;
            println!("{}", issued.token);
        }
        Command::RevokeToken { token } => {
            revoke_token(conn, &token)?;
            println!("token revoked");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{execute, resolve_db_path, Cli, Command, DEFAULT_DB_PATH};
    use clap::Parser;
    use reminme_core::auth::{find_user_by_email, issue_token, resolve_token};
    use reminme_core::open_db_in_memory;

    #[test]
    fn global_db_flag_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "reminme", "issue-token", "--label", "laptop", "a@b.c", "--db", "x.db",
        ])
        .expect("issue-token with flags should parse");
        assert_eq!(cli.db.as_deref(), Some("x.db"));
        assert_eq!(
            cli.command,
            Command::IssueToken {
                email: "a@b.c".to_string(),
                label: Some("laptop".to_string()),
            }
        );
    }

    #[test]
    fn rejects_unknown_commands_and_missing_values() {
        assert!(Cli::try_parse_from(["reminme"]).is_err());
        assert!(Cli::try_parse_from(["reminme", "frobnicate"]).is_err());
        assert!(Cli::try_parse_from(["reminme", "create-user"]).is_err());
        assert!(Cli::try_parse_from(["reminme", "create-user", "a@b.c", "--name"]).is_err());
        assert!(Cli::try_parse_from(["reminme", "ping", "--verbose"]).is_err());
    }

    #[test]
    fn blank_db_flag_falls_back_to_environment_then_default() {
        assert_eq!(
            resolve_db_path(Some(String::new()), Some("/data/rm.db".to_string())),
            "/data/rm.db"
        );
        assert_eq!(
            resolve_db_path(Some("cli.db".to_string()), Some("/data/rm.db".to_string())),
            "cli.db"
        );
        assert_eq!(
            resolve_db_path(Some("  ".to_string()), Some(String::new())),
            DEFAULT_DB_PATH
        );
        assert_eq!(resolve_db_path(None, None), DEFAULT_DB_PATH);
    }

    #[test]
    fn issue_token_requires_existing_user() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let command = Command::IssueToken {
            email: "nobody@example.com".to_string(),
            label: None,
        };
        assert!(execute(&conn, command, ":memory:").is_err());
    }

    #[test]
    fn revoked_token_stops_resolving() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        execute(
            &conn,
            Command::CreateUser {
                email: "ada@example.com".to_string(),
                name: Some("Ada".to_string()),
            },
            ":memory:",
        )
        .expect("create-user should succeed");
        let user = find_user_by_email(&conn, "ada@example.com")
            .expect("lookup should succeed")
            .expect("user should exist");
        let issued = issue_token(&conn, user.id, None).expect("token should be issued");
        assert_eq!(
            resolve_token(&conn, &issued.token).expect("fresh token should resolve"),
            user.id
        );

        execute(
            &conn,
            Command::RevokeToken {
                token: issued.token.clone(),
            },
            ":memory:",
        )
        .expect("revoke-token should succeed");
        assert!(resolve_token(&conn, &issued.token).is_err());
    }
}
