//! Stored-session file: the bearer token and role from the last login,
//! kept on disk so later invocations stay signed in.

use std::{fs, io::ErrorKind, path::Path};

use anyhow::Context;
use client_core::Session;
use serde::{Deserialize, Serialize};
use shared::domain::Role;

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    role: Role,
}

pub fn load(path: &Path) -> anyhow::Result<Option<Session>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read session file '{}'", path.display()))
        }
    };
    let stored: StoredSession = toml::from_str(&raw)
        .with_context(|| format!("session file '{}' is corrupt", path.display()))?;
    Ok(Some(Session::new(stored.token, stored.role)))
}

pub fn save(path: &Path, session: &Session) -> anyhow::Result<()> {
    let stored = StoredSession {
        token: session.token().to_string(),
        role: session.role,
    };
    let raw = toml::to_string_pretty(&stored).context("failed to encode session")?;
    fs::write(path, raw)
        .with_context(|| format!("failed to write session file '{}'", path.display()))
}

/// Removes the stored session. Returns whether one existed.
pub fn clear(path: &Path) -> anyhow::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err)
            .with_context(|| format!("failed to remove session file '{}'", path.display())),
    }
}
