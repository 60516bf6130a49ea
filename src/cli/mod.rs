use serde::Serialize;

use crate::context::BrowsingContext;
use crate::error::{AppError, AppResult};
use crate::storage::{SharedStorage, StorageError};
use crate::theme::{ThemePreference, ThemeSync};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Show,
    Toggle,
    Set(ThemePreference),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub json: bool,
}

impl Command {
    pub fn parse<I, S>(args: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut json = false;
        let mut words = Vec::new();
        for arg in args {
            match arg.as_ref() {
                "--json" => json = true,
                other => words.push(other.to_string()),
            }
        }

        let action = match words.as_slice() {
            [] => Action::Show,
            [command] if command == "show" => Action::Show,
            [command] if command == "toggle" => Action::Toggle,
            [command, value] if command == "set" => Action::Set(
                ThemePreference::parse(value).ok_or_else(|| AppError::InvalidTheme(value.clone()))?,
            ),
            _ => return Err(AppError::UnknownCommand(words.join(" "))),
        };
        Ok(Self { action, json })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeReport {
    pub key: String,
    pub previous: Option<String>,
    pub preference: ThemePreference,
    pub is_dark_mode: bool,
}

impl ThemeReport {
    pub fn render(&self, json: bool) -> AppResult<String> {
        if json {
            return Ok(serde_json::to_string(self)?);
        }
        Ok(self.preference.to_string())
    }
}

/// Runs one command against `storage` from a fresh context and reports the
/// persisted result.
pub fn execute(command: &Command, storage: &SharedStorage, key: &str) -> AppResult<ThemeReport> {
    let previous = match storage.get_item(key) {
        Ok(previous) => previous,
        // Normalization below rewrites an unparsable store.
        Err(StorageError::Parse(err)) => {
            tracing::warn!(?err, key, "stored preferences are unparsable");
            None
        }
        Err(err) => return Err(err.into()),
    };

    let context = BrowsingContext::with_storage(storage.clone());
    let sync = ThemeSync::with_key(&context, key);
    sync.read_and_normalize();

    match command.action {
        Action::Show => {}
        Action::Toggle => {
            sync.toggle();
        }
        Action::Set(preference) => {
            if sync.preference() != preference {
                sync.toggle();
            }
        }
    }

    let expected = sync.preference();
    let persisted = storage.get_item(key)?;
    if persisted.as_deref() != Some(expected.as_str()) {
        return Err(AppError::NotPersisted {
            key: key.to_string(),
        });
    }

    tracing::info!(key, preference = %expected, action = ?command.action, "theme command applied");
    Ok(ThemeReport {
        key: key.to_string(),
        previous,
        preference: expected,
        is_dark_mode: expected.is_dark(),
    })
}
