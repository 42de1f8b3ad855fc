pub mod account;
pub mod assist;
pub mod decisions;
pub mod doctor;
pub mod export;
pub mod history;
pub mod prefs;
pub mod record;
pub mod stats;

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use neurolinker::config::NeuroConfig;
use neurolinker::storage::selector::select_backend;
use neurolinker::storage::types::{RecordId, User};
use neurolinker::storage::StorageBackend;

/// Email and password given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Select the storage backend for this process.
pub fn open_storage(config: &NeuroConfig) -> Result<Arc<dyn StorageBackend>> {
    select_backend(&config.storage).context("failed to open storage")
}

/// Resolve credentials to a signed-in user.
pub fn authenticate(storage: &dyn StorageBackend, credentials: &Credentials) -> Result<User> {
    let (Some(email), Some(password)) = (&credentials.email, &credentials.password) else {
        bail!("sign in with --email and --password (or NEUROLINKER_EMAIL / NEUROLINKER_PASSWORD)");
    };
    let Some(user_id) = storage
        .authenticate_user(email, password)
        .context("failed to check credentials")?
    else {
        bail!("invalid email or password");
    };
    load_user(storage, &user_id)
}

fn load_user(storage: &dyn StorageBackend, user_id: &RecordId) -> Result<User> {
    storage
        .get_user(user_id)
        .context("failed to load user")?
        .with_context(|| format!("user {user_id} no longer exists"))
}

/// Prompt on stdout and read one trimmed line. `None` at end of input.
pub fn prompt_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask for an explicit `yes`.
pub fn confirm(question: &str) -> Result<bool> {
    Ok(prompt_line(&format!("{question} Type yes to confirm: "))?
        .is_some_and(|answer| answer.eq_ignore_ascii_case("yes")))
}

/// Shorten `text` to `max` characters, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("नमस्ते दुनिया", 3).chars().count(), 3);
    }
}
