//! CLI `doctor` command: check configuration and storage, print a health report.

use std::path::Path;

use anyhow::Result;

use neurolinker::config::{default_config_path, expand_tilde, NeuroConfig};
use neurolinker::storage::local::Collection;
use neurolinker::storage::selector::select_backend;

/// Print a health report for configuration, storage and the assistant.
pub fn doctor(config: &NeuroConfig) -> Result<()> {
    let data_dir = config.resolved_data_dir();
    let config_path = default_config_path();

    println!("NeuroLinker Health Report");
    println!("=========================");
    println!();
    println!("Config file:       {}", describe_path(&config_path));
    println!("Log level:         {}", config.logging.log_level);
    println!();

    println!("Storage:");
    println!("  Force local:     {}", config.storage.force_local);
    match config.storage.credentials_path.as_deref() {
        Some(path) => println!("  Credentials:     {}", describe_path(&expand_tilde(path))),
        None => println!("  Credentials:     (not configured)"),
    }
    match select_backend(&config.storage) {
        Ok(backend) => println!("  Selected:        {} store", backend.kind()),
        Err(e) => println!("  Selected:        FAILED ({e})"),
    }
    println!();

    println!("Local data ({}):", data_dir.display());
    let mut all_ok = true;
    for collection in Collection::ALL {
        let path = data_dir.join(collection.file_name());
        let (status, ok) = check_collection(&path);
        all_ok &= ok;
        println!("  {:<18} {}", collection.file_name(), status);
    }
    println!();

    println!("Assistant:");
    println!("  Provider:        {}", config.assistant.provider);
    println!("  Model:           {}", config.assistant.model);
    let key_set = std::env::var(&config.assistant.api_key_env).is_ok_and(|k| !k.trim().is_empty());
    println!(
        "  API key:         {} ({})",
        if key_set { "set" } else { "MISSING" },
        config.assistant.api_key_env
    );

    if !all_ok {
        println!();
        println!("Recovery steps:");
        println!("  1. Restore the damaged file from a backup, or");
        println!("  2. Move it aside; an empty collection is created on next start.");
    }

    Ok(())
}

fn describe_path(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (missing)", path.display())
    }
}

/// Record count and size, or why the file is unusable.
fn check_collection(path: &Path) -> (String, bool) {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ("not created yet".into(), true),
        Err(e) => return (format!("UNREADABLE ({e})"), false),
    };
    match serde_json::from_str::<Vec<serde_json::Value>>(&contents) {
        Ok(records) => (
            format!("{} record(s), {}", records.len(), format_bytes(contents.len() as u64)),
            true,
        ),
        Err(e) => (format!("CORRUPT ({e})"), false),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
