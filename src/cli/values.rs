//! Commands that read and write stored values

use anyhow::{bail, Context, Result};

use super::output::Output;
use super::session::Session;
use crate::domain::{Key, SavePolicy};

pub fn get(session: &Session, output: &Output, key: &str, raw: bool) -> Result<()> {
    let key = Key::new(key)?;
    let Some(bytes) = session.store().try_load(&key)? else {
        bail!("No value stored under '{}'", key);
    };

    if raw {
        print!("{}", String::from_utf8_lossy(&bytes));
        return Ok(());
    }

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("Value under '{}' is not JSON; use --raw to print it as is", key))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "key": key,
            "value": value,
        }));
    } else {
        output.data(&value);
    }

    Ok(())
}

pub fn set(
    session: &Session,
    output: &Output,
    key: &str,
    input: &str,
    as_string: bool,
    policy: Option<SavePolicy>,
) -> Result<()> {
    let key = Key::new(key)?;
    let value = if as_string {
        serde_json::Value::String(input.to_string())
    } else {
        serde_json::from_str(input)
            .with_context(|| format!("Invalid JSON value: {}; pass --string to store it as text", input))?
    };

    let policy = policy.unwrap_or(session.config().default_policy);
    let state = session.value(key.clone(), policy);

    // An unchanged value would not be written, but the record must exist
    if !state.set_value(value) {
        state.save_now();
    }
    state.dispose();
    session.finish()?;

    output.success(&format!("Saved '{}'", key));
    Ok(())
}

pub fn remove(session: &Session, output: &Output, key: &str) -> Result<()> {
    let key = Key::new(key)?;
    let removed = session
        .store()
        .try_delete(&key)
        .with_context(|| format!("Failed to remove '{}'", key))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "key": key,
            "removed": removed,
        }));
    } else if removed {
        output.success(&format!("Removed '{}'", key));
    } else {
        output.success(&format!("No value stored under '{}'", key));
    }

    Ok(())
}

pub fn list(session: &Session, output: &Output) -> Result<()> {
    let store = session.store();
    let mut entries = Vec::new();

    for key in store.keys()? {
        // A record deleted between listing and stat is skipped
        if let Some(entry) = store.entry(&key)? {
            entries.push(entry);
        }
    }
    tracing::debug!(count = entries.len(), root = %store.root().display(), "listed records");

    if output.is_json() {
        output.data(&entries);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No values stored in {}", store.root().display());
        return Ok(());
    }

    output.row(&["KEY", "SIZE", "MODIFIED", "DIGEST"]);
    for entry in &entries {
        let modified = entry
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let size = entry.size.to_string();
        output.row(&[entry.key.as_str(), size.as_str(), modified.as_str(), entry.digest.as_str()]);
    }

    Ok(())
}
