//! Commands that report on keys and configuration without touching records

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::output::Output;
use super::session::load_config;
use crate::domain::Key;
use crate::storage::Config;

/// Prints the key a lazily bound value declared on `owner` as `name` uses
pub fn key(output: &Output, owner: Option<&str>, name: &str) -> Result<()> {
    let key = Key::derive_named(owner, name)?;

    if output.is_json() {
        output.data(&serde_json::json!({ "key": key }));
    } else {
        println!("{}", key);
    }

    Ok(())
}

pub fn config(output: &Output, root_override: Option<PathBuf>, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let file = config_path.map(Path::to_path_buf).or_else(Config::config_path);

    let (root, source) = match root_override {
        Some(root) => (Some(root), "override"),
        None if config.root.is_some() => (config.root.clone(), "config"),
        None => (Config::default_root(), "default"),
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "config_file": file,
            "root": root,
            "root_source": source,
            "default_policy": config.default_policy,
        }));
        return Ok(());
    }

    let show = |path: Option<&PathBuf>| {
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "(unavailable)".to_string())
    };
    println!("Config file:    {}", show(file.as_ref()));
    println!("Storage root:   {} ({})", show(root.as_ref()), source);
    println!("Default policy: {}", config.default_policy);

    Ok(())
}
