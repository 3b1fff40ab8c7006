//! # Command-Line Interface
//!
//! The `datasaver` binary inspects and edits a storage root directly.
//!
//! ## Commands
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Setup | Storage root | `init`, `init --save-config` |
//! | Values | Records | `get`, `set`, `rm`, `ls` |
//! | Inspect | Keys and config | `key --owner app::Settings theme`, `config` |
//!
//! ## Storage Root
//!
//! Resolved from `--root` (or `DATASAVER_ROOT`), then the `root` entry of the
//! config file, then the platform data directory.
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! `--verbose` (or `-v`) enables debug logs on stderr; `RUST_LOG` overrides
//! the filter.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod inspect;
mod output;
mod session;
mod values;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
