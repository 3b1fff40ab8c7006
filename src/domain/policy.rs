//! Save policies
//!
//! A policy decides when a mutation of a saveable value reaches the disk. It is
//! fixed for the lifetime of the value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("Unknown save policy '{0}': expected 'immediate' or 'on_dispose'")]
pub struct ParsePolicyError(String);

/// When value changes are written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Every change schedules a background save right away
    #[default]
    Immediate,
    /// Changes are saved once, when the value is disposed, and only if the
    /// final value differs from the initial one
    OnDispose,
}

impl SavePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavePolicy::Immediate => "immediate",
            SavePolicy::OnDispose => "on_dispose",
        }
    }

    /// Returns true if mutations schedule saves directly
    pub fn saves_on_change(&self) -> bool {
        *self == SavePolicy::Immediate
    }
}

impl fmt::Display for SavePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SavePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" | "immediately" => Ok(SavePolicy::Immediate),
            "on_dispose" | "on-dispose" | "disposed" => Ok(SavePolicy::OnDispose),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}
