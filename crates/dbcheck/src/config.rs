//! Database location loaded from environment variables.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Where the foot-count database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbTarget {
    pub path: PathBuf,
}

impl DbTarget {
    /// Load the database location from the environment.
    ///
    /// Expects `FOOTFALL_DB` to be set, either in the environment or in a
    /// `.env` file.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = lookup("FOOTFALL_DB")
            .filter(|value| !value.trim().is_empty())
            .context("FOOTFALL_DB environment variable not set")?;

        Ok(Self {
            path: PathBuf::from(path.trim()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_lookup() {
        let target = DbTarget::from_lookup(|key: &str| {
            (key == "FOOTFALL_DB").then(|| " data/foot_counts.db ".to_string())
        })
        .unwrap();
        assert_eq!(target.path, PathBuf::from("data/foot_counts.db"));
    }

    #[test]
    fn test_target_missing_variable() {
        let err = DbTarget::from_lookup(|_: &str| None).unwrap_err();
        assert!(err.to_string().contains("FOOTFALL_DB"));
    }

    #[test]
    fn test_target_blank_variable() {
        let err = DbTarget::from_lookup(|_: &str| Some("   ".to_string())).unwrap_err();
        assert!(err.to_string().contains("FOOTFALL_DB"));
    }
}
