//! Worker lifecycle state
//!
//! `Uninstalled -> Installing -> Installed -> Active`. A failed install ends
//! in `Redundant`; a new install may start from any state except `Installing`.
//! An `Active` worker stays `Active` through a re-install: it keeps control
//! while the new shell downloads, and a failed download leaves it in charge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    #[default]
    Uninstalled,
    Installing,
    Installed,
    Active,
    Redundant,
}

impl WorkerState {
    /// Whether fetches are routed through the caches
    pub fn controls_fetches(self) -> bool {
        self == WorkerState::Active
    }

    /// Check an install may start from this state
    pub fn begin_install(self) -> Result<WorkerState> {
        match self {
            WorkerState::Installing => Err(self.invalid("install")),
            WorkerState::Active => Ok(WorkerState::Active),
            _ => Ok(WorkerState::Installing),
        }
    }

    /// State once an install started from `self` has finished
    pub fn finish_install(self, succeeded: bool) -> WorkerState {
        match (self, succeeded) {
            (WorkerState::Active, _) => WorkerState::Active,
            (_, true) => WorkerState::Installed,
            (_, false) => WorkerState::Redundant,
        }
    }

    /// Check an activate may start from this state
    pub fn begin_activate(self) -> Result<WorkerState> {
        match self {
            WorkerState::Installed => Ok(WorkerState::Active),
            _ => Err(self.invalid("activate")),
        }
    }

    fn invalid(self, event: &str) -> Error {
        Error::InvalidTransition {
            from: self.to_string(),
            event: event.to_string(),
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Lifecycle state persisted between runs in `<cache-dir>/worker.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub state: WorkerState,
    /// Cache version the state belongs to
    pub version: String,
    pub updated_at: DateTime<Utc>,
}

impl WorkerRecord {
    pub fn path_in(cache_dir: &Path) -> PathBuf {
        cache_dir.join("worker.yaml")
    }

    /// Load the record, or `None` if nothing was persisted yet
    pub fn load(cache_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(cache_dir);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let record: WorkerRecord = serde_yaml::from_str(&contents)
            .map_err(|e| Error::Other(format!("Failed to parse {}: {}", path.display(), e)))?;
        Ok(Some(record))
    }

    pub fn save(&self, cache_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(cache_dir)?;
        let contents = serde_yaml::to_string(self)
            .map_err(|e| Error::Other(format!("Failed to serialize worker state: {}", e)))?;
        std::fs::write(Self::path_in(cache_dir), contents)?;
        Ok(())
    }

    /// State that applies to `version` when a router starts.
    ///
    /// A record for another version means this version was never installed.
    /// An install interrupted mid-way counts as failed.
    pub fn effective_state(record: Option<&Self>, version: &str) -> WorkerState {
        match record {
            Some(r) if r.version == version => match r.state {
                WorkerState::Installing => WorkerState::Redundant,
                state => state,
            },
            _ => WorkerState::Uninstalled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_install_transitions() {
        assert_eq!(
            WorkerState::Uninstalled.begin_install().unwrap(),
            WorkerState::Installing
        );
        assert_eq!(
            WorkerState::Active.begin_install().unwrap(),
            WorkerState::Active
        );
        assert!(WorkerState::Redundant.begin_install().is_ok());
        assert!(WorkerState::Installing.begin_install().is_err());
    }

    #[test]
    fn test_finish_install() {
        assert_eq!(
            WorkerState::Installing.finish_install(true),
            WorkerState::Installed
        );
        assert_eq!(
            WorkerState::Installing.finish_install(false),
            WorkerState::Redundant
        );
        assert_eq!(WorkerState::Active.finish_install(true), WorkerState::Active);
        assert_eq!(WorkerState::Active.finish_install(false), WorkerState::Active);
    }

    #[test]
    fn test_activate_requires_installed() {
        assert_eq!(
            WorkerState::Installed.begin_activate().unwrap(),
            WorkerState::Active
        );
        for state in [
            WorkerState::Uninstalled,
            WorkerState::Installing,
            WorkerState::Active,
            WorkerState::Redundant,
        ] {
            assert!(state.begin_activate().is_err(), "{}", state);
        }
    }

    #[test]
    fn test_only_active_controls_fetches() {
        assert!(WorkerState::Active.controls_fetches());
        assert!(!WorkerState::Installed.controls_fetches());
        assert!(!WorkerState::Uninstalled.controls_fetches());
    }

    #[test]
    fn test_record_roundtrip() {
        let dir = TempDir::new().unwrap();
        assert!(WorkerRecord::load(dir.path()).unwrap().is_none());

        let record = WorkerRecord {
            state: WorkerState::Active,
            version: "v1".to_string(),
            updated_at: Utc::now(),
        };
        record.save(dir.path()).unwrap();

        let loaded = WorkerRecord::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_effective_state() {
        let record = WorkerRecord {
            state: WorkerState::Active,
            version: "v1".to_string(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            WorkerRecord::effective_state(Some(&record), "v1"),
            WorkerState::Active
        );
        assert_eq!(
            WorkerRecord::effective_state(Some(&record), "v2"),
            WorkerState::Uninstalled
        );
        assert_eq!(
            WorkerRecord::effective_state(None, "v1"),
            WorkerState::Uninstalled
        );

        let interrupted = WorkerRecord {
            state: WorkerState::Installing,
            ..record
        };
        assert_eq!(
            WorkerRecord::effective_state(Some(&interrupted), "v1"),
            WorkerState::Redundant
        );
    }
}
