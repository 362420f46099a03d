//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and
//! then passed into core services. The intent is to avoid reading process-wide environment
//! variables during request handling, which can lead to inconsistent behaviour in
//! multi-threaded runtimes and test harnesses.

use crate::{VisitError, VisitResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default debounce window for autosave commits.
///
/// Matches the capture surfaces: long enough to coalesce a typing burst into a single
/// whole-record write, short enough that an abandoned device has usually persisted the
/// last edit.
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(900);

/// Upper bound on the configurable debounce window.
const MAX_AUTOSAVE_DEBOUNCE: Duration = Duration::from_secs(30);

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    visit_data_dir: PathBuf,
    autosave_debounce: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(visit_data_dir: PathBuf, autosave_debounce: Duration) -> VisitResult<Self> {
        if autosave_debounce.is_zero() {
            return Err(VisitError::InvalidInput(
                "autosave debounce cannot be zero".into(),
            ));
        }
        if autosave_debounce > MAX_AUTOSAVE_DEBOUNCE {
            return Err(VisitError::InvalidInput(format!(
                "autosave debounce exceeds maximum of {}s",
                MAX_AUTOSAVE_DEBOUNCE.as_secs()
            )));
        }

        Ok(Self {
            visit_data_dir,
            autosave_debounce,
        })
    }

    pub fn visit_data_dir(&self) -> &Path {
        &self.visit_data_dir
    }

    pub fn visits_dir(&self) -> PathBuf {
        self.visit_data_dir.join(crate::constants::VISITS_DIR_NAME)
    }

    pub fn autosave_debounce(&self) -> Duration {
        self.autosave_debounce
    }
}

/// Parse the autosave debounce window from an optional env value (milliseconds).
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_AUTOSAVE_DEBOUNCE`].
pub fn autosave_debounce_from_env_value(value: Option<String>) -> VisitResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_AUTOSAVE_DEBOUNCE),
        Some(raw) => {
            let millis: u64 = raw.parse().map_err(|_| {
                VisitError::InvalidInput(format!(
                    "autosave debounce must be a whole number of milliseconds, got '{raw}'"
                ))
            })?;
            Ok(Duration::from_millis(millis))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_excessive_debounce() {
        assert!(CoreConfig::new("/visit_data".into(), Duration::ZERO).is_err());
        assert!(CoreConfig::new("/visit_data".into(), Duration::from_secs(60)).is_err());
        assert!(CoreConfig::new("/visit_data".into(), DEFAULT_AUTOSAVE_DEBOUNCE).is_ok());
    }

    #[test]
    fn debounce_env_value_parsing() {
        assert_eq!(
            autosave_debounce_from_env_value(None).unwrap(),
            DEFAULT_AUTOSAVE_DEBOUNCE
        );
        assert_eq!(
            autosave_debounce_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_AUTOSAVE_DEBOUNCE
        );
        assert_eq!(
            autosave_debounce_from_env_value(Some("1200".into())).unwrap(),
            Duration::from_millis(1200)
        );
        assert!(autosave_debounce_from_env_value(Some("fast".into())).is_err());
    }

    #[test]
    fn visits_dir_is_nested_under_data_dir() {
        let cfg = CoreConfig::new("/visit_data".into(), DEFAULT_AUTOSAVE_DEBOUNCE).unwrap();
        assert_eq!(cfg.visits_dir(), PathBuf::from("/visit_data/visits"));
    }
}
