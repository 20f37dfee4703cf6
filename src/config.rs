//! Declarative configuration for named schedulers.
//!
//! Deployments that wire schedulers from a settings file declare them here
//! and realize them through a [`SchedulerRegistry`]. Validation is
//! synchronous and happens before any scheduler is touched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SchedError;
use crate::registry::SchedulerRegistry;
use crate::scheduler::Scheduler;

/// Settings for one named scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Admission bound; absent means unlimited concurrency.
    #[serde(default)]
    pub concurrent: Option<usize>,
}

impl SchedulerSettings {
    /// Validate settings values.
    ///
    /// # Errors
    ///
    /// Returns a parameter rejection for a zero admission bound.
    pub fn validate(&self) -> Result<(), SchedError> {
        if self.concurrent == Some(0) {
            return Err(SchedError::Parameter(
                "concurrent must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Root engine configuration mapping scheduler names to settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Map of scheduler name to settings.
    pub schedulers: HashMap<String, SchedulerSettings>,
}

impl EngineConfig {
    /// Validate every scheduler entry and ensure at least one exists.
    ///
    /// # Errors
    ///
    /// Returns a parameter rejection naming the offending entry.
    pub fn validate(&self) -> Result<(), SchedError> {
        if self.schedulers.is_empty() {
            return Err(SchedError::Parameter(
                "at least one scheduler must be defined".to_string(),
            ));
        }
        for (name, settings) in &self.schedulers {
            if name.is_empty() {
                return Err(SchedError::Parameter(
                    "scheduler name must not be empty".to_string(),
                ));
            }
            settings
                .validate()
                .map_err(|e| SchedError::Parameter(format!("scheduler `{name}` invalid: {e}")))?;
        }
        Ok(())
    }

    /// Parse engine configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parameter rejection for malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, SchedError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| SchedError::Parameter(format!("parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Realize every configured scheduler through `registry`, installing
    /// admission bounds where declared. Returns the handles in arbitrary
    /// order.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a parameter rejection when validation fails; no scheduler is
    /// created in that case.
    pub fn apply(&self, registry: &SchedulerRegistry) -> Result<Vec<Scheduler>, SchedError> {
        self.validate()?;
        let mut built = Vec::with_capacity(self.schedulers.len());
        for (name, settings) in &self.schedulers {
            let sched = registry.get_or_create(name);
            if let Some(limit) = settings.concurrent {
                sched.concurrent(limit);
            }
            built.push(sched);
        }
        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(name: &str, concurrent: Option<usize>) -> EngineConfig {
        let mut schedulers = HashMap::new();
        schedulers.insert(name.to_string(), SchedulerSettings { concurrent });
        EngineConfig { schedulers }
    }

    #[test]
    fn test_valid_settings() {
        assert!(config_with("pipeline", None).validate().is_ok());
        assert!(config_with("pipeline", Some(4)).validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = config_with("pipeline", Some(0)).validate().unwrap_err();
        assert!(err.is_parameter());
    }

    #[test]
    fn test_empty_map_rejected() {
        let cfg = EngineConfig {
            schedulers: HashMap::new(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(config_with("", None).validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "schedulers": {
                "pipeline": { "concurrent": 2 },
                "reports": {}
            }
        }"#;
        let cfg = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.schedulers.len(), 2);
        assert_eq!(cfg.schedulers["pipeline"].concurrent, Some(2));
        assert_eq!(cfg.schedulers["reports"].concurrent, None);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        let json = r#"{ "schedulers": { "pipeline": { "concurrent": 0 } } }"#;
        assert!(EngineConfig::from_json_str(json).is_err());
    }

    #[tokio::test]
    async fn test_apply_registers_named_schedulers() {
        let registry = SchedulerRegistry::new();
        let built = config_with("pipeline", Some(1)).apply(&registry).unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(registry.get("pipeline"), Some(built[0].clone()));
    }
}
