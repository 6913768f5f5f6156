//! Runtime configuration, loadable from TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{KestrelError, KestrelResult};

/// Configuration for the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Maximum number of value-stack slots before execution aborts.
    pub max_stack_depth: usize,
    /// Reject streams that do not decode cleanly or do not end in `RET` before running them.
    pub verify_programs: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_stack_depth: 1024,
            verify_programs: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(source: &str) -> KestrelResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| KestrelError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> KestrelResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| {
            KestrelError::InvalidConfig(format!("reading {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> KestrelResult<()> {
        if self.max_stack_depth == 0 {
            return Err(KestrelError::InvalidConfig(
                "max_stack_depth must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
