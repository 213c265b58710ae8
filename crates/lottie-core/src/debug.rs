//! Process-wide verbose logging switch.
//!
//! When enabled the engine emits `trace!` events for interpolation, path and
//! transform evaluation. The switch can be persisted as a small JSON file so a
//! host restores it across sessions.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn is_enabled() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

pub fn set_enabled(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugSettings {
    #[serde(default)]
    pub verbose: bool,
}

impl DebugSettings {
    /// Reads persisted settings; a missing file yields the defaults.
    pub fn load(path: &Path) -> EngineResult<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(EngineError::io(path, e)),
        }
    }

    pub fn store(&self, path: &Path) -> EngineResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json).map_err(|e| EngineError::io(path, e))
    }

    pub fn apply(&self) {
        set_enabled(self.verbose);
    }
}
