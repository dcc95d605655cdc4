// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Global settings for the engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`EngineSettings::upload_workers`].
pub const ENV_UPLOAD_WORKERS: &str = "STRATA_UPLOAD_WORKERS";
/// Environment variable overriding [`EngineSettings::fence_timeout`], in milliseconds.
pub const ENV_FENCE_TIMEOUT_MS: &str = "STRATA_FENCE_TIMEOUT_MS";
/// Environment variable enabling [`EngineSettings::validation`] when set to `1` or `true`.
pub const ENV_VALIDATION: &str = "STRATA_VALIDATION";

/// A collection of global settings read once at engine construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Number of upload workers, which is also the number of transfer contexts.
    pub upload_workers: usize,
    /// Timeout applied to every fence wait. `None` waits indefinitely.
    pub fence_timeout: Option<Duration>,
    /// Requests backend validation when the device is created.
    pub validation: bool,
    /// Queue family used by the upload engine, or `None` to let the device pick
    /// a transfer-capable family.
    pub upload_queue_family: Option<u32>,
    /// Default number of frames in flight for frames that do not set one.
    pub frames_in_flight: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            upload_workers: std::thread::available_parallelism()
                .map(|n| n.get().min(4))
                .unwrap_or(2),
            fence_timeout: None,
            validation: false,
            upload_queue_family: None,
            frames_in_flight: 2,
        }
    }
}

impl EngineSettings {
    /// Default settings overlaid with the `STRATA_*` environment variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Overlays values returned by `lookup`. Unparsable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_UPLOAD_WORKERS) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.upload_workers = n,
                _ => log::warn!("Ignoring invalid {ENV_UPLOAD_WORKERS}={raw:?}"),
            }
        }
        if let Some(raw) = lookup(ENV_FENCE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.fence_timeout = None,
                Ok(ms) => self.fence_timeout = Some(Duration::from_millis(ms)),
                Err(_) => log::warn!("Ignoring invalid {ENV_FENCE_TIMEOUT_MS}={raw:?}"),
            }
        }
        if let Some(raw) = lookup(ENV_VALIDATION) {
            self.validation = matches!(raw.trim(), "1" | "true" | "TRUE" | "True");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_usable() {
        let settings = EngineSettings::default();
        assert!(settings.upload_workers >= 1);
        assert_eq!(settings.fence_timeout, None);
        assert_eq!(settings.frames_in_flight, 2);
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let vars: HashMap<&str, &str> = [
            (ENV_UPLOAD_WORKERS, "3"),
            (ENV_FENCE_TIMEOUT_MS, "250"),
            (ENV_VALIDATION, "1"),
        ]
        .into_iter()
        .collect();
        let mut settings = EngineSettings::default();
        settings.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(settings.upload_workers, 3);
        assert_eq!(settings.fence_timeout, Some(Duration::from_millis(250)));
        assert!(settings.validation);

        settings.apply_overrides(|k| (k == ENV_UPLOAD_WORKERS).then(|| "zero".to_string()));
        assert_eq!(settings.upload_workers, 3);
    }
}
