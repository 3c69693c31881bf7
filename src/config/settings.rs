/* STATIC Proxy (AGPL-3.0)

Copyright (C) 2025 - 404 Contributors

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.

*/

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuration loaders and structures for the injector.
///
/// These types mirror `static_inject.example.toml`, apply defaults, and resolve
/// operator-supplied relative paths against the config file's directory.
#[derive(Debug, Clone, Deserialize)]
/// Top-level configuration parsed from the TOML file.
pub struct InjectConfig {
    /// Where artifact pairs are written and how their numbering starts.
    pub storage: StorageConfig,
    /// Which payload is spliced into documents.
    #[serde(default)]
    pub payload: PayloadConfig,
    /// Telemetry configuration (stdout vs structured log output).
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl InjectConfig {
    /// Reads the config file, deserializes TOML, and normalizes relative paths.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut cfg = Self::from_toml(&raw)
            .with_context(|| format!("invalid injector config: {}", path.display()))?;

        let base_dir = path.parent();
        Self::absolutize(base_dir, &mut cfg.storage.dir);
        if let Some(payload_path) = cfg.payload.path.as_mut() {
            Self::absolutize(base_dir, payload_path);
        }

        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Helper that resolves relative paths against the config file's location.
    fn absolutize(base_dir: Option<&Path>, target: &mut PathBuf) {
        if target.is_relative() {
            if let Some(dir) = base_dir {
                *target = dir.join(&*target);
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Pre-existing directory that receives `original_{n}.html` / `modified_{n}.html`.
    pub dir: PathBuf,
    /// First sequence number handed out by a fresh process.
    #[serde(default)]
    pub start_sequence: u64,
    /// Continue numbering after the highest artifact already in `dir` instead of
    /// overwriting a previous run's files.
    #[serde(default)]
    pub resume: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadConfig {
    /// Optional file replacing the embedded payload.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Emit a debug line with byte counts for every injection.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryConfig {
    /// Telemetry output: human-friendly stdout or structured JSON.
    #[serde(default)]
    pub mode: TelemetryMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryMode {
    /// Route events through tracing.
    #[default]
    Stdout,
    /// Emit JSON objects for ingestion systems.
    Json,
}
