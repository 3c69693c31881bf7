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

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

/// Content spliced into every rewritable document, read once at startup.
///
/// The payload is opaque to the proxy: it is inserted verbatim and never templated per flow.
#[derive(Clone, Debug)]
pub struct InjectionPayload {
    content: Arc<str>,
}

impl InjectionPayload {
    /// Payload bundled with the binary.
    pub fn embedded() -> Self {
        Self::from_static(include_str!("../assets/inject/payload.html"))
    }

    pub fn from_static(content: &'static str) -> Self {
        Self {
            content: Arc::from(content),
        }
    }

    /// Uses the operator-supplied file when configured, otherwise the embedded payload.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::embedded());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read injection payload: {}", path.display()))?;
        Ok(Self {
            content: Arc::from(raw),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
