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

//! Interception core: sniff each decoded response body, splice the payload in front of the
//! first `</body>`, and keep the before/after bodies on disk under a shared sequence number.

pub mod detector;
pub mod sequence;
pub mod store;

pub use detector::{HtmlDetector, Verdict, CLOSING_BODY};
pub use sequence::SequenceCounter;
pub use store::{ArtifactPaths, ArtifactRole, ArtifactStore};

use std::{path::PathBuf, sync::Arc};

use crate::{assets::InjectionPayload, utils::error::InjectError};

/// What happened to one response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptOutcome {
    /// Not a document; body untouched, nothing recorded.
    Passthrough,
    /// Document markers present but no `</body>`; body untouched, nothing recorded.
    DetectedWithoutClosingBody,
    /// Payload spliced in. The body is mutated even when the artifacts could not be written.
    Injected {
        sequence: u64,
        artifacts: ArtifactStatus,
    },
}

impl InterceptOutcome {
    pub fn sequence(&self) -> Option<u64> {
        match self {
            InterceptOutcome::Injected { sequence, .. } => Some(*sequence),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    Written(ArtifactPaths),
    Failed { path: Option<PathBuf>, reason: String },
}

/// Rewriter/recorder applied once per completed response.
///
/// Cheap to share behind an `Arc`; the only mutable state is the sequence counter, which is
/// atomic, so concurrent `intercept` calls need no outside locking.
pub struct Interceptor {
    detector: HtmlDetector,
    payload: InjectionPayload,
    counter: Arc<SequenceCounter>,
    store: ArtifactStore,
}

impl Interceptor {
    pub fn new(
        payload: InjectionPayload,
        counter: Arc<SequenceCounter>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            detector: HtmlDetector,
            payload,
            counter,
            store,
        }
    }

    pub fn counter(&self) -> &SequenceCounter {
        &self.counter
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn payload(&self) -> &InjectionPayload {
        &self.payload
    }

    /// Runs detection and, for rewritable documents, the injection plus artifact recording.
    ///
    /// `target` is the request address and is only used for diagnostics. Storage failures are
    /// logged and reported in the outcome; they never keep the mutated body from the caller.
    pub async fn intercept(&self, target: &str, body: &mut String) -> InterceptOutcome {
        match self.detector.classify(body.as_str()) {
            Verdict::Passthrough => InterceptOutcome::Passthrough,
            Verdict::HtmlWithoutClosingBody => {
                tracing::debug!(%target, "html document without closing body tag, skipping");
                InterceptOutcome::DetectedWithoutClosingBody
            }
            Verdict::Rewritable => self.rewrite(target, body).await,
        }
    }

    async fn rewrite(&self, target: &str, body: &mut String) -> InterceptOutcome {
        let Some(modified) = inject_before_closing_body(body.as_str(), self.payload.as_str())
        else {
            return InterceptOutcome::DetectedWithoutClosingBody;
        };

        let sequence = self.counter.next();
        tracing::info!(%target, sequence, "intercepted html response");

        let artifacts = match self.store.write_pair(sequence, body.as_str(), &modified).await {
            Ok(paths) => ArtifactStatus::Written(paths),
            Err(err) => {
                tracing::warn!(%target, sequence, error = %err, "failed to record artifact pair");
                let path = match &err {
                    InjectError::StorageWrite { path, .. } => Some(path.clone()),
                    _ => None,
                };
                ArtifactStatus::Failed {
                    path,
                    reason: err.to_string(),
                }
            }
        };

        *body = modified;
        InterceptOutcome::Injected {
            sequence,
            artifacts,
        }
    }
}

/// Returns `body` with `payload` placed directly before the first `</body>`, leaving any later
/// closing tags alone. `None` when the body has no closing tag.
pub fn inject_before_closing_body(body: &str, payload: &str) -> Option<String> {
    let idx = body.find(CLOSING_BODY)?;
    let (head, tail) = body.split_at(idx);
    let mut mutated = String::with_capacity(body.len() + payload.len());
    mutated.push_str(head);
    mutated.push_str(payload);
    mutated.push_str(tail);
    Some(mutated)
}
