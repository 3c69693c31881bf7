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

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::{
    inject::{ArtifactStatus, InterceptOutcome, Interceptor},
    proxy::{body, flow::Flow},
    telemetry::{TelemetrySink, EVENT_ARTIFACT_WRITE_FAILED, EVENT_HTML_INJECTED},
};

use super::FlowStage;

/// Hands every buffered response body to the [`Interceptor`] and writes the result back.
///
/// Nothing in here fails the flow: bodies that cannot be decoded are left alone, and
/// artifact write failures only show up in logs, telemetry, and `flow.metadata`.
#[derive(Clone)]
pub struct HtmlInjectionStage {
    interceptor: Arc<Interceptor>,
    telemetry: TelemetrySink,
    debug: bool,
}

impl HtmlInjectionStage {
    pub fn new(interceptor: Arc<Interceptor>, telemetry: TelemetrySink, debug: bool) -> Self {
        Self {
            interceptor,
            telemetry,
            debug,
        }
    }

    fn report(&self, flow: &Flow, target: &str, outcome: &InterceptOutcome, bytes_added: usize) {
        let InterceptOutcome::Injected {
            sequence,
            artifacts,
        } = outcome
        else {
            return;
        };

        match artifacts {
            ArtifactStatus::Written(paths) => self.telemetry.emit(
                EVENT_HTML_INJECTED,
                flow.id,
                json!({
                    "target": target,
                    "sequence": sequence,
                    "original": paths.original.display().to_string(),
                    "modified": paths.modified.display().to_string(),
                }),
            ),
            ArtifactStatus::Failed { path, reason } => self.telemetry.emit(
                EVENT_ARTIFACT_WRITE_FAILED,
                flow.id,
                json!({
                    "target": target,
                    "sequence": sequence,
                    "path": path.as_ref().map(|p| p.display().to_string()),
                    "reason": reason,
                }),
            ),
        }

        if self.debug {
            tracing::debug!(%flow.id, sequence, bytes_added, "html_injection_applied");
        }
    }
}

#[async_trait]
impl FlowStage for HtmlInjectionStage {
    async fn on_response_body(&self, flow: &mut Flow) -> Result<()> {
        let Some(response) = flow.response.as_ref() else {
            return Ok(());
        };
        if response.body.is_empty() {
            return Ok(());
        }

        let body::BodyText { mut text, charset } = match body::decoded_text(response) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::trace!(%flow.id, error = %err, "response body has no text form");
                flow.metadata.body_skip_reason = Some(err.to_string());
                return Ok(());
            }
        };

        let target = flow.target();
        let original_len = text.len();
        let outcome = self.interceptor.intercept(&target, &mut text).await;

        if matches!(outcome, InterceptOutcome::Injected { .. }) {
            if let Some(response) = flow.response.as_mut() {
                body::store_plain_body(response, &text, charset)?;
            }
        }

        self.report(flow, &target, &outcome, text.len() - original_len);
        flow.metadata.injection = Some(outcome);
        Ok(())
    }
}
