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

/// Flow stages run by the host proxy engine once the upstream response body is buffered.
/// Each stage implements [`FlowStage`]; the `StagePipeline` drives them in a fixed order.
mod html;

pub use html::HtmlInjectionStage;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::{inject::Interceptor, proxy::flow::Flow, telemetry::TelemetrySink};

#[derive(Clone)]
/// Represents the ordered pipeline of stages run for every flow.
pub struct StagePipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    stages: Vec<Arc<dyn FlowStage>>,
}

impl StagePipeline {
    /// Builds the response pipeline around a shared interceptor.
    pub fn build(interceptor: Arc<Interceptor>, telemetry: TelemetrySink, debug: bool) -> Self {
        let html: Arc<dyn FlowStage> =
            Arc::new(HtmlInjectionStage::new(interceptor, telemetry, debug));
        Self::from_stages(vec![html])
    }

    pub fn from_stages(stages: Vec<Arc<dyn FlowStage>>) -> Self {
        Self {
            inner: Arc::new(PipelineInner { stages }),
        }
    }

    pub async fn process_response_body(&self, flow: &mut Flow) -> Result<()> {
        for stage in &self.inner.stages {
            stage.on_response_body(flow).await?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait FlowStage: Send + Sync {
    async fn on_response_body(&self, _flow: &mut Flow) -> Result<()> {
        Ok(())
    }
}
