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
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use http::{HeaderMap, Uri};
use tokio::task::JoinSet;

use crate::{
    assets::InjectionPayload,
    config::{InjectConfig, StorageConfig},
    inject::{ArtifactStore, InterceptOutcome, Interceptor, SequenceCounter},
    proxy::{
        flow::{Flow, RequestParts, ResponseParts},
        stages::StagePipeline,
    },
    telemetry::TelemetrySink,
};

/// Wires configuration, payload, counter, storage, and the stage pipeline together.
///
/// Initialization order:
/// 1. Telemetry, so later steps can report
/// 2. Payload (embedded or operator file)
/// 3. Sequence counter, optionally resumed from the artifacts already on disk
/// 4. Interceptor + StagePipeline sharing one counter
pub struct InjectApp {
    pipeline: StagePipeline,
    interceptor: Arc<Interceptor>,
}

/// One replay run: every input file is treated as a decoded response body for `target`.
#[derive(Debug, Clone)]
pub struct ReplayJob {
    pub target: Uri,
    pub inputs: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Counts of how the replayed bodies were handled.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub injected: usize,
    pub passthrough: usize,
    pub failed: usize,
}

impl InjectApp {
    pub async fn new(config: InjectConfig) -> Result<Self> {
        let telemetry = TelemetrySink::new(config.telemetry.clone());
        let payload = InjectionPayload::load(config.payload.path.as_deref())?;
        let store = ArtifactStore::new(config.storage.dir.clone());
        let start = Self::starting_sequence(&config.storage, &store).await?;
        let counter = Arc::new(SequenceCounter::new(start));

        tracing::info!(
            storage = %store.dir().display(),
            start_sequence = start,
            payload_bytes = payload.len(),
            "injector ready"
        );

        let interceptor = Arc::new(Interceptor::new(payload, counter, store));
        let pipeline = StagePipeline::build(interceptor.clone(), telemetry, config.payload.debug);

        Ok(Self {
            pipeline,
            interceptor,
        })
    }

    async fn starting_sequence(cfg: &StorageConfig, store: &ArtifactStore) -> Result<u64> {
        if !cfg.resume {
            return Ok(cfg.start_sequence);
        }
        let highest = store.highest_sequence().await.with_context(|| {
            format!("failed to scan artifact directory {}", store.dir().display())
        })?;
        Ok(match highest {
            Some(n) => cfg.start_sequence.max(n.saturating_add(1)),
            None => cfg.start_sequence,
        })
    }

    pub fn pipeline(&self) -> &StagePipeline {
        &self.pipeline
    }

    pub fn interceptor(&self) -> &Arc<Interceptor> {
        &self.interceptor
    }

    /// Pushes every input through the pipeline concurrently, one task per file.
    ///
    /// A file that cannot be read or written out counts as failed; it never aborts the
    /// remaining files.
    pub async fn replay(&self, job: ReplayJob) -> Result<ReplaySummary> {
        let mut tasks = JoinSet::new();
        for input in job.inputs {
            let pipeline = self.pipeline.clone();
            let target = job.target.clone();
            let output_dir = job.output_dir.clone();
            tasks.spawn(async move {
                let result = replay_one(&pipeline, target, &input, output_dir.as_deref()).await;
                (input, result)
            });
        }

        let mut summary = ReplaySummary::default();
        while let Some(joined) = tasks.join_next().await {
            let (input, result) = joined.context("replay task panicked")?;
            match result {
                Ok(Some(InterceptOutcome::Injected { .. })) => summary.injected += 1,
                Ok(_) => summary.passthrough += 1,
                Err(err) => {
                    tracing::warn!(input = %input.display(), "replay failed: {err:?}");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            injected = summary.injected,
            passthrough = summary.passthrough,
            failed = summary.failed,
            "replay finished"
        );
        Ok(summary)
    }
}

async fn replay_one(
    pipeline: &StagePipeline,
    target: Uri,
    input: &Path,
    output_dir: Option<&Path>,
) -> Result<Option<InterceptOutcome>> {
    let raw = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;

    let mut flow = Flow::new(RequestParts::get(target));
    flow.response = Some(ResponseParts::ok(HeaderMap::new(), &raw));
    pipeline.process_response_body(&mut flow).await?;

    if let Some(dir) = output_dir {
        let file_name = input
            .file_name()
            .with_context(|| format!("input has no file name: {}", input.display()))?;
        let out_path = dir.join(file_name);
        let delivered = flow
            .response
            .as_ref()
            .map(|resp| resp.body.as_bytes())
            .unwrap_or_default();
        tokio::fs::write(&out_path, delivered)
            .await
            .with_context(|| format!("failed to write {}", out_path.display()))?;
    }

    Ok(flow.metadata.injection)
}
