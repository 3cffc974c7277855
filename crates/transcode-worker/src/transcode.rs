//! Transcode job handler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info, warn};
use transcode_media::{FfmpegRunner, TwoPassTranscoder};
use transcode_models::{ConversionPresets, TranscodeRequest};
use transcode_storage::ObjectStore;

use crate::error::WorkerResult;
use crate::handler::{Handler, HandlerResult};
use crate::metrics;

const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

/// Downloads the input object, runs a two-pass transcode and uploads the
/// result.
///
/// Every job gets its own scratch directory under `work_dir`, removed when
/// the job ends whatever the outcome.
pub struct TranscodeHandler {
    store: Arc<dyn ObjectStore>,
    presets: ConversionPresets,
    runner: FfmpegRunner,
    work_dir: PathBuf,
}

impl TranscodeHandler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        presets: ConversionPresets,
        runner: FfmpegRunner,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            presets,
            runner,
            work_dir: work_dir.into(),
        }
    }

    pub fn presets(&self) -> &ConversionPresets {
        &self.presets
    }

    /// Run one transcode job.
    pub async fn transcode(&self, request: &TranscodeRequest) -> WorkerResult<()> {
        let conversion = self.presets.get(&request.conversion)?.clone();

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.work_dir)?;

        let input_path = scratch.path().join(format!("input-{}", request.input.file_name()));
        let output_path = scratch.path().join("output.mp4");

        self.store.download_file(&request.input, &input_path).await?;

        let started = Instant::now();
        TwoPassTranscoder::new(&input_path, &output_path, conversion)
            .run(&self.runner)
            .await?;
        metrics::record_ffmpeg_duration(&request.conversion, started.elapsed().as_secs_f64());

        self.store
            .upload_file(&output_path, &request.output, OUTPUT_CONTENT_TYPE)
            .await?;

        info!(
            input = %request.input,
            output = %request.output,
            conversion = %request.conversion,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Transcode complete"
        );
        Ok(())
    }

    async fn handle_body(&self, body: &str) -> WorkerResult<()> {
        let request = TranscodeRequest::from_body(body)?;
        self.transcode(&request).await
    }
}

#[async_trait]
impl Handler for TranscodeHandler {
    async fn handle(&self, body: &str) -> HandlerResult {
        match self.handle_body(body).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_retryable() {
                    error!(error = %e, "Transcode failed");
                } else {
                    warn!(error = %e, "Rejected transcode job; it will fail again on redelivery");
                }
                Err(e.into())
            }
        }
    }
}
