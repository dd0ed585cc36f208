use std::sync::Arc;

use reelgrab_core::core::events::{EventEmitter, FetchProgress, FetchStatus};
use reelgrab_core::models::media::{MediaRequest, RetrievalOutcome};

use crate::core::error::FetchError;
use crate::core::retriever::Retriever;
use crate::platforms::RetrievalKind;
use crate::AppState;

/// Resolves one request end to end: extraction chain, destination path, a slot
/// from the gate, then the platform's retriever. Every step is reported to
/// `emitter`, ending in `Complete` or `Error`.
pub async fn fetch_media<E: EventEmitter>(
    state: &AppState,
    request: &MediaRequest,
    emitter: &E,
) -> Result<RetrievalOutcome, FetchError> {
    let report = |status: FetchStatus| {
        emitter.emit_progress(&FetchProgress {
            scope: request.scope().to_string(),
            source_url: request.source_url().to_string(),
            platform: request.platform().as_str().to_string(),
            status,
        });
    };

    report(FetchStatus::Resolving);
    tracing::debug!(
        "[pipeline] {} link {} for scope {}",
        request.platform(),
        request.source_url(),
        request.scope()
    );
    let result = run(state, request, &report).await;

    match &result {
        Ok(outcome) => {
            tracing::info!(
                "[pipeline] {} -> {} ({} bytes)",
                request.source_url(),
                outcome.local_path.display(),
                outcome.byte_size
            );
            report(FetchStatus::Complete {
                path: outcome.local_path.to_string_lossy().to_string(),
                bytes: outcome.byte_size,
            });
        }
        Err(e) => {
            tracing::warn!("[pipeline] {} failed: {}", request.source_url(), e);
            report(FetchStatus::Error {
                kind: e.kind().to_string(),
                message: e.to_string(),
            });
        }
    }
    result
}

async fn run(
    state: &AppState,
    request: &MediaRequest,
    report: &impl Fn(FetchStatus),
) -> Result<RetrievalOutcome, FetchError> {
    let retriever = retriever_for(state, request)?;

    let extraction = state.orchestrator.resolve(request).await?;
    report(FetchStatus::Resolved {
        strategy: extraction.strategy.clone(),
        media_url: extraction.media_url.clone(),
    });

    let output = state.workspace.allocate(request).await?;

    report(FetchStatus::Waiting);
    let _permit = state.gate.acquire().await?;
    tracing::debug!(
        "[pipeline] slot acquired ({}/{} in flight)",
        state.gate.in_flight(),
        state.gate.capacity()
    );

    report(FetchStatus::Retrieving);
    retriever.retrieve(&extraction.media_url, &output).await
}

fn retriever_for(state: &AppState, request: &MediaRequest) -> Result<Arc<dyn Retriever>, FetchError> {
    match request.platform().retrieval_kind() {
        RetrievalKind::Direct => Ok(state.direct.clone()),
        RetrievalKind::ExternalTool => match &state.ytdlp {
            Some(ytdlp) => Ok(ytdlp.clone()),
            None => Err(FetchError::ToolUnavailable(format!(
                "yt-dlp is required for {}",
                request.platform()
            ))),
        },
    }
}
