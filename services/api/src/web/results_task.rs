//! services/api/src/web/results_task.rs
//!
//! This module contains the asynchronous "worker" function that fills the
//! result view: it runs the recommendation orchestrator and forwards its
//! progress to the session that started it.

use crate::web::state::SessionEvent;
use soul_map_core::{
    board::SpotBoard,
    domain::ArchetypeId,
    orchestrator::{FetchSummary, RecommendationFetchError, RecommendationOrchestrator},
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs one recommendation fetch for a session.
///
/// Updates are tagged with `epoch` so the session can drop them after a
/// reset. If the session goes away the forwarding stops; the orchestrator
/// keeps going until its cancellation token is checked.
pub async fn results_process(
    orchestrator: RecommendationOrchestrator,
    archetype: ArchetypeId,
    epoch: u64,
    board: Arc<Mutex<SpotBoard>>,
    cancellation_token: CancellationToken,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Result<FetchSummary, RecommendationFetchError> {
    info!("Results process started for {}.", archetype);
    let (updates_tx, mut updates_rx) = mpsc::unbounded_channel();

    let forward = async move {
        while let Some(update) = updates_rx.recv().await {
            if events.send(SessionEvent::Spot { epoch, update }).is_err() {
                debug!("Session closed; no longer forwarding spot updates.");
                break;
            }
        }
    };

    let (result, ()) = tokio::join!(
        orchestrator.fetch_for_archetype(archetype, board, updates_tx, cancellation_token),
        forward
    );
    result
}
