//! crates/soul_map_core/src/orchestrator.rs
//!
//! Fetches the recommendations for an archetype, then enriches every spot
//! with its day and night images.
//!
//! Spots are processed one after another; within a spot both variants are
//! requested together and awaited as a pair. At most two generation requests
//! are ever in flight.

use std::sync::Arc;

use futures::future;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::board::SpotBoard;
use crate::domain::{ArchetypeId, ImageRef, ImageVariant, SpotId, TravelSpot};
use crate::ports::{ImageGenerationService, ImageRequest, PortError, RecommendationService};

/// How many spots are requested per archetype.
pub const SPOT_COUNT: usize = 4;

/// The whole recommendation set is unavailable.
#[derive(Debug, thiserror::Error)]
#[error("Failed to fetch recommendations for {archetype}: {source}")]
pub struct RecommendationFetchError {
    pub archetype: ArchetypeId,
    #[source]
    pub source: PortError,
}

/// One variant of one spot could not be generated.
#[derive(Debug, thiserror::Error)]
#[error("Failed to generate the {variant} image for spot {spot_id}: {source}")]
pub struct ImageGenerationError {
    pub spot_id: SpotId,
    pub variant: ImageVariant,
    #[source]
    pub source: PortError,
}

/// Progress reported to whoever renders the result view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpotUpdate {
    /// The recommendation list arrived; every spot is loading its images.
    Loaded(Vec<TravelSpot>),
    /// A spot's image pair resolved, successfully or not.
    Settled(TravelSpot),
    /// The recommendation fetch failed; there will be no spots.
    Unavailable,
}

/// Counters describing a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub spots: usize,
    pub settled: usize,
    /// Spots that received both images.
    pub pairs_attached: usize,
    /// Spots left without images because at least one variant failed.
    pub pairs_failed: usize,
    pub cancelled: bool,
}

#[derive(Clone)]
pub struct RecommendationOrchestrator {
    recommender: Arc<dyn RecommendationService>,
    images: Arc<dyn ImageGenerationService>,
    spot_count: usize,
}

impl RecommendationOrchestrator {
    pub fn new(
        recommender: Arc<dyn RecommendationService>,
        images: Arc<dyn ImageGenerationService>,
    ) -> Self {
        Self {
            recommender,
            images,
            spot_count: SPOT_COUNT,
        }
    }

    /// Runs the full fetch sequence for an archetype.
    ///
    /// The board is filled when the recommendations arrive and merged into as
    /// each spot settles; every change is also pushed to `updates`. A dropped
    /// receiver is not an error, the results just go unobserved.
    ///
    /// `cancel` is checked between spots: once cancelled, no further spot is
    /// started, while a pair already in flight still runs to completion.
    pub async fn fetch_for_archetype(
        &self,
        archetype: ArchetypeId,
        board: Arc<Mutex<SpotBoard>>,
        updates: mpsc::UnboundedSender<SpotUpdate>,
        cancel: CancellationToken,
    ) -> Result<FetchSummary, RecommendationFetchError> {
        info!("Fetching {} recommendations for {}.", self.spot_count, archetype);

        let records = match self.recommender.recommend(archetype, self.spot_count).await {
            Ok(records) => records,
            Err(source) => {
                let err = RecommendationFetchError { archetype, source };
                error!("{}", err);
                board.lock().await.clear();
                let _ = updates.send(SpotUpdate::Unavailable);
                return Err(err);
            }
        };

        let spots: Vec<TravelSpot> = records
            .into_iter()
            .take(self.spot_count)
            .enumerate()
            .map(|(position, record)| TravelSpot::from_record(archetype, position, record))
            .collect();

        board.lock().await.load(spots.clone());
        let _ = updates.send(SpotUpdate::Loaded(spots.clone()));

        let mut summary = FetchSummary {
            spots: spots.len(),
            ..FetchSummary::default()
        };

        for spot in &spots {
            if cancel.is_cancelled() {
                info!("Image generation for {} cancelled before spot {}.", archetype, spot.id);
                summary.cancelled = true;
                break;
            }

            let pair = future::join(
                self.generate(spot, ImageVariant::Day),
                self.generate(spot, ImageVariant::Night),
            )
            .await;

            // The pair is attached as a unit; one failed variant drops both.
            let (day, night) = match pair {
                (Some(day), Some(night)) => {
                    summary.pairs_attached += 1;
                    (Some(day), Some(night))
                }
                _ => {
                    warn!("Spot {} keeps no images: its image pair did not fully resolve.", spot.id);
                    summary.pairs_failed += 1;
                    (None, None)
                }
            };

            let settled = board.lock().await.settle(&spot.id, day, night);
            summary.settled += 1;
            match settled {
                Some(spot) => {
                    let _ = updates.send(SpotUpdate::Settled(spot));
                }
                None => warn!("Spot {} left the board before its images settled.", spot.id),
            }
        }

        info!(
            "Recommendations for {} done: {} spots, {} with images, {} without.",
            archetype, summary.spots, summary.pairs_attached, summary.pairs_failed
        );
        Ok(summary)
    }

    /// Requests one variant; a failure is logged and reported as `None`.
    async fn generate(&self, spot: &TravelSpot, variant: ImageVariant) -> Option<ImageRef> {
        let request = ImageRequest {
            spot_name: spot.name.clone(),
            location: spot.location.clone(),
            variant,
        };
        match self.images.generate(&request).await {
            Ok(image) => Some(image),
            Err(source) => {
                let err = ImageGenerationError {
                    spot_id: spot.id.clone(),
                    variant,
                    source,
                };
                error!("{}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::select_image;
    use crate::domain::SpotRecord;
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn record(name: &str) -> SpotRecord {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "location": "宜蘭縣",
            "description": "desc",
            "highlights": ["h1", "h2", "h3"],
            "reminders": ["r1", "r2"],
            "prescription": "rest",
            "coordinates": { "lat": "24.6", "lng": "121.7" }
        }))
        .unwrap()
    }

    struct FixedRecommender {
        result: StdMutex<Option<PortResult<Vec<SpotRecord>>>>,
    }

    impl FixedRecommender {
        fn ok(names: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                result: StdMutex::new(Some(Ok(names.iter().map(|n| record(n)).collect()))),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                result: StdMutex::new(Some(Err(PortError::Malformed("not a list".into())))),
            })
        }
    }

    #[async_trait]
    impl RecommendationService for FixedRecommender {
        async fn recommend(&self, _: ArchetypeId, _: usize) -> PortResult<Vec<SpotRecord>> {
            self.result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(PortError::Unexpected("called twice".into())))
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Started(String, ImageVariant),
        Finished(String, ImageVariant),
    }

    /// Records every call; sleeps to simulate latency; fails the listed
    /// `(name, variant)` pairs.
    #[derive(Default)]
    struct ScriptedImages {
        delay: Duration,
        failures: Vec<(&'static str, ImageVariant)>,
        events: StdMutex<Vec<Event>>,
        in_flight: StdMutex<(usize, usize)>,
    }

    impl ScriptedImages {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn max_in_flight(&self) -> usize {
            self.in_flight.lock().unwrap().1
        }
    }

    #[async_trait]
    impl ImageGenerationService for ScriptedImages {
        async fn generate(&self, request: &ImageRequest) -> PortResult<ImageRef> {
            {
                let mut flight = self.in_flight.lock().unwrap();
                flight.0 += 1;
                flight.1 = flight.1.max(flight.0);
            }
            self.events
                .lock()
                .unwrap()
                .push(Event::Started(request.spot_name.clone(), request.variant));

            tokio::time::sleep(self.delay).await;

            self.in_flight.lock().unwrap().0 -= 1;
            self.events
                .lock()
                .unwrap()
                .push(Event::Finished(request.spot_name.clone(), request.variant));

            if self
                .failures
                .iter()
                .any(|(name, variant)| *name == request.spot_name && *variant == request.variant)
            {
                return Err(PortError::Unavailable("quota".into()));
            }
            Ok(ImageRef::remote(format!(
                "https://img/{}/{}",
                request.spot_name,
                request.variant.label()
            )))
        }
    }

    async fn run(
        recommender: Arc<FixedRecommender>,
        images: Arc<ScriptedImages>,
    ) -> (
        Result<FetchSummary, RecommendationFetchError>,
        Arc<Mutex<SpotBoard>>,
        Vec<SpotUpdate>,
    ) {
        let orchestrator = RecommendationOrchestrator::new(recommender, images);
        let board = Arc::new(Mutex::new(SpotBoard::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = orchestrator
            .fetch_for_archetype(ArchetypeId::Healer, board.clone(), tx, CancellationToken::new())
            .await;
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        (result, board, updates)
    }

    #[tokio::test]
    async fn four_records_become_four_settled_spots() {
        let images = Arc::new(ScriptedImages {
            failures: vec![("b", ImageVariant::Day), ("b", ImageVariant::Night), ("c", ImageVariant::Night)],
            ..ScriptedImages::default()
        });
        let (result, board, updates) =
            run(FixedRecommender::ok(&["a", "b", "c", "d"]), images.clone()).await;

        let summary = result.unwrap();
        assert_eq!(summary.spots, 4);
        assert_eq!(summary.settled, 4);
        assert_eq!(summary.pairs_attached, 2);
        assert_eq!(summary.pairs_failed, 2);

        let board = board.lock().await;
        assert_eq!(board.len(), 4);
        assert!(board.all_settled());
        let ids: Vec<_> = board.entries().map(|e| e.spot.id.to_string()).collect();
        assert_eq!(ids, ["HEALER-0", "HEALER-1", "HEALER-2", "HEALER-3"]);

        let d = &board.get(&SpotId::new(ArchetypeId::Healer, 3)).unwrap().spot;
        assert_eq!(d.day_image, Some(ImageRef::remote("https://img/d/DAY")));
        assert_eq!(d.night_image, Some(ImageRef::remote("https://img/d/NIGHT")));

        assert!(matches!(&updates[0], SpotUpdate::Loaded(spots) if spots.len() == 4));
        assert_eq!(updates.len(), 5);
        assert!(updates[1..].iter().all(|u| matches!(u, SpotUpdate::Settled(_))));
    }

    #[tokio::test]
    async fn one_failed_variant_leaves_both_images_absent() {
        let images = Arc::new(ScriptedImages {
            failures: vec![("a", ImageVariant::Night), ("b", ImageVariant::Day)],
            ..ScriptedImages::default()
        });
        let (result, board, updates) = run(FixedRecommender::ok(&["a", "b"]), images).await;
        assert_eq!(result.unwrap().pairs_failed, 2);

        let board = board.lock().await;
        for position in 0..2 {
            let entry = board.get(&SpotId::new(ArchetypeId::Healer, position)).unwrap();
            assert!(!entry.image_loading);
            assert_eq!(entry.spot.day_image, None);
            assert_eq!(entry.spot.night_image, None);
            assert_eq!(select_image(&entry.spot, ImageVariant::Day), None);
            assert_eq!(select_image(&entry.spot, ImageVariant::Night), None);
        }

        let settled: Vec<_> = updates
            .iter()
            .filter_map(|u| match u {
                SpotUpdate::Settled(spot) => Some(spot),
                _ => None,
            })
            .collect();
        assert_eq!(settled.len(), 2);
        assert!(settled.iter().all(|s| s.day_image.is_none() && s.night_image.is_none()));
    }

    #[tokio::test]
    async fn failed_recommendations_mean_no_spots_and_no_image_calls() {
        let images = Arc::new(ScriptedImages::default());
        let (result, board, updates) = run(FixedRecommender::failing(), images.clone()).await;

        let err = result.unwrap_err();
        assert_eq!(err.archetype, ArchetypeId::Healer);
        assert!(board.lock().await.is_empty());
        assert!(images.events().is_empty());
        assert_eq!(updates, vec![SpotUpdate::Unavailable]);
    }

    #[tokio::test(start_paused = true)]
    async fn spots_are_processed_one_pair_at_a_time() {
        let images = Arc::new(ScriptedImages {
            delay: Duration::from_millis(250),
            failures: vec![("first", ImageVariant::Night)],
            ..ScriptedImages::default()
        });
        let (result, _, _) = run(FixedRecommender::ok(&["first", "second"]), images.clone()).await;
        assert!(result.is_ok());

        let events = images.events();
        let second_started = events
            .iter()
            .position(|e| matches!(e, Event::Started(name, _) if name == "second"))
            .unwrap();
        let first_finished: Vec<_> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, Event::Finished(name, _) if name == "first"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(first_finished.len(), 2);
        assert!(first_finished.iter().all(|i| *i < second_started));

        // Both variants of a spot overlap.
        assert_eq!(
            &events[..2],
            &[
                Event::Started("first".into(), ImageVariant::Day),
                Event::Started("first".into(), ImageVariant::Night),
            ]
        );
        assert_eq!(images.max_in_flight(), 2);
    }

    #[tokio::test]
    async fn longer_lists_are_truncated() {
        let images = Arc::new(ScriptedImages::default());
        let (result, board, _) =
            run(FixedRecommender::ok(&["a", "b", "c", "d", "e", "f"]), images.clone()).await;
        assert_eq!(result.unwrap().spots, SPOT_COUNT);
        assert_eq!(board.lock().await.len(), SPOT_COUNT);
        assert_eq!(images.events().len(), SPOT_COUNT * 4);
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_spot() {
        let orchestrator = RecommendationOrchestrator::new(
            FixedRecommender::ok(&["a", "b", "c"]),
            Arc::new(ScriptedImages::default()),
        );
        let board = Arc::new(Mutex::new(SpotBoard::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = orchestrator
            .fetch_for_archetype(ArchetypeId::Scavenger, board.clone(), tx, cancel)
            .await
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.settled, 0);
        assert_eq!(board.lock().await.len(), 3);
    }
}
