//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-connection session flow.
//!
//! The session is a plain state machine: it consumes client messages and
//! internal events, and answers with the frames to send plus the side
//! effects (timers, background fetches) the connection loop must start.

use crate::config::Config;
use crate::web::protocol::{ClientMessage, ServerMessage, Stage};
use soul_map_core::{
    board::{select_image, SpotBoard},
    catalog,
    domain::{ArchetypeId, ImageVariant, SpotId},
    orchestrator::{RecommendationOrchestrator, SpotUpdate},
    ports::PostcardRenderer,
    quiz::{QuizEngine, QuizError, QuizStep, SubmitOutcome},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: RecommendationOrchestrator,
    pub postcard_renderer: Arc<dyn PostcardRenderer>,
}

//=========================================================================================
// Session Events and Effects
//=========================================================================================

/// Events produced by work the session started earlier.
///
/// Every event carries the epoch it was started in; events from before the
/// last reset are dropped.
#[derive(Debug)]
pub enum SessionEvent {
    TransitionElapsed { epoch: u64 },
    Spot { epoch: u64, update: SpotUpdate },
}

/// Work the connection loop has to start on behalf of the session.
#[derive(Debug)]
pub enum Effect {
    /// Fire `TransitionElapsed` after the quiz transition delay.
    ArmTransition { epoch: u64 },
    /// Run the orchestrator and feed its updates back as `Spot` events.
    FetchRecommendations {
        archetype: ArchetypeId,
        epoch: u64,
        board: Arc<Mutex<SpotBoard>>,
        cancel: CancellationToken,
    },
}

/// What a session step produced.
#[derive(Debug, Default)]
pub struct Reaction {
    pub messages: Vec<ServerMessage>,
    pub effects: Vec<Effect>,
}

impl Reaction {
    pub fn send(messages: Vec<ServerMessage>) -> Self {
        Self {
            messages,
            effects: Vec::new(),
        }
    }
}

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active WebSocket connection.
pub struct SessionState {
    pub session_id: Uuid,
    stage: Stage,
    quiz: Option<QuizEngine>,
    archetype: Option<ArchetypeId>,
    board: Arc<Mutex<SpotBoard>>,
    variants: HashMap<SpotId, ImageVariant>,
    /// Cancels the recommendation run of the current epoch.
    cancellation_token: CancellationToken,
    epoch: u64,
}

impl SessionState {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            stage: Stage::Intro,
            quiz: None,
            archetype: None,
            board: Arc::new(Mutex::new(SpotBoard::new())),
            variants: HashMap::new(),
            cancellation_token: CancellationToken::new(),
            epoch: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn archetype(&self) -> Option<ArchetypeId> {
        self.archetype
    }

    /// The frames sent when the connection opens.
    pub fn greeting(&self) -> Vec<ServerMessage> {
        vec![
            ServerMessage::SessionInitialized {
                session_id: self.session_id,
            },
            ServerMessage::StageChanged { stage: self.stage },
        ]
    }

    pub async fn handle(&mut self, message: ClientMessage) -> Reaction {
        match message {
            ClientMessage::StartQuiz => self.start_quiz(),
            ClientMessage::Answer { option_index } => self.answer(option_index),
            ClientMessage::SelectVariant { spot_id, variant } => {
                self.select_variant(spot_id, variant).await
            }
            ClientMessage::Reset => self.reset(),
        }
    }

    pub fn on_event(&mut self, event: SessionEvent) -> Reaction {
        match event {
            SessionEvent::TransitionElapsed { epoch } => self.transition_elapsed(epoch),
            SessionEvent::Spot { epoch, update } => Reaction::send(self.spot_update(epoch, update)),
        }
    }

    fn start_quiz(&mut self) -> Reaction {
        if self.stage != Stage::Intro {
            return Reaction::send(vec![ServerMessage::error(
                "A quiz is already under way; reset to start over.",
            )]);
        }
        let quiz = QuizEngine::new();
        let mut messages = vec![ServerMessage::StageChanged { stage: Stage::Quiz }];
        if let Some((index, question)) = quiz.current_question() {
            messages.push(ServerMessage::question(index, quiz.question_count(), question));
        }
        self.quiz = Some(quiz);
        self.stage = Stage::Quiz;
        info!("Session {} started the quiz.", self.session_id);
        Reaction::send(messages)
    }

    fn answer(&mut self, option_index: usize) -> Reaction {
        let outcome = match self.quiz.as_mut() {
            Some(quiz) if self.stage == Stage::Quiz => quiz.submit_option(option_index),
            _ => Err(QuizError::NotInQuiz),
        };
        match outcome {
            Ok(SubmitOutcome::Accepted { question_index }) => Reaction {
                messages: vec![ServerMessage::AnswerAccepted {
                    index: question_index,
                }],
                effects: vec![Effect::ArmTransition { epoch: self.epoch }],
            },
            Ok(SubmitOutcome::Ignored) => {
                debug!("Session {} answered during a transition; ignored.", self.session_id);
                Reaction::default()
            }
            Err(e) => {
                warn!("Session {} sent an invalid answer: {}", self.session_id, e);
                Reaction::send(vec![ServerMessage::error(e.to_string())])
            }
        }
    }

    fn transition_elapsed(&mut self, epoch: u64) -> Reaction {
        if epoch != self.epoch {
            return Reaction::default();
        }
        let Some(quiz) = self.quiz.as_mut() else {
            return Reaction::default();
        };
        match quiz.finish_transition() {
            QuizStep::Next(index) => {
                let total = quiz.question_count();
                match quiz.current_question() {
                    Some((_, question)) => {
                        Reaction::send(vec![ServerMessage::question(index, total, question)])
                    }
                    None => Reaction::default(),
                }
            }
            QuizStep::Completed(winner) => {
                info!("Session {} completed the quiz as {}.", self.session_id, winner);
                self.quiz = None;
                self.archetype = Some(winner);
                self.stage = Stage::Result;
                Reaction {
                    messages: vec![
                        ServerMessage::QuizCompleted {
                            archetype: *catalog::profile(winner),
                        },
                        ServerMessage::StageChanged { stage: Stage::Result },
                        ServerMessage::SpotsLoading,
                    ],
                    effects: vec![Effect::FetchRecommendations {
                        archetype: winner,
                        epoch: self.epoch,
                        board: self.board.clone(),
                        cancel: self.cancellation_token.clone(),
                    }],
                }
            }
            QuizStep::Idle => Reaction::default(),
        }
    }

    fn spot_update(&mut self, epoch: u64, update: SpotUpdate) -> Vec<ServerMessage> {
        if epoch != self.epoch {
            debug!("Dropping a spot update from a previous run.");
            return Vec::new();
        }
        match update {
            SpotUpdate::Loaded(spots) => vec![ServerMessage::SpotsLoaded { spots }],
            SpotUpdate::Settled(spot) => {
                let variant = self.variant_of(&spot.id);
                let image = select_image(&spot, variant).cloned();
                vec![
                    ServerMessage::ActiveImage {
                        spot_id: spot.id.clone(),
                        variant,
                        image,
                    },
                    ServerMessage::SpotImagesSettled { spot },
                ]
            }
            SpotUpdate::Unavailable => vec![ServerMessage::RecommendationsUnavailable],
        }
    }

    async fn select_variant(&mut self, spot_id: SpotId, variant: ImageVariant) -> Reaction {
        if self.stage != Stage::Result {
            return Reaction::send(vec![ServerMessage::error("No recommendations are on screen.")]);
        }
        let image = {
            let board = self.board.lock().await;
            match board.get(&spot_id) {
                Some(entry) => select_image(&entry.spot, variant).cloned(),
                None => {
                    return Reaction::send(vec![ServerMessage::error(format!(
                        "Unknown spot {}.",
                        spot_id
                    ))])
                }
            }
        };
        self.variants.insert(spot_id.clone(), variant);
        Reaction::send(vec![ServerMessage::ActiveImage {
            spot_id,
            variant,
            image,
        }])
    }

    /// Back to the intro. Work started before the reset is cancelled or its
    /// results ignored; a fresh board keeps late writes out of the next run.
    fn reset(&mut self) -> Reaction {
        self.shutdown();
        self.cancellation_token = CancellationToken::new();
        self.epoch += 1;
        self.quiz = None;
        self.archetype = None;
        self.board = Arc::new(Mutex::new(SpotBoard::new()));
        self.variants.clear();
        self.stage = Stage::Intro;
        info!("Session {} reset.", self.session_id);
        Reaction::send(vec![ServerMessage::StageChanged { stage: Stage::Intro }])
    }

    fn variant_of(&self, spot_id: &SpotId) -> ImageVariant {
        self.variants.get(spot_id).copied().unwrap_or(ImageVariant::Day)
    }

    /// Stops the recommendation run of the current epoch.
    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
    }
}
