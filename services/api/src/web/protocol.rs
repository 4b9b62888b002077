//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the quiz, the recommendation board and the day/night image toggle.

use serde::{Deserialize, Serialize};
use soul_map_core::domain::{ArchetypeProfile, ImageRef, ImageVariant, Question, SpotId, TravelSpot};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Leaves the intro and presents the first question.
    StartQuiz,

    /// Picks an option of the question on screen.
    Answer { option_index: usize },

    /// Toggles which image variant a spot shows.
    SelectVariant { spot_id: SpotId, variant: ImageVariant },

    /// Returns to the intro from anywhere, abandoning any work in progress.
    Reset,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// The three views of the flow.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intro,
    Quiz,
    Result,
}

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once when the connection opens.
    SessionInitialized { session_id: Uuid },

    StageChanged { stage: Stage },

    /// A question to display; `index` is 0-based.
    QuestionPresented {
        index: usize,
        total: usize,
        prompt: String,
        options: Vec<String>,
    },

    /// The answer to question `index` was counted. The next question follows
    /// after the transition delay.
    AnswerAccepted { index: usize },

    /// The quiz is over; carries the full profile of the winner.
    QuizCompleted { archetype: ArchetypeProfile },

    /// Recommendations have been requested.
    SpotsLoading,

    /// The recommendation list arrived; images are still loading.
    SpotsLoaded { spots: Vec<TravelSpot> },

    /// One spot's day/night pair resolved. Absent images failed.
    SpotImagesSettled { spot: TravelSpot },

    /// The recommendation fetch failed and no spots will be shown.
    RecommendationsUnavailable,

    /// The image a spot should display. `None` means the placeholder.
    ActiveImage {
        spot_id: SpotId,
        variant: ImageVariant,
        image: Option<ImageRef>,
    },

    /// Reports an error to the client, which should display the message.
    Error { message: String },
}

impl ServerMessage {
    pub fn question(index: usize, total: usize, question: &Question) -> Self {
        ServerMessage::QuestionPresented {
            index,
            total,
            prompt: question.prompt.to_string(),
            options: question.options.iter().map(|o| o.text.to_string()).collect(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use soul_map_core::{catalog, domain::ArchetypeId};

    #[test]
    fn client_messages_are_tagged_in_snake_case() {
        let msg: ClientMessage = serde_json::from_value(json!({ "type": "start_quiz" })).unwrap();
        assert_eq!(msg, ClientMessage::StartQuiz);

        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "answer", "option_index": 2 })).unwrap();
        assert_eq!(msg, ClientMessage::Answer { option_index: 2 });

        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "select_variant",
            "spot_id": "HEALER-1",
            "variant": "night"
        }))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SelectVariant {
                spot_id: SpotId::from("HEALER-1"),
                variant: ImageVariant::Night,
            }
        );
    }

    #[test]
    fn unknown_client_messages_are_rejected() {
        assert!(serde_json::from_value::<ClientMessage>(json!({ "type": "init" })).is_err());
        assert!(serde_json::from_value::<ClientMessage>(json!({ "type": "answer" })).is_err());
    }

    #[test]
    fn server_messages_have_the_expected_shape() {
        let value = serde_json::to_value(ServerMessage::StageChanged { stage: Stage::Result }).unwrap();
        assert_eq!(value, json!({ "type": "stage_changed", "stage": "result" }));

        let value = serde_json::to_value(ServerMessage::RecommendationsUnavailable).unwrap();
        assert_eq!(value, json!({ "type": "recommendations_unavailable" }));

        let value = serde_json::to_value(ServerMessage::ActiveImage {
            spot_id: SpotId::from("SCAVENGER-0"),
            variant: ImageVariant::Day,
            image: None,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({ "type": "active_image", "spot_id": "SCAVENGER-0", "variant": "day", "image": null })
        );
    }

    #[test]
    fn quiz_completed_carries_the_profile() {
        let msg = ServerMessage::QuizCompleted {
            archetype: *catalog::profile(ArchetypeId::Adventurer),
        };
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(value["type"], "quiz_completed");
        assert_eq!(value["archetype"]["id"], "ADVENTURER");
        assert_eq!(value["archetype"]["keywords"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn question_frames_list_option_texts() {
        let question = &catalog::questions()[0];
        let ServerMessage::QuestionPresented { index, total, options, .. } =
            ServerMessage::question(0, 5, question)
        else {
            panic!("expected a question frame");
        };
        assert_eq!((index, total), (0, 5));
        assert_eq!(options.len(), question.options.len());
    }
}
