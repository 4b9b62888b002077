//! crates/soul_map_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or provider format.

use serde::{Deserialize, Serialize};
use std::fmt;

//=========================================================================================
// Archetypes
//=========================================================================================

/// One of the three traveler personas a quiz can end in.
///
/// The declaration order is the tie-break order used when scoring a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArchetypeId {
    Healer,
    Adventurer,
    Scavenger,
}

impl ArchetypeId {
    /// Every archetype, in enumeration order.
    pub const ALL: [ArchetypeId; 3] = [
        ArchetypeId::Healer,
        ArchetypeId::Adventurer,
        ArchetypeId::Scavenger,
    ];

    /// Position of this archetype in [`ArchetypeId::ALL`].
    pub const fn index(self) -> usize {
        match self {
            ArchetypeId::Healer => 0,
            ArchetypeId::Adventurer => 1,
            ArchetypeId::Scavenger => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ArchetypeId::Healer => "HEALER",
            ArchetypeId::Adventurer => "ADVENTURER",
            ArchetypeId::Scavenger => "SCAVENGER",
        }
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Theme colours of an archetype, as hex strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub background: &'static str,
    pub text: &'static str,
}

/// The static, display-facing description of an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchetypeProfile {
    pub id: ArchetypeId,
    pub name: &'static str,
    pub subtitle: &'static str,
    pub description: &'static str,
    pub keywords: [&'static str; 4],
    pub palette: Palette,
}

//=========================================================================================
// Quiz Questions
//=========================================================================================

/// A single answer a user can pick; it scores exactly one archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizOption {
    pub text: &'static str,
    pub archetype: ArchetypeId,
}

/// A quiz question with its ordered options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: u32,
    pub prompt: &'static str,
    pub options: &'static [QuizOption],
}

//=========================================================================================
// Travel Spots
//=========================================================================================

/// Synthetic key of a travel spot: `"{ARCHETYPE}-{position}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpotId(String);

impl SpotId {
    pub fn new(archetype: ArchetypeId, position: usize) -> Self {
        Self(format!("{}-{}", archetype.as_str(), position))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SpotId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SpotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Latitude and longitude, kept as the display strings the provider returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: String,
    pub lng: String,
}

/// One raw recommendation, as returned by the recommendation service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpotRecord {
    pub name: String,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub reminders: Vec<String>,
    #[serde(default)]
    pub prescription: String,
    #[serde(default)]
    pub coordinates: Coordinates,
}

/// Highlights every recommendation must carry.
pub const HIGHLIGHT_COUNT: usize = 3;
/// Practical reminders every recommendation must carry.
pub const REMINDER_COUNT: usize = 2;

impl SpotRecord {
    /// Checks the record against the recommendation contract: exactly three
    /// highlights, exactly two reminders, a prescription and both coordinates.
    ///
    /// Deserialization tolerates missing extras; the service adapter decides
    /// whether a short record is acceptable.
    pub fn check_contract(&self) -> Result<(), String> {
        let blank = |value: &str| value.trim().is_empty();
        if blank(&self.name) || blank(&self.location) {
            return Err("a recommendation needs a name and a location".to_string());
        }
        if self.highlights.len() != HIGHLIGHT_COUNT {
            return Err(format!(
                "{} has {} highlights, expected {}",
                self.name,
                self.highlights.len(),
                HIGHLIGHT_COUNT
            ));
        }
        if self.reminders.len() != REMINDER_COUNT {
            return Err(format!(
                "{} has {} reminders, expected {}",
                self.name,
                self.reminders.len(),
                REMINDER_COUNT
            ));
        }
        if blank(&self.prescription) {
            return Err(format!("{} has no prescription", self.name));
        }
        if blank(&self.coordinates.lat) || blank(&self.coordinates.lng) {
            return Err(format!("{} has no coordinates", self.name));
        }
        Ok(())
    }
}

/// The day or night rendering of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageVariant {
    Day,
    Night,
}

impl ImageVariant {
    pub const fn label(self) -> &'static str {
        match self {
            ImageVariant::Day => "DAY",
            ImageVariant::Night => "NIGHT",
        }
    }
}

impl fmt::Display for ImageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A generated image: either an inline payload or a reachable URL.
///
/// Serialized as a single string (`data:` URL or plain URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ImageRef {
    Inline { mime_type: String, data: String },
    Remote(String),
}

impl ImageRef {
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        ImageRef::Inline {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        ImageRef::Remote(url.into())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Inline { mime_type, data } => write!(f, "data:{};base64,{}", mime_type, data),
            ImageRef::Remote(url) => f.write_str(url),
        }
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for ImageRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if let Some(rest) = value.strip_prefix("data:") {
            let (mime_type, data) = rest
                .split_once(";base64,")
                .ok_or_else(|| "data URL is not base64 encoded".to_string())?;
            return Ok(ImageRef::inline(mime_type, data));
        }
        if value.starts_with("http://") || value.starts_with("https://") {
            return Ok(ImageRef::Remote(value));
        }
        Err(format!("unsupported image reference: {}", value))
    }
}

/// A recommended location, enriched in place as its images arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelSpot {
    pub id: SpotId,
    pub name: String,
    pub location: String,
    pub description: String,
    pub highlights: Vec<String>,
    pub reminders: Vec<String>,
    pub prescription: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub day_image: Option<ImageRef>,
    #[serde(default)]
    pub night_image: Option<ImageRef>,
}

impl TravelSpot {
    /// Builds a spot from a service record; the id is derived from its position.
    pub fn from_record(archetype: ArchetypeId, position: usize, record: SpotRecord) -> Self {
        Self {
            id: SpotId::new(archetype, position),
            name: record.name,
            location: record.location,
            description: record.description,
            highlights: record.highlights,
            reminders: record.reminders,
            prescription: record.prescription,
            coordinates: record.coordinates,
            day_image: None,
            night_image: None,
        }
    }

    pub fn image(&self, variant: ImageVariant) -> Option<&ImageRef> {
        match variant {
            ImageVariant::Day => self.day_image.as_ref(),
            ImageVariant::Night => self.night_image.as_ref(),
        }
    }
}

//=========================================================================================
// Postcards
//=========================================================================================

/// The user-entered fields of a postcard. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostcardDraft {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub signature: String,
}
