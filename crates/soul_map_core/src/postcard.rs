//! crates/soul_map_core/src/postcard.rs
//!
//! Fills the postcard template from a spot and the user's draft, and drives
//! the export through the `PostcardRenderer` port.

use tracing::{error, info};

use crate::domain::{ImageRef, PostcardDraft, TravelSpot};
use crate::ports::{PortError, PostcardRenderer};

/// Output canvas, 9:16.
pub const POSTCARD_WIDTH: u32 = 1080;
pub const POSTCARD_HEIGHT: u32 = 1920;
pub const POSTCARD_JPEG_QUALITY: u8 = 95;

pub const DEFAULT_RECIPIENT: &str = "未知的旅伴";
pub const DEFAULT_MESSAGE: &str = "在這裡，我聽見了島嶼的心跳。這份靜謐與震撼，希望能與你分享。";
pub const DEFAULT_SIGNATURE: &str = "一位旅人";

const BRAND: &str = "心旅地圖";

/// Rasterizing the postcard failed; nothing was produced.
#[derive(Debug, thiserror::Error)]
#[error("Failed to export the postcard for {spot_name}: {source}")]
pub struct ExportError {
    pub spot_name: String,
    #[source]
    pub source: PortError,
}

/// Every piece of text and imagery the renderer places on the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostcardLayout {
    pub spot_name: String,
    pub heading: String,
    pub recipient_line: String,
    pub message: String,
    pub signature_line: String,
    pub guide_line: String,
    pub latitude_line: String,
    pub longitude_line: String,
    pub prescription: String,
    pub background: Option<ImageRef>,
}

impl PostcardLayout {
    /// Binds a draft onto the fixed template. Blank fields use the defaults.
    pub fn compose(spot: &TravelSpot, draft: &PostcardDraft) -> Self {
        Self {
            spot_name: spot.name.clone(),
            heading: format!("{} · {}", BRAND, spot.location),
            recipient_line: format!("寄給: {}", or_default(&draft.recipient, DEFAULT_RECIPIENT)),
            message: or_default(&draft.message, DEFAULT_MESSAGE).to_string(),
            signature_line: format!("— {}", or_default(&draft.signature, DEFAULT_SIGNATURE)),
            guide_line: format!("深度導覽 / {}", spot.location),
            latitude_line: format!("{} N", spot.coordinates.lat),
            longitude_line: format!("{} E", spot.coordinates.lng),
            prescription: spot.prescription.clone(),
            background: spot.day_image.clone(),
        }
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed
    }
}

/// The download name of a postcard: `心旅地圖_明信片_{name}.jpg`.
pub fn export_file_name(spot_name: &str) -> String {
    let safe: String = spot_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}_明信片_{}.jpg", BRAND, safe)
}

/// An exported postcard, ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostcardExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Composes and rasterizes a postcard. On failure the error is logged and no
/// partial output is returned.
pub async fn export_postcard(
    renderer: &dyn PostcardRenderer,
    spot: &TravelSpot,
    draft: &PostcardDraft,
) -> Result<PostcardExport, ExportError> {
    let layout = PostcardLayout::compose(spot, draft);
    match renderer.render(&layout).await {
        Ok(bytes) => {
            info!("Exported postcard for {} ({} bytes).", spot.name, bytes.len());
            Ok(PostcardExport {
                file_name: export_file_name(&spot.name),
                bytes,
            })
        }
        Err(source) => {
            let err = ExportError {
                spot_name: spot.name.clone(),
                source,
            };
            error!("{}", err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArchetypeId, SpotRecord};
    use crate::ports::PortResult;
    use async_trait::async_trait;

    fn spot() -> TravelSpot {
        let record: SpotRecord = serde_json::from_value(serde_json::json!({
            "name": "神木/步道",
            "location": "嘉義縣阿里山鄉",
            "description": "desc",
            "prescription": "慢慢走",
            "coordinates": { "lat": "23.51", "lng": "120.80" }
        }))
        .unwrap();
        let mut spot = TravelSpot::from_record(ArchetypeId::Healer, 0, record);
        spot.day_image = Some(ImageRef::remote("https://img/day"));
        spot
    }

    #[test]
    fn blank_fields_fall_back_to_defaults() {
        let draft = PostcardDraft {
            recipient: "   ".into(),
            ..PostcardDraft::default()
        };
        let layout = PostcardLayout::compose(&spot(), &draft);
        assert_eq!(layout.recipient_line, format!("寄給: {}", DEFAULT_RECIPIENT));
        assert_eq!(layout.message, DEFAULT_MESSAGE);
        assert_eq!(layout.signature_line, format!("— {}", DEFAULT_SIGNATURE));
    }

    #[test]
    fn template_binds_spot_and_draft() {
        let draft = PostcardDraft {
            recipient: "小安".into(),
            message: "好想你".into(),
            signature: "阿杰".into(),
        };
        let layout = PostcardLayout::compose(&spot(), &draft);
        assert_eq!(layout.heading, "心旅地圖 · 嘉義縣阿里山鄉");
        assert_eq!(layout.recipient_line, "寄給: 小安");
        assert_eq!(layout.message, "好想你");
        assert_eq!(layout.signature_line, "— 阿杰");
        assert_eq!(layout.guide_line, "深度導覽 / 嘉義縣阿里山鄉");
        assert_eq!(layout.latitude_line, "23.51 N");
        assert_eq!(layout.longitude_line, "120.80 E");
        assert_eq!(layout.background, Some(ImageRef::remote("https://img/day")));
    }

    #[test]
    fn file_name_replaces_path_separators() {
        assert_eq!(export_file_name("神木/步道"), "心旅地圖_明信片_神木_步道.jpg");
        assert_eq!(export_file_name("老街"), "心旅地圖_明信片_老街.jpg");
    }

    struct Renderer(bool);

    #[async_trait]
    impl PostcardRenderer for Renderer {
        async fn render(&self, layout: &PostcardLayout) -> PortResult<Vec<u8>> {
            if self.0 {
                Ok(layout.spot_name.as_bytes().to_vec())
            } else {
                Err(PortError::Unexpected("font missing".into()))
            }
        }
    }

    #[tokio::test]
    async fn export_names_the_file_after_the_spot() {
        let export = export_postcard(&Renderer(true), &spot(), &PostcardDraft::default())
            .await
            .unwrap();
        assert_eq!(export.file_name, "心旅地圖_明信片_神木_步道.jpg");
        assert!(!export.bytes.is_empty());
    }

    #[tokio::test]
    async fn export_failure_produces_no_output() {
        let err = export_postcard(&Renderer(false), &spot(), &PostcardDraft::default())
            .await
            .unwrap_err();
        assert_eq!(err.spot_name, "神木/步道");
    }
}
