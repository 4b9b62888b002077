//! services/api/src/adapters/postcard_raster.rs
//!
//! This module contains the raster postcard renderer.
//! It implements the `PostcardRenderer` port from the `core` crate.

use ab_glyph::{FontArc, PxScale};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use reqwest::{redirect, Client, Url};
use soul_map_core::{
    domain::ImageRef,
    ports::{PortError, PortResult, PostcardRenderer},
    postcard::{PostcardLayout, POSTCARD_HEIGHT, POSTCARD_JPEG_QUALITY, POSTCARD_WIDTH},
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::OnceCell;
use tracing::{info, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_REDIRECTS: usize = 5;
/// Largest remote background the renderer will download.
pub const MAX_BACKGROUND_BYTES: usize = 10 * 1024 * 1024;

const MARGIN: i32 = 80;
const PANEL_TOP: u32 = 1160;
const HEADER_BOTTOM: u32 = 220;
const MESSAGE_MAX_LINES: usize = 5;

const BACKDROP: Rgb<u8> = Rgb([28, 25, 23]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const MUTED: Rgb<u8> = Rgb([190, 190, 190]);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Renders postcards into 1080×1920 JPEG files.
///
/// The font is read from disk on first use, so a missing font only fails the
/// export, not the service.
///
/// Remote backgrounds come from client-supplied spots. They are fetched only
/// from `allowed_hosts`, redirects included, and never beyond
/// `max_background_bytes`.
pub struct RasterPostcardAdapter {
    font_path: PathBuf,
    font: OnceCell<FontArc>,
    http: Client,
    allowed_hosts: Arc<[String]>,
    max_background_bytes: usize,
}

impl RasterPostcardAdapter {
    /// Creates a new `RasterPostcardAdapter` that downloads backgrounds only
    /// from the given hosts.
    pub fn new(font_path: PathBuf, allowed_hosts: Vec<String>) -> PortResult<Self> {
        let allowed_hosts: Arc<[String]> = allowed_hosts
            .into_iter()
            .map(|host| host.trim().to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect();

        let redirect_hosts = allowed_hosts.clone();
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if is_allowed(&redirect_hosts, attempt.url()) {
                attempt.follow()
            } else {
                attempt.error("redirected to a host that is not allowed")
            }
        });
        let http = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(policy)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Self {
            font_path,
            font: OnceCell::new(),
            http,
            allowed_hosts,
            max_background_bytes: MAX_BACKGROUND_BYTES,
        })
    }

    async fn font(&self) -> PortResult<FontArc> {
        let font = self
            .font
            .get_or_try_init(|| async {
                let bytes = tokio::fs::read(&self.font_path).await.map_err(|e| {
                    PortError::Unavailable(format!(
                        "cannot read postcard font {}: {}",
                        self.font_path.display(),
                        e
                    ))
                })?;
                info!("Loaded postcard font from {}.", self.font_path.display());
                FontArc::try_from_vec(bytes)
                    .map_err(|e| PortError::Malformed(format!("invalid postcard font: {}", e)))
            })
            .await?;
        Ok(font.clone())
    }

    async fn image_bytes(&self, image: &ImageRef) -> PortResult<Vec<u8>> {
        match image {
            ImageRef::Inline { data, .. } => STANDARD
                .decode(data)
                .map_err(|e| PortError::Malformed(format!("inline image is not base64: {}", e))),
            ImageRef::Remote(url) => self.download(url).await,
        }
    }

    async fn download(&self, url: &str) -> PortResult<Vec<u8>> {
        let url = Url::parse(url)
            .map_err(|e| PortError::Malformed(format!("invalid background url: {}", e)))?;
        if !is_allowed(&self.allowed_hosts, &url) {
            warn!("Refusing to fetch background from {}.", url);
            return Err(PortError::Malformed(format!(
                "background host is not allowed: {}",
                url.host_str().unwrap_or_default()
            )));
        }

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        let too_large = || {
            PortError::Malformed(format!(
                "background exceeds {} bytes",
                self.max_background_bytes
            ))
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_background_bytes as u64)
        {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
        {
            if bytes.len() + chunk.len() > self.max_background_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

/// Only http(s) URLs whose host is on the list may be fetched.
fn is_allowed(allowed_hosts: &[String], url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
        && url
            .host_str()
            .is_some_and(|host| allowed_hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(host)))
}

//=========================================================================================
// `PostcardRenderer` Trait Implementation
//=========================================================================================

#[async_trait]
impl PostcardRenderer for RasterPostcardAdapter {
    async fn render(&self, layout: &PostcardLayout) -> PortResult<Vec<u8>> {
        let font = self.font().await?;
        let background = match &layout.background {
            Some(image) => Some(self.image_bytes(image).await?),
            None => None,
        };
        let layout = layout.clone();

        tokio::task::spawn_blocking(move || compose_jpeg(&layout, background.as_deref(), &font))
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
    }
}

//=========================================================================================
// Drawing
//=========================================================================================

/// Draws the fixed template and encodes it as JPEG.
pub fn compose_jpeg(
    layout: &PostcardLayout,
    background: Option<&[u8]>,
    font: &FontArc,
) -> PortResult<Vec<u8>> {
    let mut canvas = match background {
        Some(bytes) => image::load_from_memory(bytes)
            .map_err(|e| PortError::Malformed(format!("cannot decode background: {}", e)))?
            .resize_to_fill(POSTCARD_WIDTH, POSTCARD_HEIGHT, FilterType::Lanczos3)
            .to_rgb8(),
        None => RgbImage::from_pixel(POSTCARD_WIDTH, POSTCARD_HEIGHT, BACKDROP),
    };

    shade(&mut canvas, 0, HEADER_BOTTOM, 0.35);
    shade(&mut canvas, PANEL_TOP, POSTCARD_HEIGHT, 0.6);

    let width = POSTCARD_WIDTH as i32;
    let text_width = (width - 2 * MARGIN) as u32;

    draw_text_mut(&mut canvas, WHITE, MARGIN, 110, PxScale::from(40.0), font, &layout.heading);

    let mut y = PANEL_TOP as i32 + 70;
    draw_text_mut(&mut canvas, MUTED, MARGIN, y, PxScale::from(32.0), font, &layout.recipient_line);
    y += 70;

    let message_scale = PxScale::from(50.0);
    for line in wrap(&layout.message, message_scale, font, text_width)
        .into_iter()
        .take(MESSAGE_MAX_LINES)
    {
        draw_text_mut(&mut canvas, WHITE, MARGIN, y, message_scale, font, &line);
        y += 72;
    }

    let signature_scale = PxScale::from(34.0);
    let (signature_width, _) = text_size(signature_scale, font, &layout.signature_line);
    draw_text_mut(
        &mut canvas,
        MUTED,
        width - MARGIN - signature_width as i32,
        y + 10,
        signature_scale,
        font,
        &layout.signature_line,
    );

    if !layout.prescription.is_empty() {
        draw_text_mut(&mut canvas, MUTED, MARGIN, 1700, PxScale::from(30.0), font, &layout.prescription);
    }

    let small = PxScale::from(28.0);
    draw_text_mut(&mut canvas, MUTED, MARGIN, 1790, small, font, &layout.guide_line);
    for (line, line_y) in [(&layout.latitude_line, 1760), (&layout.longitude_line, 1800)] {
        let (w, _) = text_size(small, font, line);
        draw_text_mut(&mut canvas, MUTED, width - MARGIN - w as i32, line_y, small, font, line);
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, POSTCARD_JPEG_QUALITY)
        .encode_image(&canvas)
        .map_err(|e| PortError::Unexpected(format!("cannot encode postcard: {}", e)))?;
    Ok(out)
}

/// Darkens the rows `[top, bottom)` by `strength` (0 keeps, 1 blackens).
fn shade(canvas: &mut RgbImage, top: u32, bottom: u32, strength: f32) {
    let keep = (1.0 - strength).clamp(0.0, 1.0);
    for y in top..bottom.min(canvas.height()) {
        for x in 0..canvas.width() {
            let pixel = canvas.get_pixel_mut(x, y);
            for channel in pixel.0.iter_mut() {
                *channel = (*channel as f32 * keep) as u8;
            }
        }
    }
}

/// Greedy character wrap; works for CJK text, which has no spaces to break on.
fn wrap(text: &str, scale: PxScale, font: &FontArc, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for c in paragraph.chars() {
            current.push(c);
            if text_size(scale, font, &current).0 > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}
