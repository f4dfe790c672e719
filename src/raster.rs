//! Raster buffers and their text/image codecs
//!
//! A [`RasterBuffer`] is a plain RGBA pixel grid. It crosses the
//! memory/string boundary in two ways:
//!
//! - **Text form** (lossless, canonical on-disk form):
//!   `{"width": 2, "height": 1, "data": [255, 0, 0, 255, 0, 0, 0, 0]}`
//! - **Image form**: a `data:image/png;base64,...` string. PNG is lossless and
//!   keeps the alpha channel exactly.

use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of an image-embedded raster string.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Error type for raster decoding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Text payload is not JSON or is missing `width`/`height`/`data`
    #[error("malformed raster payload: {0}")]
    MalformedPayload(String),
    /// Declared dimensions disagree with the channel array
    #[error("channel array length {actual} does not match expected length {expected}")]
    ChannelLengthMismatch { expected: usize, actual: usize },
    /// Image-embedded string could not be decoded as an image
    #[error("failed to load image: {0}")]
    ImageLoadError(String),
}

/// A rectangular RGBA pixel buffer.
///
/// `data` always holds `width * height * 4` bytes when built through the
/// constructors in this module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RasterBuffer {
    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; channel_len(width, height)],
        }
    }

    /// The 1x1 fully-unset placeholder used for empty frame slots.
    pub fn empty() -> Self {
        Self::new(1, 1)
    }

    /// Create a buffer with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(channel_len(width, height));
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing channel array, checking its length.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CodecError> {
        let expected = channel_len(width, height);
        if data.len() != expected {
            return Err(CodecError::ChannelLengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Number of channel bytes (`width * height * 4`) the dimensions call for.
    pub fn expected_len(&self) -> usize {
        channel_len(self.width, self.height)
    }

    /// RGBA value at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Set the RGBA value at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(px) = self.data.get_mut(i..i + 4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Convert into an `image` crate buffer.
    pub fn to_image(&self) -> Result<RgbaImage, CodecError> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            CodecError::ChannelLengthMismatch {
                expected: self.expected_len(),
                actual: self.data.len(),
            },
        )
    }

    /// Build from an `image` crate buffer.
    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

impl Default for RasterBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

fn channel_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// Loose shape used when reading text payloads.
///
/// `data` is kept as a raw JSON value so both arrays and the index-keyed
/// objects produced by browser typed-array serialization are accepted.
#[derive(Deserialize)]
struct TextPayload {
    width: Option<u32>,
    height: Option<u32>,
    data: Option<serde_json::Value>,
}

/// Encode a buffer in the lossless text form.
pub fn encode_text(buffer: &RasterBuffer) -> String {
    // Serializing a struct of integers and a byte vector cannot fail.
    serde_json::to_string(buffer).unwrap_or_default()
}

/// Strictly decode the text form.
///
/// Fails with [`CodecError::MalformedPayload`] when the structure is wrong and
/// with [`CodecError::ChannelLengthMismatch`] when the channel array does not
/// fit the declared dimensions.
pub fn try_decode_text(text: &str) -> Result<RasterBuffer, CodecError> {
    let payload: TextPayload =
        serde_json::from_str(text).map_err(|e| CodecError::MalformedPayload(e.to_string()))?;

    let width = payload
        .width
        .ok_or_else(|| CodecError::MalformedPayload("missing width".to_string()))?;
    let height = payload
        .height
        .ok_or_else(|| CodecError::MalformedPayload("missing height".to_string()))?;
    let data = payload
        .data
        .ok_or_else(|| CodecError::MalformedPayload("missing data".to_string()))?;

    let channels = channels_from_value(&data)?;
    if channels.is_empty() {
        return Err(CodecError::MalformedPayload("empty data array".to_string()));
    }

    RasterBuffer::from_raw(width, height, channels)
}

/// Decode the text form, recovering locally from any failure.
///
/// Malformed payloads and channel-length mismatches are logged and replaced
/// by a 1x1 empty buffer so one bad frame never takes the artwork down.
pub fn decode_text(text: &str) -> RasterBuffer {
    match try_decode_text(text) {
        Ok(buffer) => buffer,
        Err(e) => {
            tracing::warn!(error = %e, "raster text payload rejected, substituting empty buffer");
            RasterBuffer::empty()
        }
    }
}

fn channels_from_value(value: &serde_json::Value) -> Result<Vec<u8>, CodecError> {
    match value {
        serde_json::Value::Array(items) => items.iter().map(channel_from_value).collect(),
        serde_json::Value::Object(map) => {
            // {"0": r, "1": g, ...} - order by numeric key, not map order
            let mut indexed = Vec::with_capacity(map.len());
            for (key, v) in map {
                let idx: usize = key.parse().map_err(|_| {
                    CodecError::MalformedPayload(format!("non-numeric channel index '{}'", key))
                })?;
                indexed.push((idx, channel_from_value(v)?));
            }
            indexed.sort_by_key(|(idx, _)| *idx);
            Ok(indexed.into_iter().map(|(_, c)| c).collect())
        }
        _ => Err(CodecError::MalformedPayload(
            "data must be an array or object".to_string(),
        )),
    }
}

fn channel_from_value(value: &serde_json::Value) -> Result<u8, CodecError> {
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| CodecError::MalformedPayload(format!("invalid channel value {}", value)))
}

/// Encode a buffer as a PNG data URL.
pub fn encode_image(buffer: &RasterBuffer) -> Result<String, CodecError> {
    let mut png = Vec::new();
    let expected = buffer.expected_len();
    if buffer.data.len() != expected {
        return Err(CodecError::ChannelLengthMismatch {
            expected,
            actual: buffer.data.len(),
        });
    }
    PngEncoder::new(&mut png)
        .write_image(&buffer.data, buffer.width, buffer.height, ColorType::Rgba8)
        .map_err(|e| CodecError::ImageLoadError(e.to_string()))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, encoded))
}

/// Synchronously decode a PNG data URL (or bare base64 PNG).
pub fn decode_image_blocking(source: &str) -> Result<RasterBuffer, CodecError> {
    let encoded = source.strip_prefix(PNG_DATA_URL_PREFIX).unwrap_or(source);
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| CodecError::ImageLoadError(e.to_string()))?;
    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
        .map_err(|e| CodecError::ImageLoadError(e.to_string()))?;
    Ok(RasterBuffer::from_image(image.to_rgba8()))
}

/// Asynchronously decode a PNG data URL.
///
/// The decode runs on a blocking worker. Callers must not start a second
/// decode for the same frame slot until this one resolves.
pub async fn decode_image(source: &str) -> Result<RasterBuffer, CodecError> {
    let source = source.to_string();
    tokio::task::spawn_blocking(move || decode_image_blocking(&source))
        .await
        .map_err(|e| CodecError::ImageLoadError(e.to_string()))?
}

/// True iff dimensions and every channel byte match.
pub fn buffer_equals(a: &RasterBuffer, b: &RasterBuffer) -> bool {
    if a.width != b.width || a.height != b.height {
        return false;
    }
    a.data == b.data
}

/// True if `b` differs from `a` in any way.
pub fn has_changed(a: &RasterBuffer, b: &RasterBuffer) -> bool {
    !buffer_equals(a, b)
}
