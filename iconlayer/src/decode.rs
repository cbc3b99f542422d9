//! Bundle decoding boundary.
//!
//! Asset bundles are a proprietary compressed container holding one or more
//! images. Parsing them is an external collaborator's job: the worker pool
//! treats the parser as an opaque function behind the [`BundleDecoder`]
//! trait, so deployments can plug in the real bundle toolchain while tests
//! and plain-image flows use [`ImageBitmapDecoder`].

use thiserror::Error;

/// Decoded image pixels: RGBA8, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawBitmap {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl RawBitmap {
    /// Encodes the bitmap as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, DecodeError> {
        let image = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| {
                DecodeError::Encode("pixel buffer does not match dimensions".to_string())
            })?;

        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| DecodeError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

/// Errors raised while turning a bundle payload into a bitmap.
#[derive(Clone, Debug, Error)]
pub enum DecodeError {
    /// The payload did not parse as a bundle with an image inside.
    #[error("failed to parse an image out of this bundle: {0}")]
    Parse(String),

    /// The atlas bundle parsed, but holds no sprite under the given name.
    #[error("sprite {0:?} not found in bundle")]
    SpriteNotFound(String),

    /// A bitmap could not be re-encoded for persistence.
    #[error("failed to encode bitmap: {0}")]
    Encode(String),

    /// The decode worker terminated before delivering a result.
    #[error("decode worker terminated before completing the task")]
    WorkerGone,
}

/// Parses binary bundle payloads into bitmaps.
///
/// `sprite_name` selects a named sub-sprite out of an atlas bundle; `None`
/// requests the bundle's whole image.
pub trait BundleDecoder: Send + Sync + 'static {
    fn parse(&self, payload: &[u8], sprite_name: Option<&str>) -> Result<RawBitmap, DecodeError>;
}

/// Decoder for plain single-image payloads (PNG, JPEG, and the other
/// formats the `image` crate reads).
///
/// Atlas bundles with named sprites need the full bundle toolchain and are
/// rejected here.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageBitmapDecoder;

impl BundleDecoder for ImageBitmapDecoder {
    fn parse(&self, payload: &[u8], sprite_name: Option<&str>) -> Result<RawBitmap, DecodeError> {
        if let Some(sprite) = sprite_name {
            return Err(DecodeError::SpriteNotFound(sprite.to_string()));
        }

        let decoded =
            image::load_from_memory(payload).map_err(|e| DecodeError::Parse(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(RawBitmap {
            width,
            height,
            data: rgba.into_raw(),
        })
    }
}
