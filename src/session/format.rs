//! Still capture format selection
//!
//! Pure functions deciding what a single capture asks the hardware for.
//! The session controller feeds them the hardware's current capabilities
//! and a snapshot of the capture preferences.

use crate::config::CameraSettings;
use crate::errors::CameraError;
use crate::types::{
    Dimensions, PhotoCodec, PhotoSettings, RawFamily, RawPixelFormat, ThumbnailFormat,
};

/// Zoom factor treated as "not zoomed"
pub const NEUTRAL_ZOOM: f64 = 1.0;

/// Embedded thumbnail edge used when the capture dimensions are unknown;
/// the hardware clamps it to the actual photo size.
pub const THUMBNAIL_FALLBACK_EDGE: u32 = 10_000;

/// Codec of the processed deliverable
pub const PROCESSED_CODEC: PhotoCodec = PhotoCodec::Hevc;

/// First enhanced raw format, otherwise first Bayer raw format
pub fn preferred_raw_format(available: &[RawPixelFormat]) -> Option<RawPixelFormat> {
    let find = |family: RawFamily| available.iter().copied().find(|f| f.family == family);
    find(RawFamily::EnhancedRaw).or_else(|| find(RawFamily::BayerRaw))
}

/// Zoom Guard: raw capture is only allowed at exactly neutral zoom
#[allow(clippy::float_cmp)]
pub fn raw_allowed_at_zoom(zoom_factor: f64) -> bool {
    zoom_factor == NEUTRAL_ZOOM
}

/// Raw format for a capture, or `None` for a processed-only capture
pub fn select_raw_format(
    settings: &CameraSettings,
    zoom_factor: f64,
    available: &[RawPixelFormat],
) -> Option<RawPixelFormat> {
    if !settings.use_raw || !raw_allowed_at_zoom(zoom_factor) {
        return None;
    }
    preferred_raw_format(available)
}

/// Photo tier for a capture given the device's tiers, smallest first.
///
/// Zoomed captures with `fix_zoomed_exposure` use the smallest tier so the
/// exposure matches the preview; everything else uses the largest.
pub fn select_photo_dimensions(
    supported: &[Dimensions],
    zoom_factor: f64,
    fix_zoomed_exposure: bool,
) -> Option<Dimensions> {
    if zoom_factor > NEUTRAL_ZOOM && fix_zoomed_exposure {
        supported.first().copied()
    } else {
        supported.last().copied()
    }
}

/// Build the full request for one still capture.
///
/// Fails with a configuration error, before anything reaches the hardware,
/// when raw was selected but the format offers no thumbnail codec.
pub fn resolve_photo_settings<F>(
    settings: &CameraSettings,
    zoom_factor: f64,
    available_raw: &[RawPixelFormat],
    thumbnail_codecs: F,
    supported_dimensions: &[Dimensions],
) -> Result<PhotoSettings, CameraError>
where
    F: FnOnce(RawPixelFormat) -> Vec<PhotoCodec>,
{
    let mut photo = PhotoSettings::processed(PROCESSED_CODEC);
    photo.max_photo_dimensions =
        select_photo_dimensions(supported_dimensions, zoom_factor, settings.fix_zoomed_exposure);

    let Some(raw_format) = select_raw_format(settings, zoom_factor, available_raw) else {
        log::info!(
            "Capturing processed only (use_raw: {}, zoom: {}, raw formats: {})",
            settings.use_raw,
            zoom_factor,
            available_raw.len()
        );
        return Ok(photo);
    };

    let codec = thumbnail_codecs(raw_format).first().copied().ok_or_else(|| {
        CameraError::ConfigurationError(format!(
            "No embedded thumbnail codec for raw format {:#010x}",
            raw_format.fourcc
        ))
    })?;

    let dimensions = match photo.max_photo_dimensions {
        Some(d) if !d.is_empty() => d,
        _ => Dimensions::new(THUMBNAIL_FALLBACK_EDGE, THUMBNAIL_FALLBACK_EDGE),
    };

    log::info!("Capturing raw ({:?}) with processed", raw_format.family);
    photo.raw_format = Some(raw_format);
    photo.raw_thumbnail = Some(ThumbnailFormat { codec, dimensions });
    Ok(photo)
}
