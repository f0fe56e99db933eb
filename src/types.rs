use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical placement of a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevicePosition {
    Front,
    Back,
    Unspecified,
}

/// Lens class of a built-in capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    WideAngle,
    UltraWide,
    Telephoto,
}

/// A device as reported by the hardware backend, before classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareDevice {
    pub model_id: String,
    pub name: String,
    pub position: DevicePosition,
    pub device_type: DeviceType,
}

impl HardwareDevice {
    pub fn new(
        model_id: impl Into<String>,
        name: impl Into<String>,
        position: DevicePosition,
        device_type: DeviceType,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            name: name.into(),
            position,
            device_type,
        }
    }
}

/// Classified device, as produced by the device catalog.
///
/// Immutable once enumerated. The catalog replaces the whole set on every
/// enumeration instead of patching entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Stable model identifier used for lens switching
    pub model_id: String,
    pub name: String,
    pub position: DevicePosition,
    pub device_type: DeviceType,
    /// True for the platform's default wide-angle back camera
    pub is_primary: bool,
}

impl DeviceDescriptor {
    pub fn is_back(&self) -> bool {
        self.position == DevicePosition::Back
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {:?}, {:?}{})",
            self.name,
            self.model_id,
            self.position,
            self.device_type,
            if self.is_primary { ", primary" } else { "" }
        )
    }
}

/// Pixel dimensions of a photo tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawFamily {
    /// Platform-proprietary computational raw (preferred)
    EnhancedRaw,
    /// Plain sensor Bayer raw
    BayerRaw,
}

/// A raw pixel format advertised by the photo output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawPixelFormat {
    pub fourcc: u32,
    pub family: RawFamily,
}

impl RawPixelFormat {
    pub fn enhanced(fourcc: u32) -> Self {
        Self {
            fourcc,
            family: RawFamily::EnhancedRaw,
        }
    }

    pub fn bayer(fourcc: u32) -> Self {
        Self {
            fourcc,
            family: RawFamily::BayerRaw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhotoCodec {
    Hevc,
    Jpeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoOrientation {
    Portrait,
    LandscapeRight,
}

/// Embedded thumbnail requested alongside a raw deliverable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailFormat {
    pub codec: PhotoCodec,
    pub dimensions: Dimensions,
}

/// Fully resolved request handed to the hardware for one still capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSettings {
    pub raw_format: Option<RawPixelFormat>,
    pub processed_codec: PhotoCodec,
    pub raw_thumbnail: Option<ThumbnailFormat>,
    pub max_photo_dimensions: Option<Dimensions>,
    pub orientation: VideoOrientation,
}

impl PhotoSettings {
    /// Processed-only request
    pub fn processed(codec: PhotoCodec) -> Self {
        Self {
            raw_format: None,
            processed_codec: codec,
            raw_thumbnail: None,
            max_photo_dimensions: None,
            orientation: VideoOrientation::Portrait,
        }
    }

    pub fn is_raw(&self) -> bool {
        self.raw_format.is_some()
    }

    /// Number of deliverables the hardware produces for these settings
    pub fn expected_deliverables(&self) -> usize {
        if self.is_raw() {
            2
        } else {
            1
        }
    }
}

/// Hardware-assigned identifier of one in-flight still capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationId(pub i64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliverableKind {
    Raw,
    Processed,
}

impl DeliverableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliverableKind::Raw => "raw",
            DeliverableKind::Processed => "processed",
        }
    }
}

impl fmt::Display for DeliverableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hardware-produced image payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deliverable {
    pub kind: DeliverableKind,
    /// Encoded file representation as produced by the hardware
    pub data: Bytes,
}

impl Deliverable {
    pub fn new(kind: DeliverableKind, data: impl Into<Bytes>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self::new(DeliverableKind::Raw, data)
    }

    pub fn processed(data: impl Into<Bytes>) -> Self {
        Self::new(DeliverableKind::Processed, data)
    }
}

/// Paired deliverables of one capture, handed to persistence on finalize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverableSet {
    pub id: CorrelationId,
    pub raw: Option<Deliverable>,
    pub processed: Option<Deliverable>,
}

impl DeliverableSet {
    pub fn empty(id: CorrelationId) -> Self {
        Self {
            id,
            raw: None,
            processed: None,
        }
    }

    pub fn len(&self) -> usize {
        usize::from(self.raw.is_some()) + usize::from(self.processed.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, kind: DeliverableKind) -> bool {
        self.slot(kind).is_some()
    }

    pub fn kinds(&self) -> Vec<DeliverableKind> {
        [DeliverableKind::Raw, DeliverableKind::Processed]
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }

    pub(crate) fn slot(&self, kind: DeliverableKind) -> Option<&Deliverable> {
        match kind {
            DeliverableKind::Raw => self.raw.as_ref(),
            DeliverableKind::Processed => self.processed.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, kind: DeliverableKind) -> &mut Option<Deliverable> {
        match kind {
            DeliverableKind::Raw => &mut self.raw,
            DeliverableKind::Processed => &mut self.processed,
        }
    }
}

/// Decoded preview frame; opaque to this crate beyond its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFrame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl PreviewFrame {
    pub fn new(sequence: u64, width: u32, height: u32, data: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            width,
            height,
            data: data.into(),
        }
    }
}
