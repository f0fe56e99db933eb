//! Simulated capture hardware
//!
//! Behaves like a phone with one front and three back cameras. Capture
//! lifecycle events are emitted synchronously from `capture_photo`
//! according to the configured [`CaptureScript`]; failure toggles make the
//! hardware refuse inputs, outputs, sessions or zoom changes.

use super::synthetic_data::{
    synthetic_processed_payload, synthetic_raw_payload, BAYER_RAW_FOURCC, ENHANCED_RAW_FOURCC,
};
use crate::correlation::CaptureEvent;
use crate::errors::CameraError;
use crate::platform::{
    CaptureBackend, HardwareSession, InputHandle, OutputConfiguration, OutputHandle, OutputKind,
    SessionSinks,
};
use crate::types::{
    CorrelationId, Deliverable, DevicePosition, DeviceType, Dimensions, HardwareDevice,
    PhotoCodec, PhotoSettings, PreviewFrame, RawPixelFormat,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const FRONT_WIDE: &str = "sim-front-wide";
pub const BACK_ULTRA_WIDE: &str = "sim-back-ultrawide";
pub const BACK_WIDE: &str = "sim-back-wide";
pub const BACK_TELE: &str = "sim-back-tele";

const PAYLOAD_SIZE: usize = 256;

/// How the simulated hardware answers a still capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureScript {
    /// Every expected deliverable, then a finished event
    Complete { raw_first: bool },
    /// The raw deliverable never arrives; processed only, then finished
    DropRaw,
    /// A hardware error right after begin
    Fail,
    /// Begin only; the test drives the rest with [`SimulatedBackend::emit_event`]
    Silent,
    /// The processed deliverable is delivered twice
    DuplicateProcessed,
}

/// Hardware call counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedStats {
    pub sessions_created: usize,
    pub inputs_added: usize,
    pub inputs_removed: usize,
    pub outputs_added: usize,
    pub outputs_removed: usize,
    pub configure_calls: usize,
    pub commits: usize,
    pub starts: usize,
    pub stops: usize,
    pub captures: usize,
    pub zoom_calls: usize,
}

struct Shared {
    devices: Vec<HardwareDevice>,
    primary: Mutex<Option<String>>,
    raw_formats: Mutex<Vec<RawPixelFormat>>,
    thumbnail_codecs: Mutex<Vec<PhotoCodec>>,
    photo_tiers: Mutex<Vec<Dimensions>>,
    failing_inputs: Mutex<HashSet<String>>,
    output_failures: AtomicUsize,
    fail_session_creation: AtomicBool,
    fail_zoom: AtomicBool,
    script: Mutex<CaptureScript>,
    late_events: Mutex<Vec<CaptureEvent>>,
    next_id: AtomicI64,
    stats: Mutex<SimulatedStats>,
    last_settings: Mutex<Option<PhotoSettings>>,
    last_configuration: Mutex<Option<OutputConfiguration>>,
    sinks: Mutex<Option<SessionSinks>>,
    bound_model: Mutex<Option<String>>,
    running: AtomicBool,
    hardware_zoom: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn count(&self, update: impl FnOnce(&mut SimulatedStats)) {
        update(&mut lock(&self.stats));
    }

    fn device(&self, model_id: &str) -> Option<&HardwareDevice> {
        self.devices.iter().find(|d| d.model_id == model_id)
    }
}

/// Simulated backend; clones share the same hardware
#[derive(Clone)]
pub struct SimulatedBackend {
    shared: Arc<Shared>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        let devices = vec![
            HardwareDevice::new(
                FRONT_WIDE,
                "Front Camera",
                DevicePosition::Front,
                DeviceType::WideAngle,
            ),
            HardwareDevice::new(
                BACK_ULTRA_WIDE,
                "Back Ultra Wide Camera",
                DevicePosition::Back,
                DeviceType::UltraWide,
            ),
            HardwareDevice::new(
                BACK_WIDE,
                "Back Camera",
                DevicePosition::Back,
                DeviceType::WideAngle,
            ),
            HardwareDevice::new(
                BACK_TELE,
                "Back Telephoto Camera",
                DevicePosition::Back,
                DeviceType::Telephoto,
            ),
        ];

        Self {
            shared: Arc::new(Shared {
                devices,
                primary: Mutex::new(Some(BACK_WIDE.to_string())),
                raw_formats: Mutex::new(vec![
                    RawPixelFormat::bayer(BAYER_RAW_FOURCC),
                    RawPixelFormat::enhanced(ENHANCED_RAW_FOURCC),
                ]),
                thumbnail_codecs: Mutex::new(vec![PhotoCodec::Jpeg, PhotoCodec::Hevc]),
                photo_tiers: Mutex::new(vec![
                    Dimensions::new(4032, 3024),
                    Dimensions::new(8064, 6048),
                ]),
                failing_inputs: Mutex::new(HashSet::new()),
                output_failures: AtomicUsize::new(0),
                fail_session_creation: AtomicBool::new(false),
                fail_zoom: AtomicBool::new(false),
                script: Mutex::new(CaptureScript::Complete { raw_first: true }),
                late_events: Mutex::new(Vec::new()),
                next_id: AtomicI64::new(1),
                stats: Mutex::new(SimulatedStats::default()),
                last_settings: Mutex::new(None),
                last_configuration: Mutex::new(None),
                sinks: Mutex::new(None),
                bound_model: Mutex::new(None),
                running: AtomicBool::new(false),
                hardware_zoom: AtomicU64::new(1.0f64.to_bits()),
            }),
        }
    }

    /// Host without a default wide-angle back camera
    pub fn without_primary() -> Self {
        let backend = Self::new();
        *lock(&backend.shared.primary) = None;
        backend
    }

    pub fn set_raw_formats(&self, formats: Vec<RawPixelFormat>) {
        *lock(&self.shared.raw_formats) = formats;
    }

    pub fn set_thumbnail_codecs(&self, codecs: Vec<PhotoCodec>) {
        *lock(&self.shared.thumbnail_codecs) = codecs;
    }

    pub fn set_photo_tiers(&self, tiers: Vec<Dimensions>) {
        *lock(&self.shared.photo_tiers) = tiers;
    }

    /// Make opening the device with `model_id` fail
    pub fn fail_input(&self, model_id: &str) {
        lock(&self.shared.failing_inputs).insert(model_id.to_string());
    }

    pub fn clear_input_failures(&self) {
        lock(&self.shared.failing_inputs).clear();
    }

    /// Make the next `count` output additions fail
    pub fn fail_next_outputs(&self, count: usize) {
        self.shared.output_failures.store(count, Ordering::SeqCst);
    }

    pub fn set_fail_session_creation(&self, fail: bool) {
        self.shared.fail_session_creation.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_zoom(&self, fail: bool) {
        self.shared.fail_zoom.store(fail, Ordering::SeqCst);
    }

    pub fn set_capture_script(&self, script: CaptureScript) {
        *lock(&self.shared.script) = script;
    }

    /// Queue an event for an earlier request. The next capture call emits
    /// it from the hardware thread before any event of its own.
    pub fn queue_late_event(&self, event: CaptureEvent) {
        lock(&self.shared.late_events).push(event);
    }

    pub fn stats(&self) -> SimulatedStats {
        lock(&self.shared.stats).clone()
    }

    /// Settings of the most recent capture request
    pub fn last_photo_settings(&self) -> Option<PhotoSettings> {
        lock(&self.shared.last_settings).clone()
    }

    pub fn last_output_configuration(&self) -> Option<OutputConfiguration> {
        lock(&self.shared.last_configuration).clone()
    }

    /// Model id bound to the most recent session's input
    pub fn bound_model(&self) -> Option<String> {
        lock(&self.shared.bound_model).clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Zoom factor the hardware actually applied
    pub fn hardware_zoom(&self) -> f64 {
        f64::from_bits(self.shared.hardware_zoom.load(Ordering::SeqCst))
    }

    /// Push a preview frame as the frame thread would. Frames are only
    /// produced while running.
    pub fn emit_preview_frame(&self, frame: PreviewFrame) -> bool {
        if !self.is_running() {
            return false;
        }
        match lock(&self.shared.sinks).clone() {
            Some(sinks) => {
                sinks.frames.deliver(frame);
                true
            }
            None => false,
        }
    }

    /// Inject a capture lifecycle event into the latest session
    pub fn emit_event(&self, event: CaptureEvent) -> bool {
        match lock(&self.shared.sinks).clone() {
            Some(sinks) => {
                sinks.events.emit(event);
                true
            }
            None => false,
        }
    }
}

impl CaptureBackend for SimulatedBackend {
    fn default_device(
        &self,
        device_type: DeviceType,
        position: DevicePosition,
    ) -> Option<HardwareDevice> {
        let primary = lock(&self.shared.primary).clone()?;
        self.shared
            .device(&primary)
            .filter(|d| d.device_type == device_type && d.position == position)
            .cloned()
    }

    fn discover(
        &self,
        device_types: &[DeviceType],
        position: DevicePosition,
    ) -> Vec<HardwareDevice> {
        self.shared
            .devices
            .iter()
            .filter(|d| d.position == position && device_types.contains(&d.device_type))
            .cloned()
            .collect()
    }

    fn create_session(&self, sinks: SessionSinks) -> Result<Box<dyn HardwareSession>, CameraError> {
        if self.shared.fail_session_creation.load(Ordering::SeqCst) {
            return Err(CameraError::InitializationError(
                "simulated session creation failure".to_string(),
            ));
        }

        self.shared.count(|s| s.sessions_created += 1);
        *lock(&self.shared.sinks) = Some(sinks.clone());
        *lock(&self.shared.bound_model) = None;
        self.shared.running.store(false, Ordering::SeqCst);

        Ok(Box::new(SimulatedSession {
            shared: self.shared.clone(),
            sinks,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            next_handle: 1,
            running: false,
        }))
    }
}

struct SimulatedSession {
    shared: Arc<Shared>,
    sinks: SessionSinks,
    inputs: HashMap<u64, String>,
    outputs: HashMap<u64, OutputKind>,
    next_handle: u64,
    running: bool,
}

impl SimulatedSession {
    fn handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn has_output(&self, kind: OutputKind) -> bool {
        self.outputs.values().any(|k| *k == kind)
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
        self.shared.running.store(running, Ordering::SeqCst);
    }

    fn emit(&self, event: CaptureEvent) {
        self.sinks.events.emit(event);
    }

    fn deliver(&self, id: CorrelationId, raw: bool) {
        let deliverable = if raw {
            Deliverable::raw(synthetic_raw_payload(id, PAYLOAD_SIZE))
        } else {
            Deliverable::processed(synthetic_processed_payload(id, PAYLOAD_SIZE))
        };
        self.emit(CaptureEvent::DeliverableArrived { id, deliverable });
    }

    fn play(&self, script: CaptureScript, id: CorrelationId, settings: &PhotoSettings) {
        let raw = settings.is_raw();
        self.emit(CaptureEvent::Begin {
            id,
            expected: settings.expected_deliverables(),
        });

        match script {
            CaptureScript::Complete { raw_first } => {
                if raw && raw_first {
                    self.deliver(id, true);
                }
                self.deliver(id, false);
                if raw && !raw_first {
                    self.deliver(id, true);
                }
                self.emit(CaptureEvent::Finished { id });
            }
            CaptureScript::DropRaw => {
                self.deliver(id, false);
                self.emit(CaptureEvent::Finished { id });
            }
            CaptureScript::Fail => self.emit(CaptureEvent::TerminalFailure {
                id,
                reason: "simulated sensor error".to_string(),
            }),
            CaptureScript::Silent => {}
            CaptureScript::DuplicateProcessed => {
                self.deliver(id, false);
                self.deliver(id, false);
                if raw {
                    self.deliver(id, true);
                }
                self.emit(CaptureEvent::Finished { id });
            }
        }
    }
}

impl HardwareSession for SimulatedSession {
    fn begin_configuration(&mut self) {}

    fn commit_configuration(&mut self) {
        self.shared.count(|s| s.commits += 1);
    }

    fn add_input(&mut self, model_id: &str) -> Result<InputHandle, CameraError> {
        if self.shared.device(model_id).is_none() {
            return Err(CameraError::DeviceNotFound(model_id.to_string()));
        }
        if lock(&self.shared.failing_inputs).contains(model_id) {
            return Err(CameraError::HardwareError(format!(
                "cannot open {}",
                model_id
            )));
        }
        if !self.inputs.is_empty() {
            return Err(CameraError::HardwareError(
                "session already has an input".to_string(),
            ));
        }

        let handle = self.handle();
        self.inputs.insert(handle, model_id.to_string());
        *lock(&self.shared.bound_model) = Some(model_id.to_string());
        self.shared.count(|s| s.inputs_added += 1);
        Ok(InputHandle(handle))
    }

    fn remove_input(&mut self, input: InputHandle) {
        if self.inputs.remove(&input.0).is_some() {
            *lock(&self.shared.bound_model) = None;
            self.shared.count(|s| s.inputs_removed += 1);
        }
    }

    fn add_output(&mut self, kind: OutputKind) -> Result<OutputHandle, CameraError> {
        let pending_failures = self.shared.output_failures.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.shared
                .output_failures
                .store(pending_failures - 1, Ordering::SeqCst);
            return Err(CameraError::HardwareError(format!(
                "cannot add {:?} output",
                kind
            )));
        }
        if self.has_output(kind) {
            return Err(CameraError::HardwareError(format!(
                "{:?} output already attached",
                kind
            )));
        }

        let handle = self.handle();
        self.outputs.insert(handle, kind);
        self.shared.count(|s| s.outputs_added += 1);
        Ok(OutputHandle(handle))
    }

    fn remove_output(&mut self, output: OutputHandle) {
        if self.outputs.remove(&output.0).is_some() {
            self.shared.count(|s| s.outputs_removed += 1);
        }
    }

    fn configure_outputs(&mut self, configuration: &OutputConfiguration) {
        self.shared.count(|s| s.configure_calls += 1);
        *lock(&self.shared.last_configuration) = Some(configuration.clone());
    }

    fn start_running(&mut self) {
        self.shared.count(|s| s.starts += 1);
        self.set_running(true);
    }

    fn stop_running(&mut self) {
        self.shared.count(|s| s.stops += 1);
        self.set_running(false);
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn available_raw_formats(&self) -> Vec<RawPixelFormat> {
        if self.has_output(OutputKind::Photo) {
            lock(&self.shared.raw_formats).clone()
        } else {
            Vec::new()
        }
    }

    fn raw_thumbnail_codecs(&self, _format: RawPixelFormat) -> Vec<PhotoCodec> {
        lock(&self.shared.thumbnail_codecs).clone()
    }

    fn supported_max_photo_dimensions(&self) -> Vec<Dimensions> {
        if self.inputs.is_empty() {
            Vec::new()
        } else {
            lock(&self.shared.photo_tiers).clone()
        }
    }

    fn set_zoom_factor(&mut self, factor: f64, _ramp_rate: Option<f32>) -> Result<(), CameraError> {
        self.shared.count(|s| s.zoom_calls += 1);
        if self.shared.fail_zoom.load(Ordering::SeqCst) {
            return Err(CameraError::HardwareError(
                "device locked for configuration".to_string(),
            ));
        }
        self.shared
            .hardware_zoom
            .store(factor.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    fn capture_photo(&mut self, settings: &PhotoSettings) -> Result<CorrelationId, CameraError> {
        if !self.has_output(OutputKind::Photo) {
            return Err(CameraError::HardwareError("no photo output".to_string()));
        }
        if !self.running {
            return Err(CameraError::HardwareError("session not running".to_string()));
        }

        let id = CorrelationId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        self.shared.count(|s| s.captures += 1);
        *lock(&self.shared.last_settings) = Some(settings.clone());

        let late = std::mem::take(&mut *lock(&self.shared.late_events));
        for event in late {
            self.emit(event);
        }

        let script = *lock(&self.shared.script);
        self.play(script, id, settings);
        Ok(id)
    }
}
