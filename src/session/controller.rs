use super::format::{self, NEUTRAL_ZOOM};
use super::preview::PreviewDispatcher;
use crate::catalog::DeviceCatalog;
use crate::completion::{capture_request, CaptureRequestHandle};
use crate::config::CameraSettings;
use crate::correlation::{CorrelationDriver, EngineMessage};
use crate::errors::CameraError;
use crate::permissions::PermissionGate;
use crate::persistence::Persistence;
use crate::platform::{
    CaptureBackend, EventSink, HardwareSession, InputHandle, OutputConfiguration, OutputHandle,
    OutputKind, SessionSinks,
};
use crate::signals::{PreviewCallback, SessionSignals, SignalCallback};
use crate::types::DeviceDescriptor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

/// Outputs attached to the hardware session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveOutputs {
    pub photo: OutputHandle,
    pub video: OutputHandle,
}

/// Device, input and outputs currently bound to the hardware session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveBinding {
    pub device: DeviceDescriptor,
    pub input: InputHandle,
    pub outputs: ActiveOutputs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// A reconfiguration is in progress; nothing else may run
    Configuring,
    Running(ActiveBinding),
    Stopped,
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running(_))
    }

    pub fn binding(&self) -> Option<&ActiveBinding> {
        match self {
            SessionState::Running(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Configuring => "configuring",
            SessionState::Running(_) => "running",
            SessionState::Stopped => "stopped",
        }
    }
}

/// Result of a lens switch that left the session running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Switched(DeviceDescriptor),
    /// The requested device could not be bound; the previous device is
    /// bound again with working outputs
    RolledBack { requested: String, reason: String },
}

/// Everything mutated inside the configuration critical section
struct SessionCore {
    hardware: Option<Box<dyn HardwareSession>>,
    /// Binding of `hardware`, kept while stopped so it can resume
    binding: Option<ActiveBinding>,
}

/// Why a rebind attempt failed, and what it left attached
struct RebindFailure {
    error: CameraError,
    outputs_detached: bool,
}

/// Clears the in-flight capture flag when the capture call ends or is
/// dropped
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Capture session controller.
///
/// Configuration (setup, lens switch, stop, zoom and issuing a capture) is
/// serialized by one lock over the hardware session; an operation started
/// during a reconfiguration waits for it to commit. Capture lifecycle
/// events are handled by the correlation driver task spawned on creation.
pub struct CameraSession {
    backend: Arc<dyn CaptureBackend>,
    permissions: Arc<dyn PermissionGate>,
    catalog: DeviceCatalog,
    core: Mutex<SessionCore>,
    state: watch::Sender<SessionState>,
    devices: RwLock<Vec<DeviceDescriptor>>,
    settings: RwLock<CameraSettings>,
    zoom_bits: AtomicU64,
    capture_in_flight: AtomicBool,
    signals: Arc<SessionSignals>,
    preview: Arc<PreviewDispatcher>,
    engine: mpsc::UnboundedSender<EngineMessage>,
    saved_file: watch::Receiver<Option<PathBuf>>,
    processing: watch::Receiver<bool>,
}

impl CameraSession {
    /// Create an uninitialized session. Must be called within a tokio
    /// runtime, which hosts the correlation driver.
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        permissions: Arc<dyn PermissionGate>,
        persistence: Arc<dyn Persistence>,
        settings: CameraSettings,
    ) -> Result<Self, CameraError> {
        let runtime = Handle::try_current().map_err(|e| {
            CameraError::InitializationError(format!("No tokio runtime available: {}", e))
        })?;

        let signals = Arc::new(SessionSignals::default());
        let driver = CorrelationDriver::spawn(&runtime, persistence, signals.clone());
        let (state, _) = watch::channel(SessionState::Uninitialized);

        Ok(Self {
            catalog: DeviceCatalog::new(backend.clone()),
            backend,
            permissions,
            core: Mutex::new(SessionCore {
                hardware: None,
                binding: None,
            }),
            state,
            devices: RwLock::new(Vec::new()),
            settings: RwLock::new(settings),
            zoom_bits: AtomicU64::new(NEUTRAL_ZOOM.to_bits()),
            capture_in_flight: AtomicBool::new(false),
            preview: Arc::new(PreviewDispatcher::new(signals.clone())),
            signals,
            engine: driver.tx,
            saved_file: driver.saved_file,
            processing: driver.processing,
        })
    }

    /// Enumerate devices and remember the list for lens switching
    pub fn discover_devices(&self) -> Vec<DeviceDescriptor> {
        let devices = self.catalog.enumerate();
        if let Ok(mut slot) = self.devices.write() {
            *slot = devices.clone();
        }
        devices
    }

    /// Devices from the last enumeration
    pub fn devices(&self) -> Vec<DeviceDescriptor> {
        self.devices.read().map(|d| d.clone()).unwrap_or_default()
    }

    /// Bind `device` and start streaming.
    ///
    /// Without `reconstruct`, an existing session already bound to the
    /// same device is reused: outputs are reconfigured and streaming
    /// resumes, nothing is torn down.
    pub async fn setup_session(
        &self,
        device: &DeviceDescriptor,
        reconstruct: bool,
    ) -> Result<ActiveBinding, CameraError> {
        if !self.permissions.is_authorized() && !self.permissions.request_authorization().await {
            log::error!("Camera authorization not granted");
            return Err(CameraError::PermissionDenied(
                "camera access not granted".to_string(),
            ));
        }

        let mut core = self.lock_core();

        if !reconstruct {
            if let Some(binding) = Self::resume(&mut core, device, &self.preview) {
                log::info!("Reusing existing session for {}", binding.device);
                self.publish(SessionState::Running(binding.clone()));
                return Ok(binding);
            }
        }

        self.publish(SessionState::Configuring);

        match self.build_session(&mut core, device) {
            Ok(binding) => {
                self.zoom_bits.store(NEUTRAL_ZOOM.to_bits(), Ordering::SeqCst);
                self.publish(SessionState::Running(binding.clone()));
                Ok(binding)
            }
            Err(e) => {
                log::error!("Session setup with {} failed: {}", device, e);
                // Any earlier hardware session was stopped and stays resumable.
                self.publish(if core.hardware.is_some() {
                    SessionState::Stopped
                } else {
                    SessionState::Uninitialized
                });
                Err(e)
            }
        }
    }

    fn resume(
        core: &mut SessionCore,
        device: &DeviceDescriptor,
        preview: &PreviewDispatcher,
    ) -> Option<ActiveBinding> {
        let binding = core.binding.clone()?;
        if binding.device.model_id != device.model_id {
            log::info!(
                "Existing session is bound to {}, rebuilding for {}",
                binding.device.model_id,
                device.model_id
            );
            return None;
        }

        let hardware = core.hardware.as_mut()?;
        configure_for_bound_device(hardware.as_mut());
        if !hardware.is_running() {
            preview.reset_first_frame();
            hardware.start_running();
        }
        Some(binding)
    }

    fn build_session(
        &self,
        core: &mut SessionCore,
        device: &DeviceDescriptor,
    ) -> Result<ActiveBinding, CameraError> {
        let started = std::time::Instant::now();

        if let Some(existing) = core.hardware.as_mut() {
            existing.stop_running();
        }

        let sinks = SessionSinks {
            events: EventSink::new(self.engine.clone()),
            frames: self.preview.clone(),
        };
        let mut hardware = self.backend.create_session(sinks)?;

        hardware.begin_configuration();
        let input = hardware.add_input(&device.model_id)?;
        let outputs = attach_outputs(hardware.as_mut())?;
        configure_for_bound_device(hardware.as_mut());
        hardware.commit_configuration();

        self.preview.reset_first_frame();
        hardware.start_running();

        let binding = ActiveBinding {
            device: device.clone(),
            input,
            outputs,
        };
        core.hardware = Some(hardware);
        core.binding = Some(binding.clone());

        log::info!(
            "Session set up with {} in {:?}",
            binding.device,
            started.elapsed()
        );
        Ok(binding)
    }

    /// Rebind the running session to the device with `model_id`.
    ///
    /// A device that cannot be found or bound leaves the previous device
    /// bound with its outputs attached ([`SwitchOutcome::RolledBack`]). An
    /// error is returned when there is no session to switch, or when the
    /// previous device could not be restored either; the session is then
    /// `Stopped` and needs a full setup.
    pub async fn switch_lens(&self, model_id: &str) -> Result<SwitchOutcome, CameraError> {
        let mut guard = self.lock_core();
        let core = &mut *guard;
        let (Some(hardware), Some(previous)) = (core.hardware.as_mut(), core.binding.clone())
        else {
            return Err(CameraError::InvalidState(
                "no session to switch lens on".to_string(),
            ));
        };

        let target = self
            .devices
            .read()
            .ok()
            .and_then(|devices| devices.iter().find(|d| d.model_id == model_id).cloned());

        self.preview.set_suppressed(true);
        self.publish(SessionState::Configuring);

        hardware.stop_running();
        hardware.begin_configuration();
        hardware.remove_input(previous.input);

        let (binding, outcome) = match rebind(hardware.as_mut(), target, &previous) {
            Ok(binding) => {
                log::info!("Switched lens to {}", binding.device);
                let outcome = SwitchOutcome::Switched(binding.device.clone());
                (binding, outcome)
            }
            Err(failure) => {
                log::warn!("Lens switch to {} failed: {}", model_id, failure.error);
                match restore(hardware.as_mut(), &previous, failure.outputs_detached) {
                    Ok(binding) => (
                        binding,
                        SwitchOutcome::RolledBack {
                            requested: model_id.to_string(),
                            reason: failure.error.to_string(),
                        },
                    ),
                    Err(e) => {
                        hardware.commit_configuration();
                        core.binding = None;
                        self.preview.set_suppressed(false);
                        self.publish(SessionState::Stopped);
                        log::error!("Could not restore {} after failed switch: {}", previous.device, e);
                        return Err(CameraError::HardwareError(format!(
                            "lens switch to {} failed ({}) and {} could not be restored ({})",
                            model_id, failure.error, previous.device.model_id, e
                        )));
                    }
                }
            }
        };

        configure_for_bound_device(hardware.as_mut());
        hardware.commit_configuration();
        hardware.start_running();

        if matches!(outcome, SwitchOutcome::Switched(_)) {
            self.zoom_bits.store(NEUTRAL_ZOOM.to_bits(), Ordering::SeqCst);
        }
        core.binding = Some(binding.clone());
        self.preview.set_suppressed(false);
        self.publish(SessionState::Running(binding));
        Ok(outcome)
    }

    /// Stop streaming. Returns false when no session was ever set up.
    ///
    /// A capture in flight is not cancelled; it resolves when the hardware
    /// reports its outcome.
    pub fn stop(&self) -> bool {
        {
            let mut core = self.lock_core();
            let Some(hardware) = core.hardware.as_mut() else {
                return false;
            };
            hardware.stop_running();
            self.preview.reset_first_frame();
            self.publish(SessionState::Stopped);
        }

        // Outside the lock: the preview callback may call back into us.
        self.preview.clear();
        log::info!("Session stopped");
        true
    }

    /// Apply a zoom factor. The factor is recorded before the hardware
    /// call and hardware failures are ignored.
    pub fn zoom(&self, factor: f64, animated: bool) {
        let mut core = self.lock_core();
        let Some(hardware) = core.hardware.as_mut() else {
            return;
        };

        self.zoom_bits.store(factor.to_bits(), Ordering::SeqCst);
        let ramp = animated.then(|| self.settings().zoom_ramp_rate);
        if let Err(e) = hardware.set_zoom_factor(factor, ramp) {
            log::debug!("Zoom to {} not applied: {}", factor, e);
        }
    }

    /// Capture one still and wait until it has been persisted.
    ///
    /// Reports only success or failure; the reason is logged. Returns false
    /// immediately when another capture is still in flight.
    pub async fn capture_photo(&self) -> bool {
        if self
            .capture_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("Capture requested while another capture is in flight");
            return false;
        }
        let _in_flight = InFlightGuard(&self.capture_in_flight);

        match self.issue_capture() {
            Ok(handle) => handle.wait().await,
            Err(e) => {
                log::error!("Capture not issued: {}", e);
                false
            }
        }
    }

    fn issue_capture(&self) -> Result<CaptureRequestHandle, CameraError> {
        let settings = self.settings();
        let zoom_factor = self.zoom_factor();

        let mut core = self.lock_core();
        if core.binding.is_none() || !self.state.borrow().is_running() {
            return Err(CameraError::InvalidState(format!(
                "capture requires a running session, session is {}",
                self.state.borrow().name()
            )));
        }
        let Some(hardware) = core.hardware.as_mut() else {
            return Err(CameraError::InvalidState("no hardware session".to_string()));
        };

        let raw_formats = hardware.available_raw_formats();
        log::debug!("Available raw formats: {}", raw_formats.len());
        let photo = format::resolve_photo_settings(
            &settings,
            zoom_factor,
            &raw_formats,
            |raw| hardware.raw_thumbnail_codecs(raw),
            &hardware.supported_max_photo_dimensions(),
        )?;

        // Armed ahead of the hardware call so no event can overtake it, and
        // bound to the returned id once the call comes back.
        let (completion, handle) = capture_request();
        self.engine
            .send(EngineMessage::Arm(completion))
            .map_err(|_| CameraError::InvalidState("correlation engine has shut down".into()))?;

        match hardware.capture_photo(&photo) {
            Ok(id) => {
                self.engine.send(EngineMessage::Bind(id)).map_err(|_| {
                    CameraError::InvalidState("correlation engine has shut down".into())
                })?;
                log::info!(
                    "Capture {} issued, expecting {} deliverables",
                    id,
                    photo.expected_deliverables()
                );
                Ok(handle)
            }
            Err(e) => {
                let _ = self.engine.send(EngineMessage::Disarm);
                Err(e)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Last requested zoom factor
    pub fn zoom_factor(&self) -> f64 {
        f64::from_bits(self.zoom_bits.load(Ordering::SeqCst))
    }

    pub fn is_switching_lens(&self) -> bool {
        self.preview.is_suppressed()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture_in_flight.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> CameraSettings {
        self.settings.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Replace the capture preferences; read again by the next capture
    pub fn set_settings(&self, settings: CameraSettings) {
        if let Ok(mut slot) = self.settings.write() {
            *slot = settings;
        }
    }

    /// Location of the most recently saved capture
    pub fn saved_file(&self) -> Option<PathBuf> {
        self.saved_file.borrow().clone()
    }

    pub fn subscribe_saved_file(&self) -> watch::Receiver<Option<PathBuf>> {
        self.saved_file.clone()
    }

    /// True while a finalized capture is being persisted
    pub fn is_processing(&self) -> bool {
        *self.processing.borrow()
    }

    pub fn subscribe_processing(&self) -> watch::Receiver<bool> {
        self.processing.clone()
    }

    pub fn on_preview(&self, callback: Option<PreviewCallback>) {
        self.signals.set_preview(callback);
    }

    pub fn on_first_frame(&self, callback: Option<SignalCallback>) {
        self.signals.set_first_frame(callback);
    }

    pub fn on_begin_capture(&self, callback: Option<SignalCallback>) {
        self.signals.set_begin_capture(callback);
    }

    fn publish(&self, state: SessionState) {
        log::debug!("Session state -> {}", state.name());
        self.state.send_replace(state);
    }

    fn lock_core(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if let Some(hardware) = self.lock_core().hardware.as_mut() {
            if hardware.is_running() {
                hardware.stop_running();
            }
        }
    }
}

/// Tune the outputs for the currently bound device
fn configure_for_bound_device(hardware: &mut dyn HardwareSession) {
    let tiers = hardware.supported_max_photo_dimensions();
    hardware.configure_outputs(&OutputConfiguration::for_device(&tiers));
}

/// Attach a fresh photo and video output pair. Nothing stays attached on
/// failure.
fn attach_outputs(hardware: &mut dyn HardwareSession) -> Result<ActiveOutputs, CameraError> {
    let photo = hardware.add_output(OutputKind::Photo).map_err(|e| {
        log::error!("Failed to add photo output: {}", e);
        e
    })?;
    match hardware.add_output(OutputKind::VideoData) {
        Ok(video) => Ok(ActiveOutputs { photo, video }),
        Err(e) => {
            log::error!("Failed to add video data output: {}", e);
            hardware.remove_output(photo);
            Err(e)
        }
    }
}

/// Bind `target` in place of the removed previous input and replace the
/// outputs
fn rebind(
    hardware: &mut dyn HardwareSession,
    target: Option<DeviceDescriptor>,
    previous: &ActiveBinding,
) -> Result<ActiveBinding, RebindFailure> {
    let intact = |error| RebindFailure {
        error,
        outputs_detached: false,
    };

    let device = target.ok_or_else(|| {
        intact(CameraError::DeviceNotFound(
            "requested lens is not in the enumerated device set".to_string(),
        ))
    })?;
    let input = hardware.add_input(&device.model_id).map_err(intact)?;

    hardware.remove_output(previous.outputs.photo);
    hardware.remove_output(previous.outputs.video);
    match attach_outputs(hardware) {
        Ok(outputs) => Ok(ActiveBinding {
            device,
            input,
            outputs,
        }),
        Err(error) => {
            hardware.remove_input(input);
            Err(RebindFailure {
                error,
                outputs_detached: true,
            })
        }
    }
}

/// Rebind the previous device after a failed switch
fn restore(
    hardware: &mut dyn HardwareSession,
    previous: &ActiveBinding,
    outputs_detached: bool,
) -> Result<ActiveBinding, CameraError> {
    let input = hardware.add_input(&previous.device.model_id)?;
    let outputs = if outputs_detached {
        match attach_outputs(hardware) {
            Ok(outputs) => outputs,
            Err(e) => {
                hardware.remove_input(input);
                return Err(e);
            }
        }
    } else {
        previous.outputs
    };

    log::info!("Restored {} after failed lens switch", previous.device);
    Ok(ActiveBinding {
        device: previous.device.clone(),
        input,
        outputs,
    })
}
