use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
    /// Permission restricted (parental controls, etc)
    Restricted,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// Camera authorization boundary.
///
/// Queries are point-in-time and must not be cached by callers.
/// `request_authorization` is idempotent and safe to call repeatedly.
pub trait PermissionGate: Send + Sync {
    fn status(&self) -> PermissionStatus;

    fn is_authorized(&self) -> bool {
        self.status() == PermissionStatus::Granted
    }

    fn is_denied(&self) -> bool {
        matches!(
            self.status(),
            PermissionStatus::Denied | PermissionStatus::Restricted
        )
    }

    /// Prompt for access if needed; resolves to whether access is granted
    fn request_authorization(&self) -> BoxFuture<'_, bool>;
}

/// Gate with a fixed user answer, for hosts that resolve access elsewhere
/// and for tests.
///
/// Starts in `initial` status. A request while `NotDetermined` settles the
/// status to `Granted` or `Denied` according to `grant_on_request`.
pub struct PresetPermissionGate {
    status: Mutex<PermissionStatus>,
    grant_on_request: bool,
    requests: AtomicUsize,
}

impl PresetPermissionGate {
    pub fn new(initial: PermissionStatus, grant_on_request: bool) -> Self {
        Self {
            status: Mutex::new(initial),
            grant_on_request,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, true)
    }

    pub fn denied() -> Self {
        Self::new(PermissionStatus::Denied, false)
    }

    pub fn undetermined(grant_on_request: bool) -> Self {
        Self::new(PermissionStatus::NotDetermined, grant_on_request)
    }

    /// How many times access has been requested
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionGate for PresetPermissionGate {
    fn status(&self) -> PermissionStatus {
        self.status
            .lock()
            .map(|s| *s)
            .unwrap_or(PermissionStatus::NotDetermined)
    }

    fn request_authorization(&self) -> BoxFuture<'_, bool> {
        async move {
            self.requests.fetch_add(1, Ordering::SeqCst);

            let mut status = match self.status.lock() {
                Ok(status) => status,
                Err(_) => return false,
            };

            if *status == PermissionStatus::NotDetermined {
                *status = if self.grant_on_request {
                    PermissionStatus::Granted
                } else {
                    PermissionStatus::Denied
                };
                log::info!("Camera permission settled: {}", *status);
            }

            *status == PermissionStatus::Granted
        }
        .boxed()
    }
}
