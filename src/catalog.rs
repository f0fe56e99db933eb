//! Device catalog
//!
//! Enumerates the capture devices the session can bind, classifying each
//! as primary (the platform's default wide-angle back camera) and as front
//! or back facing.

use crate::platform::CaptureBackend;
use crate::types::{DeviceDescriptor, DevicePosition, DeviceType, HardwareDevice};
use std::sync::Arc;

/// Lens types offered on the back of the device
const BACK_DEVICE_TYPES: [DeviceType; 3] = [
    DeviceType::UltraWide,
    DeviceType::WideAngle,
    DeviceType::Telephoto,
];

const FRONT_DEVICE_TYPES: [DeviceType; 1] = [DeviceType::WideAngle];

pub struct DeviceCatalog {
    backend: Arc<dyn CaptureBackend>,
}

impl DeviceCatalog {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self { backend }
    }

    /// Fresh, front-first list of every supported device.
    ///
    /// Empty when the host has no default wide-angle back camera; callers
    /// must read that as "camera unavailable".
    pub fn enumerate(&self) -> Vec<DeviceDescriptor> {
        let Some(main) = self
            .backend
            .default_device(DeviceType::WideAngle, DevicePosition::Back)
        else {
            log::error!("No default wide-angle back camera found");
            return Vec::new();
        };

        let mut devices = self
            .backend
            .discover(&BACK_DEVICE_TYPES, DevicePosition::Back);

        // Each front device goes to the head of the list.
        for front in self
            .backend
            .discover(&FRONT_DEVICE_TYPES, DevicePosition::Front)
        {
            devices.insert(0, front);
        }

        log::info!("Discovered {} supported devices", devices.len());

        devices
            .into_iter()
            .map(|device| classify(device, &main.model_id))
            .collect()
    }
}

/// Classify one hardware device against the primary model id
pub fn classify(device: HardwareDevice, primary_model_id: &str) -> DeviceDescriptor {
    let is_primary = device.model_id == primary_model_id;
    DeviceDescriptor {
        model_id: device.model_id,
        name: device.name,
        position: device.position,
        device_type: device.device_type,
        is_primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_marks_primary_by_model_id() {
        let device = HardwareDevice::new(
            "wide-1",
            "Back Camera",
            DevicePosition::Back,
            DeviceType::WideAngle,
        );
        let descriptor = classify(device.clone(), "wide-1");
        assert!(descriptor.is_primary);
        assert!(descriptor.is_back());

        assert!(!classify(device, "tele-1").is_primary);
    }

    #[test]
    fn test_front_camera_is_never_back() {
        let device = HardwareDevice::new(
            "front-1",
            "Front Camera",
            DevicePosition::Front,
            DeviceType::WideAngle,
        );
        assert!(!classify(device, "wide-1").is_back());
    }
}
