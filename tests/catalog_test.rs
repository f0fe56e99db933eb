use crabshutter::testing::simulated::{BACK_TELE, BACK_ULTRA_WIDE, BACK_WIDE, FRONT_WIDE};
use crabshutter::testing::SimulatedBackend;
use crabshutter::{DeviceCatalog, DevicePosition};
use std::sync::Arc;

#[test]
fn test_front_devices_come_first() {
    let catalog = DeviceCatalog::new(Arc::new(SimulatedBackend::new()));
    let ids: Vec<String> = catalog
        .enumerate()
        .into_iter()
        .map(|d| d.model_id)
        .collect();

    assert_eq!(ids, vec![FRONT_WIDE, BACK_ULTRA_WIDE, BACK_WIDE, BACK_TELE]);
}

#[test]
fn test_exactly_one_primary_back_camera() {
    let catalog = DeviceCatalog::new(Arc::new(SimulatedBackend::new()));
    let devices = catalog.enumerate();

    let primaries: Vec<_> = devices.iter().filter(|d| d.is_primary).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0].model_id, BACK_WIDE);
    assert!(primaries[0].is_back());

    let front = devices.iter().find(|d| d.model_id == FRONT_WIDE).unwrap();
    assert_eq!(front.position, DevicePosition::Front);
    assert!(!front.is_back());
}

#[test]
fn test_no_default_camera_yields_empty_list() {
    let catalog = DeviceCatalog::new(Arc::new(SimulatedBackend::without_primary()));
    assert!(catalog.enumerate().is_empty());
}

#[test]
fn test_each_enumeration_is_fresh() {
    let catalog = DeviceCatalog::new(Arc::new(SimulatedBackend::new()));
    let first = catalog.enumerate();
    let second = catalog.enumerate();
    assert_eq!(first, second);
}
