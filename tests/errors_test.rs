#[cfg(test)]
mod error_tests {
    use crabshutter::errors::CameraError;
    use std::error::Error;

    #[test]
    fn test_camera_error_initialization() {
        let error = CameraError::InitializationError("No runtime".to_string());
        assert!(error.to_string().contains("Camera initialization error"));
        assert!(error.to_string().contains("No runtime"));
    }

    #[test]
    fn test_camera_error_permission_denied() {
        let error = CameraError::PermissionDenied("Access denied".to_string());
        assert!(error.to_string().contains("Permission denied"));
        assert!(error.is_authorization());
        assert!(!error.is_configuration());
    }

    #[test]
    fn test_configuration_errors_are_classified() {
        assert!(CameraError::ConfigurationError("no thumbnail codec".to_string()).is_configuration());
        assert!(CameraError::DeviceNotFound("sim-back-tele".to_string()).is_configuration());
        assert!(!CameraError::HardwareError("sensor".to_string()).is_configuration());
    }

    #[test]
    fn test_camera_error_display_trait() {
        let error = CameraError::HardwareError("Display test".to_string());
        assert_eq!(format!("{}", error), "Hardware error: Display test");
    }

    #[test]
    fn test_camera_error_debug_format() {
        let error = CameraError::InvalidState("Debug test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("InvalidState"));
        assert!(debug_str.contains("Debug test"));
    }

    #[test]
    fn test_io_error_conversion_keeps_source() {
        fn read_missing() -> Result<Vec<u8>, CameraError> {
            Ok(std::fs::read("/definitely/not/here.heic")?)
        }

        let error = read_missing().unwrap_err();
        assert!(matches!(error, CameraError::Io(_)));
        assert!(error.to_string().starts_with("IO error"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_string_variants_have_no_source() {
        let errors = vec![
            CameraError::InitializationError("a".to_string()),
            CameraError::PermissionDenied("b".to_string()),
            CameraError::ConfigurationError("c".to_string()),
            CameraError::DeviceNotFound("d".to_string()),
            CameraError::InvalidState("e".to_string()),
            CameraError::HardwareError("f".to_string()),
            CameraError::StorageError("g".to_string()),
        ];
        for error in errors {
            let _error_trait: &dyn Error = &error;
            assert!(error.source().is_none());
            assert!(!error.to_string().is_empty());
        }
    }
}
