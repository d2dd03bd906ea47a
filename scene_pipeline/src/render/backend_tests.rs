use super::*;

#[test]
fn test_recording_backend_keeps_frames() {
    let shared = RecordingBackend::new();
    let mut backend = shared.clone();

    backend.init().unwrap();
    backend.submit(&FrameDrawLists { frame: 0, lists: Vec::new() }).unwrap();
    backend.submit(&FrameDrawLists { frame: 1, lists: Vec::new() }).unwrap();
    backend.shutdown();

    assert!(shared.is_initialized().unwrap());
    assert!(shared.is_shut_down().unwrap());
    assert_eq!(shared.frame_count().unwrap(), 2);
    assert_eq!(shared.last_frame().unwrap().unwrap().frame, 1);
    let frames: Vec<u64> = shared.frames().unwrap().iter().map(|f| f.frame).collect();
    assert_eq!(frames, vec![0, 1]);
}

#[test]
fn test_failing_init() {
    let mut backend = RecordingBackend::failing_init("no device");

    let err = backend.init().unwrap_err();

    assert!(matches!(err, crate::error::Error::BackendError(ref m) if m == "no device"));
    assert!(!backend.is_initialized().unwrap());
}
