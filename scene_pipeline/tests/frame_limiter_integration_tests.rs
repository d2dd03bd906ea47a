//! Integration tests for frame pacing between the logic and render stages
//!
//! Run with: cargo test --test frame_limiter_integration_tests

use std::time::Duration;
use scene_pipeline::pipeline3d::render::{FrameDrawLists, RecordingBackend, RenderBackend};
use scene_pipeline::pipeline3d::{Pipeline, PipelineConfig, Result, StageKind};

// ============================================================================
// GATED BACKEND
// ============================================================================

/// Backend that holds every submission until the test opens the gate once
struct GatedBackend {
    gate: flume::Receiver<()>,
    recording: RecordingBackend,
}

impl RenderBackend for GatedBackend {
    fn init(&mut self) -> Result<()> {
        self.recording.init()
    }

    fn submit(&mut self, frame: &FrameDrawLists) -> Result<()> {
        let _ = self.gate.recv();
        self.recording.submit(frame)
    }
}

fn launch_gated(max_frames_in_flight: usize) -> (Pipeline, flume::Sender<()>, RecordingBackend) {
    let (gate_tx, gate_rx) = flume::unbounded();
    let recording = RecordingBackend::new();
    let backend = GatedBackend { gate: gate_rx, recording: recording.clone() };
    let config = PipelineConfig { max_frames_in_flight, ..PipelineConfig::default() };
    (Pipeline::launch(config, backend).unwrap(), gate_tx, recording)
}

// ============================================================================
// FRAME LIMITER
// ============================================================================

#[test]
fn test_integration_prepare_blocks_at_frames_in_flight() {
    let (mut pipeline, gate, recording) = launch_gated(2);
    let (done_tx, done_rx) = flume::unbounded();

    let logic = std::thread::spawn(move || {
        for i in 0..3 {
            pipeline.scene().prepare_draw_lists().unwrap();
            done_tx.send(i).unwrap();
        }
        pipeline
    });

    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(0));
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(1));
    // both tokens are held by unconsumed frames
    assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());

    gate.send(()).unwrap();
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(2));

    gate.send(()).unwrap();
    gate.send(()).unwrap();
    let mut pipeline = logic.join().unwrap();
    pipeline.shutdown().unwrap();
    assert_eq!(recording.frame_count().unwrap(), 3);
}

#[test]
fn test_integration_frames_in_flight_drops_after_render() {
    let (mut pipeline, gate, _recording) = launch_gated(1);

    pipeline.scene().prepare_draw_lists().unwrap();
    assert_eq!(pipeline.scene().frames_in_flight(), 1);

    gate.send(()).unwrap();
    pipeline.flush().unwrap();
    assert_eq!(pipeline.scene().frames_in_flight(), 0);
}

// ============================================================================
// STATISTICS
// ============================================================================

#[test]
fn test_integration_render_waits_while_idle() {
    let backend = RecordingBackend::new();
    let mut pipeline = Pipeline::launch(PipelineConfig::default(), backend).unwrap();
    std::thread::sleep(Duration::from_millis(30));
    pipeline.scene().prepare_draw_lists().unwrap();
    pipeline.shutdown().unwrap();

    let render = pipeline.statistics(StageKind::Render);
    assert!(render.wait_time >= Duration::from_millis(20));
    assert!(render.batches >= 2);
    assert!(render.average_wait_time() > Duration::ZERO);
}
