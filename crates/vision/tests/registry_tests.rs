mod common;

use {
    common::*,
    std::{sync::Arc, time::Duration},
    tokio::time::timeout,
    video::{CaptureConfig, CaptureSource, TestPattern},
    vision::*,
};

#[tokio::test(flavor = "multi_thread")]
async fn attach_rejects_duplicate_names() {
    let registry = CameraRegistry::new(VisionConfig::default(), Arc::new(RecordingSink::default()));
    let setup = || CameraSetup::new("front", Box::new(IdleSource), Arc::new(RecordingControls::new()));
    assert_eq!(registry.attach(setup()), Ok(0));
    assert_eq!(
        registry.attach(setup()),
        Err(VisionError::DuplicatedKey("front".to_string()))
    );
    assert_eq!(registry.len(), 1);
    assert!(registry.by_name("front").is_ok());
    assert!(matches!(
        registry.by_name("rear"),
        Err(VisionError::UnknownCamera(_))
    ));
    registry.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn saved_pipelines_and_calibrations_are_restored() {
    let registry = CameraRegistry::new(VisionConfig::default(), Arc::new(RecordingSink::default()));
    let intrinsics = intrinsics_for(image::Size::new(32, 24));
    let setup = CameraSetup::new("front", Box::new(IdleSource), Arc::new(RecordingControls::new()))
        .with_nickname("Front Cam")
        .with_fov(62.5)
        .with_calibrations(vec![intrinsics.clone()])
        .with_pipelines(vec![Pipeline::standard("Goal"), Pipeline::standard("Ball")]);
    registry.attach(setup).unwrap();

    let handle = registry.ui_camera().unwrap();
    assert_eq!(handle.manager.nicknames(), vec!["Goal", "Ball"]);
    assert_eq!(handle.camera.nickname(), "Front Cam");
    assert_eq!(handle.camera.fov(), 62.5);
    assert_eq!(handle.camera.intrinsics(0), Some(intrinsics));
    registry.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pattern_results_reach_the_channel() {
    let (sink, mut rx) = ChannelSink::new(64);
    let sink = Arc::new(sink);
    let registry = CameraRegistry::new(VisionConfig::default(), sink.clone());

    let (source, controls) = CaptureSource::open(
        TestPattern::new(),
        CaptureConfig::default().with_name("pattern"),
    )
    .await
    .unwrap();
    registry
        .attach(
            CameraSetup::new("pattern", Box::new(source), Arc::new(controls)).with_fov(60.0),
        )
        .unwrap();

    let mut saw_table = false;
    let mut saw_snapshot = false;
    let mut saw_frame = false;
    while !(saw_table && saw_snapshot && saw_frame) {
        let message = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match message {
            Telemetry::Table { channel, entries } => {
                assert_eq!(channel, "/vision/pattern");
                // the moving square is the only bright blob
                assert!(entries.is_valid);
                assert_eq!(entries.aux_targets.len(), 1);
                saw_table = true;
            }
            Telemetry::Snapshot(snapshot) => {
                assert_eq!(snapshot.camera, "pattern");
                saw_snapshot = true;
            }
            Telemetry::Frame { image, .. } => {
                assert_eq!(image.size, image::Size::new(320, 240));
                saw_frame = true;
            }
            Telemetry::Rebind { .. } => {}
        }
    }

    let handle = registry.camera(0).unwrap();
    assert!(handle.last_result().is_some());
    registry.shutdown();
    assert_eq!(handle.worker_state(), WorkerState::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn lost_camera_leaves_the_others_running() {
    let sink = Arc::new(RecordingSink::default());
    let config = VisionConfig::default().with_ui_rate_hz(0);
    let registry = CameraRegistry::new(config, sink.clone());
    let script = ScriptedSource::new(vec![Ok(frame(1)), Ok(frame(2))]);
    registry
        .attach(CameraSetup::new("front", Box::new(script), Arc::new(RecordingControls::new())))
        .unwrap();
    registry
        .attach(CameraSetup::new("rear", Box::new(FrameStream), Arc::new(RecordingControls::new())))
        .unwrap();

    let front = registry.by_name("front").unwrap();
    let rear = registry.by_name("rear").unwrap();
    timeout(Duration::from_secs(5), async {
        while front.worker_state() != WorkerState::Stopped {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(matches!(
        front.status().stop_reason(),
        Some(video::VideoError::Disconnected(_))
    ));

    let published = |channel: &str| {
        sink.structured
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == channel)
            .count()
    };
    let before = published("/vision/rear");
    timeout(Duration::from_secs(5), async {
        while published("/vision/rear") <= before + 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(rear.worker_state(), WorkerState::Running);
    assert_eq!(published("/vision/front"), 2);
    registry.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_renames_cannot_share_a_nickname() {
    let registry = CameraRegistry::new(VisionConfig::default(), Arc::new(RecordingSink::default()));
    for name in ["a", "b", "c", "d"] {
        registry
            .attach(CameraSetup::new(name, Box::new(IdleSource), Arc::new(RecordingControls::new())))
            .unwrap();
    }

    for round in 0..20 {
        let nickname = format!("shared {round}");
        let barrier = std::sync::Barrier::new(4);
        let outcomes: Vec<_> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|index| {
                    let (registry, barrier, nickname) = (&registry, &barrier, &nickname);
                    scope.spawn(move || {
                        barrier.wait();
                        registry.rename_camera(index, nickname.clone())
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        let holders = registry
            .handles()
            .iter()
            .filter(|h| h.camera.nickname() == nickname)
            .count();
        assert_eq!(holders, 1);
    }
    registry.shutdown();
}
