mod common;

use {
    common::*,
    image::Size,
    std::sync::Arc,
    vision::*,
};

#[test]
fn seeded_with_one_pipeline() {
    let (manager, _, _) = manager("front");
    assert_eq!(manager.len(), 1);
    assert_eq!(manager.current_index(), 0);
    assert_eq!(manager.current_pipeline().nickname, DEFAULT_NICKNAME);
}

#[test]
fn add_then_select() {
    let (manager, _, _) = manager("front");
    manager.add_pipeline(None).unwrap();
    let (index, added) = manager.add_pipeline(None).unwrap();
    assert_eq!(index, 2);
    assert_eq!(manager.len(), 3);
    assert_eq!(manager.current_index(), 0);
    assert_eq!(added.nickname, "New Pipeline (2)");

    manager.set_current_pipeline(2).unwrap();
    assert_eq!(manager.current_index(), 2);

    assert_eq!(
        manager.set_current_pipeline(5),
        Err(VisionError::InvalidPipelineIndex { index: 5, len: 3 })
    );
    assert_eq!(manager.current_index(), 2);
}

#[test]
fn selecting_pushes_camera_settings() {
    let (manager, controls, _) = manager("front");
    let mut settings = PipelineSettings::default();
    settings.camera_mut().exposure = 12;
    settings.camera_mut().video_mode_index = 1;
    manager.add_pipeline(Some(settings)).unwrap();

    manager.set_current_pipeline(1).unwrap();
    let calls = controls.calls();
    assert!(calls.contains(&"exposure:12".to_string()));
    assert!(calls.contains(&"mode:1".to_string()));
    assert_eq!(manager.camera().video_mode_index(), 1);
}

#[test]
fn added_settings_are_clamped_to_the_camera() {
    let (manager, _, _) = manager("front");
    let mut settings = PipelineSettings::default();
    settings.camera_mut().video_mode_index = 9;
    let (_, pipeline) = manager.add_pipeline(Some(settings)).unwrap();
    assert_eq!(pipeline.settings.camera().video_mode_index, 1);
}

#[test]
fn driver_mode_is_idempotent() {
    let (manager, _, hooks) = manager("front");
    manager.add_pipeline(None).unwrap();
    manager.set_current_pipeline(1).unwrap();

    assert!(manager.set_driver_mode(true));
    assert!(!manager.set_driver_mode(true));
    assert_eq!(*hooks.events.lock().unwrap(), vec![LifecycleEvent::EnteredDriverMode]);
    assert_eq!(manager.current_pipeline().kind(), PipelineKind::Driver);
    assert_eq!(manager.current_index(), 1);

    // the index still moves under the override
    manager.set_current_pipeline(0).unwrap();
    assert_eq!(manager.current_pipeline().kind(), PipelineKind::Driver);

    assert!(manager.set_driver_mode(false));
    assert!(!manager.set_driver_mode(false));
    assert_eq!(
        *hooks.events.lock().unwrap(),
        vec![LifecycleEvent::EnteredDriverMode, LifecycleEvent::ExitedDriverMode]
    );
    assert_eq!(manager.current_pipeline().nickname, DEFAULT_NICKNAME);
}

#[test]
fn duplicate_is_independent() {
    let (manager, _, _) = manager("front");
    let copy = manager.duplicate_pipeline(0, None, None).unwrap();
    assert_eq!(copy.nickname, "New Pipeline (copy)");
    assert_eq!(manager.len(), 2);

    manager.set_current_pipeline(1).unwrap();
    manager.update_setting(SettingUpdate::Exposure(5)).unwrap();
    let pipelines = manager.pipelines();
    assert_eq!(pipelines[0].settings.camera().exposure, 50);
    assert_eq!(pipelines[1].settings.camera().exposure, 5);
}

#[test]
fn default_duplicate_names_stay_unique() {
    let (manager, _, _) = manager("front");
    manager.duplicate_pipeline(0, None, None).unwrap();
    let second = manager.duplicate_pipeline(0, None, None).unwrap();
    assert_eq!(second.nickname, "New Pipeline (copy) (1)");
}

#[test]
fn duplicate_nickname_collision_fails() {
    let (manager, _, _) = manager("front");
    manager
        .duplicate_pipeline(0, Some("Goal".to_string()), None)
        .unwrap();
    let result = manager.duplicate_pipeline(0, Some("Goal".to_string()), None);
    assert_eq!(result, Err(VisionError::DuplicatedKey("Goal".to_string())));
    assert_eq!(manager.len(), 2);
}

#[test]
fn duplicate_of_unknown_index_fails() {
    let (manager, _, _) = manager("front");
    assert_eq!(
        manager.duplicate_pipeline(3, None, None),
        Err(VisionError::InvalidPipelineIndex { index: 3, len: 1 })
    );
}

#[test]
fn cross_camera_duplicate_is_adapted() {
    let (source, _, _) = manager("front");
    let mut settings = StandardSettings::default();
    settings.camera.video_mode_index = 1;
    settings.is_3d = true;
    source.add_pipeline(Some(PipelineSettings::Standard(settings))).unwrap();

    // the destination has a single mode and no intrinsics
    let controls = Arc::new(RecordingControls::new());
    let mut id = identity("rear");
    id.video_modes.truncate(1);
    let rear = Arc::new(Camera::new(id, controls));
    let destination = PipelineManager::new(rear, Vec::new(), Arc::new(NoHooks));

    let copy = source
        .duplicate_pipeline(1, None, Some(&destination))
        .unwrap();
    assert_eq!(copy.settings.camera().video_mode_index, 0);
    assert!(!copy.settings.is_3d());
    assert_eq!(destination.len(), 2);
    assert_eq!(source.len(), 2);
    // the source keeps its own settings
    assert!(source.pipelines()[1].settings.is_3d());
}

#[test]
fn cross_camera_duplicate_keeps_3d_when_calibrated() {
    let (source, _, _) = manager("front");
    let mut settings = StandardSettings::default();
    settings.is_3d = true;
    source.add_pipeline(Some(PipelineSettings::Standard(settings))).unwrap();

    let (rear, _) = camera("rear");
    rear.store_intrinsics(intrinsics_for(Size::new(32, 24)));
    let destination = PipelineManager::new(rear, Vec::new(), Arc::new(NoHooks));

    let copy = source
        .duplicate_pipeline(1, None, Some(&destination))
        .unwrap();
    assert!(copy.settings.is_3d());
}

#[test]
fn deleting_the_only_pipeline_is_rejected() {
    let (manager, _, _) = manager("front");
    assert_eq!(manager.delete_pipeline(0), Err(VisionError::LastPipeline));
    assert_eq!(manager.len(), 1);
}

#[test]
fn deleting_the_selected_last_entry_selects_the_previous() {
    let (manager, _, _) = manager("front");
    manager.add_pipeline(None).unwrap();
    manager.add_pipeline(None).unwrap();
    manager.set_current_pipeline(2).unwrap();

    let removed = manager.delete_pipeline(2).unwrap();
    assert_eq!(removed.nickname, "New Pipeline (2)");
    assert_eq!(manager.current_index(), 1);
}

#[test]
fn deleting_before_the_selection_keeps_it() {
    let (manager, _, _) = manager("front");
    manager.add_pipeline(None).unwrap();
    manager.add_pipeline(None).unwrap();
    manager.set_current_pipeline(2).unwrap();

    manager.delete_pipeline(0).unwrap();
    assert_eq!(manager.current_index(), 1);
    assert_eq!(manager.current_pipeline().nickname, "New Pipeline (2)");
    assert_eq!(
        manager.delete_pipeline(7),
        Err(VisionError::InvalidPipelineIndex { index: 7, len: 2 })
    );
}

#[test]
fn rename_rejects_taken_nicknames() {
    let (manager, _, _) = manager("front");
    manager.add_pipeline(None).unwrap();
    manager.rename_pipeline(1, "Goal").unwrap();
    // renaming to its own name is fine
    manager.rename_pipeline(1, "Goal").unwrap();
    assert_eq!(
        manager.rename_pipeline(0, "Goal"),
        Err(VisionError::DuplicatedKey("Goal".to_string()))
    );
    assert_eq!(manager.nicknames(), vec![DEFAULT_NICKNAME, "Goal"]);
}

#[test]
fn setting_updates_are_validated() {
    let (manager, controls, _) = manager("front");

    manager.update_setting(SettingUpdate::Exposure(20)).unwrap();
    assert!(controls.calls().contains(&"exposure:20".to_string()));

    assert!(matches!(
        manager.update_setting(SettingUpdate::Exposure(101)),
        Err(VisionError::InvalidSetting(_))
    ));
    assert_eq!(
        manager.update_setting(SettingUpdate::VideoModeIndex(4)),
        Err(VisionError::InvalidVideoMode(4))
    );
    assert!(matches!(
        manager.update_setting(SettingUpdate::SquareSize(2.0)),
        Err(VisionError::UnsupportedSetting(_))
    ));
    assert_eq!(manager.current_pipeline().settings.camera().exposure, 20);
}

#[test]
fn updates_follow_the_driver_override() {
    let (manager, _, _) = manager("front");
    manager.set_driver_mode(true);
    assert!(matches!(
        manager.update_setting(SettingUpdate::Multiple(true)),
        Err(VisionError::UnsupportedSetting(_))
    ));
    manager.update_setting(SettingUpdate::StreamDivisor(2)).unwrap();
    assert_eq!(manager.current_pipeline().settings.stream_divisor(), 2);
    manager.set_driver_mode(false);
    assert_eq!(manager.current_pipeline().settings.stream_divisor(), 1);
}

#[test]
fn three_d_needs_intrinsics() {
    let (manager, _, _) = manager("front");
    assert!(matches!(
        manager.update_setting(SettingUpdate::Is3d(true)),
        Err(VisionError::InvalidSetting(_))
    ));
    manager
        .camera()
        .store_intrinsics(intrinsics_for(Size::new(32, 24)));
    manager.update_setting(SettingUpdate::Is3d(true)).unwrap();
    assert!(manager.current_pipeline().settings.is_3d());
}

#[test]
fn driver_mode_during_calibration_is_announced_when_it_runs() {
    let (manager, _, hooks) = manager("front");
    let controller = CalibrationController::new(
        manager.clone(),
        Arc::new(SnapshotSlot::default()),
        Arc::new(FovSolver::new(70.0)),
        3,
    );
    controller.enter_calibration(1.0, 0).unwrap();

    assert!(manager.set_driver_mode(true));
    assert_eq!(manager.current_pipeline().kind(), PipelineKind::Calibration);
    assert!(hooks.events.lock().unwrap().is_empty());

    controller.cancel_calibration().unwrap();
    assert_eq!(manager.current_pipeline().kind(), PipelineKind::Driver);
    assert_eq!(*hooks.events.lock().unwrap(), vec![LifecycleEvent::EnteredDriverMode]);
}

#[test]
fn calibration_interrupts_a_running_driver_pipeline() {
    let (manager, _, hooks) = manager("front");
    let controller = CalibrationController::new(
        manager.clone(),
        Arc::new(SnapshotSlot::default()),
        Arc::new(FovSolver::new(70.0)),
        3,
    );
    manager.set_driver_mode(true);
    controller.enter_calibration(1.0, 0).unwrap();
    controller.cancel_calibration().unwrap();
    assert_eq!(
        *hooks.events.lock().unwrap(),
        vec![
            LifecycleEvent::EnteredDriverMode,
            LifecycleEvent::ExitedDriverMode,
            LifecycleEvent::EnteredDriverMode,
        ]
    );
}

#[test]
fn added_settings_are_validated() {
    let (manager, _, _) = manager("front");
    let invalid = [
        StandardSettings {
            stream_divisor: 0,
            ..StandardSettings::default()
        },
        StandardSettings {
            max_targets: 0,
            ..StandardSettings::default()
        },
        StandardSettings {
            luma: (200, 100),
            ..StandardSettings::default()
        },
        StandardSettings {
            area: (f64::NAN, 10.0),
            ..StandardSettings::default()
        },
        StandardSettings {
            camera: CameraSettings {
                exposure: 101,
                ..CameraSettings::default()
            },
            ..StandardSettings::default()
        },
    ];
    for settings in invalid {
        assert!(matches!(
            manager.add_pipeline(Some(PipelineSettings::Standard(settings))),
            Err(VisionError::InvalidSetting(_))
        ));
    }
    assert_eq!(manager.len(), 1);

    let calibration = PipelineSettings::Calibration(CalibrationSettings {
        camera: CameraSettings::default(),
        square_size: -1.0,
        stream_divisor: 1,
    });
    assert!(manager.add_pipeline(Some(calibration)).is_err());
    assert!(manager.add_pipeline(Some(PipelineSettings::default())).is_ok());
    assert_eq!(manager.len(), 2);
}
