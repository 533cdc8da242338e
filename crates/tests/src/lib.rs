//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 基于 MockDriver 的 e2e 测试（无需真实设备）

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{CalibrationEstimate, OutputMode, Point3, RigConfig};

    #[test]
    fn test_default_config_round_trips_through_loader() {
        let toml = ConfigLoader::to_toml(&RigConfig::default()).unwrap();
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.output_mode, OutputMode::VGA_30);
        assert_eq!(config.capture, RigConfig::default().capture);
    }

    #[test]
    fn test_probe_projection_snapshot() {
        // 真实驱动的投影约定: x 轴镜像，y 轴向下
        let estimate = CalibrationEstimate::from_probes(
            Point3::new(320.0, 240.0, -1.0),
            Point3::new(320.0 - 575.8157, 240.0 + 575.8157, -1.0),
        );
        assert_eq!(
            estimate.to_string(),
            "cx:320.000, cy:240.000, fx:575.816, fy:575.816"
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{BarrierConfig, NodeKind, PairingPolicy, RigConfig, SensorIndex};
    use rig_engine::{CancellationToken, RigError, SensorRig};
    use sensor_driver::{MockConfig, MockDriver, PinholeIntrinsics};

    fn mock_rig(depth: usize, image: usize) -> SensorRig<MockDriver> {
        SensorRig::new(
            MockDriver::with_config(MockConfig::with_sensors(depth, image)),
            RigConfig::default(),
        )
    }

    /// End-to-end: 初始化 -> 标定 -> 对齐 -> 屏障采集 -> 关闭
    ///
    /// 对应一次完整的诊断采集流程。
    #[tokio::test]
    async fn test_e2e_capture_routine() {
        let mut rig = mock_rig(2, 2);
        rig.initialize().await.unwrap();

        let before = rig.estimate_calibration(SensorIndex::new(0)).await.unwrap();
        assert_eq!(rig.align_all_depth_to_color().await.unwrap(), 2);
        let after = rig.estimate_calibration(SensorIndex::new(0)).await.unwrap();
        // 对齐不改变深度传感器自身的投影
        assert_eq!(before, after);

        for i in 0..2 {
            rig.get_depth_frame(SensorIndex::new(i)).await.unwrap();
            rig.get_video_frame(SensorIndex::new(i)).await.unwrap();
        }

        let mut last = 0;
        for _ in 0..5 {
            rig.wait_for_any_update().await.unwrap();
            let depth = rig.get_depth_frame(SensorIndex::new(1)).await.unwrap();
            assert!(depth.frame_number() > last);
            last = depth.frame_number();

            let color = rig.get_video_frame(SensorIndex::new(1)).await.unwrap();
            assert_eq!(color.pixels().len(), 640 * 480 * 3);
            rig.align_all_depth_to_color().await.unwrap();
        }

        assert_eq!(rig.driver().stats().start_calls, 4);
        rig.shutdown().unwrap();
        assert!(!rig.is_ready());
        assert!(!rig.driver().is_context_initialized());
    }

    #[tokio::test]
    async fn test_registry_matches_enumeration() {
        let mut rig = mock_rig(3, 2);
        rig.initialize().await.unwrap();

        let registry = rig.registry().unwrap();
        assert_eq!(registry.depth_count(), 3);
        assert_eq!(registry.image_count(), 2);

        let mut raws: Vec<u32> = (0..3)
            .map(|i| registry.depth_handle(SensorIndex::new(i)).unwrap().raw())
            .collect();
        raws.dedup();
        assert_eq!(raws.len(), 3);

        for i in 0..3 {
            let metadata = registry.depth_metadata(SensorIndex::new(i)).unwrap();
            assert!(metadata.is_empty());
            assert_eq!(metadata.header().frame_number, 0);
            assert_eq!(metadata.header().width, 0);
        }
    }

    #[tokio::test]
    async fn test_second_initialize_does_not_enumerate() {
        let mut rig = mock_rig(1, 1);
        rig.initialize().await.unwrap();
        let stats = rig.driver().stats();

        rig.initialize().await.unwrap();
        rig.ensure_initialized().await.unwrap();
        assert_eq!(rig.driver().stats(), stats);
    }

    #[tokio::test]
    async fn test_lazy_start_per_sensor() {
        let mut rig = mock_rig(2, 1);
        let index = SensorIndex::new(1);

        rig.initialize().await.unwrap();
        assert!(!rig
            .registry()
            .unwrap()
            .is_generating(NodeKind::Depth, index)
            .unwrap());

        rig.get_depth_frame(index).await.unwrap();
        rig.get_depth_frame(index).await.unwrap();

        let registry = rig.registry().unwrap();
        assert!(registry.is_generating(NodeKind::Depth, index).unwrap());
        assert!(!registry
            .is_generating(NodeKind::Depth, SensorIndex::new(0))
            .unwrap());
        assert_eq!(rig.driver().stats().start_calls, 1);
    }

    #[tokio::test]
    async fn test_fetch_overwrites_buffer_in_place() {
        let mut rig = mock_rig(1, 1);
        let index = SensorIndex::new(0);

        let first = rig.get_depth_frame(index).await.unwrap();
        let (first_frame, first_px) = (first.frame_number(), first.pixels()[0]);

        rig.wait_for_any_update().await.unwrap();
        let second = rig.get_depth_frame(index).await.unwrap();

        assert_eq!(second.frame_number(), first_frame + 1);
        assert_eq!(second.pixels()[0], first_px + 1);
        assert_eq!(second.pixels().len(), 640 * 480);
    }

    #[tokio::test]
    async fn test_alignment_changes_depth_frames() {
        let mut rig = mock_rig(1, 1);
        let index = SensorIndex::new(0);

        let before = rig.get_depth_frame(index).await.unwrap().pixels().to_vec();
        rig.align_all_depth_to_color().await.unwrap();
        let after = rig.get_depth_frame(index).await.unwrap().pixels().to_vec();

        assert_eq!(before.len(), after.len());
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_calibration_matches_pinhole_model() {
        let intrinsics = PinholeIntrinsics {
            focal_length: 580.0,
            cx: 314.5,
            cy: 235.5,
        };
        let mut rig = SensorRig::new(
            MockDriver::with_config(MockConfig {
                intrinsics,
                ..Default::default()
            }),
            RigConfig::default(),
        );

        let estimate = rig.estimate_calibration(SensorIndex::new(0)).await.unwrap();
        assert!((estimate.cx() - intrinsics.cx).abs() < 1e-9);
        assert!((estimate.cy() - intrinsics.cy).abs() < 1e-9);
        assert!((estimate.fx() - intrinsics.focal_length).abs() < 1e-9);
        assert!((estimate.fy() - intrinsics.focal_length).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_out_of_range_never_returns_other_sensor() {
        let mut rig = mock_rig(1, 1);
        let err = rig.get_video_frame(SensorIndex::new(1)).await.unwrap_err();
        assert!(matches!(
            err,
            RigError::IndexOutOfRange {
                kind: NodeKind::Image,
                len: 1,
                ..
            }
        ));
        assert!(err.is_programmer_error());
    }

    #[tokio::test]
    async fn test_shutdown_then_reinitialize_with_new_counts() {
        let mut rig = mock_rig(1, 1);
        rig.get_depth_frame(SensorIndex::new(0)).await.unwrap();
        rig.shutdown().unwrap();
        assert!(!rig.is_ready());

        // 模拟热插拔
        rig.driver_mut().set_sensor_counts(3, 1);
        let depth = rig.get_depth_frame(SensorIndex::new(2)).await.unwrap();
        assert!(!depth.is_empty());

        let registry = rig.registry().unwrap();
        assert_eq!(registry.depth_count(), 3);
        assert_eq!(registry.image_count(), 1);
        assert_eq!(rig.driver().stats().init_calls, 2);
    }

    #[tokio::test]
    async fn test_init_failure_reports_driver_message() {
        let mut rig = SensorRig::new(
            MockDriver::with_config(MockConfig {
                depth_sensors: 2,
                fail_output_mode: vec!["depth_1".to_string()],
                ..Default::default()
            }),
            RigConfig::default(),
        );

        let err = rig.initialize().await.unwrap_err();
        assert!(matches!(err, RigError::OutputMode { kind: NodeKind::Depth, .. }));
        assert!(err.to_string().contains("depth_1"));
        assert!(!rig.is_ready());
        // 不回滚，也不自动重试
        assert_eq!(rig.driver().stats().init_calls, 1);
    }

    #[tokio::test]
    async fn test_pairing_policies() {
        let mut strict = mock_rig(2, 1);
        assert!(matches!(
            strict.align_all_depth_to_color().await,
            Err(RigError::PairingMismatch { depth: 2, image: 1 })
        ));

        let mut positional = SensorRig::new(
            MockDriver::with_config(MockConfig::with_sensors(2, 1)),
            RigConfig {
                pairing: PairingPolicy::Positional,
                ..Default::default()
            },
        );
        assert_eq!(positional.align_all_depth_to_color().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_barrier_timeout_and_cancellation() {
        let mut rig = SensorRig::new(
            MockDriver::new(),
            RigConfig {
                barrier: BarrierConfig {
                    timeout_ms: Some(100),
                },
                ..Default::default()
            },
        );

        // 没有 generator 在生成，屏障只能超时
        assert!(matches!(
            rig.wait_for_any_update().await,
            Err(RigError::WaitTimeout { waited_ms: 100 })
        ));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        assert!(matches!(
            rig.wait_for_any_update_until(&cancel).await,
            Err(RigError::WaitCancelled)
        ));
    }

    #[tokio::test]
    async fn test_shared_rig_serializes_access() {
        let shared = mock_rig(2, 2).into_shared();

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let rig = shared.clone();
                tokio::spawn(async move {
                    let mut rig = rig.lock().await;
                    let frame = rig
                        .get_depth_frame(SensorIndex::new(i))
                        .await
                        .map(|m| m.frame_number());
                    frame
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }
        assert_eq!(shared.lock().await.driver().stats().init_calls, 1);
    }
}
