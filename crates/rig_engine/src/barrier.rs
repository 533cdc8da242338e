//! Synchronization barrier
//!
//! Waits until any generating sensor has a new frame, then refreshes every
//! registered sensor's metadata. The driver wait has no cancellation hook, so it
//! is raced against a caller-supplied interrupt instead.

use std::future::Future;
use std::time::{Duration, Instant};

use sensor_driver::SensorDriver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{Result, RigError};
use crate::registry::GeneratorRegistry;
use crate::rig::SensorRig;

impl<D: SensorDriver> SensorRig<D> {
    /// Block until any generating sensor updates, then refresh all sensors
    ///
    /// Bounded by `barrier.timeout_ms` when configured, unbounded otherwise. Does
    /// not report which sensor updated; fetch the sensors you need afterwards.
    pub async fn wait_for_any_update(&mut self) -> Result<()> {
        let timeout = self.config().barrier.timeout();
        self.wait_interruptible(expire(timeout)).await
    }

    /// Like [`wait_for_any_update`](Self::wait_for_any_update) with an explicit bound
    pub async fn wait_for_any_update_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.wait_interruptible(expire(Some(timeout))).await
    }

    /// Like [`wait_for_any_update`](Self::wait_for_any_update), returning
    /// `WaitCancelled` as soon as `cancel` fires
    pub async fn wait_for_any_update_until(&mut self, cancel: &CancellationToken) -> Result<()> {
        let timeout = self.config().barrier.timeout();
        self.wait_interruptible(async move {
            tokio::select! {
                _ = cancel.cancelled() => RigError::WaitCancelled,
                err = expire(timeout) => err,
            }
        })
        .await
    }

    #[instrument(name = "sensor_rig_wait_for_any_update", skip(self, interrupt))]
    async fn wait_interruptible<F>(&mut self, interrupt: F) -> Result<()>
    where
        F: Future<Output = RigError> + Send,
    {
        let (driver, registry) = self.ready_parts().await?;
        let started = Instant::now();

        // 中断与更新同时就绪时以中断为准
        let outcome = tokio::select! {
            biased;
            err = interrupt => Err(err),
            result = driver.wait_any_update_all() => result.map_err(|e| RigError::Wait {
                message: e.to_string(),
            }),
        };
        let wait_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(()) => {
                observability::record_barrier_wait_ms(wait_ms, "ok");
                refresh_all(driver, registry)?;
                debug!(wait_ms, "sensors refreshed");
                Ok(())
            }
            Err(e) => {
                let label = match &e {
                    RigError::WaitCancelled => "cancelled",
                    RigError::WaitTimeout { .. } => "timeout",
                    _ => "error",
                };
                observability::record_barrier_wait_ms(wait_ms, label);
                warn!(error = %e, wait_ms, "barrier wait interrupted");
                Err(e)
            }
        }
    }
}

/// Resolves with `WaitTimeout` after `timeout`, never when `None`
async fn expire(timeout: Option<Duration>) -> RigError {
    match timeout {
        Some(timeout) => {
            tokio::time::sleep(timeout).await;
            RigError::WaitTimeout {
                waited_ms: timeout.as_millis() as u64,
            }
        }
        None => std::future::pending().await,
    }
}

/// Pull the latest frame of every registered sensor, generating or not
fn refresh_all<D: SensorDriver>(driver: &mut D, registry: &mut GeneratorRegistry) -> Result<()> {
    for (index, slot) in registry.depth_slots_mut() {
        let (handle, metadata) = slot.parts_mut();
        driver
            .fetch_depth(handle, metadata)
            .map_err(|e| RigError::fetch(handle.kind(), index, e))?;
    }
    for (index, slot) in registry.image_slots_mut() {
        let (handle, metadata) = slot.parts_mut();
        driver
            .fetch_image(handle, metadata)
            .map_err(|e| RigError::fetch(handle.kind(), index, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BarrierConfig, NodeKind, RigConfig, SensorIndex};
    use sensor_driver::{MockConfig, MockDriver};

    fn mock_rig(config: RigConfig) -> SensorRig<MockDriver> {
        SensorRig::new(MockDriver::new(), config)
    }

    #[tokio::test]
    async fn test_wait_refreshes_all_generating_sensors() {
        let mut rig = mock_rig(RigConfig::default());
        let index = SensorIndex::new(0);
        let first_depth = rig.get_depth_frame(index).await.unwrap().frame_number();
        let first_image = rig.get_video_frame(index).await.unwrap().frame_number();

        rig.wait_for_any_update().await.unwrap();

        let registry = rig.registry().unwrap();
        assert_eq!(
            registry.depth_metadata(index).unwrap().frame_number(),
            first_depth + 1
        );
        assert_eq!(
            registry.image_metadata(index).unwrap().frame_number(),
            first_image + 1
        );
    }

    #[tokio::test]
    async fn test_wait_leaves_idle_sensors_untouched() {
        let mut rig = SensorRig::new(
            MockDriver::with_config(MockConfig::with_sensors(2, 1)),
            RigConfig::default(),
        );
        rig.get_depth_frame(SensorIndex::new(0)).await.unwrap();
        rig.wait_for_any_update().await.unwrap();

        let registry = rig.registry().unwrap();
        assert!(registry.depth_metadata(SensorIndex::new(1)).unwrap().is_empty());
        assert!(!registry
            .is_generating(NodeKind::Depth, SensorIndex::new(1))
            .unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_without_generating_sensors() {
        let mut rig = mock_rig(RigConfig {
            barrier: BarrierConfig {
                timeout_ms: Some(50),
            },
            ..Default::default()
        });
        let err = rig.wait_for_any_update().await.unwrap_err();
        assert!(matches!(err, RigError::WaitTimeout { waited_ms: 50 }));
    }

    #[tokio::test]
    async fn test_wait_cancelled() {
        let mut rig = mock_rig(RigConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = rig.wait_for_any_update_until(&cancel).await.unwrap_err();
        assert!(matches!(err, RigError::WaitCancelled));
        // 取消不影响后续使用
        assert!(rig.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_timeout_overrides_unbounded_config() {
        let mut rig = mock_rig(RigConfig::default());
        let result = rig.wait_for_any_update_timeout(Duration::from_millis(5)).await;
        assert!(matches!(result, Err(RigError::WaitTimeout { waited_ms: 5 })));
    }
}
