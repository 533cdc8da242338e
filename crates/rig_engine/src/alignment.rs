//! Viewpoint alignment
//!
//! Registers each depth generator to its paired color generator so that depth and
//! color pixels at the same (x, y) see the same physical point.

use contracts::PairingPolicy;
use sensor_driver::SensorDriver;
use tracing::{info, instrument, warn};

use crate::error::{Result, RigError};
use crate::rig::SensorRig;

impl<D: SensorDriver> SensorRig<D> {
    /// Align every depth stream to its paired color stream
    ///
    /// Applies to all depth frames fetched afterwards. Repeating the call with an
    /// unchanged color viewpoint leaves the driver in the same state. Returns the
    /// number of pairs aligned.
    #[instrument(name = "sensor_rig_align_all_depth_to_color", skip(self))]
    pub async fn align_all_depth_to_color(&mut self) -> Result<usize> {
        let policy = self.config().pairing;
        let (driver, registry) = self.ready_parts().await?;

        if !registry.is_balanced() {
            match policy {
                PairingPolicy::Strict => {
                    return Err(RigError::PairingMismatch {
                        depth: registry.depth_count(),
                        image: registry.image_count(),
                    });
                }
                PairingPolicy::Positional => warn!(
                    depth = registry.depth_count(),
                    image = registry.image_count(),
                    "aligning positional pairs only, remaining sensors stay unaligned"
                ),
            }
        }

        let registry = &*registry;
        for pair in registry.pairs() {
            let depth = registry.depth_handle(pair.depth_index)?;
            let color = registry.image_handle(pair.color_index)?;

            driver
                .set_viewpoint(depth, color)
                .await
                .map_err(|e| RigError::Alignment {
                    depth_index: pair.depth_index,
                    color_index: pair.color_index,
                    message: e.to_string(),
                })?;
        }

        let aligned = registry.pairs().len();
        info!(pairs = aligned, "depth aligned to color");
        observability::record_alignment(aligned);
        Ok(aligned)
    }
}
