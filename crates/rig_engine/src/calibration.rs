//! Two-point intrinsics estimate

use contracts::{
    CalibrationEstimate, NodeKind, Point3, SensorIndex, FOCAL_PROBE, PRINCIPAL_PROBE,
};
use sensor_driver::SensorDriver;
use tracing::{info, instrument};

use crate::error::{Result, RigError};
use crate::rig::SensorRig;

impl<D: SensorDriver> SensorRig<D> {
    /// Estimate principal point and focal length of a depth sensor
    ///
    /// Projects [`PRINCIPAL_PROBE`] and [`FOCAL_PROBE`] through the driver's
    /// real-world to projective conversion. The generator does not need to be
    /// started.
    #[instrument(name = "sensor_rig_estimate_calibration", skip(self))]
    pub async fn estimate_calibration(
        &mut self,
        depth_index: SensorIndex,
    ) -> Result<CalibrationEstimate> {
        let (driver, registry) = self.ready_parts().await?;
        let handle = registry.depth_handle(depth_index)?;

        let convert = |probe: Point3| {
            driver
                .real_world_to_projective(handle, probe)
                .map_err(|e| RigError::Conversion {
                    index: depth_index,
                    message: e.to_string(),
                })
        };
        let principal = convert(PRINCIPAL_PROBE)?;
        let focal = convert(FOCAL_PROBE)?;

        let estimate = CalibrationEstimate::from_probes(principal, focal);
        info!(
            kind = %NodeKind::Depth,
            cx = format_args!("{:.3}", estimate.cx()),
            cy = format_args!("{:.3}", estimate.cy()),
            fx = format_args!("{:.3}", estimate.fx()),
            fy = format_args!("{:.3}", estimate.fy()),
            "calibration estimate"
        );
        observability::record_calibration(depth_index, &estimate);
        Ok(estimate)
    }
}
