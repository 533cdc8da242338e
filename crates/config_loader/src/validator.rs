//! 配置校验模块
//!
//! 校验规则：
//! - output_mode 分辨率与帧率 > 0
//! - barrier.timeout_ms 若设置则 > 0
//! - driver.focal_length > 0 且有限，principal_point 有限
//! - capture.frames > 0，output_dir 非空

use contracts::{ContractError, RigConfig};

/// 校验 RigConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RigConfig) -> Result<(), ContractError> {
    validate_output_mode(config)?;
    validate_barrier(config)?;
    validate_driver(config)?;
    validate_capture(config)?;
    Ok(())
}

/// 校验输出模式
fn validate_output_mode(config: &RigConfig) -> Result<(), ContractError> {
    let mode = &config.output_mode;
    for (field, value) in [
        ("output_mode.width", mode.width),
        ("output_mode.height", mode.height),
        ("output_mode.fps", mode.fps),
    ] {
        if value == 0 {
            return Err(ContractError::config_validation(field, "must be > 0"));
        }
    }
    Ok(())
}

/// 校验屏障配置
fn validate_barrier(config: &RigConfig) -> Result<(), ContractError> {
    if config.barrier.timeout_ms == Some(0) {
        return Err(ContractError::config_validation(
            "barrier.timeout_ms",
            "timeout_ms must be > 0, omit it to wait forever",
        ));
    }
    Ok(())
}

/// 校验模拟驱动参数
fn validate_driver(config: &RigConfig) -> Result<(), ContractError> {
    let driver = &config.driver;

    if !driver.focal_length.is_finite() || driver.focal_length <= 0.0 {
        return Err(ContractError::config_validation(
            "driver.focal_length",
            format!("focal_length must be > 0, got {}", driver.focal_length),
        ));
    }

    if let Some((cx, cy)) = driver.principal_point {
        if !cx.is_finite() || !cy.is_finite() {
            return Err(ContractError::config_validation(
                "driver.principal_point",
                format!("principal_point must be finite, got ({cx}, {cy})"),
            ));
        }
    }

    Ok(())
}

/// 校验采集配置
fn validate_capture(config: &RigConfig) -> Result<(), ContractError> {
    let capture = &config.capture;

    if capture.frames == 0 {
        return Err(ContractError::config_validation(
            "capture.frames",
            "frames must be > 0",
        ));
    }

    if capture.output_dir.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "capture.output_dir",
            "output_dir cannot be empty",
        ));
    }

    Ok(())
}
