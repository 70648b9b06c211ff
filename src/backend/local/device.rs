use candle_core::Device;
use tracing::{debug, info, warn};

type DeviceOpener = fn() -> candle_core::Result<Device>;

/// Accelerators compiled into this build, in preference order.
fn accelerators() -> Vec<(&'static str, DeviceOpener)> {
    #[allow(unused_mut)]
    let mut candidates: Vec<(&'static str, DeviceOpener)> = Vec::new();

    #[cfg(feature = "metal")]
    candidates.push(("metal", || Device::new_metal(0)));

    #[cfg(feature = "cuda")]
    candidates.push(("cuda", || Device::new_cuda(0)));

    candidates
}

/// First accelerator that opens, else CPU.
pub fn select_device() -> Device {
    let candidates = accelerators();
    if candidates.is_empty() {
        debug!("No GPU features enabled, scoring on CPU");
        return Device::Cpu;
    }

    for (label, open) in candidates {
        match open() {
            Ok(device) => {
                info!(device = label, "Using GPU acceleration");
                return device;
            }
            Err(e) => warn!(device = label, error = %e, "GPU device unavailable"),
        }
    }

    warn!("Falling back to CPU device");
    Device::Cpu
}

/// Short label reported by `/health`.
pub fn device_label(device: &Device) -> &'static str {
    if device.is_cuda() {
        "cuda"
    } else if device.is_metal() {
        "metal"
    } else {
        "cpu"
    }
}
