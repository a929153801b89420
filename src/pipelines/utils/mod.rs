use crate::error::{Result, ServeError};
use candle_core::{Device, DeviceLocation};
use std::str::FromStr;

/// Which compute device to bind the model to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceRequest {
    /// Use an accelerator if the runtime reports one, otherwise CPU (default behavior).
    #[default]
    Auto,
    /// Force CPU even if an accelerator is available.
    Cpu,
    /// Select a specific CUDA device by index.
    Cuda(usize),
    /// Select a specific Metal device by index.
    Metal(usize),
}

impl DeviceRequest {
    /// Resolve the request into an actual [`Device`].
    pub fn resolve(self) -> Result<Device> {
        match self {
            DeviceRequest::Auto => {
                let mut probes: Vec<(&str, DeviceProbe)> = Vec::new();
                if candle_core::utils::cuda_is_available() {
                    probes.push(("cuda:0", || Device::new_cuda(0)));
                }
                if candle_core::utils::metal_is_available() {
                    probes.push(("metal:0", || Device::new_metal(0)));
                }
                Ok(first_available(&probes))
            }
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => Device::new_cuda(i).map_err(|e| {
                ServeError::Device(format!(
                    "Failed to init CUDA device {i}: {e}. Try CPU as fallback."
                ))
            }),
            DeviceRequest::Metal(i) => Device::new_metal(i).map_err(|e| {
                ServeError::Device(format!(
                    "Failed to init Metal device {i}: {e}. Try CPU as fallback."
                ))
            }),
        }
    }
}

impl FromStr for DeviceRequest {
    type Err = ServeError;

    /// Accepts `auto`, `cpu`, `cuda`, `cuda:N`, `metal` and `metal:N`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let (kind, index) = match s.split_once(':') {
            Some((kind, index)) => {
                let index = index
                    .parse::<usize>()
                    .map_err(|_| ServeError::Config(format!("Invalid device index in '{s}'")))?;
                (kind.to_string(), Some(index))
            }
            None => (s.clone(), None),
        };

        match (kind.as_str(), index) {
            ("auto", None) => Ok(DeviceRequest::Auto),
            ("cpu", None) => Ok(DeviceRequest::Cpu),
            ("cuda", i) => Ok(DeviceRequest::Cuda(i.unwrap_or(0))),
            ("metal", i) => Ok(DeviceRequest::Metal(i.unwrap_or(0))),
            _ => Err(ServeError::Config(format!(
                "Unknown device '{s}'; expected auto, cpu, cuda[:N] or metal[:N]"
            ))),
        }
    }
}

type DeviceProbe = fn() -> candle_core::Result<Device>;

// A compiled-in backend can still be missing at runtime; CPU is the last resort.
fn first_available(probes: &[(&str, DeviceProbe)]) -> Device {
    for (name, probe) in probes {
        match probe() {
            Ok(device) => return device,
            Err(e) => {
                tracing::warn!(device = %name, error = %e, "Accelerator unavailable, falling back");
            }
        }
    }
    Device::Cpu
}

/// Short, stable name for `device`: `cpu`, `cuda:N` or `metal:N`.
pub fn device_label(device: &Device) -> String {
    match device.location() {
        DeviceLocation::Cpu => "cpu".to_string(),
        DeviceLocation::Cuda { gpu_id } => format!("cuda:{gpu_id}"),
        DeviceLocation::Metal { gpu_id } => format!("metal:{gpu_id}"),
    }
}
