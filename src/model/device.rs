//! Device configuration for model inference.

/// Compute device for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// CPU execution (default).
    #[default]
    Cpu,

    /// CUDA GPU execution.
    #[cfg(feature = "cuda")]
    Cuda {
        /// GPU device ID (0-indexed).
        device_id: u32,
    },
}

impl Device {
    /// Get the device name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            #[cfg(feature = "cuda")]
            Self::Cuda { .. } => "CUDA",
        }
    }

    /// Parse the `device` config value ("cpu", "cuda" or "cuda:N").
    pub fn parse(value: &str) -> crate::Result<Self> {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "cpu" => Ok(Self::Cpu),
            #[cfg(feature = "cuda")]
            "cuda" => Ok(Self::Cuda { device_id: 0 }),
            #[cfg(feature = "cuda")]
            other if other.starts_with("cuda:") => other[5..]
                .parse()
                .map(|device_id| Self::Cuda { device_id })
                .map_err(|e| {
                    crate::FruitscanError::Configuration(format!(
                        "Invalid CUDA device id in {other:?}: {e}"
                    ))
                }),
            other => Err(crate::FruitscanError::Configuration(format!(
                "Unsupported device {other:?} (this build supports: {})",
                Self::supported()
            ))),
        }
    }

    fn supported() -> &'static str {
        if cfg!(feature = "cuda") {
            "cpu, cuda, cuda:N"
        } else {
            "cpu"
        }
    }
}
