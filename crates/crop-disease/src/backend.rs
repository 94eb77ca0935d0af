//! Compile-time backend selection. ndarray on the CPU by default, LibTorch with the `libtorch` feature.

use crate::error::{DiagnosisError, Result};
use burn::prelude::Device;

#[cfg(not(feature = "libtorch"))]
pub type InferenceBackend = burn::backend::NdArray;

#[cfg(feature = "libtorch")]
pub type InferenceBackend = burn_tch::LibTorch;

#[cfg(not(feature = "libtorch"))]
pub fn device(name: &str) -> Result<Device<InferenceBackend>> {
	match name.trim().to_ascii_lowercase().as_str() {
		"cpu" => Ok(burn::backend::ndarray::NdArrayDevice::Cpu),
		other => Err(DiagnosisError::Config(format!(
			"device '{other}' needs the libtorch feature; only 'cpu' is available"
		))),
	}
}

#[cfg(feature = "libtorch")]
pub fn device(name: &str) -> Result<Device<InferenceBackend>> {
	use burn_tch::LibTorchDevice;

	let name = name.trim().to_ascii_lowercase();
	let cuda_index = match name.as_str() {
		"cpu" => return Ok(LibTorchDevice::Cpu),
		"mps" => return Ok(LibTorchDevice::Mps),
		"cuda" => 0,
		other => other
			.strip_prefix("cuda:")
			.and_then(|index| index.parse::<usize>().ok())
			.ok_or_else(|| DiagnosisError::Config(format!("unknown device '{other}'")))?,
	};

	if !tch::utils::has_cuda() {
		log::warn!("Could not detect valid CUDA configuration, falling back to CPU");
		return Ok(LibTorchDevice::Cpu);
	}

	Ok(LibTorchDevice::Cuda(cuda_index))
}

pub fn backend_name() -> &'static str {
	if cfg!(feature = "libtorch") {
		"LibTorch"
	} else {
		"ndarray (CPU)"
	}
}

#[cfg(all(test, not(feature = "libtorch")))]
mod tests {
	use super::*;

	#[test]
	fn test_cpu_only() {
		assert!(device("cpu").is_ok());
		assert!(device(" CPU ").is_ok());
		assert!(matches!(device("cuda:0"), Err(DiagnosisError::Config(_))));
	}
}
