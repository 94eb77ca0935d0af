use crate::error::{DiagnosisError, Result};
use image::imageops::{self, FilterType};
use image::DynamicImage;
use std::path::Path;

/// Side length the reference classifier was trained on.
pub const DEFAULT_IMAGE_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;

/// A single image as `[1, height, width, RGB]` with samples in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceTensor {
	data: Vec<f32>,
	shape: [usize; 4],
}

impl InferenceTensor {
	pub fn new(data: Vec<f32>, height: usize, width: usize) -> Result<Self> {
		let shape = [1, height, width, CHANNELS];
		if data.len() != height * width * CHANNELS {
			return Err(DiagnosisError::Inference(format!(
				"{} samples do not fill a tensor of shape {shape:?}",
				data.len()
			)));
		}
		Ok(Self { data, shape })
	}

	pub fn zeros(side: usize) -> Self {
		Self {
			data: vec![0.0; side * side * CHANNELS],
			shape: [1, side, side, CHANNELS],
		}
	}

	pub fn shape(&self) -> [usize; 4] {
		self.shape
	}

	pub fn data(&self) -> &[f32] {
		&self.data
	}

	pub fn into_data(self) -> Vec<f32> {
		self.data
	}
}

/// Turns encoded images into classifier input.
///
/// Mirrors the training-time pipeline: RGB conversion, nearest-neighbour resize to a square,
/// HWC layout, division by 255. Any drift here degrades accuracy without raising errors.
#[derive(Debug, Clone)]
pub struct Preprocessor {
	image_size: u32,
	filter: FilterType,
}

impl Default for Preprocessor {
	fn default() -> Self {
		Self::new(DEFAULT_IMAGE_SIZE)
	}
}

impl Preprocessor {
	pub fn new(image_size: u32) -> Self {
		Self {
			image_size,
			filter: FilterType::Nearest,
		}
	}

	pub fn with_filter(mut self, filter: FilterType) -> Self {
		self.filter = filter;
		self
	}

	pub fn image_size(&self) -> u32 {
		self.image_size
	}

	pub fn prepare(&self, bytes: &[u8]) -> Result<InferenceTensor> {
		if bytes.is_empty() {
			return Err(DiagnosisError::Decode("empty image payload".to_string()));
		}

		let image = image::load_from_memory(bytes).map_err(|err| DiagnosisError::Decode(err.to_string()))?;
		Ok(self.prepare_image(&image))
	}

	pub fn prepare_file<P: AsRef<Path>>(&self, path: P) -> Result<InferenceTensor> {
		let bytes = std::fs::read(path)?;
		self.prepare(&bytes)
	}

	pub fn prepare_image(&self, image: &DynamicImage) -> InferenceTensor {
		let side = self.image_size;
		let mut rgb = image.to_rgb8();

		if rgb.dimensions() != (side, side) {
			rgb = imageops::resize(&rgb, side, side, self.filter);
		}

		let data = rgb.into_raw().into_iter().map(|x| (x as f32) / 255.0).collect();

		InferenceTensor {
			data,
			shape: [1, side as usize, side as usize, CHANNELS],
		}
	}
}
