use crate::error::{DiagnosisError, Result};
use crate::model::{LeafNet, LeafNetConfig, LeafNetRecord};
use crate::preprocess::InferenceTensor;
use burn::module::Module;
use burn::prelude::{Backend, Tensor, TensorData};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use log::{debug, info};
use std::path::Path;
use std::sync::Mutex;

/// Per-category scores, aligned with the label table.
pub type ScoreVector = Vec<f32>;

/// A loaded model that scores one preprocessed image.
pub trait Classifier: Send + Sync {
	/// Length of every score vector this classifier returns.
	fn num_outputs(&self) -> usize;

	fn predict(&self, tensor: &InferenceTensor) -> Result<ScoreVector>;
}

/// [`LeafNet`] weights loaded from a burn or PyTorch artifact.
///
/// Evaluation is serialized through a mutex, so one instance can be shared across threads.
pub struct BurnClassifier<B: Backend> {
	model: Mutex<LeafNet<B>>,
	device: B::Device,
	num_outputs: usize,
}

impl <B: Backend> BurnClassifier<B> {
	/// Loads the artifact and runs a probe inference at `image_size` to learn the output width.
	///
	/// `.mpk` files are read with burn's named MessagePack recorder, `.pt`/`.pth` files as a
	/// PyTorch state dict.
	pub fn load<P: AsRef<Path>>(artifact: P, config: &LeafNetConfig, image_size: u32, device: &B::Device) -> Result<Self> {
		let path = artifact.as_ref();
		let load_error = |reason: String| DiagnosisError::ModelLoad { path: path.to_path_buf(), reason };

		if !path.is_file() {
			return Err(load_error("artifact not found".to_string()));
		}

		let model: LeafNet<B> = config.init(device);
		let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);

		let model = match extension.as_deref() {
			Some("mpk") => {
				let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
				model
					.load_file(path.to_path_buf(), &recorder, device)
					.map_err(|err| load_error(format!("{err:?}")))?
			}
			Some("pt") | Some("pth") => {
				let load_args = LoadArgs::new(path.to_path_buf())
					// Checkpoints saved from nn.DataParallel prefix every key with `module.`
					.with_key_remap("^module\\.(.+)", "$1");
				let record: LeafNetRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::new()
					.load(load_args, device)
					.map_err(|err| load_error(format!("{err:?}")))?;
				model.load_record(record)
			}
			other => return Err(load_error(format!("unsupported artifact format {other:?}"))),
		};

		let classifier = Self::from_model(model, image_size, device.clone())
			.map_err(|err| load_error(format!("probe inference failed: {err}")))?;
		info!("Loaded classifier from {:?} with {} outputs", path, classifier.num_outputs);

		Ok(classifier)
	}

	pub fn from_model(model: LeafNet<B>, image_size: u32, device: B::Device) -> Result<Self> {
		let probe = InferenceTensor::zeros(image_size as usize);
		let scores = run(&model, &probe, &device)?;
		debug!("Probe inference returned {} scores", scores.len());

		Ok(Self {
			model: Mutex::new(model),
			device,
			num_outputs: scores.len(),
		})
	}
}

impl <B: Backend> Classifier for BurnClassifier<B> {
	fn num_outputs(&self) -> usize {
		self.num_outputs
	}

	fn predict(&self, tensor: &InferenceTensor) -> Result<ScoreVector> {
		let model = self
			.model
			.lock()
			.map_err(|_| DiagnosisError::Inference("classifier lock poisoned".to_string()))?;
		run(&model, tensor, &self.device)
	}
}

fn run<B: Backend>(model: &LeafNet<B>, tensor: &InferenceTensor, device: &B::Device) -> Result<ScoreVector> {
	let data = TensorData::new(tensor.data().to_vec(), tensor.shape());
	// NHWC -> NCHW
	let input = Tensor::<B, 4>::from_data(data.convert::<B::FloatElem>(), device).permute([0, 3, 1, 2]);

	let output = model.probabilities(input);
	let [batch, _] = output.dims();
	if batch != 1 {
		return Err(DiagnosisError::Inference(format!("expected one score row, got {batch}")));
	}

	output
		.flatten::<1>(0, 1)
		.into_data()
		.convert::<f32>()
		.to_vec::<f32>()
		.map_err(|err| DiagnosisError::Inference(format!("{err:?}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use burn::backend::NdArray;
	use std::path::PathBuf;

	fn small_config(num_classes: usize) -> LeafNetConfig {
		LeafNetConfig::new(num_classes).with_base_channels(2).with_hidden_size(8)
	}

	fn save_model(dir: &Path, num_classes: usize) -> PathBuf {
		let device = Default::default();
		let model: LeafNet<NdArray> = small_config(num_classes).init(&device);
		let path = dir.join("model.mpk");
		model
			.save_file(path.clone(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new())
			.unwrap();
		path
	}

	#[test]
	fn test_load_and_predict() {
		let dir = tempfile::tempdir().unwrap();
		let path = save_model(dir.path(), 7);

		let classifier = BurnClassifier::<NdArray>::load(&path, &small_config(7), 16, &Default::default()).unwrap();
		assert_eq!(classifier.num_outputs(), 7);

		let tensor = InferenceTensor::new(vec![0.25; 16 * 16 * 3], 16, 16).unwrap();
		let scores = classifier.predict(&tensor).unwrap();
		assert_eq!(scores.len(), 7);
		assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
		assert!((scores.iter().sum::<f32>() - 1.0).abs() < 1e-4);

		// evaluation leaves no trace
		assert_eq!(scores, classifier.predict(&tensor).unwrap());
	}

	#[test]
	fn test_missing_artifact() {
		let result = BurnClassifier::<NdArray>::load("no/such/model.mpk", &small_config(3), 16, &Default::default());
		assert!(matches!(result, Err(DiagnosisError::ModelLoad { .. })));
	}

	#[test]
	fn test_corrupt_artifact() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("model.mpk");
		std::fs::write(&path, b"not a model").unwrap();

		let result = BurnClassifier::<NdArray>::load(&path, &small_config(3), 16, &Default::default());
		assert!(matches!(result, Err(DiagnosisError::ModelLoad { .. })));
	}

	#[test]
	fn test_unsupported_extension() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("plant_disease_model.h5");
		std::fs::write(&path, b"HDF").unwrap();

		let result = BurnClassifier::<NdArray>::load(&path, &small_config(3), 16, &Default::default());
		match result {
			Err(DiagnosisError::ModelLoad { reason, .. }) => assert!(reason.contains("unsupported")),
			_ => panic!("Expected ModelLoad"),
		}
	}

	#[test]
	fn test_shared_across_threads() {
		let device = Default::default();
		let model: LeafNet<NdArray> = small_config(4).init(&device);
		let classifier = std::sync::Arc::new(BurnClassifier::from_model(model, 8, device).unwrap());
		let tensor = InferenceTensor::zeros(8);
		let expected = classifier.predict(&tensor).unwrap();

		let handles: Vec<_> = (0..4)
			.map(|_| {
				let classifier = classifier.clone();
				let tensor = tensor.clone();
				std::thread::spawn(move || classifier.predict(&tensor).unwrap())
			})
			.collect();

		for handle in handles {
			assert_eq!(handle.join().unwrap(), expected);
		}
	}
}
