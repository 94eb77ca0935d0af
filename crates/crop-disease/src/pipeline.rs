use crate::backend::{self, InferenceBackend};
use crate::classifier::{BurnClassifier, Classifier};
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::labels::LabelTable;
use crate::preprocess::Preprocessor;
use crate::resolver::{argmax, DiagnosisResolver, DiagnosisResult};
use log::{debug, info, warn};
use std::path::Path;
use std::time::Instant;

/// Preprocessor -> classifier -> resolver.
///
/// Per-request failures never escape: they come back as [`DiagnosisResult::failure`].
pub struct DiagnosisPipeline<C: Classifier> {
	preprocessor: Preprocessor,
	classifier: C,
	resolver: DiagnosisResolver,
}

impl <C: Classifier> DiagnosisPipeline<C> {
	/// Fails with `LabelMismatch` unless the label table covers every classifier output.
	pub fn new(preprocessor: Preprocessor, classifier: C, labels: LabelTable, knowledge: KnowledgeBase) -> Result<Self> {
		labels.ensure_matches(classifier.num_outputs())?;

		let missing = knowledge.missing_from(&labels);
		if !missing.is_empty() {
			let names: Vec<&str> = missing.iter().map(|id| id.as_str()).collect();
			warn!("{} categories have no disease record and will use the fallback: {}", names.len(), names.join(", "));
		}

		Ok(Self {
			preprocessor,
			classifier,
			resolver: DiagnosisResolver::new(labels, knowledge),
		})
	}

	pub fn labels(&self) -> &LabelTable {
		self.resolver.labels()
	}

	pub fn classifier(&self) -> &C {
		&self.classifier
	}

	pub fn diagnose(&self, bytes: &[u8]) -> DiagnosisResult {
		let start = Instant::now();

		match self.try_diagnose(bytes) {
			Ok(result) => {
				info!(
					"Diagnosed {} / {} in {:.1} ms",
					result.crop,
					result.disease,
					start.elapsed().as_secs_f64() * 1000.0
				);
				result
			}
			Err(err) => {
				warn!("Diagnosis failed: {err}");
				DiagnosisResult::failure(format!("Failed to process image: {err}"))
			}
		}
	}

	pub fn diagnose_file<P: AsRef<Path>>(&self, path: P) -> DiagnosisResult {
		match std::fs::read(path.as_ref()) {
			Ok(bytes) => self.diagnose(&bytes),
			Err(err) => {
				warn!("Could not read {:?}: {err}", path.as_ref());
				DiagnosisResult::failure(format!("Failed to process image: {err}"))
			}
		}
	}

	/// Like [`diagnose`](Self::diagnose) but surfaces the error.
	pub fn try_diagnose(&self, bytes: &[u8]) -> Result<DiagnosisResult> {
		let tensor = self.preprocessor.prepare(bytes)?;
		let scores = self.classifier.predict(&tensor)?;

		if let Some(top) = argmax(&scores) {
			debug!("Top score {:.4} at index {top}", scores[top]);
		}

		self.resolver.resolve(&scores)
	}
}

/// Builds the production pipeline from configuration. Any error here is fatal at startup.
pub fn load_pipeline(config: &ServiceConfig) -> Result<DiagnosisPipeline<BurnClassifier<InferenceBackend>>> {
	let labels = config.label_table()?;
	info!("Label table: {} categories", labels.len());

	let knowledge = config.knowledge_base()?;
	match &config.knowledge_base_path {
		Some(path) => info!("Knowledge base: {} records from {:?}", knowledge.len(), path),
		None => info!("Knowledge base: {} bundled records", knowledge.len()),
	}

	let device = backend::device(&config.device)?;
	info!("Inference backend: {} ({:?})", backend::backend_name(), device);

	let model_config = config.model_config(labels.len())?;
	let classifier = BurnClassifier::<InferenceBackend>::load(&config.model_path, &model_config, config.image_size, &device)?;

	DiagnosisPipeline::new(Preprocessor::new(config.image_size), classifier, labels, knowledge)
}
