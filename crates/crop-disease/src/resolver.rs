use crate::error::{DiagnosisError, Result};
use crate::knowledge::{DiseaseRecord, KnowledgeBase};
use crate::labels::LabelTable;
use serde::{Deserialize, Serialize};

/// Index of the largest score. The first index wins on ties and NaN never beats a number.
pub fn argmax(scores: &[f32]) -> Option<usize> {
	let mut best: Option<(usize, f32)> = None;

	for (index, &score) in scores.iter().enumerate() {
		match best {
			Some((_, current)) if !(score > current || (current.is_nan() && !score.is_nan())) => {}
			_ => best = Some((index, score)),
		}
	}

	best.map(|(index, _)| index)
}

/// What the boundary returns for every request that reaches the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
	pub crop: String,
	pub disease: String,
	pub disease_info: Option<DiseaseRecord>,
}

impl DiagnosisResult {
	pub const ERROR_CROP: &'static str = "Error";

	/// The only variant without disease info.
	pub fn failure(description: impl Into<String>) -> Self {
		Self {
			crop: Self::ERROR_CROP.to_string(),
			disease: description.into(),
			disease_info: None,
		}
	}

	pub fn is_failure(&self) -> bool {
		self.disease_info.is_none()
	}
}

/// Joins the top-scoring category with its advisory record.
#[derive(Debug, Clone)]
pub struct DiagnosisResolver {
	labels: LabelTable,
	knowledge: KnowledgeBase,
}

impl DiagnosisResolver {
	pub fn new(labels: LabelTable, knowledge: KnowledgeBase) -> Self {
		Self { labels, knowledge }
	}

	pub fn labels(&self) -> &LabelTable {
		&self.labels
	}

	pub fn knowledge(&self) -> &KnowledgeBase {
		&self.knowledge
	}

	pub fn resolve(&self, scores: &[f32]) -> Result<DiagnosisResult> {
		let index = argmax(scores).ok_or(DiagnosisError::EmptyScores)?;
		let category = self.labels.category_at(index)?;

		Ok(DiagnosisResult {
			crop: category.crop().to_string(),
			disease: category.display_condition(),
			disease_info: Some(self.knowledge.lookup(category).clone()),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn resolver() -> DiagnosisResolver {
		DiagnosisResolver::new(LabelTable::plant_village(), KnowledgeBase::bundled().unwrap())
	}

	fn one_hot(index: usize) -> Vec<f32> {
		let mut scores = vec![0.001; 38];
		scores[index] = 0.9;
		scores
	}

	#[test]
	fn test_argmax() {
		assert_eq!(argmax(&[]), None);
		assert_eq!(argmax(&[0.3]), Some(0));
		assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
		assert_eq!(argmax(&[0.2, 0.5, 0.1, 0.5]), Some(1));
		assert_eq!(argmax(&[f32::NAN, 0.1, 0.4]), Some(2));
		assert_eq!(argmax(&[0.1, f32::NAN, 0.05]), Some(0));
		assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
	}

	#[test]
	fn test_apple_healthy() {
		let result = resolver().resolve(&one_hot(3)).unwrap();

		assert_eq!(result.crop, "Apple");
		assert_eq!(result.disease, "healthy");
		assert_eq!(result.disease_info.unwrap().severity_level, "N/A");
	}

	#[test]
	fn test_corn_common_rust() {
		let result = resolver().resolve(&one_hot(8)).unwrap();

		assert_eq!(result.crop, "Corn_(maize)");
		assert_eq!(result.disease, "Common rust ");
		assert!(!result.is_failure());
	}

	#[test]
	fn test_tie_prefers_lowest_index() {
		let mut scores = vec![0.0; 38];
		scores[5] = 0.45;
		scores[20] = 0.45;

		let result = resolver().resolve(&scores).unwrap();
		assert_eq!(result.crop, "Cherry_(including_sour)");
		assert_eq!(result.disease, "Powdery mildew");
	}

	#[test]
	fn test_deterministic() {
		let resolver = resolver();
		let scores: Vec<f32> = (0..38).map(|i| ((i * 7) % 38) as f32 / 38.0).collect();

		assert_eq!(resolver.resolve(&scores).unwrap(), resolver.resolve(&scores).unwrap());
	}

	#[test]
	fn test_unmapped_label_gets_fallback() {
		let index = LabelTable::plant_village().position("Tomato___Leaf_Mold").unwrap();
		let result = resolver().resolve(&one_hot(index)).unwrap();

		assert_eq!(result.crop, "Tomato");
		assert_eq!(result.disease, "Leaf Mold");
		assert_eq!(result.disease_info, Some(DiseaseRecord::unknown()));
	}

	#[test]
	fn test_invalid_score_vectors() {
		assert!(matches!(resolver().resolve(&[]), Err(DiagnosisError::EmptyScores)));

		let mut scores = vec![0.0; 40];
		scores[39] = 1.0;
		assert!(matches!(
			resolver().resolve(&scores),
			Err(DiagnosisError::IndexOutOfRange { index: 39, len: 38 })
		));
	}

	#[test]
	fn test_failure_json_shape() {
		let json = serde_json::to_value(DiagnosisResult::failure("Failed to process image")).unwrap();

		assert_eq!(json["crop"], "Error");
		assert_eq!(json["disease"], "Failed to process image");
		assert!(json["disease_info"].is_null());
	}
}
