use crate::error::{DiagnosisError, Result};
use crate::labels::{CategoryId, LabelTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const BUNDLED: &str = include_str!("../data/disease_info.json");
const NOT_AVAILABLE: &str = "Information not available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pesticide {
	pub name: String,
	pub application: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherProfile {
	pub temperature: String,
	pub humidity: String,
	pub rainfall: String,
	pub seasonality: String,
}

/// Advisory data for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseRecord {
	pub causes: Vec<String>,
	pub prevention: Vec<String>,
	pub pesticides: Vec<Pesticide>,
	#[serde(rename = "weather_conditions")]
	pub weather_profile: WeatherProfile,
	pub occurrence_pattern: String,
	pub severity_level: String,
}

impl DiseaseRecord {
	/// Returned for categories without an entry.
	pub fn unknown() -> Self {
		Self {
			causes: vec![NOT_AVAILABLE.to_string()],
			prevention: vec![NOT_AVAILABLE.to_string()],
			pesticides: vec![Pesticide {
				name: "Consult local agricultural expert".to_string(),
				application: String::new(),
			}],
			weather_profile: WeatherProfile {
				temperature: NOT_AVAILABLE.to_string(),
				humidity: NOT_AVAILABLE.to_string(),
				rainfall: NOT_AVAILABLE.to_string(),
				seasonality: NOT_AVAILABLE.to_string(),
			},
			occurrence_pattern: NOT_AVAILABLE.to_string(),
			severity_level: NOT_AVAILABLE.to_string(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
	records: HashMap<String, DiseaseRecord>,
	fallback: DiseaseRecord,
}

impl KnowledgeBase {
	pub fn new(records: HashMap<String, DiseaseRecord>) -> Result<Self> {
		for key in records.keys() {
			CategoryId::new(key.as_str())?;
		}

		Ok(Self {
			records,
			fallback: DiseaseRecord::unknown(),
		})
	}

	/// Parses a JSON object mapping category identifiers to records.
	pub fn from_json(json: &str) -> Result<Self> {
		let records: HashMap<String, DiseaseRecord> = serde_json::from_str(json)
			.map_err(|err| DiagnosisError::KnowledgeBase(err.to_string()))?;
		Self::new(records)
	}

	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let json = std::fs::read_to_string(path)
			.map_err(|err| DiagnosisError::KnowledgeBase(format!("{}: {err}", path.display())))?;
		Self::from_json(&json)
	}

	/// The advisory table shipped with the crate.
	pub fn bundled() -> Result<Self> {
		Self::from_json(BUNDLED)
	}

	/// Never fails; unmapped identifiers get the fallback record.
	pub fn lookup(&self, id: &CategoryId) -> &DiseaseRecord {
		self.records.get(id.as_str()).unwrap_or(&self.fallback)
	}

	pub fn contains(&self, id: &CategoryId) -> bool {
		self.records.contains_key(id.as_str())
	}

	pub fn fallback(&self) -> &DiseaseRecord {
		&self.fallback
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Labels that will always resolve to the fallback record.
	pub fn missing_from<'a>(&self, labels: &'a LabelTable) -> Vec<&'a CategoryId> {
		labels.iter().filter(|id| !self.contains(id)).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id(s: &str) -> CategoryId {
		CategoryId::new(s).unwrap()
	}

	#[test]
	fn test_bundled_records() {
		let knowledge = KnowledgeBase::bundled().unwrap();
		assert_eq!(knowledge.len(), 31);

		let healthy = knowledge.lookup(&id("Apple___healthy"));
		assert_eq!(healthy.severity_level, "N/A");

		let scab = knowledge.lookup(&id("Apple___Apple_scab"));
		assert_eq!(scab.pesticides[0].name, "Captan");
		assert_eq!(scab.weather_profile.humidity, "High");
		assert_eq!(scab.severity_level, "Moderate to High");
	}

	#[test]
	fn test_citrus_greening_label_has_record() {
		let knowledge = KnowledgeBase::bundled().unwrap();
		assert!(knowledge.contains(&id("Orange___Huanglongbing_(Citrus_greening)")));
	}

	#[test]
	fn test_lookup_is_total() {
		let knowledge = KnowledgeBase::bundled().unwrap();
		let labels = LabelTable::plant_village();

		for label in labels.iter() {
			let record = knowledge.lookup(label);
			if knowledge.contains(label) {
				assert_ne!(record, &DiseaseRecord::unknown());
			} else {
				assert_eq!(record, &DiseaseRecord::unknown());
			}
			assert!(!record.causes.is_empty());
			assert!(!record.pesticides.is_empty());
		}

		let missing: Vec<&str> = knowledge.missing_from(&labels).iter().map(|id| id.as_str()).collect();
		assert!(missing.contains(&"Tomato___Early_blight"));
		assert!(!missing.contains(&"Apple___healthy"));
		assert_eq!(missing.len(), 8);
	}

	#[test]
	fn test_fallback_shape() {
		let unknown = DiseaseRecord::unknown();
		assert_eq!(unknown.causes, vec!["Information not available"]);
		assert_eq!(unknown.pesticides.len(), 1);
		assert_eq!(unknown.pesticides[0].application, "");
		assert_eq!(unknown.severity_level, "Information not available");

		let json = serde_json::to_value(&unknown).unwrap();
		assert_eq!(json["weather_conditions"]["rainfall"], "Information not available");
	}

	#[test]
	fn test_rejects_partial_records_and_bad_keys() {
		let partial = r#"{"Apple___healthy": {"causes": [], "prevention": []}}"#;
		assert!(matches!(KnowledgeBase::from_json(partial), Err(DiagnosisError::KnowledgeBase(_))));

		let bad_key = serde_json::json!({ "Apple": DiseaseRecord::unknown() }).to_string();
		assert!(matches!(KnowledgeBase::from_json(&bad_key), Err(DiagnosisError::InvalidLabel(_))));
	}

	#[test]
	fn test_missing_file() {
		let result = KnowledgeBase::from_file("does/not/exist.json");
		assert!(matches!(result, Err(DiagnosisError::KnowledgeBase(_))));
	}
}
