use crate::error::{DiagnosisError, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Separates the crop from the condition in a category identifier.
pub const DELIMITER: &str = "___";

/// Output order of the reference PlantVillage classifier.
pub const PLANT_VILLAGE: [&str; 38] = [
	"Apple___Apple_scab",
	"Apple___Black_rot",
	"Apple___Cedar_apple_rust",
	"Apple___healthy",
	"Blueberry___healthy",
	"Cherry_(including_sour)___Powdery_mildew",
	"Cherry_(including_sour)___healthy",
	"Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
	"Corn_(maize)___Common_rust_",
	"Corn_(maize)___Northern_Leaf_Blight",
	"Corn_(maize)___healthy",
	"Grape___Black_rot",
	"Grape___Esca_(Black_Measles)",
	"Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
	"Grape___healthy",
	"Orange___Huanglongbing_(Citrus_greening)",
	"Peach___Bacterial_spot",
	"Peach___healthy",
	"Pepper,_bell___Bacterial_spot",
	"Pepper,_bell___healthy",
	"Potato___Early_blight",
	"Potato___Late_blight",
	"Potato___healthy",
	"Raspberry___healthy",
	"Soybean___healthy",
	"Squash___Powdery_mildew",
	"Strawberry___Leaf_scorch",
	"Strawberry___healthy",
	"Tomato___Bacterial_spot",
	"Tomato___Early_blight",
	"Tomato___Late_blight",
	"Tomato___Leaf_Mold",
	"Tomato___Septoria_leaf_spot",
	"Tomato___Spider_mites Two-spotted_spider_mite",
	"Tomato___Target_Spot",
	"Tomato___Tomato_Yellow_Leaf_Curl_Virus",
	"Tomato___Tomato_mosaic_virus",
	"Tomato___healthy",
];

/// A `<Crop>___<Condition>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryId(String);

impl CategoryId {
	pub fn new(id: impl Into<String>) -> Result<Self> {
		let id = id.into();
		match id.split_once(DELIMITER) {
			Some((crop, _)) if !crop.is_empty() => Ok(Self(id)),
			_ => Err(DiagnosisError::InvalidLabel(id)),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Splits on the first delimiter. Everything after it belongs to the condition.
	pub fn split(&self) -> (&str, &str) {
		self.0.split_once(DELIMITER).unwrap_or((&self.0, ""))
	}

	pub fn crop(&self) -> &str {
		self.split().0
	}

	pub fn condition(&self) -> &str {
		self.split().1
	}

	/// Condition with word separators turned into spaces, e.g. `Common_rust_` -> `Common rust `.
	pub fn display_condition(&self) -> String {
		self.condition().replace('_', " ")
	}
}

impl fmt::Display for CategoryId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Category identifiers indexed by classifier output neuron.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
	labels: Vec<CategoryId>,
}

impl LabelTable {
	pub fn new(labels: Vec<CategoryId>) -> Result<Self> {
		let mut seen = HashSet::with_capacity(labels.len());
		for label in &labels {
			if !seen.insert(label.as_str()) {
				return Err(DiagnosisError::InvalidLabel(format!("{label} (duplicate)")));
			}
		}

		Ok(Self { labels })
	}

	pub fn plant_village() -> Self {
		Self {
			labels: PLANT_VILLAGE.iter().map(|id| CategoryId(id.to_string())).collect(),
		}
	}

	/// One identifier per line. Blank lines and lines starting with `#` are skipped.
	pub fn parse(text: &str) -> Result<Self> {
		let labels = text
			.lines()
			.map(str::trim)
			.filter(|line| !line.is_empty() && !line.starts_with('#'))
			.map(CategoryId::new)
			.collect::<Result<Vec<_>>>()?;

		Self::new(labels)
	}

	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let text = std::fs::read_to_string(path)?;
		Self::parse(&text)
	}

	pub fn category_at(&self, index: usize) -> Result<&CategoryId> {
		self.labels.get(index).ok_or(DiagnosisError::IndexOutOfRange {
			index,
			len: self.labels.len(),
		})
	}

	pub fn position(&self, id: &str) -> Option<usize> {
		self.labels.iter().position(|label| label.as_str() == id)
	}

	pub fn len(&self) -> usize {
		self.labels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &CategoryId> {
		self.labels.iter()
	}

	/// Fails unless every classifier output has exactly one label.
	pub fn ensure_matches(&self, outputs: usize) -> Result<()> {
		if self.labels.len() != outputs {
			return Err(DiagnosisError::LabelMismatch {
				labels: self.labels.len(),
				outputs,
			});
		}
		Ok(())
	}
}
