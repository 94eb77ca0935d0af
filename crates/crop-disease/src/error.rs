use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiagnosisError>;

#[derive(Debug, Error)]
pub enum DiagnosisError {
	#[error("Could not load classifier from {path:?}: {reason}")]
	ModelLoad { path: PathBuf, reason: String },
	#[error("Could not decode image: {0}")]
	Decode(String),
	#[error("Label table has {labels} entries but the classifier produces {outputs} scores")]
	LabelMismatch { labels: usize, outputs: usize },
	#[error("Category index {index} is outside the label table (length {len})")]
	IndexOutOfRange { index: usize, len: usize },
	#[error("Classifier returned an empty score vector")]
	EmptyScores,
	#[error("Invalid category identifier '{0}'")]
	InvalidLabel(String),
	#[error("Knowledge base error: {0}")]
	KnowledgeBase(String),
	#[error("Inference failed: {0}")]
	Inference(String),
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Std IO error: {0}")]
	StdIoError(#[from] std::io::Error),
}

/// Failures of the HTTP boundary that happen outside the diagnosis pipeline.
#[derive(Debug, Error)]
pub enum UploadError {
	#[error("No file part in request")]
	MissingFile,
	#[error("No selected file")]
	EmptyFilename,
	#[error("Invalid upload filename '{0}'")]
	InvalidFilename(String),
	#[error("Malformed multipart request: {0}")]
	Multipart(#[from] axum::extract::multipart::MultipartError),
	#[error("Could not save upload: {0}")]
	Save(#[from] std::io::Error),
	#[error("Diagnosis worker failed: {0}")]
	Worker(#[from] tokio::task::JoinError),
}
