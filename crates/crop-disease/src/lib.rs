//! Plant-leaf disease diagnosis: image preprocessing, burn classifier inference, label
//! resolution and advisory lookup, plus a small axum boundary.

pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod labels;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod resolver;
pub mod server;
pub mod upload;

pub use classifier::{BurnClassifier, Classifier, ScoreVector};
pub use config::ServiceConfig;
pub use error::{DiagnosisError, Result, UploadError};
pub use knowledge::{DiseaseRecord, KnowledgeBase, Pesticide, WeatherProfile};
pub use labels::{CategoryId, LabelTable};
pub use pipeline::{load_pipeline, DiagnosisPipeline};
pub use preprocess::{InferenceTensor, Preprocessor};
pub use resolver::{DiagnosisResolver, DiagnosisResult};
