use crate::error::DiagnosisError;
use crate::knowledge::KnowledgeBase;
use crate::labels::LabelTable;
use crate::model::LeafNetConfig;
use burn::config::Config;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Everything the service needs at startup. See [`ServiceConfig::from_file`] for the JSON form.
#[derive(Debug, Config)]
pub struct ServiceConfig {
	/// Classifier weights (`.mpk` or `.pt`/`.pth`).
	pub model_path: PathBuf,
	/// `LeafNetConfig` JSON. Defaults to the standard architecture sized to the label table.
	pub model_config_path: Option<PathBuf>,
	/// One category per line. Defaults to the built-in PlantVillage table.
	pub labels_path: Option<PathBuf>,
	/// Disease records JSON. Defaults to the copy compiled into the binary.
	pub knowledge_base_path: Option<PathBuf>,
	#[config(default = 224)]
	pub image_size: u32,
	#[config(default = "PathBuf::from(\"uploads\")")]
	pub upload_dir: PathBuf,
	#[config(default = "String::from(\"0.0.0.0\")")]
	pub host: String,
	#[config(default = 5000)]
	pub port: u16,
	/// `cpu`, or with the `libtorch` feature `cuda`, `cuda:N`, `mps`.
	#[config(default = "String::from(\"cpu\")")]
	pub device: String,
	#[config(default = 16777216)]
	pub max_upload_bytes: usize,
}

/// On-disk form of [`ServiceConfig`]: only `model_path` is required.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceConfigFile {
	model_path: PathBuf,
	model_config_path: Option<PathBuf>,
	labels_path: Option<PathBuf>,
	knowledge_base_path: Option<PathBuf>,
	image_size: Option<u32>,
	upload_dir: Option<PathBuf>,
	host: Option<String>,
	port: Option<u16>,
	device: Option<String>,
	max_upload_bytes: Option<usize>,
}

impl ServiceConfig {
	/// Reads a JSON object; every field except `model_path` may be left out and takes its default.
	pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path)
			.map_err(|err| DiagnosisError::Config(format!("{}: {err}", path.display())))?;
		let file: ServiceConfigFile = serde_json::from_str(&text)
			.map_err(|err| DiagnosisError::Config(format!("{}: {err}", path.display())))?;

		let mut config = Self::new(file.model_path)
			.with_model_config_path(file.model_config_path)
			.with_labels_path(file.labels_path)
			.with_knowledge_base_path(file.knowledge_base_path);

		if let Some(image_size) = file.image_size {
			config.image_size = image_size;
		}
		if let Some(upload_dir) = file.upload_dir {
			config.upload_dir = upload_dir;
		}
		if let Some(host) = file.host {
			config.host = host;
		}
		if let Some(port) = file.port {
			config.port = port;
		}
		if let Some(device) = file.device {
			config.device = device;
		}
		if let Some(max_upload_bytes) = file.max_upload_bytes {
			config.max_upload_bytes = max_upload_bytes;
		}

		Ok(config)
	}

	pub fn label_table(&self) -> crate::error::Result<LabelTable> {
		match &self.labels_path {
			Some(path) => LabelTable::from_file(path),
			None => Ok(LabelTable::plant_village()),
		}
	}

	pub fn knowledge_base(&self) -> crate::error::Result<KnowledgeBase> {
		match &self.knowledge_base_path {
			Some(path) => KnowledgeBase::from_file(path),
			None => KnowledgeBase::bundled(),
		}
	}

	pub fn model_config(&self, num_classes: usize) -> crate::error::Result<LeafNetConfig> {
		match &self.model_config_path {
			Some(path) => LeafNetConfig::load(path)
				.map_err(|err| DiagnosisError::Config(format!("{}: {err:?}", path.display()))),
			None => Ok(LeafNetConfig::new(num_classes)),
		}
	}

	pub fn socket_addr(&self) -> crate::error::Result<SocketAddr> {
		format!("{}:{}", self.host, self.port)
			.parse()
			.map_err(|err| DiagnosisError::Config(format!("invalid listen address {}:{}: {err}", self.host, self.port)))
	}
}
