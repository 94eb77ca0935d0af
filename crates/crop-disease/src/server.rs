use crate::classifier::Classifier;
use crate::error::UploadError;
use crate::pipeline::DiagnosisPipeline;
use crate::resolver::DiagnosisResult;
use crate::upload;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{info, warn};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

pub struct AppState<C: Classifier> {
	pub pipeline: Arc<DiagnosisPipeline<C>>,
	pub upload_dir: PathBuf,
}

/// Body of `POST /predict`. Always sent with status 200.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PredictResponse {
	Diagnosis(DiagnosisResult),
	Error { error: String },
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub classes: usize,
}

pub fn router<C: Classifier + 'static>(state: AppState<C>, max_upload_bytes: usize) -> Router {
	Router::new()
		.route("/predict", post(predict::<C>))
		.route("/health", get(health::<C>))
		.layer(DefaultBodyLimit::max(max_upload_bytes))
		.with_state(Arc::new(state))
}

pub async fn serve<C: Classifier + 'static>(addr: SocketAddr, state: AppState<C>, max_upload_bytes: usize) -> std::io::Result<()> {
	let app = router(state, max_upload_bytes);

	let listener = tokio::net::TcpListener::bind(addr).await?;
	info!("Listening on http://{}", listener.local_addr()?);
	axum::serve(listener, app).await
}

async fn predict<C: Classifier + 'static>(State(state): State<Arc<AppState<C>>>, mut multipart: Multipart) -> Json<PredictResponse> {
	match handle_upload(&state, &mut multipart).await {
		Ok(result) => Json(PredictResponse::Diagnosis(result)),
		Err(err) => {
			warn!("Rejected upload: {err}");
			Json(PredictResponse::Error { error: err.to_string() })
		}
	}
}

async fn health<C: Classifier + 'static>(State(state): State<Arc<AppState<C>>>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok",
		classes: state.pipeline.labels().len(),
	})
}

async fn handle_upload<C: Classifier + 'static>(state: &AppState<C>, multipart: &mut Multipart) -> Result<DiagnosisResult, UploadError> {
	let (file_name, bytes) = read_file_field(multipart).await?;

	let path = upload::save(&state.upload_dir, &file_name, &bytes).await?;
	info!("Saved upload to {:?} ({} bytes)", path, bytes.len());

	let pipeline = state.pipeline.clone();
	let result = tokio::task::spawn_blocking(move || pipeline.diagnose(&bytes)).await?;

	Ok(result)
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), UploadError> {
	while let Some(field) = multipart.next_field().await? {
		if field.name() != Some("file") {
			continue;
		}

		let file_name = field.file_name().unwrap_or_default().to_string();
		if file_name.is_empty() {
			return Err(UploadError::EmptyFilename);
		}

		let bytes = field.bytes().await?;
		return Ok((file_name, bytes.to_vec()));
	}

	Err(UploadError::MissingFile)
}
