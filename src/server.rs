//! REST API for facematch.
//!
//! One [`FaceDB`] lives for the lifetime of the process and is shared by
//! every worker through [`web::Data`]. Image uploads go through an
//! [`Embedder`] before reaching the database; the JSON endpoints accept raw
//! embeddings directly.
//!
//! ## Endpoints
//!
//! - `GET /` - Liveness, model, dimension and face count
//! - `GET /stats` - Database and model statistics
//! - `POST /add_face` - Multipart `id` + `file`: register a face image
//! - `POST /match_face` - Multipart `file`: best match for a face image
//! - `POST /register` - JSON `{id, embedding}`
//! - `POST /match` - JSON `{embedding, top_k}`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use actix_web::{App, HttpServer, web};
//! use facematch::server::AppState;
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let state = web::Data::new(AppState::default());
//!     HttpServer::new(move || App::new().app_data(state.clone()).configure(facematch::server::config))
//!         .bind("0.0.0.0:8000")?
//!         .run()
//!         .await
//! }
//! ```

use std::time::Instant;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use futures::StreamExt;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::embedder::{EmbedError, Embedder, PixelEmbedder, decode_image};
use crate::error::MatchError;
use crate::FaceDB;

// --- Shared state ---

pub struct AppState {
    pub db: FaceDB,
    pub embedder: Box<dyn Embedder>,
    /// Optional score cutoff used only to annotate match responses.
    pub match_threshold: Option<f32>,
}

impl AppState {
    pub fn new(db: FaceDB, embedder: Box<dyn Embedder>) -> Self {
        Self { db, embedder, match_threshold: None }
    }

    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.match_threshold = threshold;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let db = match config.dimension {
            Some(d) => FaceDB::with_dimension(d),
            None => FaceDB::new(),
        };
        let embedder = PixelEmbedder::new(config.embedder.width, config.embedder.height);
        Self::new(db, Box::new(embedder)).with_threshold(config.match_threshold)
    }

    fn is_match(&self, score: f32) -> Option<bool> {
        self.match_threshold.map(|t| score >= t)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(FaceDB::new(), Box::new(PixelEmbedder::default()))
    }
}

// --- Errors ---

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Match(e) => e.kind(),
            ApiError::Embed(EmbedError::Decode(_)) => "decode_failed",
            ApiError::Embed(EmbedError::Extract(_)) => "extraction_failed",
            ApiError::BadRequest(_) => "bad_request",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Match(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Match(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Embed(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        })
    }
}

// --- Request structs ---

#[derive(Deserialize)]
struct RegisterRequest {
    id: String,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct MatchRequest {
    embedding: Vec<f32>,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize { 1 }

/// Fields collected from a multipart upload.
#[derive(Default)]
struct UploadForm {
    id: Option<String>,
    file: Option<Vec<u8>>,
}

// --- Response structs ---

#[derive(Serialize)]
struct RootResponse {
    status: &'static str,
    model: String,
    embedding_dimensions: usize,
    faces_in_database: usize,
}

#[derive(Serialize)]
struct StatsResponse {
    database_stats: DatabaseStats,
    model_info: ModelInfo,
}

#[derive(Serialize)]
struct DatabaseStats {
    total_faces: usize,
    unique_identities: usize,
}

#[derive(Serialize)]
struct ModelInfo {
    name: String,
    dimensions: usize,
    similarity_threshold: Option<f32>,
}

#[derive(Serialize)]
struct AddFaceResponse {
    status: &'static str,
    id: String,
    row: usize,
    details: AddFaceDetails,
}

#[derive(Serialize)]
struct AddFaceDetails {
    model: String,
    dimensions: usize,
    processing_ms: f64,
}

#[derive(Serialize)]
struct MatchFaceResponse {
    id: String,
    score: f32,
    row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_match: Option<bool>,
    processing_ms: f64,
}

#[derive(Serialize)]
struct RegisterResponse {
    status: &'static str,
    id: String,
    row: usize,
}

#[derive(Serialize)]
struct MatchResponse {
    matches: Vec<MatchResult>,
}

#[derive(Serialize)]
struct MatchResult {
    id: String,
    score: f32,
    row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_match: Option<bool>,
}

/// Drains a multipart payload, keeping the `id` and `file` fields.
async fn read_upload(mut payload: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| ApiError::BadRequest(format!("malformed multipart: {}", e)))?;
        let name = field.name().map(str::to_owned);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::BadRequest(format!("malformed multipart: {}", e)))?;
            data.extend_from_slice(&chunk);
        }

        match name.as_deref() {
            Some("id") => {
                let id = String::from_utf8(data)
                    .map_err(|_| ApiError::BadRequest("field 'id' is not valid UTF-8".to_string()))?;
                form.id = Some(id);
            }
            Some("file") => form.file = Some(data),
            _ => {}
        }
    }

    Ok(form)
}

fn embed_upload(state: &AppState, bytes: &[u8]) -> Result<Vec<f32>, ApiError> {
    let image = decode_image(bytes)?;
    Ok(state.embedder.embed(&image)?)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

// --- Handlers ---

async fn root_handler(state: web::Data<AppState>) -> HttpResponse {
    let status = state.db.status();
    HttpResponse::Ok().json(RootResponse {
        status: "ok",
        model: state.embedder.name().to_string(),
        embedding_dimensions: status.dimension.unwrap_or_else(|| state.embedder.dimension()),
        faces_in_database: status.faces,
    })
}

async fn stats_handler(state: web::Data<AppState>) -> HttpResponse {
    let status = state.db.status();
    HttpResponse::Ok().json(StatsResponse {
        database_stats: DatabaseStats {
            total_faces: status.faces,
            unique_identities: status.unique_identities,
        },
        model_info: ModelInfo {
            name: state.embedder.name().to_string(),
            dimensions: state.embedder.dimension(),
            similarity_threshold: state.match_threshold,
        },
    })
}

async fn add_face_handler(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let start = Instant::now();
    let form = read_upload(payload).await?;

    let id = form.id.filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing form field 'id'".to_string()))?;
    let file = form.file
        .ok_or_else(|| ApiError::BadRequest("missing form field 'file'".to_string()))?;

    let embedding = embed_upload(&state, &file)?;
    let reg = state.db.register(id, &embedding).inspect_err(|e| warn!("add_face rejected: {}", e))?;

    Ok(HttpResponse::Ok().json(AddFaceResponse {
        status: "added",
        id: reg.label,
        row: reg.row,
        details: AddFaceDetails {
            model: state.embedder.name().to_string(),
            dimensions: embedding.len(),
            processing_ms: elapsed_ms(start),
        },
    }))
}

async fn match_face_handler(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let start = Instant::now();
    if state.db.count() == 0 {
        return Err(MatchError::EmptyDatabase.into());
    }

    let form = read_upload(payload).await?;
    let file = form.file
        .ok_or_else(|| ApiError::BadRequest("missing form field 'file'".to_string()))?;

    let embedding = embed_upload(&state, &file)?;
    let best = state.db.match_face(&embedding)?;

    Ok(HttpResponse::Ok().json(MatchFaceResponse {
        is_match: state.is_match(best.score),
        id: best.label,
        score: best.score,
        row: best.row,
        processing_ms: elapsed_ms(start),
    }))
}

async fn register_handler(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let reg = state.db.register(body.id, &body.embedding)?;

    Ok(HttpResponse::Ok().json(RegisterResponse { status: "added", id: reg.label, row: reg.row }))
}

async fn match_handler(state: web::Data<AppState>, body: web::Json<MatchRequest>) -> Result<HttpResponse, ApiError> {
    let found = state.db.search(&body.embedding, body.top_k)?;

    let matches = found
        .into_iter()
        .map(|m| MatchResult {
            is_match: state.is_match(m.score),
            id: m.label,
            score: m.score,
            row: m.row,
        })
        .collect();

    Ok(HttpResponse::Ok().json(MatchResponse { matches }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(err.to_string()).into()
    }))
       .service(web::resource("/").route(web::get().to(root_handler)))
       .service(web::resource("/stats").route(web::get().to(stats_handler)))
       .service(web::resource("/add_face").route(web::post().to(add_face_handler)))
       .service(web::resource("/match_face").route(web::post().to(match_face_handler)))
       .service(web::resource("/register").route(web::post().to(register_handler)))
       .service(web::resource("/match").route(web::post().to(match_handler)));
}

/// Logs the effective server settings once at startup.
pub fn log_startup(config: &Config, state: &AppState) {
    info!("listening on {}", config.bind_addr());
    info!(
        "embedder '{}' ({} dims), fixed dimension: {:?}, match threshold: {:?}",
        state.embedder.name(),
        state.embedder.dimension(),
        config.dimension,
        state.match_threshold,
    );
}
