//! HTTP API server.
//!
//! REST endpoints for document upload, podcast generation, and in-playback
//! question answering, plus static serving of generated artifacts under
//! `/generated`.

use crate::chunk_store::{ChunkStore, SqliteChunkStore};
use crate::config::{Prompts, Settings};
use crate::document::DocumentProcessor;
use crate::embedding::OpenAIEmbedder;
use crate::error::PodkastError;
use crate::extract::PlainTextExtractor;
use crate::generator::PodcastGenerator;
use crate::job::{JobStatus, PodcastJob};
use crate::qa::{QaContextBuilder, QuestionAnswerer, TransitionGenerator};
use crate::script::OpenAiDialogueGenerator;
use crate::store::PodcastStore;
use crate::tts::{ElevenLabsSynthesizer, SpeechSynthesizer};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

/// Shared application state.
struct AppState {
    generator: Arc<PodcastGenerator>,
    processor: DocumentProcessor,
    context_builder: QaContextBuilder,
    answerer: QuestionAnswerer,
    transitions: TransitionGenerator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let chunk_store = Arc::new(SqliteChunkStore::new(&settings.sqlite_path())?);
    let store = Arc::new(PodcastStore::open(&settings.sqlite_path())?);
    let embedder = Arc::new(OpenAIEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
    ));

    let prompts = Prompts::load(None)?;
    let dialogue = OpenAiDialogueGenerator::new(
        &settings.script.model,
        settings.script.max_input_tokens,
        settings.script.words_per_minute,
    )
    .with_prompts(prompts.clone());

    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(ElevenLabsSynthesizer::from_env(
        &settings.audio.tts_model,
        Duration::from_secs(settings.audio.request_timeout_seconds),
        settings.audio.max_retries,
    )?);

    let generator = Arc::new(PodcastGenerator::with_components(
        chunk_store.clone(),
        Arc::new(dialogue),
        synthesizer.clone(),
        store.clone(),
        &settings,
    ));

    let processor = DocumentProcessor::new(
        Arc::new(PlainTextExtractor),
        embedder.clone(),
        chunk_store.clone(),
        settings.upload_dir(),
        settings.chunking.chunk_size,
        settings.chunking.chunk_overlap,
    );

    let context_builder = QaContextBuilder::new(
        store.clone(),
        chunk_store,
        embedder,
        settings.podcast_dir(),
        settings.qa.lookback_seconds,
        settings.qa.max_context_chunks,
    );

    let answer_synth = settings.qa.voice_answers.then(|| synthesizer.clone());
    let answerer = QuestionAnswerer::new(
        &settings.qa.model,
        store,
        answer_synth,
        &settings.audio.host_voice,
        settings.answer_dir(),
    )
    .with_prompts(prompts);

    let transitions = TransitionGenerator::new(
        synthesizer,
        &settings.audio.host_voice,
        settings.podcast_dir(),
    );

    let generated_dir = settings.data_dir().join("generated");
    std::fs::create_dir_all(&generated_dir)?;

    let state = Arc::new(AppState {
        generator,
        processor,
        context_builder,
        answerer,
        transitions,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/documents/upload", post(upload_document))
        .route("/documents", get(list_documents))
        .route("/documents/{id}", get(get_document).delete(delete_document))
        .route("/podcasts/generate", post(generate_podcast))
        .route("/podcasts", get(list_podcasts))
        .route("/podcasts/{id}", get(get_podcast).delete(delete_podcast))
        .route("/podcasts/{id}/questions", get(list_questions))
        .route("/questions/ask", post(ask_question))
        .route("/questions/acknowledgment", post(acknowledgment))
        .route("/questions/return-transition", post(return_transition))
        .nest_service("/generated", ServeDir::new(generated_dir))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Podkast API listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct UploadResponse {
    document_id: String,
    filename: String,
    status: String,
    chunks_count: u32,
}

#[derive(Serialize)]
struct DocumentInfo {
    document_id: String,
    filename: String,
    chunk_count: u32,
    status: String,
    created_at: String,
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentInfo>,
    total: usize,
}

#[derive(Deserialize)]
struct GenerateRequest {
    document_ids: Vec<String>,
    topic: String,
    #[serde(default = "default_duration")]
    duration_minutes: u32,
}

fn default_duration() -> u32 {
    3
}

#[derive(Serialize)]
struct GenerateResponse {
    podcast_id: String,
    status: String,
    message: String,
}

#[derive(Serialize)]
struct PodcastResponse {
    podcast_id: String,
    topic: String,
    status: String,
    stage: String,
    progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    script_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    created_at: String,
}

#[derive(Serialize)]
struct PodcastListResponse {
    podcasts: Vec<PodcastResponse>,
    total: usize,
}

#[derive(Serialize)]
struct QuestionInfo {
    id: String,
    question_text: String,
    answer_text: String,
    timestamp: f64,
    created_at: String,
}

#[derive(Serialize)]
struct QuestionListResponse {
    questions: Vec<QuestionInfo>,
    total: usize,
}

#[derive(Deserialize)]
struct AskRequest {
    podcast_id: String,
    question: String,
    #[serde(default)]
    timestamp: f64,
}

#[derive(Serialize)]
struct ContextUsed {
    document_chunks: usize,
    dialogue_exchanges: usize,
}

#[derive(Serialize)]
struct AskResponse {
    answer_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_url: Option<String>,
    sources: Vec<String>,
    context_used: ContextUsed,
    timestamp: f64,
}

#[derive(Deserialize)]
struct AcknowledgmentRequest {
    question: String,
}

#[derive(Serialize)]
struct AcknowledgmentResponse {
    acknowledgment_text: String,
    question_text: String,
    full_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_url: Option<String>,
}

#[derive(Serialize)]
struct TransitionResponse {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_url: Option<String>,
}

// === Error mapping ===

fn error_response(e: PodkastError) -> Response {
    let status = if e.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn podcast_response(job: PodcastJob) -> PodcastResponse {
    let complete = job.status == JobStatus::Complete;
    PodcastResponse {
        audio_url: complete.then(|| format!("/generated/podcasts/{}.mp3", job.id)),
        script_url: complete.then(|| format!("/generated/podcasts/{}_script.json", job.id)),
        podcast_id: job.id,
        topic: job.topic,
        status: job.status.to_string(),
        stage: job.stage.to_string(),
        progress_percent: job.progress_percent,
        duration_seconds: job.duration_seconds,
        error: job.error,
        created_at: job.created_at.to_rfc3339(),
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.pdf").to_string();
            match field.bytes().await {
                Ok(bytes) => upload = Some((filename, bytes.to_vec())),
                Err(e) => {
                    return error_response(PodkastError::InvalidInput(format!(
                        "Failed to read upload: {}",
                        e
                    )))
                }
            }
            break;
        }
    }

    let Some((filename, bytes)) = upload else {
        return error_response(PodkastError::InvalidInput(
            "Missing 'file' field in multipart upload".to_string(),
        ));
    };

    match state.processor.process_upload(&filename, &bytes).await {
        Ok(doc) => Json(UploadResponse {
            document_id: doc.id,
            filename: doc.filename,
            status: doc.status.to_string(),
            chunks_count: doc.chunk_count,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_documents(State(state): State<Arc<AppState>>) -> Response {
    match state.generator.chunk_store().list_documents().await {
        Ok(docs) => Json(DocumentListResponse {
            total: docs.len(),
            documents: docs
                .into_iter()
                .map(|d| DocumentInfo {
                    document_id: d.id,
                    filename: d.filename,
                    chunk_count: d.chunk_count,
                    status: d.status.to_string(),
                    created_at: d.created_at.to_rfc3339(),
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.generator.chunk_store().get_document(&id).await {
        Ok(Some(d)) => Json(DocumentInfo {
            document_id: d.id,
            filename: d.filename,
            chunk_count: d.chunk_count,
            status: d.status.to_string(),
            created_at: d.created_at.to_rfc3339(),
        })
        .into_response(),
        Ok(None) => error_response(PodkastError::NotFound(format!("Document {}", id))),
        Err(e) => error_response(e),
    }
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.processor.delete(&id).await {
        Ok(()) => Json(serde_json::json!({ "deleted": id })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn generate_podcast(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Response {
    match state
        .generator
        .submit(&req.document_ids, &req.topic, req.duration_minutes)
        .await
    {
        Ok(podcast_id) => Json(GenerateResponse {
            podcast_id,
            status: "processing".to_string(),
            message: "Podcast generation started. Poll /podcasts/{id} for status.".to_string(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_podcasts(State(state): State<Arc<AppState>>) -> Response {
    match state.generator.list().await {
        Ok(jobs) => Json(PodcastListResponse {
            total: jobs.len(),
            podcasts: jobs.into_iter().map(podcast_response).collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_podcast(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.generator.status(&id).await {
        Ok(job) => Json(podcast_response(job)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_podcast(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    // Verify existence first so unknown ids map to 404, not a silent no-op.
    if let Err(e) = state.generator.status(&id).await {
        return error_response(e);
    }

    match state
        .generator
        .store()
        .cleanup_failed_podcast(&id, state.generator.podcast_dir())
    {
        Ok(()) => Json(serde_json::json!({ "deleted": id })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_questions(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.generator.store().questions_for(&id) {
        Ok(questions) => Json(QuestionListResponse {
            total: questions.len(),
            questions: questions
                .into_iter()
                .map(|q| QuestionInfo {
                    id: q.id,
                    question_text: q.question_text,
                    answer_text: q.answer_text,
                    timestamp: q.timestamp,
                    created_at: q.created_at.to_rfc3339(),
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Response {
    let context = match state
        .context_builder
        .build(&req.podcast_id, &req.question, req.timestamp)
        .await
    {
        Ok(context) => context,
        Err(e) => return error_response(e),
    };

    match state
        .answerer
        .answer(&context, &req.question, req.timestamp)
        .await
    {
        Ok(answer) => Json(AskResponse {
            audio_url: answer
                .audio_path
                .is_some()
                .then(|| format!("/generated/answers/{}.mp3", answer.question_id)),
            answer_text: answer.answer_text,
            sources: answer.sources,
            context_used: ContextUsed {
                document_chunks: answer.chunks_used,
                dialogue_exchanges: answer.dialogue_lines_used,
            },
            timestamp: req.timestamp,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn acknowledgment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AcknowledgmentRequest>,
) -> Response {
    match state.transitions.acknowledge(&req.question).await {
        Ok(ack) => Json(AcknowledgmentResponse {
            audio_url: ack
                .audio_path
                .is_some()
                .then(|| "/generated/podcasts/acknowledgment_temp.mp3".to_string()),
            acknowledgment_text: ack.acknowledgment_text,
            question_text: ack.question_text,
            full_text: ack.full_text,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn return_transition(State(state): State<Arc<AppState>>) -> Response {
    match state.transitions.return_transition().await {
        Ok(transition) => Json(TransitionResponse {
            audio_url: transition
                .audio_path
                .is_some()
                .then(|| "/generated/podcasts/return_temp.mp3".to_string()),
            text: transition.text,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
