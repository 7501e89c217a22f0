// Fake voice service for integration tests
//
// Mirrors the service's endpoints closely enough to exercise the HTTP
// transport and the full record -> upload -> synthesize flow.

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

pub const FFMPEG_REMEDY: &str =
    "Install FFmpeg with: brew install ffmpeg (macOS) or apt-get install ffmpeg (Linux)";

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub user_id: Option<String>,
    pub audio_len: usize,
    pub file_name: Option<String>,
}

#[derive(Debug)]
pub struct ServiceState {
    pub base_url: String,
    pub ffmpeg_available: bool,
    pub upload_fails: bool,
    pub synth_fails: bool,
    /// Replaces the computed synthesis body when set
    pub synth_override: Option<Value>,
    pub embeddings: HashSet<String>,
    pub uploads: Vec<RecordedUpload>,
    pub synth_requests: Vec<Value>,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            ffmpeg_available: true,
            upload_fails: false,
            synth_fails: false,
            synth_override: None,
            embeddings: HashSet::new(),
            uploads: Vec::new(),
            synth_requests: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeService {
    pub state: Arc<Mutex<ServiceState>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F: FnOnce(&mut ServiceState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn synth_requests(&self) -> Vec<Value> {
        self.state.lock().unwrap().synth_requests.clone()
    }

    /// Bind on an ephemeral port and serve in the background
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        self.with(|s| s.base_url = base_url.clone());

        let app = Router::new()
            .route("/health", get(health))
            .route("/voices", get(voices))
            .route("/user-voice-status", get(user_voice_status))
            .route("/upload", post(upload))
            .route("/synthesize", post(synthesize))
            .route("/synthesized/:file", get(synthesized))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        base_url
    }
}

fn missing_ffmpeg() -> Value {
    json!({
        "error_type": "missing_dependency",
        "message": "FFmpeg not found. Voice adaptation requires FFmpeg to be installed.",
        "solution": FFMPEG_REMEDY,
    })
}

async fn health(State(svc): State<FakeService>) -> impl IntoResponse {
    let state = svc.state.lock().unwrap();
    Json(json!({
        "status": "ok",
        "bark_loaded": true,
        "voice_adaptation_loaded": true,
        "ffmpeg_available": state.ffmpeg_available,
        "device": "CPU",
    }))
}

async fn voices(State(svc): State<FakeService>) -> impl IntoResponse {
    let state = svc.state.lock().unwrap();
    let mut voices: Vec<Value> = state
        .embeddings
        .iter()
        .map(|id| json!({"id": format!("user_{}", id), "name": "Your Uploaded Voice", "is_user_voice": true}))
        .collect();
    for preset in ["female_1", "male_1"] {
        voices.push(json!({"id": preset, "name": format!("AI Voice: {}", preset), "is_user_voice": false}));
    }
    Json(json!({ "voices": voices }))
}

async fn user_voice_status(
    State(svc): State<FakeService>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(user_id) = params.get("userId").filter(|id| !id.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"has_voice": false, "message": "No user ID provided"})),
        );
    };

    let state = svc.state.lock().unwrap();
    let has_voice = state.embeddings.contains(user_id);
    let mut body = json!({
        "has_voice": has_voice,
        "message": if has_voice { "Voice sample found and processed" } else { "No voice sample found for this user" },
        "ffmpeg_available": state.ffmpeg_available,
    });
    if !state.ffmpeg_available {
        body["error"] = missing_ffmpeg();
    }
    (StatusCode::OK, Json(body))
}

async fn upload(State(svc): State<FakeService>, mut multipart: Multipart) -> impl IntoResponse {
    let mut audio_len = None;
    let mut file_name = None;
    let mut user_id = None;

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                file_name = field.file_name().map(str::to_string);
                audio_len = Some(field.bytes().await.unwrap().len());
            }
            "userId" => user_id = Some(field.text().await.unwrap()),
            _ => {}
        }
    }

    let mut state = svc.state.lock().unwrap();
    let Some(audio_len) = audio_len else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "No audio file uploaded"})),
        );
    };
    state.uploads.push(RecordedUpload {
        user_id: user_id.clone(),
        audio_len,
        file_name,
    });

    if state.upload_fails {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Disk full"})),
        );
    }

    let user_id = user_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if !state.ffmpeg_available {
        return (
            StatusCode::OK,
            Json(json!({
                "message": "Voice sample received but cannot be processed",
                "userId": user_id,
                "voice_processed": false,
                "error": missing_ffmpeg(),
            })),
        );
    }

    state.embeddings.insert(user_id.clone());
    (
        StatusCode::OK,
        Json(json!({
            "message": "Voice sample received and processed!",
            "userId": user_id,
            "voice_processed": true,
        })),
    )
}

async fn synthesize(State(svc): State<FakeService>, Json(body): Json<Value>) -> impl IntoResponse {
    let mut state = svc.state.lock().unwrap();
    state.synth_requests.push(body.clone());

    let text = body["text"].as_str().unwrap_or_default();
    if text.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "No text provided."})));
    }
    if state.synth_fails {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Error synthesizing audio: model crashed"})),
        );
    }
    if let Some(canned) = &state.synth_override {
        return (StatusCode::OK, Json(canned.clone()));
    }

    let user_id = body["userId"].as_str().unwrap_or_default().to_string();
    let requested = body["use_user_voice"].as_bool().unwrap_or(false);
    let can_adapt = state.embeddings.contains(&user_id);

    let file_url = format!("{}/synthesized/{}_1.wav", state.base_url, user_id);
    let mut response = json!({
        "message": "Audio synthesized successfully",
        "file_url": file_url,
        "download_url": format!("{}?download=true", file_url),
        "user_voice_applied": requested && can_adapt,
    });
    if requested && !can_adapt {
        response["adaptation_failure"] = if state.ffmpeg_available {
            json!({
                "error_type": "no_voice_sample",
                "message": "No processed voice sample available",
                "solution": "Record your voice in the 'Learn Your Voice' tab first.",
            })
        } else {
            missing_ffmpeg()
        };
    }
    (StatusCode::OK, Json(response))
}

async fn synthesized(Path(file): Path<String>) -> impl IntoResponse {
    if file.ends_with(".wav") {
        (StatusCode::OK, b"RIFF-fake-audio".to_vec())
    } else {
        (StatusCode::NOT_FOUND, Vec::new())
    }
}
