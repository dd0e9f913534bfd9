//! Test doubles for the model backend and the PDF extractor.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::llm_client::models::ModelCandidates;
use crate::llm_client::retry::RetryPolicy;
use crate::llm_client::{GenerateRequest, LanguageModel, LlmClient, LlmError};
use crate::pdf::{ExtractedPdf, PdfError, PdfExtractor};
use crate::session::InMemorySessionStore;
use crate::state::AppState;

const BOUNDARY: &str = "mockmate-test-boundary";

const PROBE_PROMPTS: &[&str] = &["ping", "model-check"];

/// A model that answers probes with "pong" and everything else from a reply queue.
#[derive(Default)]
pub struct ScriptedModel {
    dead: HashSet<String>,
    silent: HashSet<String>,
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    probe_errors: Mutex<VecDeque<LlmError>>,
    stalled: bool,
    calls: Mutex<Vec<(String, String)>>,
    probes: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Models that fail every call with a 404.
    pub fn with_dead_models(mut self, ids: &[&str]) -> Self {
        self.dead.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    /// Models that answer every call with empty text.
    pub fn with_silent_models(mut self, ids: &[&str]) -> Self {
        self.silent.extend(ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_replies(self, replies: &[&str]) -> Self {
        self.replies
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| Ok(r.to_string())));
        self
    }

    pub fn with_error(self, error: LlmError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    /// Fails the next `n` probes with a 429 before answering normally.
    pub fn with_rate_limited_probes(self, n: usize) -> Self {
        self.probe_errors
            .lock()
            .unwrap()
            .extend((0..n).map(|_| rate_limited()));
        self
    }

    /// Answers probes but never completes any other call.
    pub fn with_stalled_replies(mut self) -> Self {
        self.stalled = true;
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Prompts of the non-probe calls made against `model_id`, in order.
    pub fn calls_for(&self, model_id: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == model_id)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, model_id: &str, request: &GenerateRequest) -> Result<String, LlmError> {
        // Lets concurrent callers interleave.
        tokio::task::yield_now().await;

        let is_probe = PROBE_PROMPTS.contains(&request.prompt.as_str());
        if is_probe {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.probe_errors.lock().unwrap().pop_front() {
                return Err(error);
            }
        } else {
            self.calls
                .lock()
                .unwrap()
                .push((model_id.to_string(), request.prompt.clone()));
        }

        if self.dead.contains(model_id) {
            return Err(LlmError::Api {
                status: 404,
                message: format!("models/{model_id} is not found"),
            });
        }
        if self.silent.contains(model_id) {
            return Ok(String::new());
        }
        if is_probe {
            return Ok("pong".to_string());
        }
        if self.stalled {
            std::future::pending::<()>().await;
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

pub fn rate_limited() -> LlmError {
    LlmError::Api {
        status: 429,
        message: "Resource has been exhausted (e.g. check quota).".to_string(),
    }
}

/// Extractor returning fixed text, or failing when `text` is `None`.
pub struct FakePdf {
    pub text: Option<String>,
    pub pages: Option<usize>,
}

impl FakePdf {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            pages: Some(1),
        }
    }

    pub fn broken() -> Self {
        Self {
            text: None,
            pages: None,
        }
    }
}

impl PdfExtractor for FakePdf {
    fn extract(&self, _bytes: &[u8]) -> Result<ExtractedPdf, PdfError> {
        match &self.text {
            Some(text) => Ok(ExtractedPdf {
                text: text.clone(),
                pages: self.pages,
            }),
            None => Err(PdfError::Extraction("corrupt xref table".to_string())),
        }
    }
}

/// Default config with one candidate per tier: `fast-1` and `pro-1`.
pub fn test_config() -> Config {
    let mut config = Config::from_lookup(|_| None).expect("empty environment is valid");
    config.models = ModelCandidates::from_lists(vec!["fast-1"], vec!["pro-1"]);
    config.llm_timeout = Duration::from_secs(5);
    config
}

/// App state over an in-memory session store. `model: None` means no API key.
pub fn test_state(model: Option<Arc<ScriptedModel>>, pdf: FakePdf) -> AppState {
    let config = test_config();
    let llm = model.map(|m| LlmClient::new(m, &config.models, RetryPolicy::default()));
    AppState {
        llm,
        sessions: Arc::new(InMemorySessionStore::new(config.session_ttl)),
        pdf: Arc::new(pdf),
        config,
        shutdown: CancellationToken::new(),
    }
}

/// A single-file multipart POST.
pub fn multipart_request(uri: &str, field: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
