//! Shared test doubles
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use swarm_engine::llm::{
    FileState, GenerateRequest, GenerateResponse, GenerativeModel, LLMError, Part, Result,
    UploadedFile,
};

/// In-process model that replays a queue of replies and records requests.
///
/// When the reply queue runs dry `generate` fails with `LLMError::Unknown`.
/// Uploaded files take their states from `file_states` in order, then stay
/// at `settled_state`.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<GenerateResponse>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    upload_error: Mutex<Option<LLMError>>,
    file_states: Mutex<VecDeque<FileState>>,
    settled_state: FileState,
    get_file_calls: AtomicUsize,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            upload_error: Mutex::new(None),
            file_states: Mutex::new(VecDeque::new()),
            settled_state: FileState::Active,
            get_file_calls: AtomicUsize::new(0),
        }
    }

    pub fn reply(mut self, text: &str) -> Self {
        self.replies
            .get_mut()
            .unwrap()
            .push_back(Ok(GenerateResponse::from_text(text)));
        self
    }

    pub fn reply_parts(mut self, parts: Vec<Part>) -> Self {
        self.replies
            .get_mut()
            .unwrap()
            .push_back(Ok(GenerateResponse::new(parts)));
        self
    }

    pub fn fail(mut self, error: LLMError) -> Self {
        self.replies.get_mut().unwrap().push_back(Err(error));
        self
    }

    pub fn fail_upload(mut self, error: LLMError) -> Self {
        *self.upload_error.get_mut().unwrap() = Some(error);
        self
    }

    pub fn file_states(mut self, states: &[FileState], settled: FileState) -> Self {
        self.file_states.get_mut().unwrap().extend(states.iter().copied());
        self.settled_state = settled;
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn get_file_calls(&self) -> usize {
        self.get_file_calls.load(Ordering::SeqCst)
    }

    fn next_state(&self) -> FileState {
        self.file_states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.settled_state)
    }

    fn file(&self, state: FileState) -> UploadedFile {
        UploadedFile {
            name: "files/test-video".to_string(),
            uri: "https://files.example/test-video".to_string(),
            mime_type: "video/mp4".to_string(),
            state,
        }
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::Unknown("script exhausted".to_string())))
    }

    async fn upload_file(&self, _path: &Path) -> Result<UploadedFile> {
        if let Some(error) = self.upload_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.file(self.next_state()))
    }

    async fn get_file(&self, _name: &str) -> Result<UploadedFile> {
        self.get_file_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.file(self.next_state()))
    }
}
