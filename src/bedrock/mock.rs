use super::ImageGenerationService;
use crate::models::{GenerationRequest, GenerationResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use std::sync::{Arc, Mutex};

// 1x1 RGBA PNG returned when no responses are queued
const TINY_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

#[derive(Clone)]
pub struct MockGenerationClient {
    responses: Arc<Mutex<Vec<GenerationResponse>>>,
    requests: Arc<Mutex<Vec<(String, GenerationRequest)>>>,
    call_count: Arc<Mutex<usize>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_response(self, response: GenerationResponse) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Queue a successful response carrying `image` as Base64.
    pub fn with_image_response(self, image: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        self.with_response(GenerationResponse::success(encoded))
    }

    /// Make every call fail as if the SDK reported `message`.
    pub fn with_client_failure(self, message: impl Into<String>) -> Self {
        *self.failure.lock().unwrap() = Some(message.into());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every `(model_id, request)` pair received so far.
    pub fn get_requests(&self) -> Vec<(String, GenerationRequest)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockGenerationClient {
    async fn invoke(
        &self,
        model_id: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        self.requests
            .lock()
            .unwrap()
            .push((model_id.to_string(), request.clone()));

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::ServiceClient(message));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(GenerationResponse::success(TINY_PNG_B64.to_string()))
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}
