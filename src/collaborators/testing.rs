//! Mock collaborators for testing
//!
//! Each mock records how it was called so tests can assert on call counts
//! and arguments without real devices or models.

use super::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock Responder
// ============================================================================

/// Response generator returning queued replies, then a default one
pub struct MockResponder {
    responses: Mutex<VecDeque<Result<String, CollaboratorError>>>,
    delay: Option<Duration>,
    panics: bool,
    /// Record of all requests made
    pub requests: Mutex<Vec<ResponseRequest>>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            delay: None,
            panics: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panic inside every call
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn queue_reply(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn queue_error(&self, error: CollaboratorError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ResponseRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseGenerator for MockResponder {
    async fn generate(&self, request: &ResponseRequest) -> Result<String, CollaboratorError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.panics {
            panic!("mock responder panicked");
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Tell me more.".to_string()))
    }
}

// ============================================================================
// Mock Camera
// ============================================================================

/// Capture provider counting acquisitions and releases
pub struct MockCamera {
    failures: Mutex<VecDeque<CaptureError>>,
    delay: Option<Duration>,
    next_id: AtomicU64,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

pub struct MockStream {
    id: String,
    sequence: u64,
}

impl CaptureStream for MockStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn current_frame(&mut self) -> Frame {
        self.sequence += 1;
        Frame {
            stream_id: self.id.clone(),
            sequence: self.sequence,
            width: 2,
            height: 2,
            pixels: vec![0; 4],
            captured_at: Utc::now(),
        }
    }
}

impl MockCamera {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            delay: None,
            next_id: AtomicU64::new(1),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// Take this long to hand out a stream
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the next acquisition fail
    pub fn fail_next(&self, error: CaptureError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Streams successfully handed out
    pub fn acquire_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaCaptureProvider for MockCamera {
    type Stream = MockStream;

    async fn acquire(&self) -> Result<MockStream, CaptureError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(MockStream {
            id: format!("mock-camera-{id}"),
            sequence: 0,
        })
    }

    fn release(&self, _stream: MockStream) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Mock Classifier
// ============================================================================

/// Classifier returning queued results, then a fixed label
pub struct MockClassifier {
    default_label: String,
    results: Mutex<VecDeque<Result<String, CollaboratorError>>>,
    delay: Option<Duration>,
    panics: AtomicUsize,
    calls: AtomicUsize,
}

impl MockClassifier {
    pub fn always(label: impl Into<String>) -> Self {
        Self {
            default_label: label.into(),
            results: Mutex::new(VecDeque::new()),
            delay: None,
            panics: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panic inside the next call
    pub fn panic_next(&self) {
        self.panics.fetch_add(1, Ordering::SeqCst);
    }

    pub fn queue(&self, result: Result<String, CollaboratorError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmotionClassifier for MockClassifier {
    async fn classify(&self, _frame: &Frame) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let panicking = self
            .panics
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if panicking {
            panic!("mock classifier panicked");
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_label.clone()))
    }
}

// ============================================================================
// Recording Speech
// ============================================================================

/// Speech output that keeps every utterance
#[derive(Default)]
pub struct RecordingSpeech {
    fail: bool,
    pub utterances: Mutex<Vec<Utterance>>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record utterances but report every call as failed
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<Utterance> {
        self.utterances.lock().unwrap().clone()
    }
}

impl SpeechOutput for RecordingSpeech {
    fn speak(&self, utterance: &Utterance) -> Result<(), CollaboratorError> {
        self.utterances.lock().unwrap().push(utterance.clone());
        if self.fail {
            return Err(CollaboratorError::Unavailable);
        }
        Ok(())
    }
}
