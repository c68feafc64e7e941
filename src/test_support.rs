//! Scripted fakes shared by the unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::delay::Delay;
use crate::error::{Error, Result};
use crate::github::{HttpResponse, HttpTransport};
use crate::llm::{LLMProvider, RatingRequest};
use crate::models::{CommitRecord, EvaluationResponse};

pub fn commits(count: usize) -> Vec<CommitRecord> {
    (0..count)
        .map(|i| CommitRecord {
            repository: "acme/widgets".to_string(),
            commit_sha: format!("{:040x}", i),
            commit_message: format!("message {}", i),
            author: "Ada".to_string(),
            date: "2024-01-01T00:00:00Z".to_string(),
            url: format!("https://github.com/acme/widgets/commit/{:040x}", i),
        })
        .collect()
}

/// Serves canned responses in order and records every requested URL. A `None` step, or
/// running past the end of the script, fails the request as a transport error.
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Option<HttpResponse>>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self::with_steps(responses.into_iter().map(Some).collect())
    }

    pub fn with_steps(steps: Vec<Option<HttpResponse>>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

/// A genuine `reqwest` error, built without touching the network.
pub fn transport_error() -> Error {
    match reqwest::Client::new().get("not a url").build() {
        Err(e) => Error::Network(e),
        Ok(_) => unreachable!("relative URL must not build"),
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requested.lock().unwrap().push(url.to_string());
        let step = self.steps.lock().unwrap().pop_front().flatten();
        step.ok_or_else(transport_error)
    }
}

#[derive(Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn recorded(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

type Responder = Box<dyn Fn(&RatingRequest, usize) -> Result<EvaluationResponse> + Send + Sync>;

/// LLM fake answering through a closure that sees the request and the call number.
pub struct ScriptedProvider {
    respond: Responder,
    calls: Mutex<Vec<RatingRequest>>,
}

impl ScriptedProvider {
    pub fn from_fn<F>(respond: F) -> Self
    where
        F: Fn(&RatingRequest, usize) -> Result<EvaluationResponse> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn evaluate_commits(&self, request: &RatingRequest) -> Result<EvaluationResponse> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };
        (self.respond)(request, call)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["scripted".to_string()])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
