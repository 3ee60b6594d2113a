//! In-process network double for tests.
//!
//! Enabled for this crate's own tests and, through the `test-util` feature,
//! for downstream crates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tokio::sync::Notify;

use crate::fetch::{FetchError, Network, RequestDescriptor, ResponseDescriptor};

#[derive(Clone)]
enum Reply {
    Respond { status: u16, content_type: &'static str, body: Vec<u8> },
    Held { hold: Hold, status: u16, content_type: &'static str, body: Vec<u8> },
    Hang,
}

/// Signals for a held request: `started` fires when the request reaches the
/// network, and the response is sent only after `release` is notified.
#[derive(Clone, Default)]
pub struct Hold {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Answers requests from a per-URL script. Unscripted URLs and every URL while
/// offline fail as unreachable.
#[derive(Default)]
pub struct ScriptedNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn replies(&self) -> MutexGuard<'_, HashMap<String, Reply>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn respond(&self, url: &str, status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) {
        let reply = Reply::Respond { status, content_type, body: body.into() };
        self.replies().insert(url.to_string(), reply);
    }

    /// Answer `url` only once the returned [`Hold`] is released.
    pub fn hold(&self, url: &str, status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Hold {
        let hold = Hold::default();
        let reply = Reply::Held { hold: hold.clone(), status, content_type, body: body.into() };
        self.replies().insert(url.to_string(), reply);
        hold
    }

    /// Never resolve requests for `url`.
    pub fn hang(&self, url: &str) {
        self.replies().insert(url.to_string(), Reply::Hang);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests that reached the network.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn canned(status: u16, content_type: &'static str, body: Vec<u8>) -> ResponseDescriptor {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    ResponseDescriptor::new(status, headers, body)
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Unreachable("offline".into()));
        }

        let reply = self.replies().get(request.url().as_str()).cloned();
        match reply {
            Some(Reply::Respond { status, content_type, body }) => Ok(canned(status, content_type, body)),
            Some(Reply::Held { hold, status, content_type, body }) => {
                hold.started.notify_one();
                hold.release.notified().await;
                Ok(canned(status, content_type, body))
            }
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(FetchError::Unreachable(format!("no route to {}", request.url()))),
        }
    }
}
