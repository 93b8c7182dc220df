//! Scripted transport, resolver and destinations shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use pkgfetch::{
    Connector, Destination, EventLog, EventStream, FetchConfig, MirrorResolver, MirrorStrategy, RepositorySession,
    SrvRecord, TransferEvent, TransferRequest, Transport, TransportConfig, TransportError,
};

pub const REPO_NAME: &str = "FreeBSD";
pub const REPO_URL: &str = "pkg+http://pkg.example.org/FreeBSD";
pub const ITEM_URL: &str = "http://pkg.example.org/FreeBSD/All/zsh-5.9.pkg";

/// What the transport does for one attempt.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A full response.
    Status { status: u16, body: Vec<u8>, filetime: Option<i64> },

    /// Fails before any header arrives.
    Error(TransportError),

    /// `200` headers and part of a body, then a transport failure.
    Broken { body: Vec<u8>, error: TransportError },

    /// Headers and body, but the stream ends without completing.
    Truncated,

    /// Never produces anything.
    Silent,
}

impl Reply {
    pub fn ok(body: &[u8]) -> Self {
        Reply::Status {
            status:   200,
            body:     body.to_vec(),
            filetime: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Reply::Status {
            status,
            body: format!("<html>{status}</html>").into_bytes(),
            filetime: None,
        }
    }

    pub fn broken(body: &[u8]) -> Self {
        Reply::Broken {
            body:  body.to_vec(),
            error: TransportError::Reset("connection reset by peer".to_string()),
        }
    }

    pub fn filetime(self, mtime: i64) -> Self {
        match self {
            Reply::Status { status, body, .. } => Reply::Status {
                status,
                body,
                filetime: Some(mtime),
            },
            other => other,
        }
    }

    fn into_stream(self) -> EventStream {
        match self {
            Reply::Status { status, body, filetime } => {
                let mut events = headers(status, body.len());
                events.extend(body_events(&body));
                events.push(Ok(TransferEvent::Complete { status, filetime }));
                Box::pin(stream::iter(events))
            },
            Reply::Error(e) => Box::pin(stream::iter([Err::<TransferEvent, _>(e)])),
            Reply::Broken { body, error } => {
                let mut events = headers(200, body.len() * 2);
                events.extend(body_events(&body));
                events.push(Err(error));
                Box::pin(stream::iter(events))
            },
            Reply::Truncated => {
                let mut events = headers(200, 8);
                events.extend(body_events(b"half"));
                Box::pin(stream::iter(events))
            },
            Reply::Silent => Box::pin(stream::pending::<Result<TransferEvent, TransportError>>()),
        }
    }
}

fn headers(status: u16, length: usize) -> Vec<Result<TransferEvent, TransportError>> {
    [
        format!("HTTP/1.1 {status}"),
        "Server: mirror".to_string(),
        "Content-Type: application/octet-stream".to_string(),
        format!("Content-Length: {length}"),
    ]
    .into_iter()
    .map(|line| Ok(TransferEvent::Header { status, line }))
    .chain([Ok(TransferEvent::Progress {
        downloaded: 0,
        total:      0,
    })])
    .collect()
}

fn body_events(body: &[u8]) -> Vec<Result<TransferEvent, TransportError>> {
    let total = body.len() as u64;
    let mut downloaded = 0;
    let mut events = Vec::new();
    for chunk in body.chunks(4) {
        downloaded += chunk.len() as u64;
        events.push(Ok(TransferEvent::Data(Bytes::copy_from_slice(chunk))));
        events.push(Ok(TransferEvent::Progress { downloaded, total }));
    }
    events
}

#[derive(Debug, Default)]
struct ScriptState {
    replies:  VecDeque<Reply>,
    requests: Vec<TransferRequest>,
    connects: usize,
    config:   Option<TransportConfig>,
    refusal:  Option<TransportError>,
}

/// Replies handed out in order, plus a log of what was asked for.
#[derive(Debug, Clone, Default)]
pub struct Script {
    state: Arc<Mutex<ScriptState>>,
}

impl Script {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        let script = Self::default();
        script.push(replies);
        script
    }

    /// A script whose connector fails every `connect` with `error`.
    pub fn refusing(error: TransportError) -> Self {
        let script = Self::default();
        script.lock().refusal = Some(error);
        script
    }

    pub fn push(&self, replies: impl IntoIterator<Item = Reply>) { self.lock().replies.extend(replies) }

    pub fn connector(&self) -> ScriptedConnector { ScriptedConnector { script: self.clone() } }

    pub fn requests(&self) -> Vec<TransferRequest> { self.lock().requests.clone() }

    /// `host[:port]` of every request so far.
    pub fn hosts(&self) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .map(|r| match r.url.port() {
                Some(port) => format!("{}:{port}", r.url.host_str().unwrap_or_default()),
                None => r.url.host_str().unwrap_or_default().to_string(),
            })
            .collect()
    }

    pub fn connects(&self) -> usize { self.lock().connects }

    pub fn transport_config(&self) -> Option<TransportConfig> { self.lock().config }

    fn lock(&self) -> MutexGuard<'_, ScriptState> { self.state.lock().unwrap() }
}

#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    script: Script,
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&self, config: &TransportConfig) -> Result<ScriptedTransport, TransportError> {
        let mut state = self.script.lock();
        state.connects += 1;
        state.config = Some(*config);
        if let Some(error) = state.refusal.clone() {
            return Err(error);
        }
        Ok(ScriptedTransport {
            script: self.script.clone(),
        })
    }
}

#[derive(Debug)]
pub struct ScriptedTransport {
    script: Script,
}

impl Transport for ScriptedTransport {
    fn begin(&self, request: TransferRequest) -> Result<EventStream, TransportError> {
        let mut state = self.script.lock();
        state.requests.push(request);
        let reply = state
            .replies
            .pop_front()
            .unwrap_or_else(|| Reply::Error(TransportError::Other("no scripted reply".to_string())));
        Ok(reply.into_stream())
    }
}

/// Resolver that counts its lookups.
#[derive(Debug, Default)]
pub struct CountingResolver {
    records: Vec<SrvRecord>,
    calls:   AtomicUsize,
    service: Mutex<Option<String>>,
}

impl CountingResolver {
    pub fn new(records: Vec<SrvRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    pub fn last_service(&self) -> Option<String> { self.service.lock().unwrap().clone() }
}

#[async_trait]
impl MirrorResolver for CountingResolver {
    async fn resolve_mirrors(&self, service: &str) -> Vec<SrvRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.service.lock().unwrap() = Some(service.to_string());
        self.records.clone()
    }
}

/// In-memory destination whose writes fail during the first `failures` attempts.
#[derive(Debug, Default)]
pub struct FlakyDestination {
    pub data:     Vec<u8>,
    pub attempts: usize,
    failures:     usize,
}

impl FlakyDestination {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }
}

impl Destination for FlakyDestination {
    async fn begin_attempt(&mut self) -> io::Result<()> {
        self.attempts += 1;
        self.data.clear();
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.attempts <= self.failures {
            return Err(io::Error::new(io::ErrorKind::StorageFull, "no space left on device"));
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> { Ok(()) }
}

/// A session on [`REPO_URL`] over `script`, recording events into the log.
pub fn repo_session(script: &Script, config: FetchConfig) -> (RepositorySession<ScriptedConnector>, Arc<EventLog>) {
    let log = Arc::new(EventLog::new());
    let session = RepositorySession::new(REPO_NAME, REPO_URL, script.connector())
        .with_config(config)
        .with_events(log.clone());
    (session, log)
}

/// Like [`repo_session`], with service discovery answered by `resolver`.
pub fn srv_session(
    script: &Script,
    config: FetchConfig,
    resolver: Arc<CountingResolver>,
) -> (RepositorySession<ScriptedConnector>, Arc<EventLog>) {
    let (session, log) = repo_session(script, config);
    let session = session
        .with_strategy(MirrorStrategy::ServiceDiscovery)
        .with_resolver(resolver);
    (session, log)
}
