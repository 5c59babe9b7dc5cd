#![allow(dead_code)]

use {
    axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
        routing::get,
    },
    chrono::{DateTime, TimeZone, Utc},
    egress_audit::{
        AuditError, AuditRecord, AuditSink, AuditableResponse, EgressAuditor, Entity, EntityJson,
        Page, RequestContext,
    },
    serde::Serialize,
    std::{
        future::Future,
        io::{self, Write},
        pin::Pin,
        sync::{Arc, Mutex},
        time::Duration,
    },
    tokio::sync::mpsc,
};

// ── Entities ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Patient {
    pub id: u64,
    pub name: String,
}

impl Entity for Patient {
    const ENTITY_TYPE: &'static str = "Patient";

    fn primary_key(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: u64,
}

impl Entity for Order {
    const ENTITY_TYPE: &'static str = "Order";

    fn primary_key(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

/// Row that was never saved, so it has no identity.
#[derive(Debug, Clone, Serialize)]
pub struct Draft {
    pub id: Option<u64>,
}

impl Entity for Draft {
    const ENTITY_TYPE: &'static str = "Draft";

    fn primary_key(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }
}

pub fn patient(id: u64) -> Patient {
    Patient {
        id,
        name: format!("patient-{id}"),
    }
}

pub fn orders(ids: &[u64]) -> Vec<Order> {
    ids.iter().map(|&id| Order { id }).collect()
}

// ── Sinks ──────────────────────────────────────────────────────────────────

/// Keeps every record it is handed.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn write(
        &self,
        record: AuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + '_>> {
        self.records.lock().unwrap().push(record);
        Box::pin(async { Ok(()) })
    }
}

/// Fails every write the way an unreachable object store would.
pub struct FailingSink;

impl AuditSink for FailingSink {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn write(
        &self,
        _record: AuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + '_>> {
        Box::pin(async {
            Err(AuditError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        })
    }
}

pub struct PanickingSink;

impl AuditSink for PanickingSink {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn write(
        &self,
        _record: AuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + '_>> {
        panic!("sink exploded")
    }
}

/// Forwards records over a channel, for background dispatch.
pub struct ChannelSink(pub mpsc::UnboundedSender<AuditRecord>);

impl AuditSink for ChannelSink {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn write(
        &self,
        record: AuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + '_>> {
        let _ = self.0.send(record);
        Box::pin(async { Ok(()) })
    }
}

/// Never completes.
pub struct StuckSink;

impl AuditSink for StuckSink {
    fn name(&self) -> &'static str {
        "stuck"
    }

    fn write(
        &self,
        _record: AuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + '_>> {
        Box::pin(std::future::pending::<Result<(), AuditError>>())
    }
}

/// Records each write after `delay`, like a slow object store.
pub struct SlowSink {
    pub delay: Duration,
    records: Mutex<Vec<AuditRecord>>,
}

impl SlowSink {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            records: Mutex::default(),
        }
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for SlowSink {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn write(
        &self,
        record: AuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + '_>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.records.lock().unwrap().push(record);
            Ok(())
        })
    }
}

/// Writer that blocks its thread on every write, like a stalled pipe.
pub struct BlockingWriter(pub Duration);

impl Write for BlockingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        std::thread::sleep(self.0);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Cloneable in-memory writer for `LineSink`.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Fixtures ───────────────────────────────────────────────────────────────

pub fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
        + chrono::Duration::milliseconds(ms as i64)
}

pub fn ctx(actor: Option<&str>, path: &str) -> RequestContext {
    RequestContext {
        actor: actor.map(str::to_string),
        path: path.to_string(),
        method: "GET".to_string(),
        client_ip: Some("8.8.8.8".to_string()),
        response_status: 200,
    }
}

/// Routes covering every response shape the middleware understands.
pub fn app(auditor: &EgressAuditor) -> Router {
    let api = Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/patients/{id}",
            get(|axum::extract::Path(id): axum::extract::Path<u64>| async move {
                EntityJson(patient(id))
            }),
        )
        .route(
            "/patients",
            get(|| async { EntityJson(vec![patient(1), patient(2)]) }),
        )
        .route(
            "/orders",
            get(|| async {
                Page {
                    page: 1,
                    per_page: 3,
                    total: 3,
                    items: orders(&[1, 2, 2]),
                }
            }),
        )
        .route(
            "/summary",
            get(|| async {
                let p = patient(7);
                let o = orders(&[10, 11]);
                AuditableResponse::new(serde_json::json!({"orders": o.len()}))
                    .with_source(&p)
                    .with_source(&o)
            }),
        )
        .route(
            "/gone",
            get(|| async {
                AuditableResponse::new(serde_json::json!({"error": "archived"}))
                    .with_status(StatusCode::GONE)
                    .with_source(&patient(9))
            }),
        )
        .route(
            "/raw",
            get(|| async { axum::Json(serde_json::json!({"id": 5, "name": "raw"})) }),
        );

    auditor.wrap(api)
}

pub fn get_request(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-real-ip", "8.8.8.8")
        .body(Body::empty())
        .unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
