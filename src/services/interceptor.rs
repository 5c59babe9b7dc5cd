use {
    crate::{
        adapters::{
            request::capture,
            response::{AuditableSources, InferredSource},
        },
        config::{AuditConfig, DispatchMode},
        domain::{
            entity::EntityRef,
            error::AuditError,
            extract::{extract, extract_all},
            record::{AuditRecord, AuditRecordBuilder, RequestContext},
        },
        infra::sink::{AuditSink, build_sink},
    },
    axum::{
        Router,
        extract::{Request, State},
        middleware::{self, Next},
        response::Response,
    },
    chrono::{DateTime, Utc},
    futures_util::FutureExt,
    std::{
        panic::{self, AssertUnwindSafe},
        sync::Arc,
        time::Duration,
    },
    tokio_util::task::TaskTracker,
};

/// Shared, immutable audit pipeline. Cheap to clone; holds no per-request
/// state, so one instance serves every request.
#[derive(Clone)]
pub struct EgressAuditor {
    inner: Arc<Inner>,
}

struct Inner {
    builder: AuditRecordBuilder,
    sink: Arc<dyn AuditSink>,
    dispatch: DispatchMode,
    sink_timeout: Duration,
    pending: TaskTracker,
}

impl EgressAuditor {
    pub fn new(config: &AuditConfig, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                builder: AuditRecordBuilder::new(config.service_name.as_str()),
                sink,
                dispatch: config.dispatch,
                sink_timeout: config.sink_timeout(),
                pending: TaskTracker::new(),
            }),
        }
    }

    /// Validate `config` and build the sink it names.
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        let sink = build_sink(config)?;
        Ok(Self::new(config, sink))
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.inner.dispatch
    }

    /// Put the audit middleware around every route of `router`.
    pub fn wrap<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self.clone(), egress_audit))
    }

    /// Extract egressed entities from a finished response and build its
    /// record. Runs for every status code.
    pub fn record_for(
        &self,
        mut ctx: RequestContext,
        response: &Response,
        started_at: DateTime<Utc>,
    ) -> AuditRecord {
        ctx.response_status = response.status().as_u16();

        tracing::trace!(path = %ctx.path, "extracting egressed entities");
        let refs = response_entity_refs(response);

        let record = self
            .inner
            .builder
            .build(&ctx, refs, started_at, Utc::now());
        tracing::trace!(
            path = %record.path,
            entities = record.egressed_entities.len(),
            "audit record built"
        );
        record
    }

    /// Hand `record` to the sink. Failures end here, in the log.
    pub async fn dispatch(&self, record: AuditRecord) {
        match self.inner.dispatch {
            DispatchMode::Inline => write_logged(self.inner.clone(), record).await,
            DispatchMode::Background => {
                self.inner
                    .pending
                    .spawn(write_logged(self.inner.clone(), record));
            }
        }
    }

    /// Background writes not yet finished.
    pub fn pending_writes(&self) -> usize {
        self.inner.pending.len()
    }

    /// Wait up to `grace` for background writes to finish. Call once the
    /// server has stopped accepting requests. Returns how many were left
    /// unwritten.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let pending = &self.inner.pending;
        pending.close();

        if tokio::time::timeout(grace, pending.wait()).await.is_ok() {
            tracing::info!(
                service = %self.inner.builder.service_name(),
                "egress audit writes drained"
            );
            return 0;
        }

        let left = pending.len();
        tracing::error!(
            service = %self.inner.builder.service_name(),
            sink = self.inner.sink.name(),
            pending = left,
            "egress audit records dropped at shutdown"
        );
        left
    }
}

async fn write_logged(inner: Arc<Inner>, record: AuditRecord) {
    let path = record.path.clone();
    let sink = inner.sink.name();

    // `write` itself is called inside the guarded future, so a sink that
    // panics before returning its future is caught too.
    let write = AssertUnwindSafe(async {
        tokio::time::timeout(inner.sink_timeout, inner.sink.write(record))
            .await
            .unwrap_or(Err(AuditError::Timeout(inner.sink_timeout)))
    })
    .catch_unwind();

    match write.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(
            service = %inner.builder.service_name(),
            sink,
            path = %path,
            error = %e,
            "failed to write egress audit record"
        ),
        Err(_) => tracing::error!(
            service = %inner.builder.service_name(),
            sink,
            path = %path,
            "egress audit sink panicked"
        ),
    }
}

/// References the response declares, preferring explicit
/// [`AuditableSources`] over the shape-inferred source.
pub fn response_entity_refs(response: &Response) -> Vec<EntityRef> {
    let extensions = response.extensions();

    if let Some(AuditableSources(sources)) = extensions.get::<AuditableSources>() {
        return extract_all(sources);
    }

    if let Some(InferredSource(source)) = extensions.get::<InferredSource>() {
        return extract(source);
    }

    Vec::new()
}

/// Axum middleware: time the request, let the handler run, audit whatever
/// came back, and return the response untouched.
pub async fn egress_audit(
    State(auditor): State<EgressAuditor>,
    request: Request,
    next: Next,
) -> Response {
    let started_at = Utc::now();
    let ctx = capture(&request);

    let response = next.run(request).await;

    // The body is not `Sync`, so nothing may borrow the response across the
    // dispatch await below.
    let record = panic::catch_unwind(AssertUnwindSafe(|| {
        auditor.record_for(ctx, &response, started_at)
    }));

    match record {
        Ok(record) => auditor.dispatch(record).await,
        Err(_) => tracing::error!(
            "egress audit record could not be built, response passed through"
        ),
    }

    response
}
