use {
    super::AuditSink,
    crate::domain::{error::AuditError, record::AuditRecord},
    std::{
        future::Future,
        io::{self, Write},
        pin::Pin,
        sync::{Arc, Mutex},
    },
};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// One JSON record per line. Stdout in practice; any writer in tests.
///
/// Writes run on tokio's blocking pool, so a stalled pipe holds a blocking
/// thread, never a runtime worker.
pub struct LineSink {
    out: SharedWriter,
}

impl LineSink {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    async fn write_inner(&self, record: AuditRecord) -> Result<(), AuditError> {
        let line = record.to_json()?;
        let out = self.out.clone();

        tokio::task::spawn_blocking(move || write_line(&out, &line))
            .await
            .map_err(|e| AuditError::Io(io::Error::other(e)))?
    }
}

fn write_line(out: &SharedWriter, line: &str) -> Result<(), AuditError> {
    // A panicked writer leaves no partial state we care about.
    let mut out = out.lock().unwrap_or_else(|p| p.into_inner());
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

impl AuditSink for LineSink {
    fn name(&self) -> &'static str {
        "std_out"
    }

    fn write(
        &self,
        record: AuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + '_>> {
        Box::pin(self.write_inner(record))
    }
}
