pub mod s3;
pub mod stdout;

use {
    crate::{
        config::{AuditConfig, LogType},
        domain::{error::AuditError, record::AuditRecord},
    },
    std::{future::Future, pin::Pin, sync::Arc},
};

pub use {s3::ObjectStoreSink, stdout::LineSink};

/// Destination for finished audit records.
///
/// The interceptor is the only caller and treats every `Err` as
/// logged-and-swallowed, so implementations report failure instead of
/// panicking.
pub trait AuditSink: Send + Sync {
    /// Short label used in log fields.
    fn name(&self) -> &'static str;

    fn write(
        &self,
        record: AuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + '_>>;
}

/// Pick the sink named by `config`. Called once at startup.
pub fn build_sink(config: &AuditConfig) -> Result<Arc<dyn AuditSink>, AuditError> {
    config.validate()?;

    match config.log_type {
        LogType::S3 => {
            let bucket = config.bucket.as_deref().ok_or_else(|| {
                AuditError::Config("S3 logging selected without a bucket".into())
            })?;
            let sink = ObjectStoreSink::s3(bucket)?;
            tracing::info!(bucket, "egress audit records go to S3");
            Ok(Arc::new(sink))
        }
        LogType::StdOut => {
            tracing::info!("egress audit records go to stdout");
            Ok(Arc::new(LineSink::stdout()))
        }
    }
}
