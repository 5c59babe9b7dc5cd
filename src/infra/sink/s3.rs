use {
    super::AuditSink,
    crate::domain::{error::AuditError, record::AuditRecord},
    chrono::{DateTime, Utc},
    object_store::{ObjectStore, PutPayload, aws::AmazonS3Builder, path::Path},
    std::{future::Future, pin::Pin, sync::Arc},
    uuid::Uuid,
};

/// Writes each record as its own JSON object.
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreSink {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// S3 bucket, credentials and region taken from the usual `AWS_*`
    /// environment variables.
    pub fn s3(bucket: &str) -> Result<Self, AuditError> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        Ok(Self::new(Arc::new(store)))
    }

    async fn write_inner(&self, record: AuditRecord) -> Result<(), AuditError> {
        let body = serde_json::to_vec(&record)?;
        let key = object_key(&record.service_name, record.started_at, Uuid::now_v7());

        self.store.put(&key, PutPayload::from(body)).await?;
        tracing::debug!(key = %key, "audit record stored");
        Ok(())
    }
}

impl AuditSink for ObjectStoreSink {
    fn name(&self) -> &'static str {
        "object_store"
    }

    fn write(
        &self,
        record: AuditRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), AuditError>> + Send + '_>> {
        Box::pin(self.write_inner(record))
    }
}

/// `{service_name}/{YYYY-MM-DD}/{unix_millis}-{suffix}.json`
///
/// The suffix keeps two records from the same millisecond apart.
pub fn object_key(service_name: &str, started_at: DateTime<Utc>, suffix: Uuid) -> Path {
    Path::from(format!(
        "{}/{}/{}-{}.json",
        service_name,
        started_at.format("%Y-%m-%d"),
        started_at.timestamp_millis(),
        suffix
    ))
}
