use {
    crate::domain::error::AuditError,
    derive_more::Display,
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

pub const ENV_SERVICE_NAME: &str = "EGRESS_SERVICE_NAME";
pub const ENV_LOG_TYPE: &str = "EGRESS_LOG_TYPE";
pub const ENV_S3_BUCKET: &str = "EGRESS_S3_BUCKET";
pub const ENV_DISPATCH: &str = "EGRESS_DISPATCH";
pub const ENV_SINK_TIMEOUT_MS: &str = "EGRESS_SINK_TIMEOUT_MS";

pub const DEFAULT_SINK_TIMEOUT_MS: u64 = 2_000;

fn default_sink_timeout_ms() -> u64 {
    DEFAULT_SINK_TIMEOUT_MS
}

/// Where audit records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum LogType {
    #[display("s3")]
    #[serde(rename = "s3")]
    S3,
    #[display("std_out")]
    #[serde(rename = "std_out")]
    StdOut,
}

impl TryFrom<&str> for LogType {
    type Error = AuditError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "s3" => Ok(Self::S3),
            "std_out" => Ok(Self::StdOut),
            other => Err(AuditError::Config(format!(
                "unknown egress log type: {other}"
            ))),
        }
    }
}

/// Whether the sink write is awaited before the response goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    #[default]
    #[display("inline")]
    Inline,
    #[display("background")]
    Background,
}

impl TryFrom<&str> for DispatchMode {
    type Error = AuditError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "inline" => Ok(Self::Inline),
            "background" => Ok(Self::Background),
            other => Err(AuditError::Config(format!(
                "unknown egress dispatch mode: {other}"
            ))),
        }
    }
}

/// Process-wide audit configuration. Loaded once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    pub service_name: String,
    pub log_type: LogType,
    pub bucket: Option<String>,
    #[serde(default)]
    pub dispatch: DispatchMode,
    /// Upper bound on one sink write, in either dispatch mode. Keep it well
    /// under any request timeout layered outside the audit middleware.
    #[serde(default = "default_sink_timeout_ms")]
    pub sink_timeout_ms: u64,
}

impl AuditConfig {
    pub fn std_out(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_type: LogType::StdOut,
            bucket: None,
            dispatch: DispatchMode::Inline,
            sink_timeout_ms: DEFAULT_SINK_TIMEOUT_MS,
        }
    }

    pub fn s3(service_name: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_type: LogType::S3,
            bucket: Some(bucket.into()),
            dispatch: DispatchMode::Inline,
            sink_timeout_ms: DEFAULT_SINK_TIMEOUT_MS,
        }
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }

    /// Read `EGRESS_*` variables from the process environment.
    pub fn from_env() -> Result<Self, AuditError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuditError> {
        let service_name = lookup(ENV_SERVICE_NAME)
            .ok_or_else(|| AuditError::Config(format!("{ENV_SERVICE_NAME} must be set")))?;
        let log_type = lookup(ENV_LOG_TYPE)
            .ok_or_else(|| AuditError::Config(format!("{ENV_LOG_TYPE} must be set")))?;
        let dispatch = match lookup(ENV_DISPATCH) {
            Some(raw) => DispatchMode::try_from(raw.trim())?,
            None => DispatchMode::default(),
        };
        let sink_timeout_ms = match lookup(ENV_SINK_TIMEOUT_MS) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                AuditError::Config(format!("{ENV_SINK_TIMEOUT_MS} must be a number, got: {raw}"))
            })?,
            None => DEFAULT_SINK_TIMEOUT_MS,
        };

        let config = Self {
            service_name,
            log_type: LogType::try_from(log_type.trim())?,
            bucket: lookup(ENV_S3_BUCKET),
            dispatch,
            sink_timeout_ms,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AuditError> {
        if self.service_name.trim().is_empty() {
            return Err(AuditError::Config("service_name must not be empty".into()));
        }

        if self.sink_timeout_ms == 0 {
            return Err(AuditError::Config("sink_timeout_ms must be positive".into()));
        }

        if self.log_type == LogType::S3
            && self.bucket.as_deref().is_none_or(|b| b.trim().is_empty())
        {
            return Err(AuditError::Config(
                "S3 logging is selected for egress logging but no bucket is specified".into(),
            ));
        }

        Ok(())
    }
}
