use {
    super::entity::EntityRef,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::{collections::HashSet, sync::Arc},
};

pub const ANONYMOUS_ACTOR: &str = "Anonymous";
pub const UNKNOWN_IP: &str = "unknown";

/// What the host framework tells us about one request/response cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: Option<String>,
    pub path: String,
    pub method: String,
    pub client_ip: Option<String>,
    pub response_status: u16,
}

/// One request's egress activity. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub service_name: String,
    pub actor: String,
    pub path: String,
    pub method: String,
    pub client_ip: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub response_status: u16,
    pub egressed_entities: Vec<EntityRef>,
}

impl AuditRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Assembles [`AuditRecord`]s for one service. No I/O, no clock reads.
#[derive(Debug, Clone)]
pub struct AuditRecordBuilder {
    service_name: Arc<str>,
}

impl AuditRecordBuilder {
    pub fn new(service_name: impl Into<Arc<str>>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn build(
        &self,
        ctx: &RequestContext,
        entity_refs: Vec<EntityRef>,
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AuditRecord {
        let actor = ctx
            .actor
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(ANONYMOUS_ACTOR)
            .to_string();
        let client_ip = ctx
            .client_ip
            .as_deref()
            .filter(|ip| !ip.is_empty())
            .unwrap_or(UNKNOWN_IP)
            .to_string();

        AuditRecord {
            service_name: self.service_name.to_string(),
            actor,
            path: ctx.path.clone(),
            method: ctx.method.clone(),
            client_ip,
            started_at,
            elapsed_ms: elapsed_ms(started_at, now),
            response_status: ctx.response_status,
            egressed_entities: dedup_in_order(entity_refs),
        }
    }
}

/// Clock skew can put `now` before `started_at`; that reads as zero.
pub fn elapsed_ms(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let ms = (now - started_at).num_milliseconds();
    u64::try_from(ms).unwrap_or(0)
}

fn dedup_in_order(refs: Vec<EntityRef>) -> Vec<EntityRef> {
    let mut seen = HashSet::with_capacity(refs.len());
    refs.into_iter()
        .filter(|r| seen.insert(r.clone()))
        .collect()
}
