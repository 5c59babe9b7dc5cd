pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;
pub mod telemetry;

pub use {
    adapters::{
        request::AuthenticatedActor,
        response::{AuditableResponse, EntityJson},
    },
    config::{AuditConfig, DispatchMode, LogType},
    domain::{
        entity::{Entity, EntityRef, EntitySource, Page, ToEntitySource},
        error::AuditError,
        record::{AuditRecord, AuditRecordBuilder, RequestContext},
    },
    infra::sink::{AuditSink, LineSink, ObjectStoreSink},
    services::interceptor::{EgressAuditor, egress_audit},
};
