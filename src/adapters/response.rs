use {
    crate::domain::entity::{EntitySource, Page, ToEntitySource},
    axum::{
        http::{HeaderValue, StatusCode, header},
        response::{IntoResponse, Response},
    },
    serde::Serialize,
};

/// Sources a handler declared explicitly through [`AuditableResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditableSources(pub Vec<EntitySource>);

/// Source attached by the standard response shapes ([`EntityJson`], [`Page`]).
/// Used only when no [`AuditableSources`] are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredSource(pub EntitySource);

/// JSON response that states which entity queries its body came from.
///
/// ```ignore
/// AuditableResponse::new(summary)
///     .with_source(&patient)
///     .with_source(&orders)
/// ```
#[derive(Debug, Clone)]
pub struct AuditableResponse<T> {
    data: T,
    sources: Vec<EntitySource>,
    status: StatusCode,
}

impl<T: Serialize> AuditableResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            sources: Vec::new(),
            status: StatusCode::OK,
        }
    }

    pub fn with_source<S: ToEntitySource + ?Sized>(mut self, source: &S) -> Self {
        self.sources.push(source.to_entity_source());
        self
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = EntitySource>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn auditable_sources(&self) -> &[EntitySource] {
        &self.sources
    }
}

impl<T: Serialize> IntoResponse for AuditableResponse<T> {
    fn into_response(self) -> Response {
        json_response(self.status, &self.data, AuditableSources(self.sources))
    }
}

/// JSON body of an entity or a collection of them.
#[derive(Debug, Clone)]
pub struct EntityJson<T>(pub T);

impl<T: Serialize + ToEntitySource> IntoResponse for EntityJson<T> {
    fn into_response(self) -> Response {
        let source = self.0.to_entity_source();
        json_response(StatusCode::OK, &self.0, InferredSource(source))
    }
}

impl<T> IntoResponse for Page<T>
where
    T: Serialize,
    Page<T>: ToEntitySource,
{
    fn into_response(self) -> Response {
        let source = self.to_entity_source();
        json_response(StatusCode::OK, &self, InferredSource(source))
    }
}

// Sources ride along only when the body was actually produced.
fn json_response<T, X>(status: StatusCode, data: &T, sources: X) -> Response
where
    T: Serialize + ?Sized,
    X: Clone + Send + Sync + 'static,
{
    match serde_json::to_vec(data) {
        Ok(body) => {
            let mut res = (
                status,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                )],
                body,
            )
                .into_response();
            res.extensions_mut().insert(sources);
            res
        }
        Err(err) => {
            tracing::error!("response serialization error: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                )],
                err.to_string(),
            )
                .into_response()
        }
    }
}
