//! Route handlers.

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, Request},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::http::pages;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::client_id;
use crate::token::codec::token_prefix;
use crate::token::TokenError;
use crate::workflow::{Confirmation, Outcome, UnsubscribeRequest, WorkflowError};

/// Query string of `GET /unsubscribe`.
#[derive(Debug, Default, Deserialize)]
pub struct UnsubscribeQuery {
    pub token: Option<String>,
    pub confirm: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "unsubscribe",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// `GET /unsubscribe?token=<token>&confirm=<yes|no>`
pub async fn unsubscribe(
    State(state): State<AppState>,
    query: Result<Query<UnsubscribeQuery>, QueryRejection>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();

    // A query that cannot be parsed (e.g. a repeated `token`) gets the HTML
    // invalid-token page rather than axum's plain-text rejection.
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unparsable unsubscribe query");
            let outcome = Outcome::Invalid(TokenError::Malformed);
            metrics::record_outcome(outcome.label());
            let page = pages::render(&outcome, &state.pages);
            metrics::record_request_duration(page.status.as_u16(), start);
            return page.into_response();
        }
    };
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let unsubscribe_request = UnsubscribeRequest {
        confirm: Confirmation::from_query(query.confirm.as_deref()),
        token: query.token,
        ip_address: Some(client_id(&request)),
        user_agent,
    };

    let page = match state.workflow.handle(&unsubscribe_request).await {
        Ok(outcome) => {
            tracing::debug!(outcome = outcome.label(), "Unsubscribe request handled");
            metrics::record_outcome(outcome.label());
            pages::render(&outcome, &state.pages)
        }
        Err(WorkflowError::Storage { operation, user_id, source }) => {
            let token = unsubscribe_request.token.as_deref().unwrap_or_default();
            tracing::error!(
                user_id,
                token_prefix = %token_prefix(token),
                operation = %operation,
                error = %source,
                "Unsubscribe storage failure"
            );
            metrics::record_storage_failure(operation.as_str());
            pages::server_error(&state.pages)
        }
    };

    metrics::record_request_duration(page.status.as_u16(), start);
    page.into_response()
}
