//! Request extractors: caller identity and strict pagination

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};

use super::AppState;
use super::middleware::RequestId;
use super::responses::unauthorized;
use crate::errors::{AppError, AppResult};
use crate::models::{Pagination, RequestContext};

/// Authenticated caller, read from the identity header set by the auth layer
#[derive(Debug, Clone)]
pub struct Identity(pub RequestContext);

impl FromRequestParts<AppState> for Identity {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = state.config.web.identity_header.as_str();
        let user_id = parts
            .headers
            .get(header)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| unauthorized("Missing or invalid identity"))?;

        let mut ctx = RequestContext::new(user_id);
        if let Some(RequestId(id)) = parts.extensions.get::<RequestId>() {
            ctx.request_id = id.clone();
        }
        Ok(Identity(ctx))
    }
}

/// `?page=&limit=` and nothing else
#[derive(Debug, Clone, Copy)]
pub struct StrictPagination(pub Pagination);

impl<S> FromRequestParts<S> for StrictPagination
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_pagination(parts.uri.query())
            .map(StrictPagination)
            .map_err(IntoResponse::into_response)
    }
}

/// Exactly two query parameters, `page` and `limit`, both integers >= 1
pub fn parse_pagination(query: Option<&str>) -> AppResult<Pagination> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.unwrap_or("").as_bytes())
        .into_owned()
        .collect();

    if pairs.len() != 2 {
        return Err(AppError::validation(format!(
            "malformed query: expected exactly 'page' and 'limit', got {} parameter(s)",
            pairs.len()
        )));
    }

    let mut page = None;
    let mut limit = None;
    for (key, value) in &pairs {
        let slot = match key.as_str() {
            "page" => &mut page,
            "limit" => &mut limit,
            other => {
                return Err(AppError::validation(format!(
                    "malformed query: unexpected parameter '{other}'"
                )));
            }
        };
        if slot.is_some() {
            return Err(AppError::validation(format!(
                "malformed query: duplicate parameter '{key}'"
            )));
        }
        *slot = Some(parse_positive(key, value)?);
    }

    let (Some(page), Some(limit)) = (page, limit) else {
        return Err(AppError::validation(
            "malformed query: expected exactly 'page' and 'limit'",
        ));
    };

    if limit > Pagination::MAX_LIMIT {
        return Err(AppError::validation(format!(
            "'limit' must be <= {}",
            Pagination::MAX_LIMIT
        )));
    }
    // offset is bound as a signed 64-bit integer by the Metadata Store
    let in_range = (page - 1)
        .checked_mul(limit)
        .is_some_and(|offset| i64::try_from(offset).is_ok());
    if !in_range {
        return Err(AppError::validation("'page' is out of range"));
    }

    Ok(Pagination { page, limit })
}

fn parse_positive(key: &str, value: &str) -> AppResult<u64> {
    let parsed: i64 = value
        .trim()
        .parse()
        .map_err(|_| AppError::validation(format!("'{key}' must be an integer")))?;
    if parsed < 1 {
        return Err(AppError::validation(format!("'{key}' must be >= 1")));
    }
    Ok(parsed as u64)
}
