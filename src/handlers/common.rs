use crate::{
    commands::parse_enum,
    errors::{ApiError, ServiceError},
    ApiResponse,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::VariantNames;
use utoipa::IntoParams;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input, reporting every field error
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ServiceError(ServiceError::from(e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Parses an optional enum-valued query parameter.
pub fn parse_filter<T>(field: &str, raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr + VariantNames,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_enum(field, raw).map(Some).map_err(map_service_error),
        None => Ok(None),
    }
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, capped by the configured maximum
    pub limit: Option<u64>,
}

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PurchaseOrderStatus;
    use assert_matches::assert_matches;

    #[test]
    fn empty_filter_is_ignored() {
        let parsed: Option<PurchaseOrderStatus> = parse_filter("status", Some("  ")).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn unknown_filter_value_is_a_validation_error() {
        let err = parse_filter::<PurchaseOrderStatus>("status", Some("Shipped")).unwrap_err();
        assert_matches!(err, ApiError::ServiceError(ServiceError::ValidationError(_)));
    }

    #[test]
    fn page_defaults_to_first() {
        assert_eq!(PaginationParams::default().page(), 1);
        assert_eq!(PaginationParams { page: Some(0), limit: None }.page(), 1);
    }
}
