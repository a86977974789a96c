//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use tendril_domain::error::AppError;

/// Wrapper that maps [`AppError`] to an HTTP response.
///
/// The status comes from [`AppError::status`] and the body is the shared
/// `{code, message, details?}` shape.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            match &self.0 {
                AppError::Storage(source) => tracing::error!(error = %source, "storage error"),
                other => tracing::error!(error = %other, "request failed"),
            }
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        (status, Json(self.0.to_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tendril_domain::error::{DriverError, NotFoundError, ValidationError};

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn should_answer_404_with_entity_code_when_record_missing() {
        let response = ApiError(NotFoundError::new("widgets", "w1").into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_of(response).await;
        assert_eq!(body["code"], "widgets.not_found");
        assert_eq!(body["message"], "widgets w1 not found");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn should_answer_422_with_issues_when_validation_fails() {
        let response =
            ApiError(ValidationError::field("/name", "required").into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_of(response).await;
        assert_eq!(body["code"], "validation_error");
        assert_eq!(body["details"][0]["path"], "/name");
    }

    #[tokio::test]
    async fn should_hide_source_when_storage_fails() {
        let err = AppError::Storage(Box::new(std::io::Error::other("disk full")));
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert_eq!(body["code"], "internal_error");
        assert_eq!(body["message"], "internal server error");
    }

    #[tokio::test]
    async fn should_answer_500_when_driver_fails() {
        let err = AppError::from(DriverError::Failed("timeout".to_string()));
        let response = ApiError(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await["code"], "internal_error");
    }
}
