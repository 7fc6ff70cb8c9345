use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tradechat_agent::AgentError;
use tradechat_core::AppError;
use tradechat_db::DbError;

/// Boundary error: every handled kind renders a `{"msg": …}` payload with
/// its fixed status code; anything else becomes an opaque server error
/// without leaking internals.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let app_error = match self {
            ApiError::App(err) => err,
            ApiError::Db(DbError::NotFound { entity }) => AppError::NotFound {
                entity: entity.to_string(),
            },
            ApiError::Db(DbError::Duplicate { entity, fields }) => AppError::DuplicateEntry {
                entity: entity.to_string(),
                fields,
            },
            ApiError::Db(err) => {
                tracing::error!(error = %err, "storage error");
                return internal_error();
            }
            ApiError::Agent(err) => {
                tracing::error!(error = %err, "completion error");
                return internal_error();
            }
        };

        app_error.log();
        let status = StatusCode::from_u16(app_error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({"msg": app_error.to_string()}))).into_response()
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"msg": "Internal server error."})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_renders_404_with_msg() {
        let response = ApiError::App(AppError::not_found("Thread")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_db_not_found_translates() {
        let response = ApiError::Db(DbError::NotFound { entity: "User" }).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unhandled_db_error_is_opaque_500() {
        let response = ApiError::Db(DbError::Sqlx(sqlx::Error::PoolClosed)).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_duplicate_renders_400() {
        let response = ApiError::Db(DbError::Duplicate {
            entity: "User",
            fields: "email".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
