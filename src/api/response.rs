//! JSON 响应封装与错误码

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;

use crate::errors::BridgeError;

/// 统一响应体 `{"code": .., "message": .., "data": ..}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// API 错误码
///
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 3000-3099: 路由错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    BadRequest = 1000,
    InternalServerError = 1005,
    PayloadTooLarge = 1011,
    RateLimitExceeded = 1029,
    ServiceUnavailable = 1030,

    RouteNotFound = 3000,
    RouteInvalidDestination = 3002,
    RouteReconciliationPending = 3010,
}

impl From<&BridgeError> for ErrorCode {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::InvalidDestination(_) => ErrorCode::RouteInvalidDestination,
            BridgeError::NotFound(_) => ErrorCode::RouteNotFound,
            BridgeError::RateLimited(_) => ErrorCode::RateLimitExceeded,
            BridgeError::PayloadTooLarge(_) => ErrorCode::PayloadTooLarge,
            BridgeError::StorageUnavailable(_) => ErrorCode::ServiceUnavailable,
            BridgeError::ReconciliationPending(_) => ErrorCode::RouteReconciliationPending,
            BridgeError::Validation(_) | BridgeError::Serialization(_) => ErrorCode::BadRequest,
            BridgeError::StorageConfig(_) | BridgeError::FileOperation(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 202 Accepted
pub fn accepted_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::ACCEPTED, ErrorCode::Success, "Accepted", Some(data))
}

/// 从 BridgeError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_response(err: &BridgeError) -> HttpResponse {
    json_response::<()>(err.http_status(), ErrorCode::from(err), err.message(), None)
}
