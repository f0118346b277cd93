use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    InvalidDestination(String),
    NotFound(String),
    RateLimited(String),
    PayloadTooLarge(String),
    StorageUnavailable(String),
    ReconciliationPending(String),
    Validation(String),
    Serialization(String),
    StorageConfig(String),
    FileOperation(String),
}

impl BridgeError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::InvalidDestination(_) => "E001",
            BridgeError::NotFound(_) => "E002",
            BridgeError::RateLimited(_) => "E003",
            BridgeError::PayloadTooLarge(_) => "E004",
            BridgeError::StorageUnavailable(_) => "E005",
            BridgeError::ReconciliationPending(_) => "E006",
            BridgeError::Validation(_) => "E007",
            BridgeError::Serialization(_) => "E008",
            BridgeError::StorageConfig(_) => "E009",
            BridgeError::FileOperation(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::InvalidDestination(_) => "Invalid Destination",
            BridgeError::NotFound(_) => "Route Not Found",
            BridgeError::RateLimited(_) => "Rate Limited",
            BridgeError::PayloadTooLarge(_) => "Payload Too Large",
            BridgeError::StorageUnavailable(_) => "Storage Unavailable",
            BridgeError::ReconciliationPending(_) => "Reconciliation Pending",
            BridgeError::Validation(_) => "Validation Error",
            BridgeError::Serialization(_) => "Serialization Error",
            BridgeError::StorageConfig(_) => "Storage Configuration Error",
            BridgeError::FileOperation(_) => "File Operation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            BridgeError::InvalidDestination(msg) => msg,
            BridgeError::NotFound(msg) => msg,
            BridgeError::RateLimited(msg) => msg,
            BridgeError::PayloadTooLarge(msg) => msg,
            BridgeError::StorageUnavailable(msg) => msg,
            BridgeError::ReconciliationPending(msg) => msg,
            BridgeError::Validation(msg) => msg,
            BridgeError::Serialization(msg) => msg,
            BridgeError::StorageConfig(msg) => msg,
            BridgeError::FileOperation(msg) => msg,
        }
    }

    /// HTTP status the API layer answers with.
    ///
    /// `ReconciliationPending` maps to 202: the route table already reflects
    /// the change, only the durable copy lags behind.
    pub fn http_status(&self) -> StatusCode {
        match self {
            BridgeError::InvalidDestination(_)
            | BridgeError::Validation(_)
            | BridgeError::Serialization(_) => StatusCode::BAD_REQUEST,
            BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            BridgeError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            BridgeError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BridgeError::ReconciliationPending(_) => StatusCode::ACCEPTED,
            BridgeError::StorageConfig(_) | BridgeError::FileOperation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 格式化为彩色输出（用于启动失败时的终端输出）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for BridgeError {}

// 便捷的构造函数
impl BridgeError {
    pub fn invalid_destination<T: Into<String>>(msg: T) -> Self {
        BridgeError::InvalidDestination(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        BridgeError::NotFound(msg.into())
    }

    pub fn rate_limited<T: Into<String>>(msg: T) -> Self {
        BridgeError::RateLimited(msg.into())
    }

    pub fn payload_too_large<T: Into<String>>(msg: T) -> Self {
        BridgeError::PayloadTooLarge(msg.into())
    }

    pub fn storage_unavailable<T: Into<String>>(msg: T) -> Self {
        BridgeError::StorageUnavailable(msg.into())
    }

    pub fn reconciliation_pending<T: Into<String>>(msg: T) -> Self {
        BridgeError::ReconciliationPending(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        BridgeError::Validation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        BridgeError::Serialization(msg.into())
    }

    pub fn storage_config<T: Into<String>>(msg: T) -> Self {
        BridgeError::StorageConfig(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        BridgeError::FileOperation(msg.into())
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
