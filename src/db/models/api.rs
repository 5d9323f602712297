use serde::Serialize;

// Unified API response envelope
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
    pub timestamp: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub code: String,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            field: None,
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: &str) -> Self {
        Self {
            success: true,
            code: 200,
            message: message.to_string(),
            data: Some(data),
            errors: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(code: u16, message: &str, errors: Vec<ErrorDetail>) -> Self {
        Self {
            success: false,
            code,
            message: message.to_string(),
            data: None,
            errors: Some(errors),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn validation_error(errors: Vec<ErrorDetail>) -> Self {
        Self::error(400, "Validation failed", errors)
    }

    pub fn bad_request(message: &str, error_code: &str) -> Self {
        Self::error(400, message, vec![ErrorDetail::new(error_code, message)])
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::error(401, message, vec![ErrorDetail::new("UNAUTHORIZED", message)])
    }

    pub fn forbidden(message: &str, error_code: &str) -> Self {
        Self::error(403, message, vec![ErrorDetail::new(error_code, message)])
    }

    pub fn not_found(message: &str, error_code: &str) -> Self {
        Self::error(404, message, vec![ErrorDetail::new(error_code, message)])
    }

    pub fn service_unavailable(message: &str, error_code: &str) -> Self {
        Self::error(503, message, vec![ErrorDetail::new(error_code, message)])
    }

    pub fn gateway_timeout(message: &str, error_code: &str) -> Self {
        Self::error(504, message, vec![ErrorDetail::new(error_code, message)])
    }

    pub fn internal_error(message: &str) -> Self {
        Self::error(500, message, vec![ErrorDetail::new("INTERNAL_ERROR", message)])
    }
}

// Business error codes
pub mod error_codes {
    // Tenant resolution
    pub const TENANT_MALFORMED_IDENTITY: &str = "TENANT_001";
    pub const TENANT_NOT_FOUND: &str = "TENANT_002";
    pub const TENANT_SUSPENDED: &str = "TENANT_003";

    // Central store
    pub const STORE_UNAVAILABLE: &str = "STORE_001";
    pub const STORE_DEADLINE_EXCEEDED: &str = "STORE_002";
    pub const STORE_CANCELLED: &str = "STORE_003";

    // Authentication
    pub const AUTH_INVALID_TOKEN: &str = "AUTH_006";
    pub const VALIDATION_FAILED: &str = "VALIDATION_001";
}
