//! Error types for the IdeaScanner SDK

/// Machine-readable error category.
///
/// HTTP responses are classified by status code; everything that never
/// reached the backend is either `Network`, `Validation`, or a billing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Transport-level failure (DNS, TLS, connection reset, bad JSON body)
    Network,
    /// Rejected locally or by the backend with 400
    Validation,
    /// 401 - the session token is missing, expired, or revoked; re-login
    Unauthorized,
    /// 402 - free quota and credits exhausted; the caller must offer a
    /// purchase, never a generic error
    PaymentRequired,
    /// 404
    NotFound,
    /// 5xx
    Server,
    /// No session token stored; an authenticated call was attempted logged out
    NoToken,
    /// The platform store connection is not ready or the offer does not exist
    BillingUnavailable,
    /// The platform store reported a failure (message passed through verbatim)
    Billing,
    /// Anything the client cannot classify
    Unknown,
}

/// Error returned by all SDK operations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ScannerError {
    code: ErrorCode,
    message: String,
    /// HTTP status, when the error came from a backend response
    status: Option<u16>,
}

impl ScannerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(code: ErrorCode, message: impl Into<String>, status: u16) -> Self {
        Self {
            code,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn billing(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Billing, message)
    }

    pub fn no_token() -> Self {
        Self::new(ErrorCode::NoToken, "Not logged in")
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// True for the distinguished 402 business condition.
    pub fn is_payment_required(&self) -> bool {
        self.code == ErrorCode::PaymentRequired
    }

    /// True when the fix is to re-authenticate.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.code, ErrorCode::Unauthorized | ErrorCode::NoToken)
    }
}

/// Map an HTTP status to an error code.
///
/// The status alone decides the category; the body only supplies the message.
pub(crate) fn map_status_to_error_code(status: u16) -> ErrorCode {
    match status {
        400 => ErrorCode::Validation,
        401 => ErrorCode::Unauthorized,
        402 => ErrorCode::PaymentRequired,
        404 => ErrorCode::NotFound,
        500..=599 => ErrorCode::Server,
        _ => ErrorCode::Unknown,
    }
}

pub type Result<T> = std::result::Result<T, ScannerError>;
