//! # API Error Type
//!
//! Unified error type for backoffice commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kedai POS                              │
//! │                                                                         │
//! │  Command Function: Result<T, ApiError>                                  │
//! │         │                                                               │
//! │         ├── CoreError (business rejection) ──► 4xx-style code, message  │
//! │         │                                                               │
//! │         ├── DbError::Busy / StockConflict ──► retried, then RETRY      │
//! │         │                                                               │
//! │         └── DbError (persistence failure) ──► logged, generic message  │
//! │                                                                         │
//! │  Frontend receives:                                                     │
//! │    { "code": "INSUFFICIENT_STOCK",                                      │
//! │      "message": "Insufficient stock for Kopi Susu (Large): ..." }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use kedai_core::CoreError;
use kedai_db::DbError;

/// API error returned from backoffice commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "MEMBER_REQUIRED",
///   "message": "Discount 'Member Monday' is for members only: scan member QR first"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Business rule rejection (422)
    BusinessLogic,

    /// Not enough tracked stock
    InsufficientStock,

    /// Members-only discount without a scanned member
    MemberRequired,

    /// Role does not allow the action (403)
    Forbidden,

    /// Conflicts with existing state (409)
    Conflict,

    /// Contention outlasted the retry budget; the user may try again
    Retry,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn retry() -> Self {
        ApiError::new(
            ErrorCode::Retry,
            "The register is busy, please try again",
        )
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::SessionClosed { session_id } => ApiError::new(
                ErrorCode::BusinessLogic,
                format!("Cashier session {} was closed, open a new shift", session_id),
            ),
            DbError::StockConflict { .. } | DbError::Busy | DbError::PoolExhausted => {
                ApiError::retry()
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Decode { entity, reason } => {
                tracing::error!(entity = %entity, "Corrupt row: {}", reason);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        let code = match err {
            CoreError::ProductNotFound(_)
            | CoreError::VariantNotFound { .. }
            | CoreError::MemberNotFound(_)
            | CoreError::SessionNotFound(_)
            | CoreError::TransactionNotFound(_)
            | CoreError::DiscountRuleNotFound(_)
            | CoreError::OutletNotFound(_)
            | CoreError::DraftNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::MemberValidationRequired { .. } => ErrorCode::MemberRequired,
            CoreError::Forbidden { .. } => ErrorCode::Forbidden,
            CoreError::SessionAlreadyActive { .. } | CoreError::CustomerAlreadyLinked { .. } => {
                ErrorCode::Conflict
            }
            CoreError::ProductUnavailable { .. }
            | CoreError::InsufficientTender { .. }
            | CoreError::NoActiveSession { .. }
            | CoreError::InvalidSessionStatus { .. }
            | CoreError::CartTooLarge { .. } => ErrorCode::BusinessLogic,
            CoreError::QuantityTooLarge { .. } | CoreError::Validation(_) => {
                ErrorCode::ValidationError
            }
        };
        ApiError::new(code, message)
    }
}

impl From<kedai_core::ValidationError> for ApiError {
    fn from(err: kedai_core::ValidationError) -> Self {
        CoreError::from(err).into()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for backoffice commands.
pub type ApiResult<T> = Result<T, ApiError>;
