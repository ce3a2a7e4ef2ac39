//! Unified error system for Gatehouse
//!
//! One error type covers every guard in the workspace. Authorization failures
//! carry the name of the operation they were raised for so the host framework
//! can report it; infrastructure failures carry a message.

use serde::{Deserialize, Serialize};

/// Stable machine-readable code for an error, used by host frameworks when
/// translating errors into protocol responses.
pub trait ErrorCode {
    /// Wire code for this error
    fn code(&self) -> &'static str;
}

/// Protocol status class an error maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusClass {
    /// Caller is not authenticated or not authorized (401)
    Unauthorized,
    /// Caller supplied something the guard cannot use (400)
    BadRequest,
    /// A record the guard needed does not exist (404)
    NotFound,
    /// Server-side defect or dependency failure (500)
    Internal,
}

impl StatusClass {
    /// Numeric HTTP status for this class
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusClass::Unauthorized => 401,
            StatusClass::BadRequest => 400,
            StatusClass::NotFound => 404,
            StatusClass::Internal => 500,
        }
    }
}

/// Unified error type for all Gatehouse operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum GatehouseError {
    /// Permissions are declared but the call carries no caller identity
    #[error("You have not provided the appropriate access token for the resource {action}.")]
    MissingCallerContext {
        /// Operation the call was addressed to
        action: String,
    },

    /// Every authorization phase denied the call
    #[error("This account does not have enough permissions for this action.")]
    InsufficientPermissions {
        /// Operation the call was addressed to
        action: String,
    },

    /// The owner check could not find an entity id in the call parameters
    #[error("Entity id unable to be computed from params.")]
    EntityIdUnresolvable {
        /// Operation the call was addressed to
        action: String,
    },

    /// The owner sentinel is declared but the service has no owner check
    #[error("You are missing the isEntityOwner action on this service")]
    CapabilityMissing {
        /// Operation the call was addressed to
        action: String,
    },

    /// Network or transport error talking to the policy engine
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// The operation succeeded but policy bookkeeping afterwards failed
    #[error("Policy synchronization failed for {policy_id}: {source}")]
    Synchronization {
        /// Policy record that could not be brought in step
        policy_id: String,
        /// Error that stopped the synchronization
        #[source]
        source: Box<GatehouseError>,
    },

    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Error raised by a wrapped operation handler
    #[error("Handler error: {message}")]
    Handler {
        /// Error message reported by the handler
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl GatehouseError {
    /// Create a missing caller context error for an operation
    pub fn missing_caller_context(action: impl Into<String>) -> Self {
        Self::MissingCallerContext {
            action: action.into(),
        }
    }

    /// Create an insufficient permissions error for an operation
    pub fn insufficient_permissions(action: impl Into<String>) -> Self {
        Self::InsufficientPermissions {
            action: action.into(),
        }
    }

    /// Create an unresolvable entity id error for an operation
    pub fn entity_id_unresolvable(action: impl Into<String>) -> Self {
        Self::EntityIdUnresolvable {
            action: action.into(),
        }
    }

    /// Create a missing owner capability error for an operation
    pub fn capability_missing(action: impl Into<String>) -> Self {
        Self::CapabilityMissing {
            action: action.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a synchronization error for `policy_id`, keeping the error
    /// that caused it
    pub fn synchronization(policy_id: impl Into<String>, source: GatehouseError) -> Self {
        Self::Synchronization {
            policy_id: policy_id.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a handler error
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Status class the host framework should translate this error into
    pub fn status(&self) -> StatusClass {
        match self {
            GatehouseError::MissingCallerContext { .. }
            | GatehouseError::InsufficientPermissions { .. } => StatusClass::Unauthorized,
            GatehouseError::Invalid { .. } => StatusClass::BadRequest,
            GatehouseError::NotFound { .. } => StatusClass::NotFound,
            GatehouseError::EntityIdUnresolvable { .. }
            | GatehouseError::CapabilityMissing { .. }
            | GatehouseError::Network { .. }
            | GatehouseError::Serialization { .. }
            | GatehouseError::Synchronization { .. }
            | GatehouseError::Handler { .. }
            | GatehouseError::Internal { .. } => StatusClass::Internal,
        }
    }

    /// Operation name carried by authorization errors
    pub fn action(&self) -> Option<&str> {
        match self {
            GatehouseError::MissingCallerContext { action }
            | GatehouseError::InsufficientPermissions { action }
            | GatehouseError::EntityIdUnresolvable { action }
            | GatehouseError::CapabilityMissing { action } => Some(action),
            _ => None,
        }
    }

    /// Innermost error, looking through synchronization wrappers
    pub fn root_cause(&self) -> &GatehouseError {
        match self {
            GatehouseError::Synchronization { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether this error was raised before the protected handler ran
    pub fn is_authorization_failure(&self) -> bool {
        self.action().is_some()
    }
}

impl ErrorCode for GatehouseError {
    fn code(&self) -> &'static str {
        match self {
            GatehouseError::MissingCallerContext { .. } => "ERR_HAS_NO_ACCESS",
            GatehouseError::InsufficientPermissions { .. } => "ERR_HAS_NO_PERMISSIONS",
            GatehouseError::EntityIdUnresolvable { .. } => "ERR_UNABLE_TO_COMPUTE_ENTITY_ID",
            GatehouseError::CapabilityMissing { .. } => "ERR_ACCESS_CTRL_OWNER_HANDLER_MISSING",
            GatehouseError::Network { .. } => "ERR_POLICY_ENGINE_UNREACHABLE",
            GatehouseError::Serialization { .. } => "ERR_SERIALIZATION",
            GatehouseError::Synchronization { .. } => "ERR_POLICY_SYNC_FAILED",
            GatehouseError::Invalid { .. } => "ERR_INVALID",
            GatehouseError::NotFound { .. } => "ERR_NOT_FOUND",
            GatehouseError::Handler { .. } => "ERR_HANDLER",
            GatehouseError::Internal { .. } => "ERR_INTERNAL",
        }
    }
}

/// Standard Result type for Gatehouse operations
pub type GatehouseResult<T> = std::result::Result<T, GatehouseError>;

impl From<serde_json::Error> for GatehouseError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for GatehouseError {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid(format!("Invalid TOML: {err}"))
    }
}

impl From<std::io::Error> for GatehouseError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_errors_are_unauthorized() {
        let err = GatehouseError::missing_caller_context("widgets.update");
        assert_eq!(err.status(), StatusClass::Unauthorized);
        assert_eq!(err.code(), "ERR_HAS_NO_ACCESS");
        assert_eq!(err.action(), Some("widgets.update"));
        assert!(err.to_string().contains("widgets.update"));

        let err = GatehouseError::insufficient_permissions("widgets.update");
        assert_eq!(err.status().as_u16(), 401);
        assert_eq!(err.code(), "ERR_HAS_NO_PERMISSIONS");
    }

    #[test]
    fn test_configuration_defects_are_internal() {
        let err = GatehouseError::entity_id_unresolvable("widgets.get");
        assert_eq!(err.status().as_u16(), 500);
        assert_eq!(err.code(), "ERR_UNABLE_TO_COMPUTE_ENTITY_ID");

        let err = GatehouseError::capability_missing("widgets.get");
        assert_eq!(err.status(), StatusClass::Internal);
        assert!(err.is_authorization_failure());
    }

    #[test]
    fn test_sync_failure_is_distinguishable() {
        let err = GatehouseError::synchronization(
            "user:U1:widgets",
            GatehouseError::network("upsert rejected"),
        );
        assert!(!err.is_authorization_failure());
        assert_eq!(err.code(), "ERR_POLICY_SYNC_FAILED");
        assert_eq!(err.status(), StatusClass::Internal);
        assert_ne!(err, GatehouseError::network("upsert rejected"));
        assert!(err.to_string().contains("user:U1:widgets"));
    }

    #[test]
    fn test_sync_failure_keeps_its_cause() {
        let cause = GatehouseError::network("connection refused");
        let err = GatehouseError::synchronization("user:U1:widgets", cause.clone());

        assert_eq!(err.root_cause(), &cause);
        assert_eq!(err.root_cause().code(), "ERR_POLICY_ENGINE_UNREACHABLE");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), cause.to_string());

        let json = serde_json::to_string(&err).unwrap();
        let back: GatehouseError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = GatehouseError::from(io_err);
        assert!(matches!(err, GatehouseError::NotFound { .. }));

        let json_err = match serde_json::from_str::<serde_json::Value>("{") {
            Ok(value) => panic!("parsed truncated json: {value}"),
            Err(err) => err,
        };
        assert!(matches!(
            GatehouseError::from(json_err),
            GatehouseError::Serialization { .. }
        ));
    }
}
