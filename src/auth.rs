use tonic::{metadata::MetadataMap, Request, Status};
use tracing::debug;

use crate::errors::ServiceError;

/// Metadata key carrying the caller's role, set by the API gateway.
pub const ROLE_METADATA_KEY: &str = "role";

const ADMIN_ROLE: &str = "admin";

/// Role of the caller as asserted by the upstream gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Role {
    Admin,
    User(String),
    #[default]
    Anonymous,
}

impl Role {
    /// Interprets a raw role value. Matching is exact: `Admin` is not an admin.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" => Role::Anonymous,
            ADMIN_ROLE => Role::Admin,
            other => Role::User(other.to_string()),
        }
    }
}

/// Identity attached to every inbound request by [`identity_interceptor`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallerIdentity {
    pub role: Role,
}

impl CallerIdentity {
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    pub fn admin() -> Self {
        Self::new(Role::Admin)
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `Unauthorized` unless the caller is an admin.
    ///
    /// `action` is the verb used in the message, e.g. "add".
    pub fn require_admin(&self, action: &str) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized(format!(
                "unauthorized: only admin can {action} products"
            )))
        }
    }
}

/// Builds the caller identity from request metadata.
///
/// Never rejects: a missing or unreadable role simply yields an anonymous
/// caller and the handlers decide what that caller may do.
pub fn identity_interceptor(mut req: Request<()>) -> Result<Request<()>, Status> {
    let role = role_from_metadata(req.metadata());

    debug!(role = ?role, "Resolved caller identity");
    req.extensions_mut().insert(CallerIdentity::new(role));

    Ok(req)
}

fn role_from_metadata(metadata: &MetadataMap) -> Role {
    metadata
        .get(ROLE_METADATA_KEY)
        .and_then(|v| v.to_str().ok())
        .map(Role::parse)
        .unwrap_or_default()
}

/// Identity stored by the interceptor.
///
/// Requests that did not pass through the interceptor are resolved from
/// their metadata directly.
pub fn caller_identity<T>(req: &Request<T>) -> CallerIdentity {
    req.extensions()
        .get::<CallerIdentity>()
        .cloned()
        .unwrap_or_else(|| CallerIdentity::new(role_from_metadata(req.metadata())))
}
