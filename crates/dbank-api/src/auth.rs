//! # Caller Identity Middleware
//!
//! Authentication itself is delegated to the external identity provider;
//! the gateway in front of this service verifies the caller and forwards
//! the resulting role and subject in trusted headers. The middleware
//! here turns those headers into a [`CallerIdentity`] request extension
//! and rejects requests that lack a usable identity.
//!
//! Handlers receive the identity as an extractor and gate themselves
//! with [`require_role`] / [`require_any_role`]. The caller context is
//! always an explicit parameter from here on — nothing reads identity
//! from ambient state.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use dbank_core::{Caller, Role};

use crate::error::AppError;

/// Header carrying the caller's role label, set by the gateway.
pub const ROLE_HEADER: &str = "x-auth-role";
/// Header carrying the caller's opaque subject token, set by the gateway.
pub const SUBJECT_HEADER: &str = "x-auth-subject";

/// The authenticated caller, injected into request extensions by
/// [`authenticate`] and extracted by handlers.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Caller);

impl CallerIdentity {
    pub fn new(role: Role, subject: impl Into<String>) -> Self {
        Self(Caller::new(role, subject))
    }
}

impl std::ops::Deref for CallerIdentity {
    type Target = Caller;

    fn deref(&self) -> &Caller {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity".to_string()))
    }
}

/// Middleware: build the caller identity from the forwarded headers.
///
/// Missing headers, a blank subject, or an unknown role label are all
/// rejected with 401 before any handler runs.
pub async fn authenticate(mut req: Request, next: Next) -> Result<Response, AppError> {
    let role_label = header_str(&req, ROLE_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {ROLE_HEADER} header")))?;
    let role = Role::from_label(role_label)
        .ok_or_else(|| AppError::Unauthorized(format!("unknown role '{role_label}'")))?;

    let subject = header_str(&req, SUBJECT_HEADER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {SUBJECT_HEADER} header")))?
        .to_string();

    req.extensions_mut()
        .insert(CallerIdentity::new(role, subject));
    Ok(next.run(req).await)
}

fn header_str<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Require exactly the given role.
pub fn require_role(caller: &CallerIdentity, role: Role) -> Result<(), AppError> {
    if caller.is(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "requires the {role} role"
        )))
    }
}

/// Require any of the given roles.
pub fn require_any_role(caller: &CallerIdentity, roles: &[Role]) -> Result<(), AppError> {
    if roles.iter().any(|r| caller.is(*r)) {
        Ok(())
    } else {
        let allowed: Vec<&str> = roles.iter().map(|r| r.as_label()).collect();
        Err(AppError::Forbidden(format!(
            "requires one of the roles: {}",
            allowed.join(", ")
        )))
    }
}
