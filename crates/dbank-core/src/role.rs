//! # Caller Roles and Ownership Context
//!
//! The API recognises exactly four roles. Every authenticated caller
//! carries one role plus an opaque subject token minted by the external
//! identity provider. The subject is never interpreted here — it is only
//! compared for equality against an account's ownership secret.

use serde::{Deserialize, Serialize};

/// The closed set of caller roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Back-office operator: full field visibility, bypasses ownership.
    Admin,
    /// Account holder: restricted to records whose owning account secret
    /// matches the caller subject.
    Client,
    /// Cash terminal: endpoint-scoped read/create access, no ownership
    /// restriction on the endpoints it may reach.
    #[serde(rename = "ATM")]
    Atm,
    /// Payment acquirer: endpoint-scoped access to card identity checks
    /// and operation reads/deletes.
    Merchant,
}

impl Role {
    /// Parse a role from its wire label, case-insensitively.
    pub fn from_label(label: &str) -> Option<Role> {
        match label.trim() {
            l if l.eq_ignore_ascii_case("admin") => Some(Role::Admin),
            l if l.eq_ignore_ascii_case("client") => Some(Role::Client),
            l if l.eq_ignore_ascii_case("atm") => Some(Role::Atm),
            l if l.eq_ignore_ascii_case("merchant") => Some(Role::Merchant),
            _ => None,
        }
    }

    /// The canonical wire label for this role.
    pub fn as_label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Client => "Client",
            Role::Atm => "ATM",
            Role::Merchant => "Merchant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// The authenticated caller context, threaded explicitly into every
/// access-controlled lookup and mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub role: Role,
    /// Opaque identity token from the external provider. Compared by
    /// equality against `Account::secret`, never parsed.
    pub subject: String,
}

impl Caller {
    pub fn new(role: Role, subject: impl Into<String>) -> Self {
        Self {
            role,
            subject: subject.into(),
        }
    }

    /// Whether this caller has the given role.
    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }

    /// The ownership predicate: does this caller get to touch a record
    /// owned by `secret`? Only clients are restricted to their own
    /// records; every other role is scoped by endpoint, not by owner.
    pub fn owns(&self, secret: &str) -> bool {
        match self.role {
            Role::Client => self.subject == secret,
            _ => true,
        }
    }
}
