//! Core identity and scope types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique policy identifier
pub type PolicyId = String;

/// Unique role identifier
pub type RoleId = String;

/// Unique group identifier
pub type GroupId = String;

/// Kind of isolation boundary a scope represents
///
/// Serialized as an upper-case tag (`"TENANT"`). Tags outside the built-in
/// set are kept verbatim in [`ScopeType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScopeType {
    Platform,
    Tenant,
    Workspace,
    App,
    Custom(String),
}

impl ScopeType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Platform => "PLATFORM",
            Self::Tenant => "TENANT",
            Self::Workspace => "WORKSPACE",
            Self::App => "APP",
            Self::Custom(tag) => tag,
        }
    }
}

impl From<String> for ScopeType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "PLATFORM" => Self::Platform,
            "TENANT" => Self::Tenant,
            "WORKSPACE" => Self::Workspace,
            "APP" => Self::App,
            _ => Self::Custom(tag),
        }
    }
}

impl From<ScopeType> for String {
    fn from(scope_type: ScopeType) -> Self {
        scope_type.as_str().to_string()
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Isolation key under which policies and attachments are namespaced
///
/// Two scopes are equal iff both type and id are equal; a missing id only
/// equals a missing id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub scope_type: ScopeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Scope {
    /// Create a scope with an id
    pub fn new(scope_type: ScopeType, id: impl Into<String>) -> Self {
        Self {
            scope_type,
            id: Some(id.into()),
        }
    }

    /// The process-wide platform scope (no id)
    pub fn platform() -> Self {
        Self {
            scope_type: ScopeType::Platform,
            id: None,
        }
    }

    pub fn tenant(id: impl Into<String>) -> Self {
        Self::new(ScopeType::Tenant, id)
    }

    pub fn workspace(id: impl Into<String>) -> Self {
        Self::new(ScopeType::Workspace, id)
    }

    pub fn app(id: impl Into<String>) -> Self {
        Self::new(ScopeType::App, id)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.scope_type, id),
            None => write!(f, "{}", self.scope_type),
        }
    }
}

/// Kind of principal a policy can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrincipalType {
    User,
    Role,
    Group,
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("USER"),
            Self::Role => f.write_str("ROLE"),
            Self::Group => f.write_str("GROUP"),
        }
    }
}

/// Reference to an attachable principal (user, role or group)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalRef {
    #[serde(rename = "type")]
    pub principal_type: PrincipalType,

    pub id: String,
}

impl PrincipalRef {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            principal_type: PrincipalType::User,
            id: id.into(),
        }
    }

    pub fn role(id: impl Into<String>) -> Self {
        Self {
            principal_type: PrincipalType::Role,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            principal_type: PrincipalType::Group,
            id: id.into(),
        }
    }
}

impl fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.principal_type, self.id)
    }
}

/// Binds a policy to a principal within a scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub policy_id: PolicyId,
    pub scope: Scope,
    pub principal: PrincipalRef,
}

impl Attachment {
    pub fn new(policy_id: impl Into<PolicyId>, scope: Scope, principal: PrincipalRef) -> Self {
        Self {
            policy_id: policy_id.into(),
            scope,
            principal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_equality() {
        assert_eq!(Scope::tenant("t1"), Scope::tenant("t1"));
        assert_ne!(Scope::tenant("t1"), Scope::tenant("t2"));
        assert_ne!(Scope::tenant("t1"), Scope::workspace("t1"));
        assert_eq!(Scope::platform(), Scope::platform());

        let tenant_without_id = Scope {
            scope_type: ScopeType::Tenant,
            id: None,
        };
        assert_ne!(tenant_without_id, Scope::tenant("t1"));
    }

    #[test]
    fn test_scope_serialization() {
        let json = serde_json::to_value(Scope::tenant("acme")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "TENANT", "id": "acme"}));

        let platform = serde_json::to_value(Scope::platform()).unwrap();
        assert_eq!(platform, serde_json::json!({"type": "PLATFORM"}));
    }

    #[test]
    fn test_custom_scope_type_round_trips() {
        let scope: Scope = serde_json::from_value(serde_json::json!({"type": "REGION", "id": "eu"})).unwrap();
        assert_eq!(scope.scope_type, ScopeType::Custom("REGION".to_string()));
        assert_eq!(scope.to_string(), "REGION:eu");
    }

    #[test]
    fn test_principal_ref_display() {
        assert_eq!(PrincipalRef::role("admin").to_string(), "ROLE:admin");
        assert_eq!(PrincipalRef::user("alice").to_string(), "USER:alice");
    }
}
