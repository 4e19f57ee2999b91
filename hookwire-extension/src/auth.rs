//! Identity values produced upstream and the admin check built on them.

use crate::context::RequestContext;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A role granted to the requesting actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
}

impl Role {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }

    /// Whether this role is `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name
    }
}

/// Authorization of the requesting actor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Authorization {
    pub tenant_id: String,
    pub tenant_name: String,
    #[serde(skip_serializing)]
    pub auth_token: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Authorization {
    pub fn new(tenant_id: &str, tenant_name: &str) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            tenant_name: tenant_name.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn tenant_name(&self) -> &str {
        &self.tenant_name
    }
}

/// Auth capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct Auth;

impl Auth {
    /// True when the context's role is `admin` and its tenant is `admin`.
    pub fn is_admin_context(&self, ctx: &RequestContext) -> bool {
        let Some(role) = ctx.role() else {
            warn!("is_admin_context: missing role in context");
            return false;
        };
        let Some(auth) = ctx.auth() else {
            warn!("is_admin_context: missing auth in context");
            return false;
        };
        role.matches("admin") && auth.tenant_name() == "admin"
    }
}
