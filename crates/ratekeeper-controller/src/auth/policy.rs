//! Role-based authorization policy
//!
//! Two interchangeable policies answer `check(role, caller)`:
//! - [`RoleRegistry`]: membership kept by the controller itself
//! - [`ExternalAclAdapter`]: membership read from an external registry, with
//!   several external role names allowed to map onto one [`RoleKind`]
//!
//! Holding the `Updater` role on the zero address opens updating to everyone.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ratekeeper_common::{Address, AuthorizationError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Roles understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleKind {
    /// Rate and PID configs, capacity, manual pushes
    RateAdmin,
    /// Pausing and unpausing updates
    UpdatePauseAdmin,
    /// Granting and revoking `Updater`
    UpdaterManager,
    /// Calling `update`
    Updater,
}

impl RoleKind {
    pub const ALL: [RoleKind; 4] = [
        RoleKind::RateAdmin,
        RoleKind::UpdatePauseAdmin,
        RoleKind::UpdaterManager,
        RoleKind::Updater,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::RateAdmin => "RATE_ADMIN",
            RoleKind::UpdatePauseAdmin => "UPDATE_PAUSE_ADMIN",
            RoleKind::UpdaterManager => "UPDATER_MANAGER",
            RoleKind::Updater => "UPDATER",
        }
    }

    /// Role allowed to grant and revoke this one, `None` for owner-only roles
    pub fn manager(&self) -> Option<RoleKind> {
        match self {
            RoleKind::Updater => Some(RoleKind::UpdaterManager),
            _ => None,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External access control registry
pub trait ExternalAccessControl: Send + Sync {
    fn has_role(&self, role: &str, account: Address) -> bool;
}

/// Self-managed role membership.
///
/// The owner implicitly holds every role.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    owner: Address,
    members: HashMap<RoleKind, HashSet<Address>>,
}

impl RoleRegistry {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            members: HashMap::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn has_role(&self, role: RoleKind, account: Address) -> bool {
        if account == self.owner {
            return true;
        }

        match self.members.get(&role) {
            Some(members) => {
                members.contains(&account)
                    || (role == RoleKind::Updater && members.contains(&Address::ZERO))
            }
            None => false,
        }
    }

    /// Add `account` to `role`; returns false if it was already a member
    pub fn grant(&mut self, role: RoleKind, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Remove `account` from `role`; returns false if it was not a member
    pub fn revoke(&mut self, role: RoleKind, account: Address) -> bool {
        self.members
            .get_mut(&role)
            .map(|members| members.remove(&account))
            .unwrap_or(false)
    }

    pub fn members(&self, role: RoleKind) -> Vec<Address> {
        let mut members: Vec<Address> = self
            .members
            .get(&role)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }
}

/// Maps [`RoleKind`]s onto role names of an external registry
#[derive(Clone)]
pub struct ExternalAclAdapter {
    registry: Arc<dyn ExternalAccessControl>,
    role_map: HashMap<RoleKind, Vec<String>>,
}

impl ExternalAclAdapter {
    /// Adapter with no mappings; every check fails until roles are mapped
    pub fn new(registry: Arc<dyn ExternalAccessControl>) -> Self {
        Self {
            registry,
            role_map: HashMap::new(),
        }
    }

    /// Accept holders of the external role `external` as `kind`
    pub fn map_role(mut self, kind: RoleKind, external: &str) -> Self {
        self.role_map
            .entry(kind)
            .or_default()
            .push(external.to_string());
        self
    }

    pub fn external_roles(&self, kind: RoleKind) -> &[String] {
        self.role_map
            .get(&kind)
            .map(|names| names.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_role(&self, kind: RoleKind, account: Address) -> bool {
        self.external_roles(kind).iter().any(|name| {
            self.registry.has_role(name, account)
                || (kind == RoleKind::Updater && self.registry.has_role(name, Address::ZERO))
        })
    }
}

impl fmt::Debug for ExternalAclAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalAclAdapter")
            .field("role_map", &self.role_map)
            .finish()
    }
}

/// Authorization policy consulted by every controller entry point
#[derive(Debug, Clone)]
pub enum AuthorizationPolicy {
    SelfManaged(RoleRegistry),
    DelegatedToExternalAcl(ExternalAclAdapter),
}

impl AuthorizationPolicy {
    /// Self-managed policy owned by `owner`
    pub fn self_managed(owner: Address) -> Self {
        AuthorizationPolicy::SelfManaged(RoleRegistry::new(owner))
    }

    pub fn delegated(adapter: ExternalAclAdapter) -> Self {
        AuthorizationPolicy::DelegatedToExternalAcl(adapter)
    }

    pub fn check(&self, role: RoleKind, caller: Address) -> bool {
        match self {
            AuthorizationPolicy::SelfManaged(registry) => registry.has_role(role, caller),
            AuthorizationPolicy::DelegatedToExternalAcl(adapter) => adapter.has_role(role, caller),
        }
    }

    pub fn require(&self, role: RoleKind, caller: Address) -> Result<(), AuthorizationError> {
        if self.check(role, caller) {
            return Ok(());
        }

        debug!(%caller, %role, "Authorization denied");
        Err(AuthorizationError::MissingRole {
            caller,
            role: role.to_string(),
        })
    }

    /// Grant or revoke `role` for `account` on behalf of `manager`.
    ///
    /// Returns whether membership changed.
    pub fn set_role(
        &mut self,
        manager: Address,
        role: RoleKind,
        account: Address,
        granted: bool,
    ) -> Result<bool, AuthorizationError> {
        let registry = match self {
            AuthorizationPolicy::SelfManaged(registry) => registry,
            AuthorizationPolicy::DelegatedToExternalAcl(_) => {
                return Err(AuthorizationError::ManagedExternally)
            }
        };

        let allowed = manager == registry.owner()
            || role
                .manager()
                .map(|m| registry.has_role(m, manager))
                .unwrap_or(false);
        if !allowed {
            let required = role
                .manager()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "OWNER".to_string());
            return Err(AuthorizationError::MissingRole {
                caller: manager,
                role: required,
            });
        }

        let changed = if granted {
            registry.grant(role, account)
        } else {
            registry.revoke(role, account)
        };

        if changed {
            info!(%manager, %role, %account, granted, "Role membership changed");
        }
        Ok(changed)
    }
}
