//! Authorization
//!
//! Every mutating entry point is gated by a [`RoleKind`]. Membership is
//! resolved by an [`AuthorizationPolicy`], either self-managed or delegated
//! to an external access control registry.

pub mod policy;

pub use policy::{
    AuthorizationPolicy, ExternalAccessControl, ExternalAclAdapter, RoleKind, RoleRegistry,
};
