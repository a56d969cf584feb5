//! `bodega-auth`: pure authorization boundary.
//!
//! This crate is intentionally decoupled from sessions, HTTP and storage: the
//! caller resolves who is acting and which roles they hold; this crate answers
//! whether that is enough for an operation.

pub mod authorize;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, AuthzError};
pub use permissions::Permission;
pub use policy::RolePolicy;
pub use principal::Principal;
pub use roles::Role;
