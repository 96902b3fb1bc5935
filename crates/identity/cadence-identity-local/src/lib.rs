//! Local user accounts backing external identities.
//!
//! [`InMemoryUserStore`] is a reference `UserStore` that enforces subject
//! uniqueness; [`UserProvisioner`] turns a verified identity into exactly one
//! local user.

mod provisioner;
mod store;

pub use provisioner::UserProvisioner;
pub use store::InMemoryUserStore;
