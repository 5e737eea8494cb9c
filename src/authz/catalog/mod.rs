//! Reference catalogs for permissions and roles

mod permissions;
mod roles;
#[cfg(test)]
mod tests;

pub use permissions::PermissionCatalog;
pub use roles::RoleCatalog;
