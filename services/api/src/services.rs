//! Business operations behind the HTTP handlers
//!
//! Services validate input, call the stores and write audit records. They
//! know nothing about HTTP; handlers only unpack requests and wrap results.

pub mod catalog;
pub mod rbac;
pub mod users;

pub use catalog::CatalogService;
pub use rbac::RbacService;
pub use users::UserService;
