//! Domain operations behind the HTTP handlers.
//!
//! Services borrow the store for the length of one request and return
//! [`ServiceError`]; the API layer owns the mapping to HTTP responses.

mod error;
mod permission;
mod reference;
mod surrogate;

pub use error::ServiceError;
pub use permission::Permissions;
pub use reference::ReferenceService;
pub use surrogate::{Draft, SurrogateService};
