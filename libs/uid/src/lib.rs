//! # uid-core
//!
//! Segment schema, parsing, and validation for Surrogate unique identifiers.
//!
//! ## Identifier Format
//!
//! A Surrogate is six dash-separated segments in fixed order:
//!
//! ```text
//! {ptt}-{cid}-{sid}-{pts}-{tid}-{eid}
//! ```
//!
//! | Segment | Min | Max | Charset | Meaning          |
//! |---------|-----|-----|---------|------------------|
//! | ptt     | 1   | 1   | alnum   | participant type |
//! | cid     | 1   | 3   | digit   | country          |
//! | sid     | 1   | 2   | digit   | state            |
//! | pts     | 2   | 11  | alnum   | participant      |
//! | tid     | 3   | 3   | digit   | account type     |
//! | eid     | 5   | 11  | alnum   | external id      |
//!
//! The first four segments form the tenant (`A-36-0-P1`); the full identifier
//! appends account type and external id (`A-36-0-P1-101-EXT12345`).
//!
//! Example:
//!
//! ```
//! use uid_core::{slice, SurrogateKey};
//!
//! let key = SurrogateKey::compose("A-36-0-P1", "101", "EXT12345");
//! assert_eq!(key.to_string(), "A-36-0-P1-101-EXT12345");
//!
//! let segments = slice("A-36-0-P1-101-EXT12345").unwrap();
//! assert_eq!(segments.tenant(), "A-36-0-P1");
//! ```

mod error;
mod schema;
mod state;
mod surrogate;

pub use error::SchemaError;
pub use schema::*;
pub use state::State;
pub use surrogate::{slice, tenant, Segments, SurrogateKey};
