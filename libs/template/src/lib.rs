//! Request template descriptors.
//!
//! A descriptor lists, per environment, the request templates a requester may
//! choose from. Each template names the applications and entitlements it
//! provisions and optionally a predecessor account that must already exist.
//!
//! # Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8" standalone="yes"?>
//! <configuration>
//!   <environment id="prod" label="Production">
//!     <template id="admin" label="Administrator">
//!       <predecessor id="AD">
//!         <attribute id="login" mapping="UD_AD_LOGIN">jdoe</attribute>
//!       </predecessor>
//!       <application id="DB">
//!         <attribute id="role">dba</attribute>
//!       </application>
//!       <entitlement id="DB_GROUP">
//!         <attribute id="group">admins</attribute>
//!       </entitlement>
//!     </template>
//!   </environment>
//! </configuration>
//! ```
//!
//! Parsing is a single pass over the element stream. Nesting is checked
//! against a fixed grammar; see [`Grammar`].

mod error;
mod model;
mod parser;
mod writer;

pub use error::TemplateError;
pub use model::{Application, Attribute, Configuration, Entitlement, Environment, Predecessor, Template};
pub use parser::{parse_file, parse_str, Grammar};
pub use writer::marshal;
