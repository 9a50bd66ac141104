//! Auth-domain identifiers, client credentials, and cached token models.

pub mod credentials;
pub mod id;
pub mod token;

pub use credentials::*;
pub use id::*;
pub use token::{cached::*, secret::*};
