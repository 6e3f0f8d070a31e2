//! Request and response models of the public endpoints.

pub mod auth;
pub mod certs;
pub mod token;

pub use auth::*;
pub use certs::*;
pub use token::*;
