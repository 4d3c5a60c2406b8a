//! Authenticated session and its on-disk persistence.

mod store;

pub use store::{Session, SessionStore};
