//! Users and their bearer tokens

pub mod repository;

pub use repository::{AccessTokenRepository, UserRepository};
