//! Generation job persistence

pub mod repository;

pub use repository::JobRepository;
