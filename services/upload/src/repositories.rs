//! Repositories for document store operations

pub mod media;

pub use media::MediaRepository;
