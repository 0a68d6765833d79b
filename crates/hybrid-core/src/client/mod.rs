pub mod cache;

pub use cache::ClientKeyCache;
