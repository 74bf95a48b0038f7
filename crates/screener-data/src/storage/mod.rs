//! 로컬 저장소.

pub mod raw_cache;

pub use raw_cache::FileRawCache;
