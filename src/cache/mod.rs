//! Local persistence for issue metadata.
//!
//! This module provides:
//! - `CacheState`: the issue snapshots and issue type icons kept between runs
//! - `CacheStore`: load/save of that state as a single JSON document
//! - `Loaded`: typed read outcome, so a missing or corrupt file is an explicit
//!   empty result rather than a swallowed error

mod storage;
mod traits;

pub use storage::{read_json, write_json, CacheState, CacheStore, IssueTypeIcon};
pub use traits::{Cacheable, EmptyReason, Loaded};
