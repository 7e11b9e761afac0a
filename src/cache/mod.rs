//! Response cache used by the forward proxy.
//!
//! # Data Flow
//! ```text
//! proxy engine
//!     → store.rs lookup(method, url)   (lazy expiry under the lock)
//!     → [upstream round trip]
//!     → store.rs insert(...)           (only for 200 responses)
//! ```
//!
//! # Design Decisions
//! - One coarse lock over the whole map
//! - Eviction picks the oldest insertion time; reads never touch recency
//! - Entries are shared as `Arc<CacheEntry>` and replaced wholesale

pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CacheEntry, CacheKey, CacheStore};
