//! Algorithmic Primitives (spec §4.2): the data structures shared by `cc`
//! and `hcs`. All allocate through the normal Rust allocator; callers that
//! need shared-memory-style admission control wrap these with an `sa::Region`
//! the way `hcs::ingest` does.

pub mod min_heap;
pub mod sorted_vec;
pub mod stable_map;
pub mod string_pool;

pub use min_heap::MinHeap;
pub use sorted_vec::SortedVec;
pub use stable_map::StableMap;
pub use string_pool::StringPool;
