//! Memory management for compressed adjacency records.
//!
//! - [`pages`] - Paged bump allocation with per-writer allocators and a
//!   frozen page table

pub mod pages;

pub use pages::{Address, DEFAULT_PAGE_SHIFT, PageAllocator, PageArena, PageTable};
