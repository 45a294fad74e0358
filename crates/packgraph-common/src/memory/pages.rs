//! Paged bump allocation for write-once byte records.
//!
//! A [`PageArena`] is shared by every writer. Each writer takes its own
//! [`PageAllocator`], which bumps an offset through a page it exclusively
//! owns. When a request does not fit, the allocator retires the page
//! (shrinking it to the bytes actually used) and claims the next page id from
//! the arena's atomic counter, so no two writers ever touch the same page.
//! Requests larger than a page get a dedicated page of exactly that size.
//!
//! Dropping an allocator hands its pages back to the arena. Once every
//! allocator is gone, [`PageArena::finish`] indexes all pages by id into an
//! immutable [`PageTable`], which resolves a linear [`Address`] with a shift
//! and a mask.
//!
//! ```text
//!  address = page_id << page_shift | offset
//!
//!  writer 0: [page 0 ........][page 3 ....]
//!  writer 1: [page 1 ........][page 2 (oversized) ..............]
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;

use crate::utils::error::{Error, Result};

/// Linear address of a record: page id in the high bits, offset in the low bits.
pub type Address = u64;

/// Default page size exponent (256 KiB pages).
pub const DEFAULT_PAGE_SHIFT: u32 = 18;

/// Smallest accepted page size exponent.
pub const MIN_PAGE_SHIFT: u32 = 6;

/// Largest accepted page size exponent.
pub const MAX_PAGE_SHIFT: u32 = 30;

/// Shared page id source and collection point for retired pages.
pub struct PageArena {
    page_shift: u32,
    page_size: usize,
    next_page_id: CachePadded<AtomicUsize>,
    /// Pages handed back by dropped allocators, keyed by page id.
    returned: Mutex<Vec<(usize, Box<[u8]>)>>,
}

impl PageArena {
    /// Creates an arena with the default page size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shift(DEFAULT_PAGE_SHIFT)
    }

    /// Creates an arena with `page_size` byte pages.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `page_size` is not a power of two
    /// between `2^MIN_PAGE_SHIFT` and `2^MAX_PAGE_SHIFT`.
    pub fn with_page_size(page_size: usize) -> Result<Self> {
        if !page_size.is_power_of_two() {
            return Err(Error::configuration(format!(
                "page size {page_size} is not a power of two"
            )));
        }
        let shift = page_size.trailing_zeros();
        if !(MIN_PAGE_SHIFT..=MAX_PAGE_SHIFT).contains(&shift) {
            return Err(Error::configuration(format!(
                "page size {page_size} outside [{}, {}]",
                1usize << MIN_PAGE_SHIFT,
                1usize << MAX_PAGE_SHIFT
            )));
        }
        Ok(Self::with_shift(shift))
    }

    fn with_shift(page_shift: u32) -> Self {
        Self {
            page_shift,
            page_size: 1 << page_shift,
            next_page_id: CachePadded::new(AtomicUsize::new(0)),
            returned: Mutex::new(Vec::new()),
        }
    }

    /// Returns the standard page size in bytes.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Creates a new allocator owned by the calling writer.
    #[must_use]
    pub fn allocator(&self) -> PageAllocator<'_> {
        PageAllocator {
            arena: self,
            current: None,
            retired: Vec::new(),
            allocated_bytes: 0,
        }
    }

    fn claim_page_id(&self) -> usize {
        self.next_page_id.fetch_add(1, Ordering::AcqRel)
    }

    fn address(&self, page_id: usize, offset: usize) -> Address {
        ((page_id as u64) << self.page_shift) | offset as u64
    }

    fn hand_back(&self, pages: &mut Vec<(usize, Box<[u8]>)>) {
        if pages.is_empty() {
            return;
        }
        self.returned.lock().append(pages);
    }

    /// Freezes all pages into an immutable table.
    ///
    /// Taking `self` by value guarantees no allocator is still alive, since
    /// allocators borrow the arena.
    #[must_use]
    pub fn finish(self) -> PageTable {
        let page_count = self.next_page_id.into_inner().into_inner();
        let mut returned = self.returned.into_inner();
        returned.sort_unstable_by_key(|(id, _)| *id);

        let mut pages: Vec<Box<[u8]>> = Vec::with_capacity(page_count);
        for (id, page) in returned {
            while pages.len() < id {
                pages.push(Box::default());
            }
            pages.push(page);
        }
        while pages.len() < page_count {
            pages.push(Box::default());
        }

        tracing::debug!(
            pages = pages.len(),
            page_size = self.page_size,
            "page arena finished"
        );

        PageTable {
            page_shift: self.page_shift,
            page_mask: (1u64 << self.page_shift) - 1,
            pages,
        }
    }
}

impl Default for PageArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-writer bump allocator over pages claimed from a [`PageArena`].
///
/// Not `Sync`; each writer thread owns exactly one.
pub struct PageAllocator<'a> {
    arena: &'a PageArena,
    /// Page being filled; `len()` is the bump offset.
    current: Option<(usize, Vec<u8>)>,
    retired: Vec<(usize, Box<[u8]>)>,
    allocated_bytes: usize,
}

impl PageAllocator<'_> {
    /// Reserves `len` zeroed bytes and returns their address and contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if a fresh page cannot be reserved.
    pub fn allocate(&mut self, len: usize) -> Result<(Address, &mut [u8])> {
        let page_size = self.arena.page_size;
        if len > page_size {
            return self.allocate_oversized(len);
        }

        let fits = self
            .current
            .as_ref()
            .is_some_and(|(_, page)| page.len() + len <= page_size);
        if !fits {
            self.retire_current();
            let page = reserve(page_size)?;
            let id = self.arena.claim_page_id();
            tracing::trace!(page_id = id, "claimed page");
            self.current = Some((id, page));
        }

        let Some((id, page)) = self.current.as_mut() else {
            return Err(Error::Internal("allocator has no current page".into()));
        };
        let offset = page.len();
        page.resize(offset + len, 0);
        self.allocated_bytes += len;
        let address = self.arena.address(*id, offset);
        Ok((address, &mut page[offset..offset + len]))
    }

    fn allocate_oversized(&mut self, len: usize) -> Result<(Address, &mut [u8])> {
        let mut page = reserve(len)?;
        page.resize(len, 0);
        let id = self.arena.claim_page_id();
        tracing::trace!(page_id = id, bytes = len, "claimed oversized page");
        self.allocated_bytes += len;
        self.retired.push((id, page.into_boxed_slice()));
        let address = self.arena.address(id, 0);
        let Some((_, page)) = self.retired.last_mut() else {
            return Err(Error::Internal("oversized page vanished".into()));
        };
        Ok((address, &mut page[..]))
    }

    fn retire_current(&mut self) {
        if let Some((id, page)) = self.current.take() {
            // Shrinks the page to its realized size.
            self.retired.push((id, page.into_boxed_slice()));
        }
    }

    /// Returns the number of bytes handed out by this allocator.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    /// Returns the number of pages this allocator has claimed.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.retired.len() + usize::from(self.current.is_some())
    }

    /// Hands all pages back to the arena. Equivalent to dropping.
    pub fn close(self) {}
}

impl Drop for PageAllocator<'_> {
    fn drop(&mut self) {
        self.retire_current();
        self.arena.hand_back(&mut self.retired);
    }
}

fn reserve(bytes: usize) -> Result<Vec<u8>> {
    let mut page = Vec::new();
    page.try_reserve_exact(bytes)
        .map_err(|_| Error::OutOfMemory { requested: bytes })?;
    Ok(page)
}

/// Immutable page index produced by [`PageArena::finish`].
#[derive(Debug)]
pub struct PageTable {
    page_shift: u32,
    page_mask: u64,
    pages: Vec<Box<[u8]>>,
}

impl PageTable {
    /// Returns the bytes from `address` to the end of its page.
    ///
    /// Records never straddle pages, so the record starting at `address` is
    /// a prefix of the returned slice.
    #[inline]
    #[must_use]
    pub fn slice(&self, address: Address) -> &[u8] {
        let (page, offset) = self.split(address);
        &self.pages[page][offset..]
    }

    /// Splits an address into `(page index, offset within page)`.
    #[inline]
    #[must_use]
    pub fn split(&self, address: Address) -> (usize, usize) {
        (
            (address >> self.page_shift) as usize,
            (address & self.page_mask) as usize,
        )
    }

    /// Returns the number of pages.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns the standard page size in bytes.
    #[must_use]
    pub fn page_size(&self) -> usize {
        1 << self.page_shift
    }

    /// Returns the number of pages larger than the standard page size.
    #[must_use]
    pub fn oversized_page_count(&self) -> usize {
        let page_size = self.page_size();
        self.pages.iter().filter(|p| p.len() > page_size).count()
    }

    /// Returns the number of bytes held by all pages.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.pages.iter().map(|p| p.len()).sum()
    }

    /// Frees every page, returning the number of bytes released.
    ///
    /// Addresses resolved after a release panic on the bounds check.
    pub fn release(&mut self) -> usize {
        let bytes = self.bytes();
        self.pages = Vec::new();
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_bad_page_size() {
        assert!(matches!(
            PageArena::with_page_size(1000),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            PageArena::with_page_size(16),
            Err(Error::Configuration(_))
        ));
        assert!(PageArena::with_page_size(1024).is_ok());
    }

    #[test]
    fn test_bump_within_page() {
        let arena = PageArena::with_page_size(1024).unwrap();
        let mut alloc = arena.allocator();

        let (a, buf) = alloc.allocate(10).unwrap();
        buf.copy_from_slice(&[1; 10]);
        let (b, buf) = alloc.allocate(5).unwrap();
        buf.copy_from_slice(&[2; 5]);

        assert_eq!(a, 0);
        assert_eq!(b, 10);
        assert_eq!(alloc.page_count(), 1);
        assert_eq!(alloc.allocated_bytes(), 15);
        drop(alloc);

        let table = arena.finish();
        assert_eq!(table.page_count(), 1);
        assert_eq!(&table.slice(a)[..10], &[1; 10]);
        assert_eq!(&table.slice(b)[..5], &[2; 5]);
        // Retired pages are shrunk to their realized size.
        assert_eq!(table.bytes(), 15);
    }

    #[test]
    fn test_overflow_claims_new_page() {
        let arena = PageArena::with_page_size(64).unwrap();
        let mut alloc = arena.allocator();

        let (first, _) = alloc.allocate(40).unwrap();
        let (second, buf) = alloc.allocate(40).unwrap();
        buf[0] = 7;
        drop(alloc);

        let table = arena.finish();
        assert_eq!(table.split(first), (0, 0));
        assert_eq!(table.split(second), (1, 0));
        assert_eq!(table.slice(second)[0], 7);
        assert_eq!(table.page_count(), 2);
    }

    #[test]
    fn test_oversized_page() {
        let arena = PageArena::with_page_size(64).unwrap();
        let mut alloc = arena.allocator();

        let (small, _) = alloc.allocate(8).unwrap();
        let (big, buf) = alloc.allocate(200).unwrap();
        buf[199] = 9;
        // The current page keeps filling after an oversized request.
        let (after, _) = alloc.allocate(8).unwrap();
        drop(alloc);

        let table = arena.finish();
        assert_eq!(table.split(small), (0, 0));
        assert_eq!(table.split(big), (1, 0));
        assert_eq!(table.split(after), (0, 8));
        assert_eq!(table.slice(big).len(), 200);
        assert_eq!(table.slice(big)[199], 9);
        assert_eq!(table.oversized_page_count(), 1);
    }

    #[test]
    fn test_concurrent_allocators_never_share_pages() {
        let arena = PageArena::with_page_size(256).unwrap();
        let records: Vec<Vec<(Address, u8)>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4u8)
                .map(|worker| {
                    let arena = &arena;
                    s.spawn(move || {
                        let mut alloc = arena.allocator();
                        let mut written = Vec::new();
                        for i in 0..200usize {
                            let len = 1 + (i % 37);
                            let (address, buf) = alloc.allocate(len).unwrap();
                            buf.fill(worker);
                            written.push((address, worker));
                        }
                        written
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let table = arena.finish();
        for (address, worker) in records.into_iter().flatten() {
            assert_eq!(table.slice(address)[0], worker);
        }
    }

    #[test]
    fn test_release_frees_pages() {
        let arena = PageArena::with_page_size(64).unwrap();
        let mut alloc = arena.allocator();
        alloc.allocate(48).unwrap();
        alloc.allocate(48).unwrap();
        alloc.close();

        let mut table = arena.finish();
        assert_eq!(table.release(), 96);
        assert_eq!(table.page_count(), 0);
        assert_eq!(table.bytes(), 0);
    }

    proptest! {
        #[test]
        fn prop_every_record_resolves(lens in proptest::collection::vec(1usize..300, 1..100)) {
            let arena = PageArena::with_page_size(128).unwrap();
            let mut alloc = arena.allocator();
            let mut written = Vec::new();
            for (i, &len) in lens.iter().enumerate() {
                let (address, buf) = alloc.allocate(len).unwrap();
                buf.fill(i as u8);
                written.push((address, len, i as u8));
            }
            drop(alloc);

            let table = arena.finish();
            prop_assert_eq!(table.bytes(), lens.iter().sum::<usize>());
            for (address, len, byte) in written {
                let record = &table.slice(address)[..len];
                prop_assert!(record.iter().all(|&b| b == byte));
            }
        }
    }
}
