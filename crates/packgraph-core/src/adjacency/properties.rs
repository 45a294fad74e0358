//! Position-aligned edge properties.
//!
//! A node's properties are one column-major block of little-endian `f64`
//! bit patterns: column `c` of a node with degree `d` starts `8 * c * d`
//! bytes into the block. Value `i` of every column belongs to the `i`-th
//! target decoded by the node's adjacency cursor.

use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use packgraph_common::memory::{Address, PageTable};
use packgraph_common::types::NodeId;

const VALUE_BYTES: usize = 8;

/// Sequential reader over one property column of one node.
#[derive(Debug, Clone)]
pub struct PropertyCursor<'a> {
    pages: &'a PageTable,
    values: &'a [u8],
    remaining: usize,
}

impl<'a> PropertyCursor<'a> {
    /// Creates an unbound, exhausted cursor over `pages`.
    #[must_use]
    pub fn new(pages: &'a PageTable) -> Self {
        Self {
            pages,
            values: &[],
            remaining: 0,
        }
    }

    /// Binds the cursor to `degree` values starting at `address`.
    pub fn init(&mut self, address: Address, degree: usize) {
        self.values = if degree == 0 {
            &[]
        } else {
            &self.pages.slice(address)[..degree * VALUE_BYTES]
        };
        self.remaining = degree;
    }

    /// Returns `true` while values remain.
    #[inline]
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.remaining > 0
    }

    /// Returns the number of values not yet read.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Returns the raw bit pattern of the next value.
    #[inline]
    pub fn next_long(&mut self) -> u64 {
        debug_assert!(self.has_next(), "next_long on exhausted property cursor");
        let (head, rest) = self.values.split_at(VALUE_BYTES);
        self.values = rest;
        self.remaining -= 1;
        LittleEndian::read_u64(head)
    }

    /// Returns the next value.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        f64::from_bits(self.next_long())
    }
}

impl Iterator for PropertyCursor<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.has_next().then(|| self.next_f64())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for PropertyCursor<'_> {}

/// Writes `columns` into `out` in the column-major block layout.
pub(crate) fn write_block<C: AsRef<[f64]>>(columns: &[C], out: &mut [u8]) {
    let mut pos = 0;
    for column in columns {
        for &value in column.as_ref() {
            LittleEndian::write_u64(&mut out[pos..pos + VALUE_BYTES], value.to_bits());
            pos += VALUE_BYTES;
        }
    }
}

/// Returns the block size for `columns` columns of `degree` values.
#[inline]
pub(crate) fn block_len(columns: usize, degree: usize) -> usize {
    columns * degree * VALUE_BYTES
}

/// Frozen property blocks of every node.
#[derive(Debug)]
pub struct ImmutableProperties {
    pages: PageTable,
    offsets: Box<[u64]>,
    degrees: Arc<[u32]>,
    column_count: usize,
}

impl ImmutableProperties {
    pub(crate) fn new(
        pages: PageTable,
        offsets: Box<[u64]>,
        degrees: Arc<[u32]>,
        column_count: usize,
    ) -> Self {
        Self {
            pages,
            offsets,
            degrees,
            column_count,
        }
    }

    /// Returns the number of property columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Returns a view of one column.
    ///
    /// # Panics
    ///
    /// Panics if `column` is out of range.
    #[must_use]
    pub fn column(&self, column: usize) -> ImmutablePropertyList<'_> {
        assert!(
            column < self.column_count,
            "column {column} out of range for {} columns",
            self.column_count
        );
        ImmutablePropertyList {
            properties: self,
            column,
        }
    }

    /// Returns a cursor over `column` of `node`.
    #[must_use]
    pub fn property_cursor(&self, column: usize, node: NodeId) -> PropertyCursor<'_> {
        let mut cursor = PropertyCursor::new(&self.pages);
        self.property_cursor_reuse(&mut cursor, column, node);
        cursor
    }

    /// Rebinds `cursor` to `column` of `node`.
    pub fn property_cursor_reuse<'a>(
        &'a self,
        cursor: &mut PropertyCursor<'a>,
        column: usize,
        node: NodeId,
    ) {
        debug_assert!(column < self.column_count, "column {column} out of range");
        let degree = self.degrees.get(node.index()).copied().unwrap_or(0) as usize;
        if degree == 0 {
            cursor.init(0, 0);
            return;
        }
        let address = self.offsets[node.index()] + block_len(column, degree) as u64;
        cursor.init(address, degree);
    }

    /// Returns the page table.
    #[must_use]
    pub fn pages(&self) -> &PageTable {
        &self.pages
    }

    /// Returns the bytes held by the offset array.
    #[must_use]
    pub fn array_bytes(&self) -> usize {
        self.offsets.len() * size_of::<u64>()
    }

    /// Frees every page, returning the number of bytes released.
    pub fn release(&mut self) -> usize {
        self.degrees = Arc::from(Vec::new());
        self.offsets = Box::default();
        self.pages.release()
    }
}

/// One property column of an [`ImmutableProperties`].
#[derive(Debug, Clone, Copy)]
pub struct ImmutablePropertyList<'a> {
    properties: &'a ImmutableProperties,
    column: usize,
}

impl<'a> ImmutablePropertyList<'a> {
    /// Returns a cursor over this column for `node`.
    #[must_use]
    pub fn property_cursor(&self, node: NodeId) -> PropertyCursor<'a> {
        self.properties.property_cursor(self.column, node)
    }

    /// Returns the column index.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packgraph_common::memory::PageArena;

    #[test]
    fn test_block_layout_is_column_major() {
        let columns = [vec![1.0, 2.0], vec![-0.5, 8.25]];
        let mut out = vec![0u8; block_len(2, 2)];
        write_block(&columns, &mut out);
        assert_eq!(LittleEndian::read_u64(&out[8..16]), 2.0f64.to_bits());
        assert_eq!(LittleEndian::read_u64(&out[16..24]), (-0.5f64).to_bits());
    }

    #[test]
    fn test_cursor_reads_column() {
        let arena = PageArena::with_page_size(256).unwrap();
        let columns = [vec![1.5, 2.5, 3.5], vec![10.0, 20.0, 30.0]];
        let address = {
            let mut allocator = arena.allocator();
            allocator.allocate(5).unwrap();
            let (address, out) = allocator.allocate(block_len(2, 3)).unwrap();
            write_block(&columns, out);
            address
        };
        let pages = arena.finish();
        let degrees: Arc<[u32]> = Arc::from(vec![3u32]);
        let properties = ImmutableProperties::new(pages, vec![address].into(), degrees, 2);

        let weights: Vec<f64> = properties.column(0).property_cursor(NodeId::new(0)).collect();
        assert_eq!(weights, vec![1.5, 2.5, 3.5]);

        let mut cursor = properties.column(1).property_cursor(NodeId::new(0));
        assert_eq!(cursor.remaining(), 3);
        assert_eq!(cursor.next_long(), 10.0f64.to_bits());
        assert_eq!(cursor.next_f64(), 20.0);
        assert_eq!(cursor.next_f64(), 30.0);
        assert!(!cursor.has_next());
    }

    #[test]
    fn test_release_empties_cursors() {
        let arena = PageArena::with_page_size(64).unwrap();
        {
            let mut allocator = arena.allocator();
            let (_, out) = allocator.allocate(8).unwrap();
            write_block(&[[4.0]], out);
        }
        let mut properties =
            ImmutableProperties::new(arena.finish(), vec![0].into(), Arc::from(vec![1u32]), 1);
        assert_eq!(properties.release(), 8);
        assert!(!properties.property_cursor(0, NodeId::new(0)).has_next());
    }
}
