use redb::TableDefinition;

// The whole index lives in one byte-ordered table; the first key byte is a
// type tag that keeps the record and global families in disjoint ranges.
// See keys.rs for the key layout.
pub const INDEX: TableDefinition<&[u8], &[u8]> = TableDefinition::new("index");

/// Snapshot-side table handle.
pub type ReadTable = redb::ReadOnlyTable<&'static [u8], &'static [u8]>;

/// Batch-side table handle.
pub type WriteTable<'txn> = redb::Table<'txn, &'static [u8], &'static [u8]>;
