//! Persistent file-version index for multi-device folder synchronization.
//!
//! For every shared folder the index tracks which files each participating
//! device claims to hold and at what version, plus the derived global
//! winner of each file across all devices. The replication layer decides
//! what to fetch, from whom, and what to delete by querying it.
//!
//! State lives in a single byte-ordered redb table inside a locked
//! database directory; see [`FileIndex`] for the operation surface.

pub mod clock;
pub mod codec;
pub mod db;
pub mod index;
pub mod keys;
pub mod record;
pub mod schema;
pub mod stats;
pub mod types;
pub mod verify;
pub mod version_list;

pub use db::DbHandle;
pub use index::FileIndex;
pub use record::{
    decode_any, AnyRecord, BlockInfo, FileRecord, TruncatedRecord, FLAG_DELETED, FLAG_INVALID,
    FLAG_PERM_MASK,
};
pub use stats::IndexStats;
pub use types::{DeviceId, DEVICE_ID_LEN};
pub use verify::VerifyReport;
pub use version_list::{FileVersion, VersionList};
