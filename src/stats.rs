use crate::db::DbHandle;
use crate::keys;
use crate::record::FileRecord;
use crate::schema;
use crate::version_list::VersionList;
use anyhow::{Context, Result};
use redb::ReadableTable;
use std::collections::BTreeSet;

/// Whole-index counters, computed from one snapshot.
#[derive(Debug, Default, Clone)]
pub struct IndexStats {
    pub folders: u64,

    // Per-device record counts
    pub records: u64,
    pub deleted_records: u64,
    pub invalid_records: u64,

    // Files with a global entry
    pub global_files: u64,

    // Content bytes claimed by live records (not deleted, not invalid)
    pub live_bytes: u64,
}

pub fn compute(db: &DbHandle) -> Result<IndexStats> {
    let tx = db.db.begin_read().context("begin_read() failed")?;
    let tab = tx.open_table(schema::INDEX)?;

    let mut out = IndexStats::default();
    let mut folders: BTreeSet<Vec<u8>> = BTreeSet::new();

    let start = [keys::KEY_TYPE_RECORD];
    let limit = [keys::KEY_TYPE_RECORD + 1];
    for item in tab.range::<&[u8]>(&start[..]..&limit[..])? {
        let (k, v) = item?;
        let f = FileRecord::decode(v.value()).with_context(|| {
            format!(
                "decode record {}",
                String::from_utf8_lossy(keys::record_key_name(k.value()))
            )
        })?;

        out.records += 1;
        if f.is_deleted() {
            out.deleted_records += 1;
        }
        if f.is_invalid() {
            out.invalid_records += 1;
        }
        if !f.is_deleted() && !f.is_invalid() {
            out.live_bytes = out.live_bytes.saturating_add(f.size());
        }
    }

    let start = [keys::KEY_TYPE_GLOBAL];
    let limit = [keys::KEY_TYPE_GLOBAL + 1];
    for item in tab.range::<&[u8]>(&start[..]..&limit[..])? {
        let (k, v) = item?;
        // Decode to catch corruption early; the contents don't matter here.
        VersionList::decode(v.value()).with_context(|| {
            format!(
                "decode version list {}",
                String::from_utf8_lossy(keys::global_key_name(k.value()))
            )
        })?;
        out.global_files += 1;
        folders.insert(keys::global_key_folder(k.value()).to_vec());
    }

    out.folders = folders.len() as u64;
    Ok(out)
}
