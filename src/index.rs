use crate::clock::Clock;
use crate::db::{self, DbHandle};
use crate::keys;
use crate::record::{
    decode_any, AnyRecord, FileRecord, TruncatedRecord, FLAG_DELETED, FLAG_INVALID,
};
use crate::schema::{self, ReadTable, WriteTable};
use crate::stats::{self, IndexStats};
use crate::types::DeviceId;
use crate::verify::{self, VerifyReport};
use crate::version_list::VersionList;
use anyhow::{anyhow, ensure, Context, Result};
use redb::ReadableTable;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;

// drop_folder commits at most this many deletions per write transaction.
const DROP_BATCH: usize = 512;

/// What the merge engine does with records the incoming listing no longer
/// contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeletionMode {
    /// Remove the record and its global entry outright.
    Remove,
    /// Rewrite the record as a deletion tombstone with an advanced version,
    /// announcing the delete instead of silently dropping it.
    Tombstone,
}

/// The persistent file-version index.
///
/// Tracks, per folder, which files each device claims to hold and at what
/// version, and maintains the derived per-file version list whose head is
/// the globally winning version. All replication decisions are queries
/// against this structure.
///
/// Writers for the same (folder, device) slice must be serialized by the
/// caller; concurrent calls for different slices are independent.
pub struct FileIndex {
    db: DbHandle,
    // Stamps every record write; change-feed consumers tail these.
    local_clock: Clock,
    // Advances a tombstone's version past the stored one.
    lamport_clock: Clock,
}

impl FileIndex {
    /// Open (or initialize) the index in the given directory.
    pub fn open(db_dir: &Path) -> Result<Self> {
        Ok(Self::new(db::open(db_dir)?))
    }

    /// Open by database name or path, resolved like [`db::resolve_db_dir`].
    pub fn open_named(db: &str) -> Result<Self> {
        let dir = db::resolve_db_dir(db)
            .with_context(|| format!("Failed to resolve database {db}"))?;
        Self::open(&dir)
    }

    pub fn new(db: DbHandle) -> Self {
        Self {
            db,
            local_clock: Clock::new(),
            lamport_clock: Clock::new(),
        }
    }

    pub fn db_dir(&self) -> &Path {
        &self.db.db_dir
    }

    /// Make the record table reflect exactly `files` for this (folder,
    /// device) slice. Records the device no longer lists are removed
    /// outright, together with their global entries.
    ///
    /// Returns the highest local version stamped by this call, 0 if none.
    pub fn replace(&self, folder: &str, device: &DeviceId, files: &[FileRecord]) -> Result<u64> {
        self.generic_replace(folder, device, files, DeletionMode::Remove)
    }

    /// Like [`FileIndex::replace`], but records the device no longer lists
    /// are kept as deletion tombstones with an advanced version, so the
    /// deletion propagates instead of the file resurrecting from peers.
    pub fn replace_with_delete(
        &self,
        folder: &str,
        device: &DeviceId,
        files: &[FileRecord],
    ) -> Result<u64> {
        self.generic_replace(folder, device, files, DeletionMode::Tombstone)
    }

    /// Apply a delta of records for (folder, device): insert the missing,
    /// rewrite the changed (differing in version or flags), skip the rest.
    /// No deletions are inferred from absence.
    ///
    /// Returns the highest local version stamped by this call, 0 if none.
    pub fn update(&self, folder: &str, device: &DeviceId, files: &[FileRecord]) -> Result<u64> {
        let folder_b = folder_bytes(folder)?;

        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;
        let wtx = self.db.db.begin_write().context("begin_write() failed")?;

        let mut max_local = 0u64;
        {
            let mut wtab = wtx.open_table(schema::INDEX)?;

            for f in files {
                let fk = keys::record_key(folder_b, device, f.name.as_bytes());
                let changed = match rtab.get(fk.as_slice())? {
                    None => true,
                    Some(v) => {
                        let ef = TruncatedRecord::decode(v.value()).with_context(|| {
                            format!("stored record {}/{} is corrupt", folder, f.name)
                        })?;
                        // Flags may change with the version staying put, e.g.
                        // when a file is marked invalid.
                        ef.version != f.version || ef.flags != f.flags
                    }
                };
                if !changed {
                    continue;
                }

                let lv = self.insert_record(&mut wtab, folder_b, device, f)?;
                max_local = max_local.max(lv);
                if f.is_invalid() {
                    remove_from_global(&rtab, &mut wtab, folder_b, device, f.name.as_bytes())?;
                } else {
                    update_global(
                        &rtab,
                        &mut wtab,
                        folder_b,
                        device,
                        f.name.as_bytes(),
                        f.version,
                    )?;
                }
            }
        }
        wtx.commit().context("commit() failed")?;

        Ok(max_local)
    }

    /// Point lookup of the record (folder, device, name).
    pub fn get(&self, folder: &str, device: &DeviceId, name: &str) -> Result<Option<FileRecord>> {
        let folder_b = folder_bytes(folder)?;
        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;

        let fk = keys::record_key(folder_b, device, name.as_bytes());
        match rtab.get(fk.as_slice())? {
            None => Ok(None),
            Some(v) => Ok(Some(FileRecord::decode(v.value()).with_context(|| {
                format!("stored record {folder}/{name} is corrupt")
            })?)),
        }
    }

    /// The winning version of (folder, name): the record behind the head of
    /// its version list.
    pub fn get_global(&self, folder: &str, name: &str) -> Result<Option<FileRecord>> {
        let folder_b = folder_bytes(folder)?;
        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;

        let gk = keys::global_key(folder_b, name.as_bytes());
        let vl = match rtab.get(gk.as_slice())? {
            None => return Ok(None),
            Some(v) => VersionList::decode(v.value())
                .with_context(|| format!("version list for {folder}/{name} is corrupt"))?,
        };
        let head = vl
            .head()
            .ok_or_else(|| anyhow!("empty version list stored for {folder}/{name}"))?;

        let fk = keys::record_key(folder_b, &head.device, name.as_bytes());
        let v = rtab.get(fk.as_slice())?.ok_or_else(|| {
            anyhow!(
                "version list head {} for {folder}/{name} has no record",
                head.device
            )
        })?;
        Ok(Some(FileRecord::decode(v.value()).with_context(|| {
            format!("stored record {folder}/{name} is corrupt")
        })?))
    }

    /// Every device whose claimed version equals the winning version of
    /// (folder, name): the co-winners a caller can fetch from. Empty when
    /// the file has no global entry.
    pub fn availability(&self, folder: &str, name: &str) -> Result<Vec<DeviceId>> {
        let folder_b = folder_bytes(folder)?;
        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;

        let gk = keys::global_key(folder_b, name.as_bytes());
        let vl = match rtab.get(gk.as_slice())? {
            None => return Ok(Vec::new()),
            Some(v) => VersionList::decode(v.value())
                .with_context(|| format!("version list for {folder}/{name} is corrupt"))?,
        };

        let mut devices = Vec::new();
        for fv in &vl.versions {
            if fv.version != vl.versions[0].version {
                break;
            }
            devices.push(fv.device);
        }
        Ok(devices)
    }

    /// Visit every record (folder, device) claims, in name order. The
    /// visitor returns false to stop early.
    pub fn with_have(
        &self,
        folder: &str,
        device: &DeviceId,
        truncate: bool,
        mut f: impl FnMut(AnyRecord) -> bool,
    ) -> Result<()> {
        let folder_b = folder_bytes(folder)?;
        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;

        let (start, limit) = keys::record_range(folder_b, device);
        for item in rtab.range::<&[u8]>(start.as_slice()..limit.as_slice())? {
            let (k, v) = item?;
            let rec = decode_any(v.value(), truncate).with_context(|| {
                format!(
                    "stored record {folder}/{} is corrupt",
                    String::from_utf8_lossy(keys::record_key_name(k.value()))
                )
            })?;
            if !f(rec) {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Visit the winning record of every file in the folder, in name order.
    pub fn with_global(
        &self,
        folder: &str,
        truncate: bool,
        mut f: impl FnMut(AnyRecord) -> bool,
    ) -> Result<()> {
        let folder_b = folder_bytes(folder)?;
        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;

        let (start, limit) = keys::global_range(folder_b);
        for item in rtab.range::<&[u8]>(start.as_slice()..limit.as_slice())? {
            let (k, v) = item?;
            let name = keys::global_key_name(k.value());
            let vl = VersionList::decode(v.value()).with_context(|| {
                format!(
                    "version list for {folder}/{} is corrupt",
                    String::from_utf8_lossy(name)
                )
            })?;
            let head = vl.head().ok_or_else(|| {
                anyhow!(
                    "empty version list stored for {folder}/{}",
                    String::from_utf8_lossy(name)
                )
            })?;

            let fk = keys::record_key(folder_b, &head.device, name);
            let bs = rtab.get(fk.as_slice())?.ok_or_else(|| {
                anyhow!(
                    "version list head {} for {folder}/{} has no record",
                    head.device,
                    String::from_utf8_lossy(name)
                )
            })?;
            let rec = decode_any(bs.value(), truncate)?;
            if !f(rec) {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Visit every record of the folder across all devices, truncated, with
    /// the claiming device pulled from the key.
    pub fn with_all_folder_truncated(
        &self,
        folder: &str,
        mut f: impl FnMut(DeviceId, TruncatedRecord) -> bool,
    ) -> Result<()> {
        let folder_b = folder_bytes(folder)?;
        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;

        let (start, limit) = keys::folder_record_range(folder_b);
        for item in rtab.range::<&[u8]>(start.as_slice()..limit.as_slice())? {
            let (k, v) = item?;
            let device = DeviceId::from_slice(keys::record_key_device(k.value()))
                .ok_or_else(|| anyhow!("malformed record key in folder {folder}"))?;
            let rec = TruncatedRecord::decode(v.value()).with_context(|| {
                format!(
                    "stored record {folder}/{} is corrupt",
                    String::from_utf8_lossy(keys::record_key_name(k.value()))
                )
            })?;
            if !f(device, rec) {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Visit, for every file `device` must fetch, a usable winning copy.
    ///
    /// A file is needed when the device holds an older version than the
    /// winner, or none at all. Of the co-winners, invalid records are
    /// skipped in favor of the next; a deleted winner of a file the device
    /// never held is not delivered at all.
    pub fn with_need(
        &self,
        folder: &str,
        device: &DeviceId,
        truncate: bool,
        mut f: impl FnMut(AnyRecord) -> bool,
    ) -> Result<()> {
        let folder_b = folder_bytes(folder)?;
        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;

        let (start, limit) = keys::global_range(folder_b);
        'files: for item in rtab.range::<&[u8]>(start.as_slice()..limit.as_slice())? {
            let (k, v) = item?;
            let name = keys::global_key_name(k.value());
            let vl = VersionList::decode(v.value()).with_context(|| {
                format!(
                    "version list for {folder}/{} is corrupt",
                    String::from_utf8_lossy(name)
                )
            })?;
            let need_version = vl
                .head()
                .ok_or_else(|| {
                    anyhow!(
                        "empty version list stored for {folder}/{}",
                        String::from_utf8_lossy(name)
                    )
                })?
                .version;

            // have: the device claims the file at any version.
            // need: it claims an older version than the winner.
            let (have, need) = match vl.get(device) {
                Some(fv) => (true, fv.version < need_version),
                None => (false, true),
            };
            if have && !need {
                continue;
            }

            for fv in &vl.versions {
                if fv.version != need_version {
                    // No usable copy among the co-winners.
                    continue 'files;
                }
                let fk = keys::record_key(folder_b, &fv.device, name);
                let bs = rtab.get(fk.as_slice())?.ok_or_else(|| {
                    anyhow!(
                        "version list entry {} for {folder}/{} has no record",
                        fv.device,
                        String::from_utf8_lossy(name)
                    )
                })?;
                let rec = decode_any(bs.value(), truncate)?;

                if rec.is_invalid() {
                    // Try the next co-winner.
                    continue;
                }
                if rec.is_deleted() && !have {
                    // No need to learn about deletions of files never held.
                    continue 'files;
                }

                tracing::debug!(
                    folder,
                    device = %device,
                    name = %rec.name(),
                    have,
                    global_version = need_version,
                    "need"
                );
                if !f(rec) {
                    return Ok(());
                }
                continue 'files;
            }
        }
        Ok(())
    }

    /// All folders with at least one global entry, ascending.
    pub fn list_folders(&self) -> Result<Vec<String>> {
        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;

        let start = [keys::KEY_TYPE_GLOBAL];
        let limit = [keys::KEY_TYPE_GLOBAL + 1];
        let mut folders = BTreeSet::new();
        for item in rtab.range::<&[u8]>(&start[..]..&limit[..])? {
            let (k, _) = item?;
            let key = k.value();
            ensure!(
                key.len() >= keys::GLOBAL_NAME_OFF,
                "malformed global key of {} bytes",
                key.len()
            );
            folders.insert(String::from_utf8_lossy(keys::global_key_folder(key)).into_owned());
        }
        Ok(folders.into_iter().collect())
    }

    /// Delete every record and global entry of the folder.
    ///
    /// Deletions are committed in bounded batches, so a concurrent reader
    /// can observe partial progress; there is no atomicity across the
    /// folder.
    pub fn drop_folder(&self, folder: &str) -> Result<()> {
        let folder_b = folder_bytes(folder)?;

        let doomed = {
            let rtx = self.db.db.begin_read().context("begin_read() failed")?;
            let rtab = rtx.open_table(schema::INDEX)?;

            let mut doomed: Vec<Vec<u8>> = Vec::new();
            for tag in [keys::KEY_TYPE_RECORD, keys::KEY_TYPE_GLOBAL] {
                let start = [tag];
                let limit = [tag + 1];
                for item in rtab.range::<&[u8]>(&start[..]..&limit[..])? {
                    let (k, _) = item?;
                    let key = k.value();
                    let min = if tag == keys::KEY_TYPE_RECORD {
                        keys::RECORD_NAME_OFF
                    } else {
                        keys::GLOBAL_NAME_OFF
                    };
                    ensure!(key.len() >= min, "malformed key of {} bytes", key.len());
                    let key_folder = if tag == keys::KEY_TYPE_RECORD {
                        keys::record_key_folder(key)
                    } else {
                        keys::global_key_folder(key)
                    };
                    if key_folder == folder_b {
                        doomed.push(key.to_vec());
                    }
                }
            }
            doomed
        };

        tracing::debug!(folder, keys = doomed.len(), "drop folder");

        for chunk in doomed.chunks(DROP_BATCH) {
            let wtx = self.db.db.begin_write().context("begin_write() failed")?;
            {
                let mut wtab = wtx.open_table(schema::INDEX)?;
                for key in chunk {
                    wtab.remove(key.as_slice())?;
                }
            }
            wtx.commit().context("commit() failed")?;
        }
        Ok(())
    }

    /// Whole-index counters. See [`crate::stats`].
    pub fn stats(&self) -> Result<IndexStats> {
        stats::compute(&self.db)
    }

    /// Offline invariant check over the stored tables. See [`crate::verify`].
    pub fn verify(&self) -> Result<VerifyReport> {
        verify::run(&self.db)
    }

    // Shared merge loop of replace and replace_with_delete: a sorted
    // merge-join of the incoming listing against the stored slice, reading
    // pre-state from a snapshot taken before the batch opened.
    fn generic_replace(
        &self,
        folder: &str,
        device: &DeviceId,
        files: &[FileRecord],
        mode: DeletionMode,
    ) -> Result<u64> {
        let folder_b = folder_bytes(folder)?;

        // Sort the listing by name, the order the stored slice scans in.
        let mut order: Vec<&FileRecord> = files.iter().collect();
        order.sort_by(|a, b| a.name.cmp(&b.name));

        let rtx = self.db.db.begin_read().context("begin_read() failed")?;
        let rtab = rtx.open_table(schema::INDEX)?;
        let wtx = self.db.db.begin_write().context("begin_write() failed")?;

        let mut max_local = 0u64;
        {
            let mut wtab = wtx.open_table(schema::INDEX)?;

            let (start, limit) = keys::record_range(folder_b, device);
            let mut scan = rtab.range::<&[u8]>(start.as_slice()..limit.as_slice())?;
            let mut stored = next_kv(&mut scan)?;
            let mut fsi = 0usize;

            loop {
                let cmp = match (&stored, fsi < order.len()) {
                    (None, false) => break,
                    (None, true) => Ordering::Less,
                    (Some(_), false) => Ordering::Greater,
                    (Some((k, _)), true) => order[fsi]
                        .name
                        .as_bytes()
                        .cmp(keys::record_key_name(k)),
                };

                match cmp {
                    Ordering::Less => {
                        // The store is missing this file. Insert it.
                        let f = order[fsi];
                        let lv = self.insert_record(&mut wtab, folder_b, device, f)?;
                        max_local = max_local.max(lv);
                        if f.is_invalid() {
                            remove_from_global(
                                &rtab,
                                &mut wtab,
                                folder_b,
                                device,
                                f.name.as_bytes(),
                            )?;
                        } else {
                            update_global(
                                &rtab,
                                &mut wtab,
                                folder_b,
                                device,
                                f.name.as_bytes(),
                                f.version,
                            )?;
                        }
                        fsi += 1;
                    }

                    Ordering::Equal => {
                        // Both sides have the file. Rewrite when version or
                        // flags differ; the invalid flag may flip with the
                        // version staying put.
                        let f = order[fsi];
                        let (_, v) = stored.as_ref().ok_or_else(|| anyhow!("scan underrun"))?;
                        let ef = TruncatedRecord::decode(v).with_context(|| {
                            format!("stored record {}/{} is corrupt", folder, f.name)
                        })?;
                        if ef.version != f.version || ef.flags != f.flags {
                            let lv = self.insert_record(&mut wtab, folder_b, device, f)?;
                            max_local = max_local.max(lv);
                            if f.is_invalid() {
                                remove_from_global(
                                    &rtab,
                                    &mut wtab,
                                    folder_b,
                                    device,
                                    f.name.as_bytes(),
                                )?;
                            } else {
                                update_global(
                                    &rtab,
                                    &mut wtab,
                                    folder_b,
                                    device,
                                    f.name.as_bytes(),
                                    f.version,
                                )?;
                            }
                        }
                        fsi += 1;
                        stored = next_kv(&mut scan)?;
                    }

                    Ordering::Greater => {
                        // The device no longer lists this stored file.
                        let (k, v) = stored.as_ref().ok_or_else(|| anyhow!("scan underrun"))?;
                        let lv = self.handle_dropped(&rtab, &mut wtab, folder_b, device, k, v, mode)?;
                        max_local = max_local.max(lv);
                        stored = next_kv(&mut scan)?;
                    }
                }
            }
        }
        wtx.commit().context("commit() failed")?;

        Ok(max_local)
    }

    // Deletion handling for one stored record the listing dropped. Returns
    // the local version stamped, 0 if none.
    fn handle_dropped(
        &self,
        rtab: &ReadTable,
        wtab: &mut WriteTable<'_>,
        folder: &[u8],
        device: &DeviceId,
        key: &[u8],
        value: &[u8],
        mode: DeletionMode,
    ) -> Result<u64> {
        let name = keys::record_key_name(key);
        match mode {
            DeletionMode::Remove => {
                tracing::debug!(
                    folder = %String::from_utf8_lossy(folder),
                    device = %device,
                    name = %String::from_utf8_lossy(name),
                    "remove record"
                );
                remove_from_global(rtab, wtab, folder, device, name)?;
                wtab.remove(key)?;
                Ok(0)
            }
            DeletionMode::Tombstone => {
                let tf = TruncatedRecord::decode(value).with_context(|| {
                    format!(
                        "stored record {}/{} is corrupt",
                        String::from_utf8_lossy(folder),
                        String::from_utf8_lossy(name)
                    )
                })?;
                if tf.is_deleted() {
                    return Ok(0);
                }

                tracing::debug!(
                    folder = %String::from_utf8_lossy(folder),
                    device = %device,
                    name = %tf.name,
                    "mark deleted"
                );
                let ts = self.local_clock.tick(tf.local_version);
                let f = FileRecord {
                    name: tf.name,
                    // The tombstone re-enters the global list, so a stale
                    // invalid marker must not ride along.
                    flags: (tf.flags & !FLAG_INVALID) | FLAG_DELETED,
                    modified: tf.modified,
                    version: self.lamport_clock.tick(tf.version),
                    local_version: ts,
                    blocks: Vec::new(),
                };
                wtab.insert(key, f.encode().as_slice())?;
                update_global(rtab, wtab, folder, device, name, f.version)?;
                Ok(ts)
            }
        }
    }

    // Write one record, stamping a fresh local version unless the caller
    // brought one. Returns the stamp.
    fn insert_record(
        &self,
        wtab: &mut WriteTable<'_>,
        folder: &[u8],
        device: &DeviceId,
        rec: &FileRecord,
    ) -> Result<u64> {
        tracing::debug!(
            folder = %String::from_utf8_lossy(folder),
            device = %device,
            name = %rec.name,
            version = rec.version,
            "insert record"
        );

        let mut rec = rec.clone();
        if rec.local_version == 0 {
            rec.local_version = self.local_clock.tick(0);
        }

        let fk = keys::record_key(folder, device, rec.name.as_bytes());
        wtab.insert(fk.as_slice(), rec.encode().as_slice())?;
        Ok(rec.local_version)
    }
}

// Add or move this device's entry in the version list of (folder, name),
// creating the list if absent. Reads pre-state from the snapshot; writes go
// to the batch. Returns whether anything changed.
fn update_global(
    rtab: &ReadTable,
    wtab: &mut WriteTable<'_>,
    folder: &[u8],
    device: &DeviceId,
    name: &[u8],
    version: u64,
) -> Result<bool> {
    tracing::debug!(
        folder = %String::from_utf8_lossy(folder),
        device = %device,
        name = %String::from_utf8_lossy(name),
        version,
        "update global"
    );

    let gk = keys::global_key(folder, name);
    let mut vl = match rtab.get(gk.as_slice())? {
        None => VersionList::default(),
        Some(v) => VersionList::decode(v.value()).with_context(|| {
            format!(
                "version list for {}/{} is corrupt",
                String::from_utf8_lossy(folder),
                String::from_utf8_lossy(name)
            )
        })?,
    };

    if !vl.update(*device, version) {
        return Ok(false);
    }

    wtab.insert(gk.as_slice(), vl.encode().as_slice())?;
    Ok(true)
}

// Drop this device from the version list of (folder, name); delete the list
// when it empties. A missing list is fine: the first write for a file may
// already be invalid.
fn remove_from_global(
    rtab: &ReadTable,
    wtab: &mut WriteTable<'_>,
    folder: &[u8],
    device: &DeviceId,
    name: &[u8],
) -> Result<()> {
    tracing::debug!(
        folder = %String::from_utf8_lossy(folder),
        device = %device,
        name = %String::from_utf8_lossy(name),
        "remove from global"
    );

    let gk = keys::global_key(folder, name);
    let mut vl = match rtab.get(gk.as_slice())? {
        None => return Ok(()),
        Some(v) => VersionList::decode(v.value()).with_context(|| {
            format!(
                "version list for {}/{} is corrupt",
                String::from_utf8_lossy(folder),
                String::from_utf8_lossy(name)
            )
        })?,
    };

    vl.remove(device);

    if vl.is_empty() {
        wtab.remove(gk.as_slice())?;
    } else {
        wtab.insert(gk.as_slice(), vl.encode().as_slice())?;
    }
    Ok(())
}

fn next_kv(
    scan: &mut redb::Range<'_, &'static [u8], &'static [u8]>,
) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
    match scan.next() {
        None => Ok(None),
        Some(item) => {
            let (k, v) = item.context("range scan failed")?;
            Ok(Some((k.value().to_vec(), v.value().to_vec())))
        }
    }
}

fn folder_bytes(folder: &str) -> Result<&[u8]> {
    let b = folder.as_bytes();
    ensure!(
        b.len() <= keys::FOLDER_LEN,
        "folder id {folder:?} is {} bytes, the key schema allows {}",
        b.len(),
        keys::FOLDER_LEN
    );
    Ok(b)
}
