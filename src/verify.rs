//! Offline consistency check of the stored tables.
//!
//! Walks both key families and cross-references them, collecting every
//! violation as a human-readable problem string instead of failing on the
//! first. Meant for debugging and recovery tooling that inspects a database
//! after the fact; a clean report means the structural invariants hold.

use crate::db::DbHandle;
use crate::keys;
use crate::record::TruncatedRecord;
use crate::schema;
use crate::types::DeviceId;
use crate::version_list::VersionList;
use anyhow::{Context, Result};
use redb::ReadableTable;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct VerifyReport {
    pub records: u64,
    pub global_entries: u64,
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn run(db: &DbHandle) -> Result<VerifyReport> {
    let tx = db.db.begin_read().context("begin_read() failed")?;
    let tab = tx.open_table(schema::INDEX)?;

    let mut report = VerifyReport::default();

    // Pass 1: every global entry decodes, is non-empty, device-unique and
    // sorted descending, and each listed (device, version) is backed by a
    // record that is not invalid.
    let start = [keys::KEY_TYPE_GLOBAL];
    let limit = [keys::KEY_TYPE_GLOBAL + 1];
    for item in tab.range::<&[u8]>(&start[..]..&limit[..])? {
        let (k, v) = item?;
        let key = k.value();
        if key.len() < keys::GLOBAL_NAME_OFF {
            report
                .problems
                .push(format!("malformed global key of {} bytes", key.len()));
            continue;
        }
        report.global_entries += 1;

        let folder = keys::global_key_folder(key).to_vec();
        let name = keys::global_key_name(key).to_vec();
        let at = format!(
            "{}/{}",
            String::from_utf8_lossy(&folder),
            String::from_utf8_lossy(&name)
        );

        let vl = match VersionList::decode(v.value()) {
            Ok(vl) => vl,
            Err(e) => {
                report.problems.push(format!("{at}: undecodable version list: {e:#}"));
                continue;
            }
        };

        if vl.is_empty() {
            report.problems.push(format!("{at}: empty version list"));
            continue;
        }

        let mut seen: HashSet<DeviceId> = HashSet::new();
        let mut prev = u64::MAX;
        for fv in &vl.versions {
            if !seen.insert(fv.device) {
                report
                    .problems
                    .push(format!("{at}: device {} listed twice", fv.device));
            }
            if fv.version > prev {
                report.problems.push(format!(
                    "{at}: version list not sorted descending at version {}",
                    fv.version
                ));
            }
            prev = fv.version;

            let fk = keys::record_key(&folder, &fv.device, &name);
            match tab.get(fk.as_slice())? {
                None => report.problems.push(format!(
                    "{at}: listed device {} has no record",
                    fv.device
                )),
                Some(bs) => match TruncatedRecord::decode(bs.value()) {
                    Err(e) => report
                        .problems
                        .push(format!("{at}: undecodable record for {}: {e:#}", fv.device)),
                    Ok(rec) => {
                        if rec.is_invalid() {
                            report.problems.push(format!(
                                "{at}: invalid record of {} referenced from version list",
                                fv.device
                            ));
                        }
                        if rec.version != fv.version {
                            report.problems.push(format!(
                                "{at}: device {} listed at version {} but record has {}",
                                fv.device, fv.version, rec.version
                            ));
                        }
                    }
                },
            }
        }
    }

    // Pass 2: every record decodes, and every non-invalid record is listed
    // in its file's version list.
    let start = [keys::KEY_TYPE_RECORD];
    let limit = [keys::KEY_TYPE_RECORD + 1];
    for item in tab.range::<&[u8]>(&start[..]..&limit[..])? {
        let (k, v) = item?;
        let key = k.value();
        if key.len() < keys::RECORD_NAME_OFF {
            report
                .problems
                .push(format!("malformed record key of {} bytes", key.len()));
            continue;
        }
        report.records += 1;

        let folder = keys::record_key_folder(key);
        let name = keys::record_key_name(key);
        let Some(device) = DeviceId::from_slice(keys::record_key_device(key)) else {
            report
                .problems
                .push(format!("malformed record key of {} bytes", key.len()));
            continue;
        };
        let at = format!(
            "{}/{} ({})",
            String::from_utf8_lossy(folder),
            String::from_utf8_lossy(name),
            device
        );

        let rec = match TruncatedRecord::decode(v.value()) {
            Ok(rec) => rec,
            Err(e) => {
                report.problems.push(format!("{at}: undecodable record: {e:#}"));
                continue;
            }
        };
        if rec.is_invalid() {
            // Invalid records are stored but never listed globally.
            continue;
        }

        let gk = keys::global_key(folder, name);
        let listed = match tab.get(gk.as_slice())? {
            None => None,
            Some(bs) => VersionList::decode(bs.value())
                .ok()
                .and_then(|vl| vl.get(&device).map(|fv| fv.version)),
        };
        match listed {
            None => report
                .problems
                .push(format!("{at}: record missing from version list")),
            Some(version) if version != rec.version => report.problems.push(format!(
                "{at}: record at version {} but listed at {}",
                rec.version, version
            )),
            Some(_) => {}
        }
    }

    Ok(report)
}
