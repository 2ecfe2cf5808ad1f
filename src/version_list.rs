use crate::codec::{Reader, Writer};
use crate::types::{DeviceId, DEVICE_ID_LEN};
use anyhow::{Context, Result};

/// One device's claim on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileVersion {
    pub version: u64,
    pub device: DeviceId,
}

/// The per-file version list stored under a global key.
///
/// Invariants while persisted: never empty, each device appears at most
/// once, sorted by version descending. Among equal versions the most recent
/// writer sits first, so the head is the record `get_global` resolves.
///
/// Encoding: u32 entry count, then per entry version (u64, network byte
/// order) and the raw 32-byte device ID.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionList {
    pub versions: Vec<FileVersion>,
}

impl VersionList {
    pub fn head(&self) -> Option<&FileVersion> {
        self.versions.first()
    }

    pub fn get(&self, device: &DeviceId) -> Option<&FileVersion> {
        self.versions.iter().find(|fv| fv.device == *device)
    }

    /// Insert or move `device` to the slot its `version` orders it into.
    ///
    /// Returns false when the device is already listed at exactly this
    /// version; the list is untouched in that case. Otherwise any previous
    /// entry for the device is dropped and the new entry lands at the first
    /// position whose stored version is `<=` the new one, which keeps the
    /// list descending and makes the latest writer the head among equals.
    pub fn update(&mut self, device: DeviceId, version: u64) -> bool {
        if let Some(i) = self.versions.iter().position(|fv| fv.device == device) {
            if self.versions[i].version == version {
                return false;
            }
            self.versions.remove(i);
        }

        let at = self
            .versions
            .iter()
            .position(|fv| fv.version <= version)
            .unwrap_or(self.versions.len());
        self.versions.insert(at, FileVersion { version, device });
        true
    }

    /// Drop the entry for `device`, if any. Returns whether one was removed.
    pub fn remove(&mut self, device: &DeviceId) -> bool {
        if let Some(i) = self.versions.iter().position(|fv| fv.device == *device) {
            self.versions.remove(i);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(4 + self.versions.len() * (8 + DEVICE_ID_LEN));
        w.put_u32(self.versions.len() as u32);
        for fv in &self.versions {
            w.put_u64(fv.version);
            w.put_raw(fv.device.as_bytes());
        }
        w.into_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let n = r.u32().context("decode version list: count")? as usize;
        let mut versions = Vec::with_capacity(n.min(1024));
        for i in 0..n {
            let version = r
                .u64()
                .with_context(|| format!("decode version list: entry {i} version"))?;
            let device = r
                .raw(DEVICE_ID_LEN)
                .with_context(|| format!("decode version list: entry {i} device"))?;
            let mut id = [0u8; DEVICE_ID_LEN];
            id.copy_from_slice(device);
            versions.push(FileVersion {
                version,
                device: DeviceId::from_bytes(id),
            });
        }
        Ok(Self { versions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(fill: u8) -> DeviceId {
        DeviceId::from_bytes([fill; DEVICE_ID_LEN])
    }

    #[test]
    fn descending_order_is_maintained() {
        let mut vl = VersionList::default();
        assert!(vl.update(dev(1), 5));
        assert!(vl.update(dev(2), 9));
        assert!(vl.update(dev(3), 7));

        let versions: Vec<u64> = vl.versions.iter().map(|fv| fv.version).collect();
        assert_eq!(versions, vec![9, 7, 5]);
        assert_eq!(vl.head().unwrap().device, dev(2));
    }

    #[test]
    fn latest_writer_heads_equal_versions() {
        let mut vl = VersionList::default();
        vl.update(dev(1), 10);
        vl.update(dev(2), 10);
        // Newest write for version 10 lands first.
        assert_eq!(vl.versions[0].device, dev(2));
        assert_eq!(vl.versions[1].device, dev(1));

        vl.update(dev(3), 10);
        assert_eq!(vl.versions[0].device, dev(3));
    }

    #[test]
    fn same_device_same_version_is_a_noop() {
        let mut vl = VersionList::default();
        assert!(vl.update(dev(1), 10));
        let before = vl.encode();
        assert!(!vl.update(dev(1), 10));
        assert_eq!(vl.encode(), before);
    }

    #[test]
    fn device_appears_at_most_once() {
        let mut vl = VersionList::default();
        vl.update(dev(1), 3);
        vl.update(dev(2), 4);
        vl.update(dev(1), 8);
        assert_eq!(vl.versions.len(), 2);
        assert_eq!(vl.head().unwrap().device, dev(1));
        assert_eq!(vl.head().unwrap().version, 8);
    }

    #[test]
    fn remove_to_empty() {
        let mut vl = VersionList::default();
        vl.update(dev(1), 1);
        assert!(!vl.remove(&dev(2)));
        assert!(vl.remove(&dev(1)));
        assert!(vl.is_empty());
        assert!(!vl.remove(&dev(1)));
    }

    #[test]
    fn codec_roundtrip() {
        let mut vl = VersionList::default();
        vl.update(dev(1), u64::MAX);
        vl.update(dev(9), 0);
        let got = VersionList::decode(&vl.encode()).unwrap();
        assert_eq!(got, vl);

        assert!(VersionList::decode(&vl.encode()[..7]).is_err());
    }
}
