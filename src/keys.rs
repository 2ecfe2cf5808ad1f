//! Composite binary keys for the two record families.
//!
//! Record table (tag 0x00):
//!     [tag][folder: 64 bytes, zero padded][device: 32 bytes][name: rest]
//!         -> encoded file record
//!
//! Global table (tag 0x01):
//!     [tag][folder: 64 bytes, zero padded][name: rest]
//!         -> encoded version list
//!
//! The tag byte keeps the two families in disjoint lexicographic ranges of
//! the single backing table. The name has no length prefix; the key's end
//! delimits it. Range scans bound the name with four 0xFF bytes, which is
//! enough because scanned names never start with 0xFF bytes.

use crate::types::{DeviceId, DEVICE_ID_LEN};

pub const KEY_TYPE_RECORD: u8 = 0x00;
pub const KEY_TYPE_GLOBAL: u8 = 0x01;

/// Width of the zero-padded folder field.
pub const FOLDER_LEN: usize = 64;

/// Upper bound for the variable-length name field in range scans.
pub const NAME_LIMIT: [u8; 4] = [0xFF; 4];

/// Byte offset of the name field in a record key; also the minimum length
/// of a well-formed record key.
pub const RECORD_NAME_OFF: usize = 1 + FOLDER_LEN + DEVICE_ID_LEN;

/// Byte offset of the name field in a global key; also the minimum length
/// of a well-formed global key.
pub const GLOBAL_NAME_OFF: usize = 1 + FOLDER_LEN;

pub fn record_key(folder: &[u8], device: &DeviceId, name: &[u8]) -> Vec<u8> {
    debug_assert!(folder.len() <= FOLDER_LEN);
    let mut k = vec![0u8; RECORD_NAME_OFF + name.len()];
    k[0] = KEY_TYPE_RECORD;
    k[1..1 + folder.len()].copy_from_slice(folder);
    k[1 + FOLDER_LEN..RECORD_NAME_OFF].copy_from_slice(device.as_bytes());
    k[RECORD_NAME_OFF..].copy_from_slice(name);
    k
}

pub fn global_key(folder: &[u8], name: &[u8]) -> Vec<u8> {
    debug_assert!(folder.len() <= FOLDER_LEN);
    let mut k = vec![0u8; GLOBAL_NAME_OFF + name.len()];
    k[0] = KEY_TYPE_GLOBAL;
    k[1..1 + folder.len()].copy_from_slice(folder);
    k[GLOBAL_NAME_OFF..].copy_from_slice(name);
    k
}

pub fn record_key_name(key: &[u8]) -> &[u8] {
    &key[RECORD_NAME_OFF..]
}

pub fn record_key_folder(key: &[u8]) -> &[u8] {
    strip_folder(&key[1..1 + FOLDER_LEN])
}

pub fn record_key_device(key: &[u8]) -> &[u8] {
    &key[1 + FOLDER_LEN..RECORD_NAME_OFF]
}

pub fn global_key_name(key: &[u8]) -> &[u8] {
    &key[GLOBAL_NAME_OFF..]
}

pub fn global_key_folder(key: &[u8]) -> &[u8] {
    strip_folder(&key[1..1 + FOLDER_LEN])
}

// The first zero byte terminates the folder.
fn strip_folder(padded: &[u8]) -> &[u8] {
    match padded.iter().position(|&b| b == 0) {
        Some(i) => &padded[..i],
        None => padded,
    }
}

/// Half-open key range covering every record of one (folder, device) pair,
/// ordered by name.
pub fn record_range(folder: &[u8], device: &DeviceId) -> (Vec<u8>, Vec<u8>) {
    (
        record_key(folder, device, &[]),
        record_key(folder, device, &NAME_LIMIT),
    )
}

/// Half-open key range covering every record of a folder, across all
/// devices.
pub fn folder_record_range(folder: &[u8]) -> (Vec<u8>, Vec<u8>) {
    (
        record_key(folder, &DeviceId::MIN, &[]),
        record_key(folder, &DeviceId::MAX, &NAME_LIMIT),
    )
}

/// Half-open key range covering every global entry of a folder, ordered by
/// name.
pub fn global_range(folder: &[u8]) -> (Vec<u8>, Vec<u8>) {
    (global_key(folder, &[]), global_key(folder, &NAME_LIMIT))
}
