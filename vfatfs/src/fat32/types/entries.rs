// SPDX-License-Identifier: MIT

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    fat32::{attr::Fat32Attributes, constant::*},
    utils::checksum_utils::lfn_checksum,
};

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
struct RawDirEntry {
    name: [u8; 11],
    attr: u8,
    nt_reserved: u8,
    creation_time_tenth: u8,
    creation_time: U16,
    creation_date: U16,
    access_date: U16,
    first_cluster_high: U16,
    write_time: U16,
    write_date: U16,
    first_cluster_low: U16,
    file_size: U32,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
struct RawLfnEntry {
    order: u8,
    name1: [U16; 5],
    attr: u8,
    entry_type: u8,
    checksum: u8,
    name2: [U16; 6],
    first_cluster_low: U16,
    name3: [U16; 2],
}

const _: () = assert!(size_of::<RawDirEntry>() == DIR_ENTRY_SIZE);
const _: () = assert!(size_of::<RawLfnEntry>() == DIR_ENTRY_SIZE);

/// Space-padded 8.3 name as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortName(pub [u8; 11]);

impl ShortName {
    pub const DOT: ShortName = ShortName(*FAT_DOT_NAME);
    pub const DOTDOT: ShortName = ShortName(*FAT_DOTDOT_NAME);

    /// Builds a short name from an already-uppercased base and extension.
    /// Parts longer than 8 / 3 bytes are truncated.
    pub fn from_parts(base: &[u8], ext: &[u8]) -> Self {
        let mut raw = [b' '; 11];
        for (dst, src) in raw[..8].iter_mut().zip(base) {
            *dst = *src;
        }
        for (dst, src) in raw[8..].iter_mut().zip(ext) {
            *dst = *src;
        }
        Self(raw)
    }

    pub fn bytes(&self) -> &[u8; 11] {
        &self.0
    }

    pub fn checksum(&self) -> u8 {
        lfn_checksum(&self.0)
    }

    /// "BASE.EXT" form with padding removed, or "BASE" without an extension.
    pub fn display(&self) -> String {
        let base = trim_padding(&self.0[..8]);
        let ext = trim_padding(&self.0[8..]);
        if ext.is_empty() {
            base
        } else {
            format!("{base}.{ext}")
        }
    }
}

fn trim_padding(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Packed FAT date, 2-second time and 10 ms refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatTimestamp {
    pub date: u16,
    pub time: u16,
    pub tenths: u8,
}

impl FatTimestamp {
    /// 1980-01-01 00:00:00, the FAT epoch.
    pub const EPOCH: FatTimestamp = FatTimestamp {
        date: (1 << 5) | 1,
        time: 0,
        tenths: 0,
    };

    /// 2107-12-31 23:59:58, the last representable instant.
    pub const MAX: FatTimestamp = FatTimestamp {
        date: (127 << 9) | (12 << 5) | 31,
        time: (23 << 11) | (59 << 5) | 29,
        tenths: 199,
    };
}

/// 32-byte short directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortEntry {
    pub name: ShortName,
    pub attr: Fat32Attributes,
    pub first_cluster: u32,
    pub size: u32,
    pub modified: FatTimestamp,
}

impl ShortEntry {
    pub fn file(name: ShortName, attr: Fat32Attributes, size: u32, modified: FatTimestamp) -> Self {
        Self {
            name,
            attr,
            first_cluster: 0,
            size,
            modified,
        }
    }

    pub fn dir(name: ShortName, attr: Fat32Attributes, modified: FatTimestamp) -> Self {
        Self {
            name,
            attr,
            first_cluster: 0,
            size: 0,
            modified,
        }
    }

    pub fn dot(cluster: u32, modified: FatTimestamp) -> Self {
        Self {
            name: ShortName::DOT,
            attr: Fat32Attributes::DIRECTORY,
            first_cluster: cluster,
            size: 0,
            modified,
        }
    }

    /// `parent_cluster` is 0 when the parent is the root directory.
    pub fn dotdot(parent_cluster: u32, modified: FatTimestamp) -> Self {
        Self {
            name: ShortName::DOTDOT,
            attr: Fat32Attributes::DIRECTORY,
            first_cluster: parent_cluster,
            size: 0,
            modified,
        }
    }

    pub fn volume_label(label: [u8; 11], modified: FatTimestamp) -> Self {
        Self {
            name: ShortName(label),
            attr: Fat32Attributes::VOLUME_ID,
            first_cluster: 0,
            size: 0,
            modified,
        }
    }

    pub fn encode(&self) -> [u8; DIR_ENTRY_SIZE] {
        let ts = self.modified;
        let raw = RawDirEntry {
            name: self.name.0,
            attr: self.attr.bits(),
            nt_reserved: 0,
            creation_time_tenth: ts.tenths,
            creation_time: U16::new(ts.time),
            creation_date: U16::new(ts.date),
            access_date: U16::new(ts.date),
            first_cluster_high: U16::new((self.first_cluster >> 16) as u16),
            write_time: U16::new(ts.time),
            write_date: U16::new(ts.date),
            first_cluster_low: U16::new(self.first_cluster as u16),
            file_size: U32::new(self.size),
        };
        let mut out = [0u8; DIR_ENTRY_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }
}

/// One long-file-name slot carrying 13 UTF-16 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfnEntry {
    pub order: u8,
    pub last: bool,
    pub units: [u16; LFN_CHARS_PER_ENTRY],
    pub checksum: u8,
}

impl LfnEntry {
    pub fn sequence_byte(&self) -> u8 {
        if self.last {
            self.order | LFN_LAST_ENTRY_FLAG
        } else {
            self.order
        }
    }

    pub fn encode(&self) -> [u8; DIR_ENTRY_SIZE] {
        let u = self.units.map(U16::new);
        let raw = RawLfnEntry {
            order: self.sequence_byte(),
            name1: [u[0], u[1], u[2], u[3], u[4]],
            attr: Fat32Attributes::LFN.bits(),
            entry_type: 0,
            checksum: self.checksum,
            name2: [u[5], u[6], u[7], u[8], u[9], u[10]],
            first_cluster_low: U16::new(0),
            name3: [u[11], u[12]],
        };
        let mut out = [0u8; DIR_ENTRY_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }
}

/// A directory record: its long-name slots in on-disk order followed by
/// the short entry they describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    pub lfn: Vec<LfnEntry>,
    pub entry: ShortEntry,
}

impl DirRecord {
    pub fn short(entry: ShortEntry) -> Self {
        Self {
            lfn: Vec::new(),
            entry,
        }
    }

    /// Number of 32-byte slots this record occupies.
    pub fn slots(&self) -> usize {
        self.lfn.len() + 1
    }

    #[inline]
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        for lfn in &self.lfn {
            buf.extend_from_slice(&lfn.encode());
        }
        buf.extend_from_slice(&self.entry.encode());
    }
}
