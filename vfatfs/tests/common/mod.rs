// SPDX-License-Identifier: MIT

//! Read-back harness: parses a served volume through `Read + Seek` only,
//! without touching any of the builder's types.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use vfatfs::prelude::*;

pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_LFN: u8 = 0x0F;

/// Writes `files` (relative path, content) under `root`, creating parents.
/// A path ending in `/` creates an empty directory.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if rel.ends_with('/') {
            fs::create_dir_all(&path).unwrap();
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }
}

/// Checksum over an 11-byte short name, written out long-hand.
pub fn sfn_checksum(name: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    for &b in name {
        sum = (if sum & 1 != 0 { 0x80u8 } else { 0 })
            .wrapping_add(sum >> 1)
            .wrapping_add(b);
    }
    sum
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub short: [u8; 11],
    pub attr: u8,
    pub cluster: u32,
    pub size: u32,
    pub had_lfn: bool,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }
}

pub struct Image {
    reader: VolumeReader,
    pub partition_start: u64,
    pub bytes_per_sector: u64,
    pub sectors_per_cluster: u64,
    pub fat_offset: u64,
    pub data_offset: u64,
    pub root_cluster: u32,
    pub total_sectors: u32,
    pub volume_label: [u8; 11],
}

fn le16(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}

fn le32(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

impl Image {
    pub fn open(volume: Arc<Volume>) -> Self {
        let mut reader = VolumeReader::new(volume);
        let mut mbr = [0u8; 512];
        reader.read_exact(&mut mbr).unwrap();
        assert_eq!(&mbr[510..], &[0x55, 0xAA], "MBR signature");
        assert_eq!(mbr[446 + 4], 0x0C, "partition type");
        let partition_lba = le32(&mbr, 446 + 8) as u64;

        let mut vbr = [0u8; 512];
        reader.seek(SeekFrom::Start(partition_lba * 512)).unwrap();
        reader.read_exact(&mut vbr).unwrap();
        assert_eq!(&vbr[510..], &[0x55, 0xAA], "boot sector signature");
        assert_eq!(&vbr[0x52..0x5A], b"FAT32   ");

        let bps = le16(&vbr, 0x0B) as u64;
        let spc = vbr[0x0D] as u64;
        let reserved = le16(&vbr, 0x0E) as u64;
        let fats = vbr[0x10] as u64;
        let fat_size = le32(&vbr, 0x24) as u64;
        let hidden = le32(&vbr, 0x1C) as u64;
        assert_eq!(hidden, partition_lba);

        let partition_start = partition_lba * bps;
        let fat_offset = partition_start + reserved * bps;
        let data_offset = fat_offset + fats * fat_size * bps;
        let mut volume_label = [0u8; 11];
        volume_label.copy_from_slice(&vbr[0x47..0x52]);

        Self {
            reader,
            partition_start,
            bytes_per_sector: bps,
            sectors_per_cluster: spc,
            fat_offset,
            data_offset,
            root_cluster: le32(&vbr, 0x2C),
            total_sectors: le32(&vbr, 0x20),
            volume_label,
        }
    }

    pub fn cluster_size(&self) -> u64 {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    pub fn read_at(&mut self, offset: u64, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.reader.seek(SeekFrom::Start(offset)).unwrap();
        self.reader.read_exact(&mut buf).unwrap();
        buf
    }

    pub fn fat_entry(&mut self, cluster: u32) -> u32 {
        let raw = self.read_at(self.fat_offset + cluster as u64 * 4, 4);
        le32(&raw, 0) & 0x0FFF_FFFF
    }

    pub fn chain(&mut self, first: u32) -> Vec<u32> {
        let mut out = vec![first];
        let mut cur = first;
        loop {
            let next = self.fat_entry(cur);
            if next >= 0x0FFF_FFF8 {
                return out;
            }
            assert!(next >= 2, "chain of {first} runs into free/reserved entry {next}");
            assert!(!out.contains(&next), "loop in chain of {first}");
            out.push(next);
            cur = next;
        }
    }

    pub fn cluster_addr(&self, cluster: u32) -> u64 {
        self.data_offset + (cluster as u64 - 2) * self.cluster_size()
    }

    pub fn read_chain(&mut self, first: u32) -> Vec<u8> {
        let size = self.cluster_size() as usize;
        let mut out = Vec::new();
        for c in self.chain(first) {
            let addr = self.cluster_addr(c);
            out.extend(self.read_at(addr, size));
        }
        out
    }

    /// Lists a directory, reassembling long names and checking every LFN
    /// checksum and sequence number against its short entry.
    pub fn list_dir(&mut self, cluster: u32) -> Vec<Entry> {
        let raw = self.read_chain(cluster);
        let mut out = Vec::new();
        let mut pending: Vec<[u8; 32]> = Vec::new();

        for slot in raw.chunks_exact(32) {
            if slot[0] == 0x00 {
                break;
            }
            if slot[11] == ATTR_LFN {
                pending.push(slot.try_into().unwrap());
                continue;
            }

            let mut short = [0u8; 11];
            short.copy_from_slice(&slot[..11]);
            let had_lfn = !pending.is_empty();
            let name = if had_lfn {
                let sum = sfn_checksum(&short);
                let count = pending.len();
                let mut units = Vec::new();
                for (i, lfn) in pending.iter().enumerate() {
                    let expected_order = (count - i) as u8;
                    let flag = if i == 0 { 0x40 } else { 0 };
                    assert_eq!(lfn[0], expected_order | flag, "LFN sequence");
                    assert_eq!(lfn[13], sum, "LFN checksum");
                }
                for lfn in pending.iter().rev() {
                    for range in [1..11, 14..26, 28..32] {
                        for pair in lfn[range].chunks_exact(2) {
                            units.push(u16::from_le_bytes([pair[0], pair[1]]));
                        }
                    }
                }
                let end = units
                    .iter()
                    .position(|&u| u == 0x0000 || u == 0xFFFF)
                    .unwrap_or(units.len());
                String::from_utf16(&units[..end]).unwrap()
            } else {
                decode_short(&short)
            };
            pending.clear();

            out.push(Entry {
                name,
                short,
                attr: slot[11],
                cluster: (le16(slot, 20) as u32) << 16 | le16(slot, 26) as u32,
                size: le32(slot, 28),
                had_lfn,
            });
        }
        out
    }

    pub fn read_file(&mut self, entry: &Entry) -> Vec<u8> {
        let mut data = self.read_chain(entry.cluster);
        data.truncate(entry.size as usize);
        data
    }

    /// Every file and directory reachable from the root, keyed by
    /// `/`-joined path. Directory entries map to `None`.
    pub fn walk(&mut self) -> BTreeMap<String, Option<Vec<u8>>> {
        let mut out = BTreeMap::new();
        let mut seen = HashSet::new();
        let root = self.root_cluster;
        self.walk_dir(root, "", &mut out, &mut seen);
        out
    }

    fn walk_dir(
        &mut self,
        cluster: u32,
        prefix: &str,
        out: &mut BTreeMap<String, Option<Vec<u8>>>,
        seen: &mut HashSet<u32>,
    ) {
        assert!(seen.insert(cluster), "directory cluster {cluster} visited twice");
        for entry in self.list_dir(cluster) {
            if entry.attr & ATTR_VOLUME_ID != 0 || entry.name == "." || entry.name == ".." {
                continue;
            }
            let path = format!("{prefix}{}", entry.name);
            if entry.is_dir() {
                out.insert(format!("{path}/"), None);
                self.walk_dir(entry.cluster, &format!("{path}/"), out, seen);
            } else {
                let data = self.read_file(&entry);
                out.insert(path, Some(data));
            }
        }
    }
}

fn decode_short(short: &[u8; 11]) -> String {
    let base = String::from_utf8_lossy(&short[..8]).trim_end().to_string();
    let ext = String::from_utf8_lossy(&short[8..]).trim_end().to_string();
    if ext.is_empty() {
        base
    } else {
        format!("{base}.{ext}")
    }
}

pub fn build(root: &Path, label: Option<&str>) -> Arc<Volume> {
    let mut options = BuildOptions::default();
    options.volume_label = label.map(str::to_owned);
    Arc::new(Volume::build(root, &options).unwrap())
}
