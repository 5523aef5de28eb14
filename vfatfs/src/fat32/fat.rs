// SPDX-License-Identifier: MIT

use crate::fat32::{allocator::ClusterChain, constant::*};

/// Mutable view over the in-memory FAT region of a metadata buffer.
pub struct FatRegion<'a> {
    bytes: &'a mut [u8],
}

impl<'a> FatRegion<'a> {
    /// Wraps `bytes` and writes the two reserved entries (media byte and
    /// end-of-chain marker).
    pub fn new(bytes: &'a mut [u8]) -> Self {
        let mut fat = Self { bytes };
        fat.set(0, FAT_MEDIA_ENTRY);
        fat.set(1, FAT_EOC);
        fat
    }

    #[inline]
    pub fn entries(&self) -> usize {
        self.bytes.len() / FAT_ENTRY_SIZE
    }

    #[inline]
    pub fn set(&mut self, cluster: u32, value: u32) {
        let off = cluster as usize * FAT_ENTRY_SIZE;
        self.bytes[off..off + FAT_ENTRY_SIZE].copy_from_slice(&(value & FAT_MASK).to_le_bytes());
    }

    #[inline]
    pub fn get(&self, cluster: u32) -> u32 {
        let off = cluster as usize * FAT_ENTRY_SIZE;
        let mut raw = [0u8; FAT_ENTRY_SIZE];
        raw.copy_from_slice(&self.bytes[off..off + FAT_ENTRY_SIZE]);
        u32::from_le_bytes(raw) & FAT_MASK
    }

    /// Links every cluster of `chain` to its successor and terminates the last.
    pub fn mark_chain(&mut self, chain: &ClusterChain) {
        for cluster in chain.iter() {
            let next = if cluster == chain.last() {
                FAT_EOC
            } else {
                cluster + 1
            };
            self.set(cluster, next);
        }
    }
}
