// SPDX-License-Identifier: MIT

use crate::{
    error::{VfatError, VfatResult},
    fat32::{constant::FAT_FIRST_CLUSTER, meta::VolumeGeometry},
};

/// A run of consecutive clusters. The allocator never fragments, so a chain
/// is fully described by its first cluster and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterChain {
    pub first: u32,
    pub len: u32,
}

impl ClusterChain {
    #[inline]
    pub fn last(&self) -> u32 {
        self.first + self.len.saturating_sub(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + use<> {
        self.first..self.first + self.len
    }

    #[inline]
    pub fn contains(&self, cluster: u32) -> bool {
        cluster >= self.first && cluster < self.first + self.len
    }
}

/// Hands out clusters from a single cursor that only moves forward, so no
/// cluster is ever part of two chains.
#[derive(Debug, Clone)]
pub struct ClusterAllocator {
    next_free: u32,
    last: u32,
}

impl ClusterAllocator {
    pub fn new(geometry: &VolumeGeometry) -> Self {
        Self {
            next_free: geometry.root_cluster,
            last: geometry.last_cluster(),
        }
    }

    pub fn allocate_chain(&mut self, count: u32) -> VfatResult<ClusterChain> {
        debug_assert!(count > 0, "empty chains are never allocated");
        let end = self.next_free as u64 + count as u64;
        if end > self.last as u64 + 1 {
            return Err(VfatError::OutOfClusters);
        }
        let chain = ClusterChain {
            first: self.next_free,
            len: count,
        };
        self.next_free = end as u32;
        Ok(chain)
    }

    /// First cluster no chain has claimed yet.
    #[inline]
    pub fn next_free(&self) -> u32 {
        self.next_free
    }

    #[inline]
    pub fn used(&self) -> u32 {
        self.next_free - FAT_FIRST_CLUSTER
    }

    #[inline]
    pub fn remaining(&self) -> u32 {
        self.last + 1 - self.next_free
    }
}
