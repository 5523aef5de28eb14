// SPDX-License-Identifier: MIT

use crate::{
    error::{VfatError, VfatResult},
    fat32::constant::*,
};

/// Fixed geometry of a virtual volume. All sector numbers are absolute
/// (counted from the MBR), so FAT and data offsets already include the
/// partition's hidden sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeGeometry {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub bytes_per_cluster: u32,
    pub reserved_sectors: u32,

    pub partition_start_sector: u32,
    pub partition_sectors: u32,

    pub fat_start_sector: u32,
    pub fat_size_sectors: u32,

    pub data_start_sector: u32,
    pub cluster_count: u32,
    pub root_cluster: u32,

    pub total_sectors: u32,
}

impl VolumeGeometry {
    /// Derives every offset from the data-region cluster count, so the FAT
    /// size and the data-region start cannot disagree.
    pub fn for_clusters(cluster_count: u32) -> VfatResult<Self> {
        if cluster_count > FAT32_MAX_CLUSTERS {
            return Err(VfatError::VolumeTooLarge {
                clusters: cluster_count as u64,
                max: FAT32_MAX_CLUSTERS,
            });
        }

        let fat_bytes = (cluster_count as u64 + FAT_FIRST_CLUSTER as u64) * FAT_ENTRY_SIZE as u64;
        let fat_size_sectors = fat_bytes.div_ceil(FAT_SECTOR_SIZE as u64);

        let partition_sectors = FAT_RESERVED_SECTORS as u64
            + fat_size_sectors * FAT_NUM_FATS as u64
            + cluster_count as u64 * FAT_SECTORS_PER_CLUSTER as u64;
        let total_sectors = FAT_PARTITION_START_SECTOR as u64 + partition_sectors;
        if total_sectors > u32::MAX as u64 {
            return Err(VfatError::ImageTooLarge {
                sectors: total_sectors,
            });
        }

        let fat_start_sector = FAT_PARTITION_START_SECTOR + FAT_RESERVED_SECTORS;
        let data_start_sector = fat_start_sector + fat_size_sectors as u32 * FAT_NUM_FATS as u32;

        Ok(Self {
            bytes_per_sector: FAT_SECTOR_SIZE,
            sectors_per_cluster: FAT_SECTORS_PER_CLUSTER,
            bytes_per_cluster: FAT_CLUSTER_SIZE,
            reserved_sectors: FAT_RESERVED_SECTORS,
            partition_start_sector: FAT_PARTITION_START_SECTOR,
            partition_sectors: partition_sectors as u32,
            fat_start_sector,
            fat_size_sectors: fat_size_sectors as u32,
            data_start_sector,
            cluster_count,
            root_cluster: FAT_ROOT_CLUSTER,
            total_sectors: total_sectors as u32,
        })
    }

    #[inline]
    pub fn sector_offset(&self, sector: u32) -> u64 {
        sector as u64 * self.bytes_per_sector as u64
    }

    #[inline]
    pub fn partition_offset(&self) -> u64 {
        self.sector_offset(self.partition_start_sector)
    }

    #[inline]
    pub fn fat_offset(&self) -> u64 {
        self.sector_offset(self.fat_start_sector)
    }

    #[inline]
    pub fn fat_len(&self) -> usize {
        self.fat_size_sectors as usize * self.bytes_per_sector as usize
    }

    #[inline]
    pub fn data_offset(&self) -> u64 {
        self.sector_offset(self.data_start_sector)
    }

    /// Byte address of `cluster` (cluster numbering starts at 2).
    #[inline]
    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        self.data_offset() + (cluster - FAT_FIRST_CLUSTER) as u64 * self.bytes_per_cluster as u64
    }

    /// Cluster containing byte address `offset`, if it lies in the data region.
    pub fn cluster_at(&self, offset: u64) -> Option<u32> {
        let rel = offset.checked_sub(self.data_offset())?;
        let idx = rel / self.bytes_per_cluster as u64;
        (idx < self.cluster_count as u64).then(|| idx as u32 + FAT_FIRST_CLUSTER)
    }

    #[inline]
    pub fn image_size(&self) -> u64 {
        self.sector_offset(self.total_sectors)
    }

    #[inline]
    pub fn clusters_for_bytes(&self, bytes: u64) -> u64 {
        bytes.div_ceil(self.bytes_per_cluster as u64)
    }

    /// Last valid cluster number.
    #[inline]
    pub fn last_cluster(&self) -> u32 {
        FAT_FIRST_CLUSTER + self.cluster_count - 1
    }
}

/// Cluster budget of a scanned tree and the geometry fixed from it.
///
/// Planning runs in two steps: first every directory and file is sized in
/// clusters (bottom-up), then the total fixes the FAT size and the region
/// offsets (top-down).
#[derive(Debug, Clone)]
pub struct LayoutPlan {
    /// Clusters per directory, in scan order.
    pub dir_clusters: Vec<u32>,
    /// Clusters per file, in scan order.
    pub file_clusters: Vec<u32>,
    /// Directory + file clusters plus one spare cluster per file.
    pub estimated_clusters: u64,
    pub geometry: VolumeGeometry,
}

impl LayoutPlan {
    /// `dir_slots` is the number of 32-byte records each directory holds;
    /// `file_sizes` are the byte sizes of the files to place.
    pub fn plan(dir_slots: &[usize], file_sizes: &[u64]) -> VfatResult<Self> {
        let cluster = FAT_CLUSTER_SIZE as u64;

        let dir_clusters: Vec<u64> = dir_slots
            .iter()
            .map(|&slots| ((slots * DIR_ENTRY_SIZE) as u64).div_ceil(cluster).max(1))
            .collect();
        let file_clusters: Vec<u64> = file_sizes.iter().map(|&s| s.div_ceil(cluster)).collect();

        let estimated_clusters = dir_clusters.iter().sum::<u64>()
            + file_clusters.iter().sum::<u64>()
            + file_sizes.len() as u64;

        if estimated_clusters > FAT32_MAX_CLUSTERS as u64 {
            return Err(VfatError::VolumeTooLarge {
                clusters: estimated_clusters,
                max: FAT32_MAX_CLUSTERS,
            });
        }
        let cluster_count = (estimated_clusters as u32).max(FAT32_MIN_CLUSTERS);
        let geometry = VolumeGeometry::for_clusters(cluster_count)?;

        // Each entry is bounded by the checked total above.
        Ok(Self {
            dir_clusters: dir_clusters.into_iter().map(|c| c as u32).collect(),
            file_clusters: file_clusters.into_iter().map(|c| c as u32).collect(),
            estimated_clusters,
            geometry,
        })
    }

    pub fn directory_cluster_total(&self) -> u64 {
        self.dir_clusters.iter().map(|&c| c as u64).sum()
    }

    pub fn file_cluster_total(&self) -> u64 {
        self.file_clusters.iter().map(|&c| c as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_volume_geometry() {
        let plan = LayoutPlan::plan(&[1], &[5]).unwrap();
        let geo = plan.geometry;

        assert_eq!(plan.dir_clusters, vec![1]);
        assert_eq!(plan.file_clusters, vec![1]);
        assert_eq!(plan.estimated_clusters, 3);
        assert_eq!(geo.cluster_count, FAT32_MIN_CLUSTERS);

        // (65525 + 2) * 4 / 512, rounded up
        assert_eq!(geo.fat_size_sectors, 512);
        assert_eq!(geo.fat_start_sector, 2048 + 32);
        assert_eq!(geo.data_start_sector, 2048 + 32 + 512);
        assert_eq!(geo.partition_sectors, 32 + 512 + 65_525 * 32);
        assert_eq!(geo.total_sectors, 2048 + geo.partition_sectors);
        assert_eq!(geo.image_size(), geo.total_sectors as u64 * 512);
    }

    #[test]
    fn test_cluster_addressing() {
        let geo = VolumeGeometry::for_clusters(FAT32_MIN_CLUSTERS).unwrap();
        assert_eq!(geo.cluster_offset(2), geo.data_offset());
        assert_eq!(geo.cluster_offset(3), geo.data_offset() + 16_384);
        assert_eq!(geo.cluster_at(geo.data_offset() + 16_385), Some(3));
        assert_eq!(geo.cluster_at(geo.fat_offset()), None);
        assert_eq!(geo.cluster_at(geo.image_size()), None);
        assert_eq!(geo.last_cluster(), FAT32_MIN_CLUSTERS + 1);
    }

    #[test]
    fn test_directory_and_file_rounding() {
        // 512 records fill one 16 KiB cluster exactly; 513 spill into a second.
        let plan = LayoutPlan::plan(&[0, 512, 513], &[0, 16_384, 16_385]).unwrap();
        assert_eq!(plan.dir_clusters, vec![1, 1, 2]);
        assert_eq!(plan.file_clusters, vec![0, 1, 2]);
        assert_eq!(plan.directory_cluster_total(), 4);
        assert_eq!(plan.file_cluster_total(), 3);
        assert_eq!(plan.estimated_clusters, 4 + 3 + 3);
    }

    #[test]
    fn test_large_tree_grows_past_minimum() {
        let sizes = vec![1u64 << 30; 2]; // 2 GiB of data
        let plan = LayoutPlan::plan(&[4], &sizes).unwrap();
        assert_eq!(plan.geometry.cluster_count as u64, plan.estimated_clusters);
        assert_eq!(plan.estimated_clusters, 1 + 2 * 65_536 + 2);
        let fat_entries = plan.geometry.fat_len() / 4;
        assert!(fat_entries >= plan.geometry.cluster_count as usize + 2);
    }

    #[test]
    fn test_oversized_volume_is_rejected() {
        let err = VolumeGeometry::for_clusters(FAT32_MAX_CLUSTERS + 1).unwrap_err();
        assert!(matches!(err, VfatError::VolumeTooLarge { .. }));

        // 40 000 files of 4 GiB need ~10^10 clusters.
        let sizes = vec![u32::MAX as u64; 40_000];
        let err = LayoutPlan::plan(&[1], &sizes).unwrap_err();
        assert!(matches!(err, VfatError::VolumeTooLarge { .. }));

        // Addressable by the FAT, but not by a 32-bit sector count.
        let err = VolumeGeometry::for_clusters(200_000_000).unwrap_err();
        assert!(matches!(err, VfatError::ImageTooLarge { .. }));
    }
}
