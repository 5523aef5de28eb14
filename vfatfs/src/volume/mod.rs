// SPDX-License-Identifier: MIT

//! The served volume: metadata prefix, file windows and the read path.

mod dispatcher;
mod index;
mod reader;

pub use dispatcher::*;
pub use index::*;
pub use reader::*;

use std::path::Path;

use log::info;
use time::UtcOffset;

use crate::{
    error::VfatResult,
    fat32::{builder::ImageBuilder, constant::FAT_DEFAULT_VOLUME_ID, meta::VolumeGeometry},
    protocol::GeometryAnswer,
    scanner::{self, ScanTree},
    utils::time_utils,
};

/// Build-time settings.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Label written to the boot sector and as a root volume-ID entry.
    pub volume_label: Option<String>,
    pub volume_id: u32,
    /// Offset used to turn modification times into FAT local time.
    pub utc_offset: UtcOffset,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            volume_label: None,
            volume_id: FAT_DEFAULT_VOLUME_ID,
            utc_offset: time_utils::local_offset(),
        }
    }
}

impl BuildOptions {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.volume_label = Some(label.into());
        self
    }
}

/// A built, immutable virtual volume.
#[derive(Debug)]
pub struct Volume {
    geometry: VolumeGeometry,
    metadata: Vec<u8>,
    index: FileIndex,
    first_free_cluster: u32,
    used_clusters: u32,
    volume_label: Option<[u8; 11]>,
}

impl Volume {
    /// Scans `root` and builds the volume for it.
    pub fn build(root: &Path, options: &BuildOptions) -> VfatResult<Self> {
        let tree = scanner::scan(root)?;
        Self::from_scan(&tree, options)
    }

    pub fn from_scan(tree: &ScanTree, options: &BuildOptions) -> VfatResult<Self> {
        let image = ImageBuilder::new(tree, options).build()?;
        let geo = &image.geometry;
        info!(
            "Volume ready: {} sectors, {} clusters ({} used), {} files, {} bytes of metadata",
            geo.total_sectors,
            geo.cluster_count,
            image.used_clusters,
            image.windows.len(),
            image.metadata.len()
        );

        Ok(Self {
            geometry: image.geometry,
            metadata: image.metadata,
            index: FileIndex::new(image.windows),
            first_free_cluster: image.first_free_cluster,
            used_clusters: image.used_clusters,
            volume_label: image.volume_label,
        })
    }

    #[inline]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Image bytes preceding the first file window.
    #[inline]
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    #[inline]
    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    #[inline]
    pub fn files(&self) -> &[VirtualFileWindow] {
        self.index.as_slice()
    }

    #[inline]
    pub fn image_size(&self) -> u64 {
        self.geometry.image_size()
    }

    #[inline]
    pub fn first_free_cluster(&self) -> u32 {
        self.first_free_cluster
    }

    #[inline]
    pub fn used_clusters(&self) -> u32 {
        self.used_clusters
    }

    pub fn volume_label(&self) -> Option<String> {
        self.volume_label
            .map(|raw| String::from_utf8_lossy(&raw).trim_end().to_owned())
    }

    /// Encoded answer to a geometry query.
    pub fn init_answer(&self) -> Vec<u8> {
        GeometryAnswer::from_volume(self).encode()
    }
}
