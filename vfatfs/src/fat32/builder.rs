// SPDX-License-Identifier: MIT

//! Image builder.
//!
//! Building runs in two passes over the scanned tree:
//! 1. every directory is encoded into its records (short names, LFN slots),
//!    which sizes it, and the layout is planned from those sizes;
//! 2. clusters are allocated (all directories first, then all files, both in
//!    walk order) and the metadata prefix is serialized with every
//!    starting-cluster field already known.
//!
//! Because directories are allocated before any file, the directory clusters
//! form one contiguous run right after the FAT, and the metadata buffer is a
//! single prefix of the image. File clusters are marked in the FAT but never
//! filled; each file becomes a [`VirtualFileWindow`] instead.

use std::path::PathBuf;

use log::{debug, warn};

use crate::{
    error::VfatResult,
    fat32::{
        allocator::{ClusterAllocator, ClusterChain},
        attr::Fat32Attributes,
        constant::*,
        fat::FatRegion,
        meta::{LayoutPlan, VolumeGeometry},
        types::*,
        utils::{self as fat_utils, ShortNameGenerator},
    },
    scanner::{ChildKind, ScanTree},
    volume::{BuildOptions, VirtualFileWindow},
};

/// Everything a [`Volume`](crate::volume::Volume) is made of.
#[derive(Debug, Clone)]
pub struct BuiltImage {
    pub geometry: VolumeGeometry,
    /// Image bytes `[0, metadata.len())`: MBR, gap, reserved sectors, FAT
    /// and every directory cluster.
    pub metadata: Vec<u8>,
    /// File windows in address order.
    pub windows: Vec<VirtualFileWindow>,
    pub first_free_cluster: u32,
    pub used_clusters: u32,
    pub volume_label: Option<[u8; 11]>,
}

/// Where a record's starting-cluster field points.
#[derive(Debug, Clone, Copy)]
enum Target {
    None,
    Dir(usize),
    File(usize),
    Dot,
    DotDot,
}

struct PlannedRecord {
    record: DirRecord,
    target: Target,
}

struct PlannedDir {
    index: usize,
    records: Vec<PlannedRecord>,
}

impl PlannedDir {
    fn slots(&self) -> usize {
        self.records.iter().map(|r| r.record.slots()).sum()
    }
}

struct PlannedFile {
    path: PathBuf,
    size: u64,
}

pub struct ImageBuilder<'a> {
    tree: &'a ScanTree,
    options: &'a BuildOptions,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(tree: &'a ScanTree, options: &'a BuildOptions) -> Self {
        Self { tree, options }
    }

    pub fn build(&self) -> VfatResult<BuiltImage> {
        let label = self
            .options
            .volume_label
            .as_deref()
            .and_then(fat_utils::volume_label_bytes);

        let (dirs, files) = self.encode_tree(label);

        let dir_slots: Vec<usize> = dirs.iter().map(PlannedDir::slots).collect();
        let file_sizes: Vec<u64> = files.iter().map(|f| f.size).collect();
        let plan = LayoutPlan::plan(&dir_slots, &file_sizes)?;
        let geo = plan.geometry;

        // Pass 1: allocation.
        let mut alloc = ClusterAllocator::new(&geo);
        let mut dir_chains: Vec<Option<ClusterChain>> = vec![None; self.tree.dirs.len()];
        for (dir, &count) in dirs.iter().zip(&plan.dir_clusters) {
            dir_chains[dir.index] = Some(alloc.allocate_chain(count)?);
        }
        let mut file_chains = Vec::with_capacity(files.len());
        for &count in &plan.file_clusters {
            file_chains.push(alloc.allocate_chain(count)?);
        }

        // Pass 2: serialization.
        let metadata_len =
            geo.data_offset() + plan.directory_cluster_total() * geo.bytes_per_cluster as u64;
        let mut metadata = vec![0u8; metadata_len as usize];

        self.write_boot_region(&mut metadata, &geo, label, &alloc);

        {
            let fat_off = geo.fat_offset() as usize;
            let mut fat = FatRegion::new(&mut metadata[fat_off..fat_off + geo.fat_len()]);
            for chain in dir_chains.iter().flatten().chain(&file_chains) {
                fat.mark_chain(chain);
            }
        }

        for dir in &dirs {
            let Some(own) = dir_chains[dir.index] else {
                continue;
            };
            let parent = match self.tree.dirs[dir.index].parent {
                Some(p) if p != 0 => dir_chains[p].map_or(0, |c| c.first),
                _ => 0,
            };

            let mut buf = Vec::with_capacity(dir.slots() * DIR_ENTRY_SIZE);
            for planned in &dir.records {
                let mut record = planned.record.clone();
                record.entry.first_cluster = match planned.target {
                    Target::None => 0,
                    Target::Dir(d) => dir_chains[d].map_or(0, |c| c.first),
                    Target::File(f) => file_chains[f].first,
                    Target::Dot => own.first,
                    Target::DotDot => parent,
                };
                record.encode_into(&mut buf);
            }

            let off = geo.cluster_offset(own.first) as usize;
            metadata[off..off + buf.len()].copy_from_slice(&buf);
            debug!(
                "Directory {} at cluster {} ({} clusters, {} records)",
                self.tree.dirs[dir.index].path.display(),
                own.first,
                own.len,
                dir.slots()
            );
        }

        let windows = files
            .into_iter()
            .zip(&file_chains)
            .map(|(file, chain)| {
                let begin = geo.cluster_offset(chain.first);
                VirtualFileWindow {
                    path: file.path,
                    begin,
                    end: begin + chain.len as u64 * geo.bytes_per_cluster as u64,
                    first_cluster: chain.first,
                    size: file.size,
                }
            })
            .collect();

        Ok(BuiltImage {
            geometry: geo,
            metadata,
            windows,
            first_free_cluster: alloc.next_free(),
            used_clusters: alloc.used(),
            volume_label: label,
        })
    }

    /// Encodes every reachable directory into records. Directories hidden
    /// behind a skipped entry are left out, together with their files.
    fn encode_tree(&self, label: Option<[u8; 11]>) -> (Vec<PlannedDir>, Vec<PlannedFile>) {
        let offset = self.options.utc_offset;
        let stamp = |t: Option<std::time::SystemTime>| {
            t.map_or(FatTimestamp::EPOCH, |t| fat_utils::timestamp_from_system(t, offset))
        };

        let mut reachable = vec![false; self.tree.dirs.len()];
        reachable[0] = true;
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        for (index, scanned) in self.tree.dirs.iter().enumerate() {
            if !reachable[index] {
                continue;
            }

            let own_stamp = stamp(scanned.modified);
            let mut records = Vec::with_capacity(scanned.children.len() + 2);
            if index == 0 {
                if let Some(label) = label {
                    records.push(PlannedRecord {
                        record: DirRecord::short(ShortEntry::volume_label(label, own_stamp)),
                        target: Target::None,
                    });
                }
            } else {
                records.push(PlannedRecord {
                    record: DirRecord::short(ShortEntry::dot(0, own_stamp)),
                    target: Target::Dot,
                });
                records.push(PlannedRecord {
                    record: DirRecord::short(ShortEntry::dotdot(0, own_stamp)),
                    target: Target::DotDot,
                });
            }

            let mut names = ShortNameGenerator::new();
            for (name, child) in &scanned.children {
                if fat_utils::lfn_units(name) > MAX_LFN_UNITS {
                    warn!(
                        "Skipping {}: name longer than {MAX_LFN_UNITS} UTF-16 units",
                        scanned.path.join(name).display()
                    );
                    continue;
                }

                let (short, needs_lfn) = names.generate(name);
                let lfn = if needs_lfn {
                    fat_utils::lfn_entries(name, &short).unwrap_or_default()
                } else {
                    Vec::new()
                };
                let modified = stamp(child.modified);

                let (entry, target) = match &child.kind {
                    ChildKind::Dir(d) => {
                        reachable[*d] = true;
                        let attr = Fat32Attributes::for_dir(name);
                        (ShortEntry::dir(short, attr, modified), Target::Dir(*d))
                    }
                    ChildKind::File(path) => {
                        let attr = Fat32Attributes::for_file(name);
                        files.push(PlannedFile {
                            path: path.clone(),
                            size: child.size,
                        });
                        // The scanner drops anything above u32::MAX.
                        let size = child.size.min(FAT_MAX_FILE_SIZE) as u32;
                        (
                            ShortEntry::file(short, attr, size, modified),
                            Target::File(files.len() - 1),
                        )
                    }
                };

                records.push(PlannedRecord {
                    record: DirRecord { lfn, entry },
                    target,
                });
            }

            dirs.push(PlannedDir { index, records });
        }

        (dirs, files)
    }

    fn write_boot_region(
        &self,
        metadata: &mut [u8],
        geo: &VolumeGeometry,
        label: Option<[u8; 11]>,
        alloc: &ClusterAllocator,
    ) {
        let sector = geo.bytes_per_sector as usize;
        let part = geo.partition_offset() as usize;
        let at = |n: u32| part + n as usize * sector;

        metadata[..sector].copy_from_slice(&Mbr::from_geometry(geo).encode());

        let vbr = BootSector::from_geometry(
            geo,
            self.options.volume_id,
            label.unwrap_or(*FAT_VOLUME_LABEL_EMPTY),
        )
        .encode();
        let fsinfo = FsInfo {
            free_clusters: geo.cluster_count - alloc.used(),
            next_free_cluster: alloc.next_free(),
        }
        .encode();

        for (n, bytes) in [
            (FAT_VBR_SECTOR, &vbr),
            (FAT_FSINFO_SECTOR, &fsinfo),
            (FAT_VBR_BACKUP_SECTOR, &vbr),
            (FAT_FSINFO_BACKUP_SECTOR, &fsinfo),
        ] {
            metadata[at(n)..at(n) + sector].copy_from_slice(bytes);
        }
    }
}
