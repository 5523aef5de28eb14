// SPDX-License-Identifier: MIT

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::fat32::{constant::*, meta::VolumeGeometry};

const SECTOR: usize = FAT_SECTOR_SIZE as usize;

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
struct RawMbrPartition {
    boot_flag: u8,
    start_chs: [u8; 3],
    part_type: u8,
    end_chs: [u8; 3],
    start_lba: U32,
    sectors: U32,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
struct RawMbr {
    boot_code: [u8; 446],
    partitions: [RawMbrPartition; 4],
    signature: [u8; 2],
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
struct RawVbr {
    jump_boot: [u8; 3],
    oem_name: [u8; 8],
    bytes_per_sector: U16,
    sectors_per_cluster: u8,
    reserved_sectors: U16,
    num_fats: u8,
    root_entry_count: U16,
    total_sectors_16: U16,
    media: u8,
    fat_size_16: U16,
    sectors_per_track: U16,
    num_heads: U16,
    hidden_sectors: U32,
    total_sectors_32: U32,

    // FAT32 Extended BPB
    fat_size_32: U32,
    ext_flags: U16,
    fs_version: U16,
    root_cluster: U32,
    fsinfo_sector: U16,
    backup_boot_sector: U16,
    reserved: [u8; 12],

    drive_number: u8,
    reserved1: u8,
    boot_signature: u8,
    volume_id: U32,
    volume_label: [u8; 11],
    fs_type: [u8; 8],

    boot_code: [u8; 420],
    signature: [u8; 2],
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
struct RawFsInfo {
    lead_signature: [u8; 4],
    reserved1: [u8; 480],
    struct_signature: [u8; 4],
    free_cluster_count: U32,
    next_free_cluster: U32,
    reserved2: [u8; 12],
    trail_signature: [u8; 4],
}

const _: () = assert!(size_of::<RawMbr>() == SECTOR);
const _: () = assert!(size_of::<RawVbr>() == SECTOR);
const _: () = assert!(size_of::<RawFsInfo>() == SECTOR);

fn to_sector<T: IntoBytes + Immutable>(raw: &T) -> [u8; SECTOR] {
    let mut out = [0u8; SECTOR];
    out.copy_from_slice(raw.as_bytes());
    out
}

/// CHS triple for `lba` under the 255-head / 63-sector translation, or the
/// "use LBA" marker once the cylinder no longer fits in 10 bits.
fn lba_to_chs(lba: u32) -> [u8; 3] {
    let spt = FAT_SECTORS_PER_TRACK as u32;
    let heads = FAT_HEADS as u32;
    let cylinder = lba / (spt * heads);
    if cylinder > 1023 {
        return MBR_CHS_OUT_OF_RANGE;
    }
    let head = (lba / spt) % heads;
    let sector = lba % spt + 1;
    [
        head as u8,
        (sector as u8 & 0x3F) | ((cylinder >> 2) as u8 & 0xC0),
        cylinder as u8,
    ]
}

/// Master boot record with a single FAT32 (LBA) partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbr {
    pub partition_start: u32,
    pub partition_sectors: u32,
}

impl Mbr {
    pub fn from_geometry(geo: &VolumeGeometry) -> Self {
        Self {
            partition_start: geo.partition_start_sector,
            partition_sectors: geo.partition_sectors,
        }
    }

    pub fn encode(&self) -> [u8; SECTOR] {
        let empty = RawMbrPartition {
            boot_flag: 0,
            start_chs: [0; 3],
            part_type: 0,
            end_chs: [0; 3],
            start_lba: U32::new(0),
            sectors: U32::new(0),
        };
        let last_lba = self.partition_start + self.partition_sectors.saturating_sub(1);
        let fat32 = RawMbrPartition {
            boot_flag: 0,
            start_chs: lba_to_chs(self.partition_start),
            part_type: MBR_PARTITION_TYPE_FAT32_LBA,
            end_chs: lba_to_chs(last_lba),
            start_lba: U32::new(self.partition_start),
            sectors: U32::new(self.partition_sectors),
        };
        to_sector(&RawMbr {
            boot_code: [0u8; 446],
            partitions: [fat32, empty, empty, empty],
            signature: FAT_SIGNATURE,
        })
    }
}

/// FAT32 volume boot record (boot sector + BPB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSector {
    pub hidden_sectors: u32,
    pub total_sectors: u32,
    pub fat_size_sectors: u32,
    pub root_cluster: u32,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
}

impl BootSector {
    pub fn from_geometry(geo: &VolumeGeometry, volume_id: u32, volume_label: [u8; 11]) -> Self {
        Self {
            hidden_sectors: geo.partition_start_sector,
            total_sectors: geo.partition_sectors,
            fat_size_sectors: geo.fat_size_sectors,
            root_cluster: geo.root_cluster,
            volume_id,
            volume_label,
        }
    }

    pub fn encode(&self) -> [u8; SECTOR] {
        to_sector(&RawVbr {
            jump_boot: FAT_JUMP_BOOT,
            oem_name: *FAT_OEM_NAME,
            bytes_per_sector: U16::new(FAT_SECTOR_SIZE as u16),
            sectors_per_cluster: FAT_SECTORS_PER_CLUSTER as u8,
            reserved_sectors: U16::new(FAT_RESERVED_SECTORS as u16),
            num_fats: FAT_NUM_FATS,
            root_entry_count: U16::new(0),
            total_sectors_16: U16::new(0),
            media: FAT_MEDIA_DESCRIPTOR,
            fat_size_16: U16::new(0),
            sectors_per_track: U16::new(FAT_SECTORS_PER_TRACK),
            num_heads: U16::new(FAT_HEADS),
            hidden_sectors: U32::new(self.hidden_sectors),
            total_sectors_32: U32::new(self.total_sectors),
            fat_size_32: U32::new(self.fat_size_sectors),
            ext_flags: U16::new(0),
            fs_version: U16::new(0),
            root_cluster: U32::new(self.root_cluster),
            fsinfo_sector: U16::new(FAT_FSINFO_SECTOR as u16),
            backup_boot_sector: U16::new(FAT_VBR_BACKUP_SECTOR as u16),
            reserved: [0u8; 12],
            drive_number: FAT_DRIVE_NUMBER,
            reserved1: 0,
            boot_signature: FAT_BOOT_SIGNATURE,
            volume_id: U32::new(self.volume_id),
            volume_label: self.volume_label,
            fs_type: *FAT_FS_TYPE,
            boot_code: [0u8; 420],
            signature: FAT_SIGNATURE,
        })
    }
}

/// FAT32 FS-information sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsInfo {
    pub free_clusters: u32,
    pub next_free_cluster: u32,
}

impl FsInfo {
    pub fn encode(&self) -> [u8; SECTOR] {
        to_sector(&RawFsInfo {
            lead_signature: *FAT_FSINFO_LEAD_SIGNATURE,
            reserved1: [0u8; 480],
            struct_signature: *FAT_FSINFO_STRUCT_SIGNATURE,
            free_cluster_count: U32::new(self.free_clusters),
            next_free_cluster: U32::new(self.next_free_cluster),
            reserved2: [0u8; 12],
            trail_signature: FAT_FSINFO_TRAIL_SIGNATURE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le16(b: &[u8], off: usize) -> u16 {
        u16::from_le_bytes([b[off], b[off + 1]])
    }

    fn le32(b: &[u8], off: usize) -> u32 {
        u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
    }

    #[test]
    fn test_vbr_field_offsets() {
        let vbr = BootSector {
            hidden_sectors: 2048,
            total_sectors: 2_097_664,
            fat_size_sectors: 512,
            root_cluster: 2,
            volume_id: 0xDEADBEEF,
            volume_label: *b"VIRTUAL FAT",
        }
        .encode();

        assert_eq!(&vbr[0..3], &FAT_JUMP_BOOT);
        assert_eq!(le16(&vbr, 0x0B), 512);
        assert_eq!(vbr[0x0D], 32);
        assert_eq!(le16(&vbr, 0x0E), 32);
        assert_eq!(vbr[0x10], 1);
        assert_eq!(vbr[0x15], 0xF8);
        assert_eq!(le32(&vbr, 0x1C), 2048);
        assert_eq!(le32(&vbr, 0x20), 2_097_664);
        assert_eq!(le32(&vbr, 0x24), 512);
        assert_eq!(le32(&vbr, 0x2C), 2);
        assert_eq!(le16(&vbr, 0x30), 1);
        assert_eq!(le16(&vbr, 0x32), 6);
        assert_eq!(vbr[0x42], 0x29);
        assert_eq!(le32(&vbr, 0x43), 0xDEADBEEF);
        assert_eq!(&vbr[0x47..0x52], b"VIRTUAL FAT");
        assert_eq!(&vbr[0x52..0x5A], b"FAT32   ");
        assert_eq!(&vbr[510..512], &[0x55, 0xAA]);
    }

    #[test]
    fn test_fsinfo_signatures() {
        let info = FsInfo {
            free_clusters: 100,
            next_free_cluster: 7,
        }
        .encode();
        assert_eq!(&info[0..4], b"RRaA");
        assert_eq!(&info[484..488], b"rrAa");
        assert_eq!(le32(&info, 488), 100);
        assert_eq!(le32(&info, 492), 7);
        assert_eq!(&info[508..512], &[0x00, 0x00, 0x55, 0xAA]);
    }

    #[test]
    fn test_mbr_single_partition() {
        let mbr = Mbr {
            partition_start: 2048,
            partition_sectors: 4096,
        }
        .encode();
        let entry = &mbr[446..462];
        assert_eq!(entry[4], MBR_PARTITION_TYPE_FAT32_LBA);
        assert_eq!(le32(entry, 8), 2048);
        assert_eq!(le32(entry, 12), 4096);
        // LBA 2048 = C0/H32/S33
        assert_eq!(&entry[1..4], &[32, 33, 0]);
        assert!(mbr[462..510].iter().all(|&b| b == 0));
        assert_eq!(&mbr[510..512], &[0x55, 0xAA]);
    }

    #[test]
    fn test_chs_saturates_beyond_1024_cylinders() {
        assert_eq!(lba_to_chs(0), [0, 1, 0]);
        assert_eq!(lba_to_chs(u32::MAX), MBR_CHS_OUT_OF_RANGE);
    }
}
