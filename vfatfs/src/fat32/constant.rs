// SPDX-License-Identifier: MIT

// === Disk Layout Parameters ===

pub const FAT_SECTOR_SIZE: u32 = 512; // BPB_BytsPerSec
pub const FAT_SECTORS_PER_CLUSTER: u32 = 32; // BPB_SecPerClus
pub const FAT_CLUSTER_SIZE: u32 = FAT_SECTOR_SIZE * FAT_SECTORS_PER_CLUSTER;

pub const FAT_RESERVED_SECTORS: u32 = 32; // BPB_RsvdSecCnt
pub const FAT_NUM_FATS: u8 = 1; // BPB_NumFATs
pub const FAT_HEADS: u16 = 255; // BPB_NumHeads (CHS hint)
pub const FAT_SECTORS_PER_TRACK: u16 = 63; // BPB_SecPerTrk (CHS hint)
pub const FAT_PARTITION_START_SECTOR: u32 = 2048; // BPB_HiddSec, 1 MiB alignment

// === FAT Region Parameters ===

pub const FAT_ENTRY_SIZE: usize = 4;
pub const FAT_MEDIA_DESCRIPTOR: u8 = 0xF8; // BPB_Media
pub const FAT_MEDIA_ENTRY: u32 = 0x0FFF_FF00 | FAT_MEDIA_DESCRIPTOR as u32; // FAT[0]
pub const FAT_EOC: u32 = 0x0FFF_FFFF; // FAT[1], end of chain
pub const FAT_FREE: u32 = 0;
pub const FAT_MASK: u32 = 0x0FFF_FFFF;
pub const FAT_FIRST_CLUSTER: u32 = 2;
pub const FAT_ROOT_CLUSTER: u32 = 2; // BPB_RootClus

/// Below this many data clusters, drivers classify a volume as FAT12/16.
pub const FAT32_MIN_CLUSTERS: u32 = 65_525;
/// Clusters 2..=0x0FFFFFF6 are addressable.
pub const FAT32_MAX_CLUSTERS: u32 = 0x0FFF_FFF5;
/// Largest file a 32-bit size field can describe.
pub const FAT_MAX_FILE_SIZE: u64 = u32::MAX as u64;

// === Special Sector Numbers (relative to the partition) ===

pub const FAT_VBR_SECTOR: u32 = 0;
pub const FAT_FSINFO_SECTOR: u32 = 1;
pub const FAT_VBR_BACKUP_SECTOR: u32 = 6;
pub const FAT_FSINFO_BACKUP_SECTOR: u32 = 7;

// === Standard FAT32 BPB / Extended BPB Constants ===

pub const FAT_JUMP_BOOT: [u8; 3] = [0xEB, 0x58, 0x90]; // BS_jmpBoot
pub const FAT_OEM_NAME: &[u8; 8] = b"MSWIN4.1"; // BS_OEMName
pub const FAT_DRIVE_NUMBER: u8 = 0x80; // BS_DrvNum
pub const FAT_BOOT_SIGNATURE: u8 = 0x29; // BS_BootSig
pub const FAT_FS_TYPE: &[u8; 8] = b"FAT32   "; // BS_FilSysType
pub const FAT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const FAT_VOLUME_LABEL_EMPTY: &[u8; 11] = b"NO NAME    ";
pub const FAT_DEFAULT_VOLUME_ID: u32 = 0x1234_5678;

// === FSINFO Constants ===

pub const FAT_FSINFO_LEAD_SIGNATURE: &[u8; 4] = b"RRaA";
pub const FAT_FSINFO_STRUCT_SIGNATURE: &[u8; 4] = b"rrAa";
pub const FAT_FSINFO_TRAIL_SIGNATURE: [u8; 4] = [0x00, 0x00, 0x55, 0xAA];

// === MBR ===

pub const MBR_PARTITION_TYPE_FAT32_LBA: u8 = 0x0C;
pub const MBR_CHS_OUT_OF_RANGE: [u8; 3] = [0xFE, 0xFF, 0xFF];

// === Directory Entries ===

pub const DIR_ENTRY_SIZE: usize = 32;
pub const LFN_CHARS_PER_ENTRY: usize = 13;
pub const LFN_LAST_ENTRY_FLAG: u8 = 0x40;
pub const MAX_LFN_UNITS: usize = 255;
pub const FAT_DOT_NAME: &[u8; 11] = b".          ";
pub const FAT_DOTDOT_NAME: &[u8; 11] = b"..         ";
