// SPDX-License-Identifier: MIT

//! Read-only virtual FAT32 volumes.
//!
//! A directory tree is scanned once and turned into the metadata of a FAT32
//! volume (MBR, boot sector, FS-info, FAT, directory clusters). File contents
//! are never copied: each file occupies a *window* of the virtual address
//! space and its bytes are read from the real file when a client asks for
//! them.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vfatfs::prelude::*;
//!
//! let volume = Arc::new(Volume::build("/srv/share".as_ref(), &BuildOptions::default())?);
//! let mut dispatcher = Dispatcher::new(Arc::clone(&volume));
//! let boot_sector = dispatcher.read_range(volume.geometry().partition_offset(), 512);
//! # Ok::<(), vfatfs::VfatError>(())
//! ```

// Core Modules
pub mod error;
pub mod fat32;
pub mod protocol;
pub mod scanner;
pub mod utils;
pub mod volume;

pub use error::*;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::fat32::meta::{LayoutPlan, VolumeGeometry};
    pub use crate::protocol::{GeometryAnswer, MAX_READ_LENGTH, Request, RequestKind};
    pub use crate::scanner::{ScanTree, StdTreeSource, TreeSource};
    pub use crate::volume::{
        BuildOptions, Dispatcher, FileIndex, Lookup, VirtualFileWindow, Volume, VolumeReader,
    };
}
