// SPDX-License-Identifier: MIT

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VfatError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source path {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("volume needs {clusters} clusters, FAT32 allows at most {max}")]
    VolumeTooLarge { clusters: u64, max: u32 },

    #[error("image needs {sectors} sectors, beyond what a 32-bit sector count addresses")]
    ImageTooLarge { sectors: u64 },

    #[error("cluster allocator exhausted")]
    OutOfClusters,

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("read length {length} exceeds the {max} byte limit")]
    RequestTooLarge { length: u32, max: u32 },

    #[error("malformed geometry answer: {0}")]
    MalformedAnswer(&'static str),
}

impl VfatError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        VfatError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type VfatResult<T = ()> = Result<T, VfatError>;
