// SPDX-License-Identifier: MIT

//! Wire format between the server and its clients.
//!
//! Every integer is little-endian. A client sends fixed 12-byte requests;
//! a zero length asks for the geometry answer, anything else for that many
//! image bytes.

use zerocopy::byteorder::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    error::{VfatError, VfatResult},
    volume::Volume,
};

/// Largest read a client may ask for in one request.
pub const MAX_READ_LENGTH: u32 = 16 * 1024 * 1024;

pub const REQUEST_SIZE: usize = size_of::<RawRequest>();
pub const GEOMETRY_HEADER_SIZE: usize = size_of::<RawGeometryHeader>();

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
struct RawRequest {
    position: U64,
    length: U32,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
struct RawGeometryHeader {
    sectors_count: U32,
    clusters_count: U32,
    files_count: U32,
    fat_first_sector: U32,
    reserved: [U32; 4],
}

const _: () = assert!(REQUEST_SIZE == 12);
const _: () = assert!(GEOMETRY_HEADER_SIZE == 32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub position: u64,
    pub length: u32,
}

/// What a [`Request`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Geometry,
    Read { position: u64, length: u32 },
}

impl Request {
    pub fn geometry() -> Self {
        Self {
            position: 0,
            length: 0,
        }
    }

    pub fn read(position: u64, length: u32) -> Self {
        Self { position, length }
    }

    pub fn decode(bytes: &[u8; REQUEST_SIZE]) -> Self {
        let raw: RawRequest = zerocopy::transmute!(*bytes);
        Self {
            position: raw.position.get(),
            length: raw.length.get(),
        }
    }

    pub fn encode(&self) -> [u8; REQUEST_SIZE] {
        let raw = RawRequest {
            position: U64::new(self.position),
            length: U32::new(self.length),
        };
        let mut out = [0u8; REQUEST_SIZE];
        out.copy_from_slice(raw.as_bytes());
        out
    }

    /// Classifies the request, rejecting reads above [`MAX_READ_LENGTH`].
    pub fn kind(&self) -> VfatResult<RequestKind> {
        match self.length {
            0 => Ok(RequestKind::Geometry),
            length if length > MAX_READ_LENGTH => Err(VfatError::RequestTooLarge {
                length,
                max: MAX_READ_LENGTH,
            }),
            length => Ok(RequestKind::Read {
                position: self.position,
                length,
            }),
        }
    }
}

/// One-shot geometry handshake payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryAnswer {
    /// Whole-image sector count, MBR included.
    pub sectors_count: u32,
    /// Data-region cluster count.
    pub clusters_count: u32,
    /// Absolute sector of the FAT.
    pub fat_first_sector: u32,
    /// Starting cluster of every served file, in address order.
    pub first_clusters: Vec<u32>,
    pub first_free_cluster: u32,
}

impl GeometryAnswer {
    pub fn from_volume(volume: &Volume) -> Self {
        let geo = volume.geometry();
        Self {
            sectors_count: geo.total_sectors,
            clusters_count: geo.cluster_count,
            fat_first_sector: geo.fat_start_sector,
            first_clusters: volume.files().iter().map(|w| w.first_cluster).collect(),
            first_free_cluster: volume.first_free_cluster(),
        }
    }

    #[inline]
    pub fn files_count(&self) -> u32 {
        self.first_clusters.len() as u32
    }

    #[inline]
    pub fn encoded_len(&self) -> usize {
        GEOMETRY_HEADER_SIZE + (self.first_clusters.len() + 1) * 4
    }

    pub fn encode(&self) -> Vec<u8> {
        let header = RawGeometryHeader {
            sectors_count: U32::new(self.sectors_count),
            clusters_count: U32::new(self.clusters_count),
            files_count: U32::new(self.files_count()),
            fat_first_sector: U32::new(self.fat_first_sector),
            reserved: [U32::new(0); 4],
        };

        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(header.as_bytes());
        for cluster in &self.first_clusters {
            out.extend_from_slice(&cluster.to_le_bytes());
        }
        out.extend_from_slice(&self.first_free_cluster.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> VfatResult<Self> {
        let (header, rest) = RawGeometryHeader::read_from_prefix(bytes)
            .map_err(|_| VfatError::MalformedAnswer("short header"))?;

        let files = header.files_count.get() as usize;
        if rest.len() != (files + 1) * 4 {
            return Err(VfatError::MalformedAnswer("cluster list length mismatch"));
        }
        let mut words = rest
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        let first_clusters: Vec<u32> = words.by_ref().take(files).collect();
        let first_free_cluster = words
            .next()
            .ok_or(VfatError::MalformedAnswer("missing first free cluster"))?;

        Ok(Self {
            sectors_count: header.sectors_count.get(),
            clusters_count: header.clusters_count.get(),
            fat_first_sector: header.fat_first_sector.get(),
            first_clusters,
            first_free_cluster,
        })
    }
}
