// SPDX-License-Identifier: MIT

pub mod allocator;
pub mod attr;
pub mod builder;
pub mod constant;
pub mod fat;
pub mod meta;
pub mod types;
pub mod utils;

pub mod prelude {
    pub use super::allocator::{ClusterAllocator, ClusterChain};
    pub use super::attr::Fat32Attributes;
    pub use super::builder::{BuiltImage, ImageBuilder};
    pub use super::fat::FatRegion;
    pub use super::meta::{LayoutPlan, VolumeGeometry};
    pub use super::types::*;
    pub use super::utils::ShortNameGenerator;
}
