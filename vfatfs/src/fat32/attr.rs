// SPDX-License-Identifier: MIT

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fat32Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const LFN       = 0x0F;
    }
}

impl Fat32Attributes {
    /// Attribute byte for a regular file named `name`.
    pub fn for_file(name: &str) -> Self {
        Self::ARCHIVE | Self::hidden_if_dotted(name)
    }

    /// Attribute byte for a sub-directory named `name`.
    pub fn for_dir(name: &str) -> Self {
        Self::DIRECTORY | Self::hidden_if_dotted(name)
    }

    fn hidden_if_dotted(name: &str) -> Self {
        if name.starts_with('.') {
            Self::HIDDEN
        } else {
            Self::empty()
        }
    }
}
