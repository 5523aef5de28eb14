// SPDX-License-Identifier: MIT

/// Minimal trait to abstract the rolling "rotate-right then add byte" checksum
/// over different word sizes.
pub trait RollingWord: Copy + Default {
    fn ror1(self) -> Self;
    fn add_byte(self, b: u8) -> Self;
}

impl RollingWord for u8 {
    #[inline(always)]
    fn ror1(self) -> Self {
        self.rotate_right(1)
    }
    #[inline(always)]
    fn add_byte(self, b: u8) -> Self {
        self.wrapping_add(b)
    }
}

/// One-shot rotate-and-add checksum.
#[inline(always)]
pub fn checksum<T: RollingWord>(data: &[u8]) -> T {
    data.iter()
        .fold(T::default(), |sum, &b| sum.ror1().add_byte(b))
}

/// Checksum stored in every LFN record, computed over the 11-byte short name.
#[inline(always)]
pub fn lfn_checksum(short_name: &[u8; 11]) -> u8 {
    checksum::<u8>(short_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Byte-wise formula as published by Microsoft.
    fn reference(name: &[u8; 11]) -> u8 {
        let mut sum: u8 = 0;
        for &b in name {
            sum = (if sum & 1 != 0 { 0x80u8 } else { 0 })
                .wrapping_add(sum >> 1)
                .wrapping_add(b);
        }
        sum
    }

    #[test]
    fn test_lfn_checksum_matches_reference() {
        for name in [b"REALLY~1TXT", b"README     ", b"A       TXT", b"__________~"] {
            assert_eq!(lfn_checksum(name), reference(name), "{name:?}");
        }
    }

    #[test]
    fn test_empty_checksum_is_zero() {
        assert_eq!(checksum::<u8>(&[]), 0);
    }
}
