// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use time::{OffsetDateTime, UtcOffset};

use crate::{
    fat32::{
        constant::{LFN_CHARS_PER_ENTRY, MAX_LFN_UNITS},
        types::{FatTimestamp, LfnEntry, ShortName},
    },
    utils::time_utils,
};

/// Packs a wall-clock instant into FAT date/time fields.
///
/// Instants before 1980 collapse to the FAT epoch, instants after 2107 to the
/// last representable value.
pub fn pack_timestamp(ts: OffsetDateTime) -> FatTimestamp {
    let year = ts.year();
    if year < 1980 {
        return FatTimestamp::EPOCH;
    }
    if year > 2107 {
        return FatTimestamp::MAX;
    }

    let month = ts.month() as u16;
    let day = ts.day() as u16;
    let hour = ts.hour() as u16;
    let minute = ts.minute() as u16;
    let second = ts.second() as u16;

    let date = ((year - 1980) as u16) << 9 | (month << 5) | day;
    let time = (hour << 11) | (minute << 5) | (second / 2);
    let tenths = (second % 2) as u8 * 100 + (ts.millisecond() / 10) as u8;

    FatTimestamp { date, time, tenths }
}

/// Packs a filesystem modification time, interpreted at `offset`.
pub fn timestamp_from_system(t: SystemTime, offset: UtcOffset) -> FatTimestamp {
    pack_timestamp(time_utils::systemtime_to_local(t, offset))
}

/// Allowed characters in SFN (after uppercase):
/// A–Z, 0–9 and !$%'-_@~`^#&(){}.
#[inline(always)]
fn is_valid_sfn_char(b: u8) -> bool {
    matches!(b,
        b'A'..=b'Z' | b'0'..=b'9' |
        b'!' | b'$' | b'%' | b'\'' | b'-' | b'_' | b'@' | b'~' | b'`' |
        b'^' | b'#' | b'&' | b'(' | b')' | b'{' | b'}'
    )
}

/// Uppercases `part`, dropping spaces and dots and replacing anything not
/// allowed in a short name with `_`. The flag reports a lossy conversion.
fn sanitize(part: &str) -> (Vec<u8>, bool) {
    let mut out = Vec::with_capacity(part.len());
    let mut lossy = false;
    for ch in part.chars() {
        if ch == ' ' || ch == '.' {
            lossy = true;
            continue;
        }
        let up = if ch.is_ascii() {
            ch.to_ascii_uppercase() as u8
        } else {
            0
        };
        if is_valid_sfn_char(up) {
            out.push(up);
        } else {
            lossy = true;
            out.push(b'_');
        }
    }
    (out, lossy)
}

/// Issues unique 8.3 names within one directory.
#[derive(Debug, Default)]
pub struct ShortNameGenerator {
    used: HashSet<ShortName>,
    counters: HashMap<[u8; 6], u32>,
}

impl ShortNameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as taken without going through the generator.
    pub fn reserve(&mut self, name: ShortName) {
        self.used.insert(name);
    }

    /// Derives the short name for `name`. The flag is true when the short
    /// name does not spell `name` exactly and long-name records are needed.
    pub fn generate(&mut self, name: &str) -> (ShortName, bool) {
        let stripped = name.trim_start_matches('.');
        let (base, ext) = match stripped.rfind('.') {
            Some(i) => (&stripped[..i], &stripped[i + 1..]),
            None => (stripped, ""),
        };

        let (base, base_lossy) = sanitize(base);
        let (ext, ext_lossy) = sanitize(ext);

        let plain = ShortName::from_parts(&base, &ext);
        let needs_tail = base.len() > 8
            || ext.len() > 3
            || base_lossy
            || ext_lossy
            || base.is_empty()
            || stripped.len() != name.len()
            || self.used.contains(&plain);

        let short = if needs_tail {
            self.numbered(&base, &ext)
        } else {
            plain
        };
        self.used.insert(short);

        (short, short.display() != name)
    }

    fn numbered(&mut self, base: &[u8], ext: &[u8]) -> ShortName {
        let mut prefix = [b'_'; 6];
        for (dst, src) in prefix.iter_mut().zip(base) {
            *dst = *src;
        }
        let ext = &ext[..ext.len().min(3)];

        loop {
            let counter = self.counters.entry(prefix).or_insert(1);
            let n = *counter;
            *counter += 1;

            let suffix = format!("~{n}");
            let keep = 8usize.saturating_sub(suffix.len()).min(prefix.len());
            let mut stem = prefix[..keep].to_vec();
            stem.extend_from_slice(suffix.as_bytes());

            let candidate = ShortName::from_parts(&stem, ext);
            if !self.used.contains(&candidate) {
                return candidate;
            }
        }
    }
}

/// Number of UTF-16 code units in `name`, the unit LFN records count in.
pub fn lfn_units(name: &str) -> usize {
    name.encode_utf16().count()
}

/// Generates the LFN records for `name`, in on-disk order (highest sequence
/// first). Returns `None` when the name exceeds 255 UTF-16 units.
pub fn lfn_entries(name: &str, short: &ShortName) -> Option<Vec<LfnEntry>> {
    let name_utf16: Vec<u16> = name.encode_utf16().collect();
    if name_utf16.len() > MAX_LFN_UNITS {
        return None;
    }
    let count = name_utf16.len().div_ceil(LFN_CHARS_PER_ENTRY).max(1);
    let checksum = short.checksum();

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * LFN_CHARS_PER_ENTRY;
        let end = ((i + 1) * LFN_CHARS_PER_ENTRY).min(name_utf16.len());
        let chunk = &name_utf16[start..end];

        let mut units = [0xFFFFu16; LFN_CHARS_PER_ENTRY];
        units[..chunk.len()].copy_from_slice(chunk);
        if end == name_utf16.len() && chunk.len() < LFN_CHARS_PER_ENTRY {
            units[chunk.len()] = 0x0000;
        }

        out.push(LfnEntry {
            order: (i + 1) as u8,
            last: i + 1 == count,
            units,
            checksum,
        });
    }

    out.reverse();
    Some(out)
}

/// Boot-sector / root-entry form of a volume label: uppercased, invalid
/// characters replaced, space-padded to 11 bytes. Blank labels yield `None`.
pub fn volume_label_bytes(label: &str) -> Option<[u8; 11]> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    let mut raw = [b' '; 11];
    for (dst, ch) in raw.iter_mut().zip(label.chars()) {
        let up = if ch.is_ascii() {
            ch.to_ascii_uppercase() as u8
        } else {
            0
        };
        *dst = if up == b' ' || is_valid_sfn_char(up) {
            up
        } else {
            b'_'
        };
    }
    Some(raw)
}
