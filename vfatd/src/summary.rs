// SPDX-License-Identifier: MIT

use core::fmt;

use vfatfs::prelude::*;

use crate::utils::{ellipsize, pretty_bytes, sep_u64};

/// Geometry table printed before serving.
pub struct VolumeSummary<'a>(pub &'a Volume);

impl fmt::Display for VolumeSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let volume = self.0;
        let geo = volume.geometry();
        let rows = [
            ("Label", volume.volume_label().unwrap_or_else(|| "-".into())),
            ("Image size", pretty_bytes(volume.image_size())),
            ("Sectors", sep_u64(geo.total_sectors as u64)),
            ("Cluster size", pretty_bytes(geo.bytes_per_cluster as u64)),
            ("Clusters", sep_u64(geo.cluster_count as u64)),
            ("Used clusters", sep_u64(volume.used_clusters() as u64)),
            ("FAT start sector", sep_u64(geo.fat_start_sector as u64)),
            ("FAT sectors", sep_u64(geo.fat_size_sectors as u64)),
            ("Data start sector", sep_u64(geo.data_start_sector as u64)),
            ("Metadata", pretty_bytes(volume.metadata().len() as u64)),
            ("Files", sep_u64(volume.files().len() as u64)),
        ];

        writeln!(f, "\n  ┌────────────────────┬──────────────────┐")?;
        for (key, value) in rows {
            writeln!(f, "  | {key:<18} | {value:>16} |")?;
        }
        writeln!(f, "  └────────────────────┴──────────────────┘")
    }
}

/// Per-file window listing, for `inspect --files`.
pub struct WindowTable<'a>(pub &'a Volume);

impl fmt::Display for WindowTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "\n  ┌──────────┬──────────────────┬────────────┬──────────────────────────────┐"
        )?;
        writeln!(
            f,
            "  | Cluster  | Address          | Size       | Path                         |"
        )?;
        writeln!(
            f,
            "  ├──────────┼──────────────────┼────────────┼──────────────────────────────┤"
        )?;
        for w in self.0.files() {
            writeln!(
                f,
                "  | {c:>8} | {a:#016x} | {s:>10} | {p:<28} |",
                c = w.first_cluster,
                a = w.begin,
                s = pretty_bytes(w.size),
                p = ellipsize(&w.path.display().to_string(), 28),
            )?;
        }
        writeln!(
            f,
            "  └──────────┴──────────────────┴────────────┴──────────────────────────────┘"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_tables_render() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"abc").unwrap();
        let volume = Volume::build(dir.path(), &BuildOptions::default().with_label("demo")).unwrap();

        let summary = VolumeSummary(&volume).to_string();
        assert!(summary.contains("DEMO"));
        assert!(summary.contains("65 525"));

        let table = WindowTable(&volume).to_string();
        assert!(table.contains("a.txt"));
        assert!(table.contains("3 B"));
    }
}
