use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::path::PathBuf;
use std::sync::Arc;

use vfatfs::prelude::*;

criterion_group!(benches, find_file_bench, read_range_bench);
criterion_main!(benches);

pub fn find_file_bench(c: &mut Criterion) {
    const CLUSTER: u64 = 16_384;
    let windows: Vec<VirtualFileWindow> = (0..100_000u64)
        .map(|i| VirtualFileWindow {
            path: PathBuf::from(format!("/bench/{i}")),
            begin: (i * 3 + 10) * CLUSTER,
            end: (i * 3 + 12) * CLUSTER,
            first_cluster: (i * 3 + 10) as u32,
            size: 2 * CLUSTER - 7,
        })
        .collect();
    let end = windows.last().map_or(0, |w| w.end);
    let index = FileIndex::new(windows);

    c.bench_function("find_file_sequential", |b| {
        let mut pos = 0u64;
        b.iter(|| {
            pos = (pos + 4096) % end;
            black_box(index.find_file(black_box(pos)))
        });
    });

    c.bench_function("find_file_scattered", |b| {
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        b.iter(|| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            black_box(index.find_file(black_box(state % end)))
        });
    });
}

pub fn read_range_bench(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir failed");
    for i in 0..64 {
        let content = vec![i as u8; 50_000 + i * 1_000];
        std::fs::write(dir.path().join(format!("file{i:02}.bin")), content).expect("write failed");
    }
    let volume = Arc::new(Volume::build(dir.path(), &BuildOptions::default()).expect("build failed"));
    let start = volume.metadata().len() as u64;
    let end = volume.files().last().map_or(start, |w| w.end);
    let mut dispatcher = Dispatcher::new(Arc::clone(&volume));
    let mut buf = vec![0u8; 64 * 1024];

    c.bench_function("read_range_sequential_64k", |b| {
        let mut pos = start;
        b.iter(|| {
            if pos >= end {
                pos = start;
            }
            let n = dispatcher.read_into(pos, &mut buf);
            pos += n as u64;
            black_box(n)
        });
    });
}
