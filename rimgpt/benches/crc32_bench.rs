// cargo bench -p rimgpt
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use rimgpt::crc32::{Crc32, crc32};
use rimgpt::{DiskParams, build_disk};

criterion_group!(benches, bench_crc, bench_build);
criterion_main!(benches);

fn bench_crc(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32");
    // 92-byte header, 128-entry array, 1 MiB
    for &len in &[92usize, 16 * 1024, 1 << 20] {
        let data: Vec<u8> = (0..len).map(|i| (i * 31) as u8).collect();
        group.throughput(Throughput::Bytes(len as u64));

        group.bench_with_input(BenchmarkId::new("table", len), &data, |b, data| {
            b.iter(|| std::hint::black_box(crc32(data)));
        });

        group.bench_with_input(BenchmarkId::new("table_streamed", len), &data, |b, data| {
            b.iter(|| {
                let mut h = Crc32::new();
                for chunk in data.chunks(512) {
                    h.update(chunk);
                }
                std::hint::black_box(h.finalize())
            });
        });

        group.bench_with_input(BenchmarkId::new("crc32fast", len), &data, |b, data| {
            b.iter(|| std::hint::black_box(crc32fast::hash(data)));
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_disk");
    group.sample_size(20);
    for &mib in &[2u64, 64] {
        let params = DiskParams::default().with_disk_size(mib << 20);
        group.bench_with_input(BenchmarkId::new("mib", mib), &params, |b, params| {
            b.iter(|| std::hint::black_box(build_disk(params).len()));
        });
    }
    group.finish();
}
