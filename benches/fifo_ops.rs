//! Benchmarks for queue operations and the recovery scan.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use eefifo::{Fifo, RamStorage};

const CYCLES: u64 = 1_000;

fn bench_push_pop_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop_cycle");

    for &record_size in &[1usize, 16, 64, 127] {
        group.throughput(Throughput::Bytes(CYCLES * record_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(record_size),
            &record_size,
            |b, &record_size| {
                let record = vec![0xA5u8; record_size];
                let mut buf = [0u8; 128];
                let mut fifo = Fifo::new(RamStorage::<257>::new()).unwrap();
                fifo.format().unwrap();

                b.iter(|| {
                    for _ in 0..CYCLES {
                        fifo.push(black_box(&record)).unwrap();
                        let n = fifo.pop(&mut buf).unwrap();
                        black_box(&buf[..n]);
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_backlog_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("backlog_churn");
    group.throughput(Throughput::Elements(CYCLES));

    // Steady state with a standing backlog: every push wraps eventually
    // and every pop leaves a free block for later coalescing.
    group.bench_function("eight_byte_records", |b| {
        let record = [0x5Au8; 8];
        let mut buf = [0u8; 16];
        let mut fifo = Fifo::new(RamStorage::<257>::new()).unwrap();
        fifo.format().unwrap();
        for _ in 0..12 {
            fifo.push(&record).unwrap();
        }

        b.iter(|| {
            for _ in 0..CYCLES {
                fifo.push(black_box(&record)).unwrap();
                let n = fifo.pop(&mut buf).unwrap();
                black_box(&buf[..n]);
            }
        });
    });

    group.finish();
}

fn bench_recovery_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("recovery_scan");

    // The scan cost is dominated by the block count, so measure a ring of
    // many small records against one of a few large ones.
    group.bench_function("many_small_blocks", |b| {
        let mut fifo = Fifo::new(RamStorage::<257>::new()).unwrap();
        fifo.format().unwrap();
        while fifo.push(&[0u8; 1]).is_ok() {}
        let image = *fifo.storage().bytes();

        b.iter(|| {
            let mut revived = Fifo::new(RamStorage::from_bytes(black_box(image))).unwrap();
            revived.begin().unwrap();
            black_box(revived.cursors());
        });
    });

    group.bench_function("few_large_blocks", |b| {
        let mut fifo = Fifo::new(RamStorage::<257>::new()).unwrap();
        fifo.format().unwrap();
        while fifo.push(&[0u8; 64]).is_ok() {}
        let image = *fifo.storage().bytes();

        b.iter(|| {
            let mut revived = Fifo::new(RamStorage::from_bytes(black_box(image))).unwrap();
            revived.begin().unwrap();
            black_box(revived.cursors());
        });
    });

    group.finish();
}

fn bench_read_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_sweep");

    group.bench_function("sweep_and_restart", |b| {
        let mut fifo = Fifo::new(RamStorage::<257>::new()).unwrap();
        fifo.format().unwrap();
        while fifo.push(&[0x3Cu8; 8]).is_ok() {}
        let mut buf = [0u8; 16];

        b.iter(|| {
            while let Ok(n) = fifo.read(&mut buf) {
                black_box(&buf[..n]);
            }
            fifo.restart_read();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_push_pop_cycle,
    bench_backlog_churn,
    bench_recovery_scan,
    bench_read_sweep
);
criterion_main!(benches);
