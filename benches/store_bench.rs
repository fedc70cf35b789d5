//! Benchmarks for core table operations

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memdb::{EntryHeader, NumericalVariant, Record, Store, VariantKind};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Sample {
    header: EntryHeader,
    uid: u32,
    payload: [u32; 6],
}

impl Record for Sample {
    fn header(&self) -> &EntryHeader {
        &self.header
    }
    fn header_mut(&mut self) -> &mut EntryHeader {
        &mut self.header
    }
}

fn sample(uid: u32) -> Sample {
    let mut s = Sample::zeroed();
    s.uid = uid;
    s
}

fn populated_store(count: u32) -> Store {
    let store = Store::new();
    let t = store.create_table_for::<Sample>("samples").unwrap();
    for uid in 0..count {
        store.insert(t, &sample(uid)).unwrap();
    }
    store
}

fn insert_benchmark(c: &mut Criterion) {
    c.bench_function("insert_10k", |b| {
        b.iter(|| {
            let store = Store::new();
            let t = store
                .create_table_with_capacity(
                    "samples",
                    std::mem::size_of::<Sample>(),
                    std::mem::align_of::<Sample>(),
                    16 * 1024,
                )
                .unwrap();
            for uid in 0..10_000u32 {
                store.insert(t, black_box(&sample(uid))).unwrap();
            }
        })
    });
}

fn scan_find_benchmark(c: &mut Criterion) {
    let store = populated_store(10_000);
    let t = store.find_table("samples").unwrap();

    c.bench_function("scan_find_10k", |b| {
        b.iter(|| {
            let target = black_box(9_999u32);
            store.find_one(t, |s: &Sample| s.uid == target).unwrap()
        })
    });
}

fn indexed_find_benchmark(c: &mut Criterion) {
    let store = populated_store(10_000);
    let t = store.find_table("samples").unwrap();
    store.create_index(t, VariantKind::U32, 8, false).unwrap();

    c.bench_function("indexed_find_10k", |b| {
        b.iter(|| {
            store
                .find_one_indexed(t, black_box(NumericalVariant::U32(9_999)), 8)
                .unwrap()
        })
    });
}

fn select_benchmark(c: &mut Criterion) {
    let store = populated_store(10_000);
    let t = store.find_table("samples").unwrap();
    let id = store.find_one(t, |s: &Sample| s.uid == 5_000).unwrap().unwrap();

    c.bench_function("select_by_id", |b| {
        b.iter(|| {
            store
                .select(t, black_box(id), |s: &Sample| s.payload[0])
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    insert_benchmark,
    scan_find_benchmark,
    indexed_find_benchmark,
    select_benchmark
);
criterion_main!(benches);
