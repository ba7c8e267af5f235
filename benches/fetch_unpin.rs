use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bufpool::bp::prelude::*;
use bufpool::page::PageId;

const POOL_SIZE: usize = 64;
const NUM_PAGES: usize = 128; // working set twice the pool, so misses evict

fn setup_pool() -> (PoolForTest, Vec<PageId>) {
    let pool = get_test_pool(POOL_SIZE, 2);
    let mut ids = Vec::with_capacity(NUM_PAGES);
    for i in 0..NUM_PAGES {
        let frame = pool.new_page().unwrap();
        frame.write()[0] = i as u8;
        ids.push(frame.page_id());
        pool.unpin_page(frame.page_id(), true).unwrap();
    }
    (pool, ids)
}

fn fetch_hit_loop(pool: &PoolForTest, ids: &[PageId]) {
    // Touch only the first half of the working set; after warm-up every
    // fetch is a hit.
    for &id in &ids[..POOL_SIZE / 2] {
        let frame = pool.fetch_page(id).unwrap();
        black_box(frame.read()[0]);
        pool.unpin_page(id, false).unwrap();
    }
}

fn fetch_random_loop(pool: &PoolForTest, ids: &[PageId], rng: &mut StdRng) {
    for _ in 0..ids.len() {
        let id = ids[rng.gen_range(0..ids.len())];
        let frame = pool.fetch_page(id).unwrap();
        black_box(frame.read()[0]);
        pool.unpin_page(id, false).unwrap();
    }
}

fn bench_fetch_unpin(c: &mut Criterion) {
    let (pool, ids) = setup_pool();

    c.bench_function("fetch_unpin_hit", |b| {
        b.iter(|| fetch_hit_loop(&pool, &ids));
    });

    let mut rng = StdRng::seed_from_u64(42);
    c.bench_function("fetch_unpin_random", |b| {
        b.iter(|| fetch_random_loop(&pool, &ids, &mut rng));
    });
}

criterion_group!(benches, bench_fetch_unpin);
criterion_main!(benches);
