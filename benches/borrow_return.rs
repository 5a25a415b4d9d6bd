use commons_objectpool::{FnFactory, GenericObjectPool, PoolConfiguration};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::thread;

fn buffer_pool(max_total: usize) -> GenericObjectPool<Vec<u8>> {
    let config = PoolConfiguration::new()
        .with_max_total(max_total)
        .with_max_idle(max_total);
    GenericObjectPool::new(FnFactory::new(|| Ok(vec![0u8; 1024])), config).unwrap()
}

/// Benchmark the hot path: an idle object is always available
fn bench_borrow_return(c: &mut Criterion) {
    let pool = buffer_pool(8);
    pool.add_object().unwrap();

    c.bench_function("borrow_return_idle", |b| {
        b.iter(|| {
            let buf = pool.borrow_object().unwrap();
            black_box(buf.len());
        })
    });
}

/// Benchmark borrow/return with several threads sharing a small pool
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");

    for threads in [2usize, 4, 8] {
        group.bench_function(format!("{}_threads", threads), |b| {
            let pool = Arc::new(buffer_pool(2));
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let pool = Arc::clone(&pool);
                        thread::spawn(move || {
                            for _ in 0..100 {
                                let buf = pool.borrow_object().unwrap();
                                black_box(buf.len());
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_borrow_return, bench_contended);
criterion_main!(benches);
