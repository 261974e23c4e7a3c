use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cartstock_catalog::{NewProduct, Pricing, Product};
use cartstock_core::{CustomerId, Money, ProductCode, VendorId};
use cartstock_infra::store::{InMemoryCartStore, InMemoryCatalogStore};
use cartstock_infra::ReservationEngine;
use std::sync::Arc;
use std::thread;

type Engine = ReservationEngine<Arc<InMemoryCatalogStore>, Arc<InMemoryCartStore>>;

fn engine_with_stock(codes: &[ProductCode], stock: u32) -> Engine {
    let catalog = Arc::new(InMemoryCatalogStore::new());
    for code in codes {
        let product = Product::new(NewProduct {
            code: code.clone(),
            vendor_id: VendorId::new(),
            title: format!("Bench {code}"),
            category: "bench".to_string(),
            pic_url: None,
            pricing: Pricing {
                price: Money::from_minor(1000),
                discount_price: Money::ZERO,
                discount_note: None,
            },
            available_quantity: stock,
        })
        .unwrap();
        catalog.upsert(product).unwrap();
    }
    ReservationEngine::new(catalog, Arc::new(InMemoryCartStore::new()))
}

/// Full add → adjust → release cycle for one customer line.
fn bench_line_lifecycle(c: &mut Criterion) {
    let code = ProductCode::parse("BENCH-1").unwrap();
    let engine = engine_with_stock(std::slice::from_ref(&code), u32::MAX / 2);

    c.bench_function("line_lifecycle", |b| {
        b.iter(|| {
            let item = engine
                .reserve_for_add(CustomerId::new(), black_box(&code), 2)
                .unwrap();
            engine.adjust_quantity(item.id_typed(), 5).unwrap();
            engine.release(item.id_typed()).unwrap();
        });
    });
}

/// Clearing carts of growing size.
fn bench_release_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("release_all");

    for lines in [1usize, 10, 50].iter() {
        let codes: Vec<ProductCode> = (0..*lines)
            .map(|i| ProductCode::parse(format!("P-{i}")).unwrap())
            .collect();
        let engine = engine_with_stock(&codes, u32::MAX / 2);

        group.throughput(Throughput::Elements(*lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), lines, |b, _| {
            b.iter(|| {
                let customer = CustomerId::new();
                for code in &codes {
                    engine.reserve_for_add(customer, code, 1).unwrap();
                }
                black_box(engine.release_all(customer).unwrap());
            });
        });
    }

    group.finish();
}

/// Many threads reserving the same product (lock contention on one row).
fn bench_contended_reservations(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_reservations");

    for threads in [2usize, 8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(threads), threads, |b, &threads| {
            b.iter(|| {
                let code = ProductCode::parse("HOT").unwrap();
                let engine = Arc::new(engine_with_stock(std::slice::from_ref(&code), 64));
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let engine = engine.clone();
                        let code = code.clone();
                        thread::spawn(move || {
                            for _ in 0..16 {
                                let _ = engine.reserve_for_add(CustomerId::new(), &code, 1);
                            }
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_line_lifecycle,
    bench_release_all,
    bench_contended_reservations
);
criterion_main!(benches);
