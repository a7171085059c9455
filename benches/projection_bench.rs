//! Projection Benchmarks — Export Grid Throughput
//!
//! Benchmarks the pure projection path (sort + pivot) and the
//! in-memory store round trip over snapshots of realistic size.
//!
//! Run with: cargo bench --bench projection_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::NaiveDate;
use tariff_sync::adapters::persistence::InMemoryTariffStore;
use tariff_sync::domain::export::{project, ColumnContract};
use tariff_sync::domain::tariff::{NewTariffRow, StoredTariff, TariffFields};
use tariff_sync::ports::tariff_store::TariffStore;
use tariff_sync::usecases::ExportProjector;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 25).unwrap_or_default()
}

/// Fields with a coefficient that varies pseudo-randomly per row.
fn fields(i: usize) -> TariffFields {
    let coef = (i * 7919) % 2000;
    TariffFields {
        box_delivery_base: Some("46".to_string()),
        box_delivery_coef_expr: if i % 17 == 0 {
            Some("-".to_string())
        } else {
            Some(format!("{},{}", coef / 10, coef % 10))
        },
        box_delivery_liter: Some("14".to_string()),
        geo_name: Some("Центральный федеральный округ".to_string()),
        ..TariffFields::default()
    }
}

fn snapshot(n: usize) -> Vec<StoredTariff> {
    (0..n)
        .map(|i| StoredTariff {
            id: i as i64 + 1,
            date: day(),
            warehouse_id: i as i32 + 1,
            warehouse_name: format!("Склад {i}"),
            fields: fields(i),
        })
        .collect()
}

/// Benchmark sort + pivot for growing snapshot sizes.
fn bench_project(c: &mut Criterion) {
    let contract = ColumnContract::default();
    let mut group = c.benchmark_group("project");

    for n in [100, 1_000, 10_000] {
        let rows = snapshot(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| project(black_box(rows.clone()), &contract));
        });
    }

    group.finish();
}

/// Benchmark load + project through the use case over the memory store.
fn bench_projector(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = std::sync::Arc::new(InMemoryTariffStore::new());

    runtime.block_on(async {
        let names: Vec<String> = (0..1_000).map(|i| format!("Склад {i}")).collect();
        let ids = store.reconcile_warehouses(&names).await.unwrap();
        let rows: Vec<NewTariffRow> = names
            .iter()
            .enumerate()
            .map(|(i, name)| NewTariffRow {
                warehouse_id: ids[name],
                fields: fields(i),
            })
            .collect();
        store.replace_snapshot(day(), &rows).await.unwrap();
    });

    let projector = ExportProjector::new(store, ColumnContract::default());
    c.bench_function("projector_1000_rows", |b| {
        b.to_async(&runtime)
            .iter(|| async { projector.project(black_box(day())).await.unwrap() });
    });
}

criterion_group!(benches, bench_project, bench_projector);
criterion_main!(benches);
