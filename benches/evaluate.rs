use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use chartops::datum::{Datum, FieldMap};
use chartops::ops::Evaluate;
use chartops::spec::{Extremum, Filter, FindExtremum, Nth, Operator, Side, Sort, SortOrder};

fn make_rows(count: usize) -> Vec<Datum> {
    (0..count)
        .map(|i| {
            let month = format!("{}-{:02}", 2000 + i / 12 % 50, i % 12 + 1);
            Datum::new(month, ((i * 7919) % 1000) as f64).with_group(format!("s{}", i % 4))
        })
        .collect()
}

fn bench_filter(c: &mut Criterion) {
    let fields = FieldMap::default();
    let rows = make_rows(10_000);
    let numeric = Filter::new("value", Operator::Gt, json!(500));
    let dates = Filter::new("target", Operator::Between, json!(["2010-01", "2020-12"]));

    c.bench_function("filter_gt_10k", |b| b.iter(|| black_box(numeric.evaluate(&rows, &fields))));
    c.bench_function("filter_between_dates_10k", |b| b.iter(|| black_box(dates.evaluate(&rows, &fields))));
}

fn bench_nth(c: &mut Criterion) {
    let fields = FieldMap::default();
    let rows = make_rows(10_000);
    let nth = Nth::new(3, Side::Right);

    c.bench_function("nth_10k", |b| b.iter(|| black_box(nth.evaluate(&rows, &fields))));
}

fn bench_extremum(c: &mut Criterion) {
    let fields = FieldMap::default();
    let small = make_rows(100);
    let large = make_rows(100_000);
    let max = FindExtremum::new("value", Extremum::Max);

    c.bench_function("extremum_100", |b| b.iter(|| black_box(max.evaluate(&small, &fields))));
    c.bench_function("extremum_100k", |b| b.iter(|| black_box(max.evaluate(&large, &fields))));
}

fn bench_sort(c: &mut Criterion) {
    let fields = FieldMap::default();
    let rows = make_rows(10_000);
    let by_date = Sort::new("target", SortOrder::Asc);

    c.bench_function("sort_dates_10k", |b| b.iter(|| black_box(by_date.evaluate(&rows, &fields))));
}

criterion_group!(benches, bench_filter, bench_nth, bench_extremum, bench_sort);
criterion_main!(benches);
