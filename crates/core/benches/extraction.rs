use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use gleaner_core::{
    Document, ElementHeuristics, HtmlPage, Locator, Record, SiteProfile, discover_selector, extract_page,
    preprocess_html, reconcile,
};

fn read_site(site: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/sites/{site}/search.html")).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for site in ["portal-a", "portal-b", "portal-c"] {
        let html = read_site(site);
        group.bench_with_input(BenchmarkId::new("document", site), &html, |b, html| {
            b.iter(|| Document::parse(black_box(html)))
        });
        group.bench_with_input(BenchmarkId::new("page", site), &html, |b, html| {
            b.iter(|| HtmlPage::parse(black_box(html)))
        });
    }

    group.finish();
}

fn bench_preprocess(c: &mut Criterion) {
    let html = read_site("portal-c");
    let config = Default::default();

    c.bench_function("preprocess", |b| b.iter(|| preprocess_html(black_box(&html), &config)));
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");
    let locator = Locator::default();

    for site in ["portal-a", "portal-b"] {
        let page = HtmlPage::parse(&read_site(site)).unwrap();
        group.bench_function(site, |b| b.iter(|| locator.locate(black_box(&page))));
    }

    group.finish();
}

fn bench_discover_selector(c: &mut Criterion) {
    let page = HtmlPage::preprocessed(&read_site("portal-c")).unwrap();
    let heuristics = ElementHeuristics::default();

    c.bench_function("discover_selector", |b| b.iter(|| discover_selector(black_box(&page), &heuristics)));
}

fn bench_full_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_extraction");
    let profile = SiteProfile::new();

    for site in ["portal-a", "portal-b", "portal-c"] {
        let page = HtmlPage::preprocessed(&read_site(site)).unwrap();
        group.bench_function(site, |b| b.iter(|| extract_page(black_box(&page), &profile)));
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let records: Vec<Record> = (0..2_000)
        .map(|i| {
            let value = serde_json::json!({
                "id": i,
                "address": format!("{} Mill Lane, Leeds", i % 700),
                "postcode": "LS1 4AB",
                "price": 900 + i % 50,
                "description": "x".repeat(i % 40),
                "images": [format!("https://img.example.com/{i}.jpg")],
                "source": if i % 2 == 0 { "portal-a" } else { "portal-b" },
            });
            serde_json::from_value(value).unwrap()
        })
        .collect();

    c.bench_function("reconcile_2000", |b| b.iter(|| reconcile(black_box(records.clone()))));
}

criterion_group!(
    benches,
    bench_parse,
    bench_preprocess,
    bench_locate,
    bench_discover_selector,
    bench_full_extraction,
    bench_reconcile
);
criterion_main!(benches);
