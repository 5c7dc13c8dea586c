use criterion::{criterion_group, criterion_main, Criterion};

use gitslice_landing::check::{self, Step};
use gitslice_landing::{BrowserConfig, Engine};

fn bench_render_page(c: &mut Criterion) {
    c.bench_function("render_page", |b| {
        b.iter(|| gitslice_landing::page::render_page().unwrap())
    });
}

// Runs every assertion of the landing script against an already loaded page
fn bench_assertions(c: &mut Criterion) {
    let html = gitslice_landing::page::render_page().unwrap();
    let mut engine = gitslice_landing::new_engine(BrowserConfig::default()).unwrap();
    engine.load_html("http://localhost/", &html).unwrap();

    let locators: Vec<_> = check::landing_script()
        .steps()
        .iter()
        .filter_map(|s| match s {
            Step::ExpectVisible(l) => Some(l.clone()),
            _ => None,
        })
        .collect();

    c.bench_function("landing_assertions", |b| {
        b.iter(|| {
            for l in &locators {
                let _ = engine.any_visible(l).unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_render_page, bench_assertions);
criterion_main!(benches);
