//! Detail page parsing throughput on the saved fixtures
//!
//! Each parse fans the field extractors out over the rayon pool, so the
//! numbers include the per-extractor document parse.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pokeca_collector::domain::{CardId, Regulation};
use pokeca_collector::infrastructure::config::CatalogConfig;
use pokeca_collector::infrastructure::parsing::{
    DetailPageParser, DetailParseContext, ListParseContext, RenderedDocument,
};
use pokeca_collector::infrastructure::ListPageParser;

const FIXTURES: [(&str, &str); 3] = [
    ("pokemon", include_str!("../tests/fixtures/detail_pokemon.html")),
    ("trainer", include_str!("../tests/fixtures/detail_trainer.html")),
    ("energy", include_str!("../tests/fixtures/detail_energy.html")),
];

fn context() -> DetailParseContext {
    DetailParseContext {
        card_id: CardId::parse("45123").unwrap(),
        regulation: Regulation::SV,
        detail_url: "https://www.pokemon-card.com/card-search/details.php/card/45123/regu/SV/".to_string(),
        image_url: None,
    }
}

fn result_page(cards: usize) -> String {
    let items: String = (1..=cards)
        .map(|n| format!(r#"<li><a href="/card-search/details.php/card/{n:05}/regu/SV/">card {n}</a></li>"#))
        .collect();
    format!("<html><body><ul class=\"SearchResultList\">{items}</ul></body></html>")
}

fn detail_parsing(c: &mut Criterion) {
    let parser = DetailPageParser::new().unwrap();
    let ctx = context();

    let mut group = c.benchmark_group("detail_page");
    for (kind, html) in FIXTURES {
        group.bench_function(kind, |b| b.iter(|| parser.parse(black_box(html), &ctx)));
    }
    group.finish();
}

fn list_parsing(c: &mut Criterion) {
    let parser = ListPageParser::new().unwrap();
    let ctx = ListParseContext::new(Regulation::SV, CatalogConfig::default());
    let html = result_page(39);

    c.bench_function("result_page_39_links", |b| {
        b.iter(|| {
            let document = RenderedDocument::parse(black_box(&html), None);
            parser.parse(&document, &ctx)
        });
    });
}

criterion_group!(benches, detail_parsing, list_parsing);
criterion_main!(benches);
