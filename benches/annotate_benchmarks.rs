//! Performance benchmarks for annotation
//!
//! Targets:
//! - Escaping: linear in input size
//! - Annotation: <1ms for a 2KB toy-language source
//! - Cache hit: no engine work at all

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prismatic::text::escape_html;
use prismatic::{AnnotateOptions, Annotator, Capture, HighlightSettings, Highlighter, Registry, Rule};

fn toy_registry() -> Registry {
    let mut registry = Registry::new();
    registry.extend(
        "css",
        vec![
            Rule::new("support.property", r"\b(color|margin|padding)\b").unwrap(),
            Rule::new("constant.numeric", r"\d+(px|em)?").unwrap(),
        ],
        None,
    );
    registry.extend(
        "toy",
        vec![
            Rule::new("comment", r"//[^\n]*").unwrap(),
            Rule::new("string", r#""[^"]*""#).unwrap(),
            Rule::new("keyword", r"\b(if|else|return|let|fn)\b").unwrap(),
            Rule::new("number", r"\d+").unwrap(),
            Rule::builder()
                .name("style")
                .pattern(r"css\{([^}]*)\}")
                .capture(1, Capture::language("css"))
                .build()
                .unwrap(),
        ],
        None,
    );
    registry
}

fn source(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("let x{i} = if a < {i} {{ \"s{i}\" }} else {{ css{{margin: {i}px}} }}; // note {i}\n"))
        .collect()
}

fn bench_escape(c: &mut Criterion) {
    let mut group = c.benchmark_group("escape_html");

    for lines in [10, 100, 1000] {
        let code = source(lines);
        group.throughput(Throughput::Bytes(code.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &code, |b, code| {
            b.iter(|| escape_html(black_box(code)));
        });
    }

    group.finish();
}

fn bench_annotate(c: &mut Criterion) {
    let registry = toy_registry();
    let options = AnnotateOptions::default();
    let annotator = Annotator::new(&registry, &options);
    let mut group = c.benchmark_group("annotate");

    for lines in [10, 100, 1000] {
        let code = source(lines);
        group.throughput(Throughput::Bytes(code.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &code, |b, code| {
            b.iter(|| annotator.annotate(black_box(code), "toy"));
        });
    }

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let highlighter = Highlighter::with_settings(HighlightSettings::default());
    let registry = toy_registry();
    for language in registry.languages() {
        let rules = registry.resolve(language).into_iter().cloned().collect();
        highlighter.extend(language, rules, None);
    }
    let code = source(100);
    highlighter.color_sync(&code, "toy");

    c.bench_function("color_sync_cached", |b| {
        b.iter(|| highlighter.color_sync(black_box(&code), "toy"));
    });
}

criterion_group!(benches, bench_escape, bench_annotate, bench_cache);
criterion_main!(benches);
