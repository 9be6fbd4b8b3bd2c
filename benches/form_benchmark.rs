//! Performance benchmarks for the PDF form bridge
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lopdf::{dictionary, Document, Object};
use pdf_form_bridge::load_document;

/// One-page form with `count` text fields named `field_<i>`
fn text_form(count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let fields: Vec<Object> = (0..count)
        .map(|i| {
            Object::Reference(doc.add_object(dictionary! {
                "FT" => "Tx",
                "T" => Object::string_literal(format!("field_{}", i)),
                "V" => Object::string_literal(format!("value {}", i)),
            }))
        })
        .collect();
    let acroform = doc.add_object(dictionary! { "Fields" => fields });
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
        "AcroForm" => Object::Reference(acroform),
    });
    doc.trailer.set("Root", Object::Reference(catalog));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Benchmark parsing and classifying forms of increasing size
fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_form");

    for count in [10, 100, 1000] {
        let data = text_form(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("text_fields", count), &data, |b, data| {
            b.iter(|| {
                let form = load_document(black_box(data), None).unwrap();
                black_box(form.records().len());
            });
        });
    }

    group.finish();
}

/// Benchmark building controls, editing every field and saving
fn bench_fill_and_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_and_save");

    for count in [10, 100, 1000] {
        let data = text_form(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("text_fields", count), &data, |b, data| {
            b.iter(|| {
                let mut form = load_document(data, None).unwrap();
                let mut states = form.form_model().states();
                for state in states.iter_mut() {
                    state.value.push_str(" (edited)");
                }
                let saved = form.save(black_box(&states)).unwrap();
                black_box(saved.bytes.len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_load, bench_fill_and_save);

criterion_main!(benches);
