use criterion::{Criterion, criterion_group, criterion_main};

use pdfcore::document::{SaveOptions, Version};
use pdfcore::{Dictionary, Document, Object};

fn sample_document() -> Document {
    let mut doc = Document::new(Version::V1_7);

    let page_ids: Vec<pdfcore::ObjectId> = (0..30).map(|i| (10 + i, 0)).collect();
    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    doc.objects.insert((2, 0), Object::Dictionary(pages));

    for &id in &page_ids {
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference((2, 0)));
        doc.objects.insert(id, Object::Dictionary(page));
    }

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference((2, 0)));
    doc.objects.insert((1, 0), Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference((1, 0)));

    doc
}

fn bench_save_classical(c: &mut Criterion) {
    let _ = env_logger::try_init();
    let doc = sample_document();
    c.bench_function("save_classical", |b| {
        b.iter(|| {
            doc.save_with_options(SaveOptions {
                version: Version::V1_4,
                use_xref_streams: Some(false),
                ..Default::default()
            })
            .unwrap();
        })
    });
}

fn bench_save_modern(c: &mut Criterion) {
    let doc = sample_document();
    c.bench_function("save_modern", |b| {
        b.iter(|| {
            doc.save_with_options(SaveOptions {
                version: Version::V1_7,
                use_xref_streams: Some(true),
                ..Default::default()
            })
            .unwrap();
        })
    });
}

criterion_group!(benches, bench_save_classical, bench_save_modern);
criterion_main!(benches);
