use criterion::{Criterion, criterion_group, criterion_main};

use pdfcore::document::{LoadOptions, Version};
use pdfcore::{Dictionary, Document, Object};

fn sample_pdf_bytes() -> Vec<u8> {
    let mut doc = Document::new(Version::V1_5);

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![Object::Reference((3, 0))]));
    pages.set("Count", Object::Integer(1));
    doc.objects.insert((2, 0), Object::Dictionary(pages));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference((2, 0)));
    doc.objects.insert((3, 0), Object::Dictionary(page));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference((2, 0)));
    doc.objects.insert((1, 0), Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference((1, 0)));

    doc.save().unwrap()
}

fn encrypted_pdf_bytes() -> Vec<u8> {
    let mut doc = Document::new(Version::V1_7);
    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![]));
    pages.set("Count", Object::Integer(0));
    doc.objects.insert((2, 0), Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference((2, 0)));
    doc.objects.insert((1, 0), Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference((1, 0)));

    doc.save_with_options(pdfcore::document::SaveOptions {
        version: Version::V1_7,
        owner_password: Some("owner".to_string()),
        ..Default::default()
    })
    .unwrap()
}

fn bench_load_large(c: &mut Criterion) {
    let _ = env_logger::try_init();
    let buffer = sample_pdf_bytes();
    c.bench_function("load_large", |b| {
        b.iter(|| {
            Document::load_mem(&buffer).unwrap();
        })
    });
}

fn bench_load_encrypted(c: &mut Criterion) {
    let buffer = encrypted_pdf_bytes();
    c.bench_function("load_encrypted", |b| {
        b.iter(|| {
            let _ = Document::load_mem_with_options(&buffer, LoadOptions::default());
        })
    });
}

criterion_group!(benches, bench_load_large, bench_load_encrypted);
criterion_main!(benches);
