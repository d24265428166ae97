use criterion::{Criterion, criterion_group, criterion_main};

use pdfcore::document::Version;
use pdfcore::{Dictionary, Document, Object, ObjectId, Stream};

/// A handful of pages with real content streams, built once and reused
/// across iterations via its serialized bytes.
fn sample_pdf_bytes(page_count: u32) -> Vec<u8> {
    let mut doc = Document::new(Version::V1_5);

    let page_ids: Vec<ObjectId> = (0..page_count).map(|i| (10 + i, 0)).collect();
    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()));
    pages.set("Count", Object::Integer(page_count as i64));
    doc.objects.insert((2, 0), Object::Dictionary(pages));

    for &id in &page_ids {
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference((2, 0)));
        page.set("Contents", Object::Reference((id.0 + 1000, 0)));
        doc.objects.insert(id, Object::Dictionary(page));

        let content = b"BT /F1 12 Tf 72 720 Td (Hello, world.) Tj ET".to_vec();
        doc.objects.insert((id.0 + 1000, 0), Object::Stream(Stream::new(Dictionary::new(), content)));
    }

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference((2, 0)));
    doc.objects.insert((1, 0), Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference((1, 0)));

    doc.save().unwrap()
}

fn bench_load(c: &mut Criterion) {
    let _ = env_logger::try_init();
    let buffer = sample_pdf_bytes(20);
    c.bench_function("load", |b| {
        b.iter(|| {
            Document::load_mem(&buffer).unwrap();
        })
    });
}

fn bench_load_with_classical_xref(c: &mut Criterion) {
    let mut doc = Document::load_mem(&sample_pdf_bytes(20)).unwrap();
    doc.version = Version::V1_4;
    let buffer = doc.save().unwrap();

    c.bench_function("load_classical_xref", |b| {
        b.iter(|| {
            Document::load_mem(&buffer).unwrap();
        })
    });
}

criterion_group!(benches, bench_load, bench_load_with_classical_xref);
criterion_main!(benches);
