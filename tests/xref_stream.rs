use pdfcore::document::{SaveOptions, Version};
use pdfcore::{Dictionary, Document, Object};

fn document_with(object_count: u32) -> Document {
    let mut doc = Document::new(Version::V1_7);

    let kids: Vec<Object> = (0..object_count).map(|i| Object::Reference((10 + i, 0))).collect();
    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(kids));
    pages.set("Count", Object::Integer(object_count as i64));
    doc.objects.insert((2, 0), Object::Dictionary(pages));

    for i in 0..object_count {
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference((2, 0)));
        doc.objects.insert((10 + i, 0), Object::Dictionary(page));
    }

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference((2, 0)));
    doc.objects.insert((1, 0), Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference((1, 0)));

    doc
}

#[test]
fn xref_stream_offsets_match_object_headers_for_direct_objects() {
    // Streams can never be packed into an object stream (§4.6), so one
    // added here is guaranteed to stay a direct `Normal` xref entry even
    // though the rest of the document is written with object-stream
    // packing enabled.
    let mut doc = document_with(8);
    doc.objects.insert((50, 0), Object::Stream(pdfcore::Stream::new(Dictionary::new(), b"stream body".to_vec())));

    let bytes = doc
        .save_with_options(SaveOptions {
            version: Version::V1_7,
            use_xref_streams: Some(true),
            ..Default::default()
        })
        .unwrap();

    let reloaded = Document::load_mem(&bytes).unwrap();
    let entry = reloaded.reference_table.get(50).expect("entry present");
    let pdfcore::XrefEntry::Normal { offset, .. } = *entry else {
        panic!("expected a direct entry for the stream object");
    };
    let header = "50 0 obj";
    assert!(bytes[offset as usize..].starts_with(header.as_bytes()), "offset does not land on its header");
}

#[test]
fn eligible_objects_are_packed_into_an_object_stream() {
    let doc = document_with(8);
    let bytes = doc
        .save_with_options(SaveOptions {
            version: Version::V1_7,
            use_xref_streams: Some(true),
            ..Default::default()
        })
        .unwrap();

    let reloaded = Document::load_mem(&bytes).unwrap();
    let entry = reloaded.reference_table.get(1).expect("entry present");
    assert!(matches!(entry, pdfcore::XrefEntry::Compressed { .. }), "catalog should have been packed into an object stream");

    let catalog = reloaded.get_catalog().unwrap();
    assert!(catalog.has_type(b"Catalog"));
    assert_eq!(reloaded.page_count(), Some(8));
}

#[test]
fn classical_table_is_chosen_below_one_dot_five() {
    let doc = document_with(2);
    let bytes = doc
        .save_with_options(SaveOptions {
            version: Version::V1_4,
            ..Default::default()
        })
        .unwrap();

    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("\nxref\n"));
    assert!(!text.contains("/Type /XRef"));
}

#[test]
fn xref_stream_is_chosen_from_one_dot_five() {
    let doc = document_with(2);
    let bytes = doc
        .save_with_options(SaveOptions {
            version: Version::V1_5,
            ..Default::default()
        })
        .unwrap();

    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/Type /XRef"));
}

#[test]
fn xref_stream_payload_is_flate_compressed_with_a_predictor() {
    let doc = document_with(8);
    let bytes = doc
        .save_with_options(SaveOptions {
            version: Version::V1_7,
            use_xref_streams: Some(true),
            ..Default::default()
        })
        .unwrap();

    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/Filter /FlateDecode"), "xref stream must be Flate-compressed");
    assert!(text.contains("/Predictor 12"), "xref stream must use the PNG-Up predictor");

    // still has to round-trip cleanly through the normal loader
    let reloaded = Document::load_mem(&bytes).unwrap();
    assert_eq!(reloaded.page_count(), Some(8));
}
