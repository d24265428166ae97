use pdfcore::document::{ErrorHandling, LoadOptions, SaveOptions, Version};
use pdfcore::encryption::Permissions;
use pdfcore::{Dictionary, Document, Object};

fn minimal_document() -> Document {
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

    let mut greeting = Dictionary::new();
    greeting.set("Plain", Object::String(b"Hello, World".to_vec(), pdfcore::StringFormat::Literal));
    doc.objects.insert((3, 0), Object::Dictionary(greeting));

    doc
}

fn save_encrypted(doc: &Document, version: Version) -> Vec<u8> {
    doc.save_with_options(SaveOptions {
        version,
        user_password: Some("user".to_string()),
        owner_password: Some("owner".to_string()),
        permissions: Permissions::all(),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn encrypted_bytes_differ_from_plaintext_on_disk() {
    let doc = minimal_document();
    let bytes = save_encrypted(&doc, Version::V1_0);
    let haystack = String::from_utf8_lossy(&bytes);
    assert!(!haystack.contains("Hello, World"), "plaintext string leaked into the encrypted file");
}

#[test]
fn correct_password_recovers_the_plaintext_string() {
    let doc = minimal_document();
    let bytes = save_encrypted(&doc, Version::V1_0);

    let reloaded = Document::load_mem_with_password(&bytes, "user").unwrap();
    let greeting = reloaded.get_object((3, 0)).unwrap().as_dict().unwrap();
    let plain = greeting.get(b"Plain").unwrap().as_str().unwrap();
    assert_eq!(plain, b"Hello, World");
}

#[test]
fn wrong_password_is_rejected() {
    let doc = minimal_document();
    let bytes = save_encrypted(&doc, Version::V1_0);

    let result = Document::load_mem_with_options(
        &bytes,
        LoadOptions {
            password_callback: Some(Box::new(|_, _| Some("not-it".to_string()))),
            error_handling: ErrorHandling::Strict,
        },
    );
    assert!(result.is_err());
}

#[test]
fn aes_revision_round_trips_too() {
    let doc = minimal_document();
    let bytes = save_encrypted(&doc, Version::V1_7);

    let reloaded = Document::load_mem_with_password(&bytes, "user").unwrap();
    let greeting = reloaded.get_object((3, 0)).unwrap().as_dict().unwrap();
    assert_eq!(greeting.get(b"Plain").unwrap().as_str().unwrap(), b"Hello, World");
}
