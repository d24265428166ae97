use pdfcore::cache::LruCache;
use pdfcore::document::Version;
use pdfcore::object::Object;
use pdfcore::{Dictionary, Document};

/// Rectangle round-trip: a `[1.11 2.22 3.33 4.44]` array survives a save
/// and reload with its components intact to within 5e-3.
#[test]
fn rectangle_array_round_trips_within_tolerance() {
    let mut doc = Document::new(Version::V1_7);

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![Object::Reference((3, 0))]));
    pages.set("Count", Object::Integer(1));
    doc.objects.insert((2, 0), Object::Dictionary(pages));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference((2, 0)));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Real(1.11),
            Object::Real(2.22),
            Object::Real(3.33),
            Object::Real(4.44),
        ]),
    );
    doc.objects.insert((3, 0), Object::Dictionary(page));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference((2, 0)));
    doc.objects.insert((1, 0), Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference((1, 0)));

    let bytes = doc.save().unwrap();
    let reloaded = Document::load_mem(&bytes).unwrap();
    let page = reloaded.get_object((3, 0)).unwrap().as_dict().unwrap();
    let rect = page.get(b"MediaBox").unwrap().as_array().unwrap();

    let expected = [1.11, 2.22, 3.33, 4.44];
    for (component, want) in rect.iter().zip(expected) {
        let got = component.as_f64().unwrap();
        assert!((got - want).abs() < 5e-3, "{got} not within 5e-3 of {want}");
    }
}

/// A capacity-12 cache: refs 0..=9 go in, ref 0 is kept alive by repeated
/// access, and enough later traffic arrives to force exactly one eviction.
/// The least-recently-touched entry (ref 1, never re-accessed) is the one
/// that goes; everything touched more recently survives.
#[test]
fn lru_keeps_recently_touched_entries_and_evicts_the_rest() {
    let mut cache = LruCache::new(12);
    for id in 0u32..10 {
        cache.put((id, 0), Object::Integer(id as i64));
    }

    assert!(cache.get((0, 0)).is_some(), "ref 0 must hit right after insertion");

    cache.put((10, 0), Object::Integer(10));
    cache.put((11, 0), Object::Integer(11));
    cache.put((12, 0), Object::Integer(12));

    assert!(cache.get((1, 0)).is_none(), "ref 1 was never re-accessed and should have been evicted");
    for id in [0u32, 2, 3, 4, 5, 6, 7, 8, 9] {
        assert!(cache.get((id, 0)).is_some(), "ref {id} should still be resident");
    }
}
