use std::collections::BTreeMap;

use criterion::{Criterion, criterion_group, criterion_main};

use pdfcore::object_stream::ObjectStream;
use pdfcore::{Dictionary, Object, ObjectId};

fn sample_objects() -> BTreeMap<ObjectId, Object> {
    let mut objects = BTreeMap::new();
    for i in 1..=100 {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"TestObj".to_vec()));
        dict.set("Value", Object::Integer(i));
        objects.insert((i as u32, 0), Object::Dictionary(dict));
    }
    objects
}

fn bench_object_stream_compress(c: &mut Criterion) {
    let _ = env_logger::try_init();
    let objects = sample_objects();
    c.bench_function("object_stream_compress", |b| {
        b.iter(|| {
            let refs: Vec<(ObjectId, &Object)> = objects.iter().map(|(id, o)| (*id, o)).collect();
            let mut stream = ObjectStream::encode(&refs).unwrap();
            stream.compress();
        })
    });
}

fn bench_object_stream_parse(c: &mut Criterion) {
    let objects = sample_objects();
    let refs: Vec<(ObjectId, &Object)> = objects.iter().map(|(id, o)| (*id, o)).collect();
    let mut stream = ObjectStream::encode(&refs).unwrap();
    stream.compress();

    c.bench_function("object_stream_parse", |b| {
        b.iter(|| {
            let mut stream = stream.clone();
            let _ = ObjectStream::new(&mut stream).unwrap();
        })
    });
}

criterion_group!(benches, bench_object_stream_compress, bench_object_stream_parse);
criterion_main!(benches);
