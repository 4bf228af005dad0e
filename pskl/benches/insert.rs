use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use pskl::{PersistentSkipList, PslConfig};

fn bench_insert(c: &mut Criterion) {
    c.bench_function("insert 10k ascending", |b| {
        b.iter_batched(
            || PersistentSkipList::with_config(PslConfig {
                seed: Some(7),
                ..Default::default()
            }),
            |mut list| {
                for i in 0..10_000i64 {
                    list.insert(black_box(i)).unwrap();
                }
                list
            },
            BatchSize::LargeInput,
        );
    });

    c.bench_function("insert 10k then tick every 100", |b| {
        b.iter_batched(
            || PersistentSkipList::with_config(PslConfig {
                seed: Some(7),
                ..Default::default()
            }),
            |mut list| {
                for i in 0..10_000i64 {
                    list.insert(black_box(i)).unwrap();
                    if i % 100 == 0 {
                        list.tick().unwrap();
                    }
                }
                list
            },
            BatchSize::LargeInput,
        );
    });

    c.bench_function("locate in 10k list", |b| {
        let mut list = PersistentSkipList::with_config(PslConfig {
            seed: Some(7),
            ..Default::default()
        });
        for i in 0..10_000i64 {
            list.insert(i).unwrap();
        }
        let present = list.present();
        b.iter(|| list.locate(present, black_box(&5_000)).unwrap().data().copied());
    });
}

criterion_group!(benches, bench_insert);
criterion_main!(benches);
