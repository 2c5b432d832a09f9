use criterion::{criterion_group, criterion_main, Criterion};
use fancyline::{
    complete::Completer,
    config::Settings,
    style::Palette,
    value::{Namespace, Value},
};
use std::rc::Rc;

fn wide_namespace() -> Namespace {
    (0..1000)
        .map(|i| (format!("var_{:04}", i), Value::Int(i)))
        .collect()
}

fn colored_completer() -> Completer {
    Completer::new(Rc::new(Settings {
        use_colors: true,
        consider_getitems: true,
        palette: Palette::default(),
    }))
}

fn bench_global_listing(c: &mut Criterion) {
    c.bench_function("global_listing_100_of_1000", |bench| {
        let namespace = wide_namespace();
        let completer = colored_completer();
        bench.iter(|| completer.complete(&namespace, "var_00"))
    });
}

fn bench_global_reduction(c: &mut Criterion) {
    c.bench_function("global_reduction_1000", |bench| {
        let namespace = wide_namespace();
        let completer = colored_completer();
        bench.iter(|| completer.complete(&namespace, "v"))
    });
}

fn bench_attr_listing(c: &mut Criterion) {
    c.bench_function("attr_listing_dunders", |bench| {
        let namespace = wide_namespace();
        let completer = colored_completer();
        bench.iter(|| completer.complete(&namespace, "var_0001.__"))
    });
}

criterion_group!(
    benches,
    bench_global_listing,
    bench_global_reduction,
    bench_attr_listing,
);
criterion_main!(benches);
