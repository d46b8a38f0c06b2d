use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tc_compiler::{compile_list, ListConfig};

fn synthetic_list(lines: usize) -> String {
    let mut text = String::from("[Adblock Plus 2.0]\n! Title: synthetic\n");
    for i in 0..lines {
        match i % 4 {
            0 => text.push_str(&format!("||ads{}.example/banner/{}^$third-party\n", i % 5_000, i)),
            1 => text.push_str(&format!("||track{}.example^\n", i)),
            2 => text.push_str(&format!("example{}.com##.sponsored\n", i)),
            _ => text.push_str(&format!("@@||cdn{}.example^$script\n", i)),
        }
    }
    text
}

fn bench_compile(c: &mut Criterion) {
    let text = synthetic_list(80_000);
    let config = ListConfig::default();
    c.bench_function("compile_list_80k", |b| {
        b.iter(|| compile_list(black_box(&text), &config))
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
