//! Markup codec benchmark: Measure decode/encode throughput.
//!
//! Target: < 5µs to decode a typical message

use backchannel::markup::{decode, encode, is_attention, MemoryDirectory};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn directory() -> MemoryDirectory {
    (0..100).fold(MemoryDirectory::new(), |directory, i| {
        directory
            .with_user(format!("U{i}"), format!("user{i}"))
            .with_channel(format!("C{i}"), format!("channel{i}"))
    })
}

fn decode_plain_text(c: &mut Criterion) {
    let directory = directory();
    let text = "just a plain line of chat without any markup in it at all";

    c.bench_function("decode_plain", |b| {
        b.iter(|| decode(black_box(text), &directory, Some("U1")));
    });
}

fn decode_tagged_message(c: &mut Criterion) {
    let directory = directory();
    let text = "<@U1> can you look at <#C2|channel2>? <!here> see \
                <https://example.com/runs/123|run 123> &amp; <@U99>";

    c.bench_function("decode_tagged", |b| {
        b.iter(|| decode(black_box(text), &directory, Some("U1")));
    });
}

fn decode_by_tag_count(c: &mut Criterion) {
    let directory = directory();
    let mut group = c.benchmark_group("decode_tags");

    for count in [1, 10, 50] {
        let text: String = (0..count).map(|i| format!("<@U{i}> &lt;hi&gt; ")).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |b, text| {
            b.iter(|| decode(black_box(text), &directory, None));
        });
    }

    group.finish();
}

fn encode_message(c: &mut Criterion) {
    let text = "if a < b && b > c then <ship it>";

    c.bench_function("encode", |b| {
        b.iter(|| encode(black_box(text)));
    });
}

fn attention_check(c: &mut Criterion) {
    let quiet = "nothing to see here, move along";
    let loud = "deploy failed, paging !oncall";

    c.bench_function("is_attention_miss", |b| {
        b.iter(|| is_attention(black_box(quiet)));
    });
    c.bench_function("is_attention_hit", |b| {
        b.iter(|| is_attention(black_box(loud)));
    });
}

criterion_group!(
    benches,
    decode_plain_text,
    decode_tagged_message,
    decode_by_tag_count,
    encode_message,
    attention_check
);
criterion_main!(benches);
