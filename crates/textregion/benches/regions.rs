use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use std::io::{Read, Write};
use textregion::{DocumentInputStream, DocumentOutputStream, LineEnding, TextBuffer, TextRegion};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (textregion benchmark line)\n"
        ));
    }
    out
}

fn bench_add_scattered(c: &mut Criterion) {
    let text = large_text(10_000);
    c.bench_function("region_add/1k_disjoint", |b| {
        b.iter_batched(
            || TextBuffer::from_text(&text),
            |mut buffer| {
                let mut region = TextRegion::new(&buffer);
                // Reverse order forces inserts at the front of the list.
                for i in (0..1_000).rev() {
                    region.add(&mut buffer, i * 400, i * 400 + 100);
                }
                black_box(region.subregion_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_add_coalescing(c: &mut Criterion) {
    let text = large_text(10_000);
    c.bench_function("region_add/merge_1k_into_one", |b| {
        b.iter_batched(
            || {
                let mut buffer = TextBuffer::from_text(&text);
                let mut region = TextRegion::new(&buffer);
                for i in 0..1_000 {
                    region.add(&mut buffer, i * 400, i * 400 + 100);
                }
                (buffer, region)
            },
            |(mut buffer, mut region)| {
                region.add(&mut buffer, 0, 400_000);
                black_box(region.subregion_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_subtract_splitting(c: &mut Criterion) {
    let text = large_text(10_000);
    c.bench_function("region_subtract/split_500", |b| {
        b.iter_batched(
            || {
                let mut buffer = TextBuffer::from_text(&text);
                let mut region = TextRegion::new(&buffer);
                region.add(&mut buffer, 0, 500_000);
                (buffer, region)
            },
            |(mut buffer, mut region)| {
                for i in 0..500 {
                    region.subtract(&mut buffer, i * 1_000 + 10, i * 1_000 + 20);
                }
                black_box(region.subregion_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_normalize_after_edits(c: &mut Criterion) {
    let text = large_text(10_000);
    c.bench_function("region_normalize/after_100_deletes", |b| {
        b.iter_batched(
            || {
                let mut buffer = TextBuffer::from_text(&text);
                let mut region = TextRegion::new(&buffer);
                for i in 0..1_000 {
                    region.add(&mut buffer, i * 400, i * 400 + 100);
                }
                for i in 0..100 {
                    let at = i * 3_000 + 100;
                    buffer.delete(at..at + 300);
                }
                (buffer, region)
            },
            |(mut buffer, mut region)| {
                black_box(region.normalize(&mut buffer));
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_stream_load(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("stream_load/50k_lines_4k_chunks", |b| {
        b.iter(|| {
            let mut buffer = TextBuffer::new();
            {
                let mut out = DocumentOutputStream::new(&mut buffer);
                for chunk in text.as_bytes().chunks(4096) {
                    out.write_all(chunk).unwrap();
                }
                out.close().unwrap();
            }
            black_box(buffer.char_count());
        })
    });
}

fn bench_stream_save(c: &mut Criterion) {
    let buffer = TextBuffer::from_text(&large_text(50_000));
    c.bench_function("stream_save/50k_lines_crlf", |b| {
        b.iter(|| {
            let mut saved = Vec::with_capacity(4 << 20);
            DocumentInputStream::new(&buffer, LineEnding::CrLf)
                .read_to_end(&mut saved)
                .unwrap();
            black_box(saved.len());
        })
    });
}

criterion_group!(
    benches,
    bench_add_scattered,
    bench_add_coalescing,
    bench_subtract_splitting,
    bench_normalize_after_edits,
    bench_stream_load,
    bench_stream_save
);
criterion_main!(benches);
