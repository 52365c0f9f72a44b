//! Extraction benchmark
//!
//! Measures:
//! - Batch extraction for each of the four syntaxes
//! - Streaming extraction with small deltas, as a model server would feed them
//! - Concurrent extraction with one shared extractor
//! - Large multi-call envelope payloads

use std::{sync::Arc, thread, time::Instant};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tool_call_extractor::{ExtractorConfig, MultiFormatExtractor, StreamState};

const TAGGED_JSON: &str = r#"I'll read the configuration first so I know which port the service uses.

<tool_call>
{"name": "read_file", "arguments": {"path": "config/service.yaml", "start_line": 1, "end_line": 120}}
</tool_call>"#;

const WRAPPER_JSON: &str = r#"Listing the workspace before making changes.
<tools>{"name": "list_files", "arguments": {"path": "src", "recursive": true}}</tools>"#;

const BARE_JSON: &str = r#"<think>
The user wants the failing test fixed. The assertion compares a trimmed string, so the fixture is probably missing a newline. I should search for the fixture.
</think>

{"name": "search_files", "arguments": {"path": "tests", "regex": "fixture_\\w+\\.txt", "file_pattern": "*.rs"}}"#;

const TAG_PER_CALL: &str = r#"The handler needs an early return when the request has no body.

<apply_diff>
<path>src/server/handler.rs</path>
<diff>
<<<<<<< SEARCH
    let body = request.body();
=======
    let Some(body) = request.body() else {
        return Ok(Response::empty());
    };
>>>>>>> REPLACE
</diff>
</apply_diff>"#;

const NARRATION: &str = "The build passes locally. The failure in CI comes from a stale cache; clearing it and re-running the job should be enough. If a < b still fails after that, compare the lockfiles.";

fn cases() -> Vec<(&'static str, &'static str)> {
    vec![
        ("tagged_json", TAGGED_JSON),
        ("wrapper_json", WRAPPER_JSON),
        ("bare_json", BARE_JSON),
        ("tag_per_call", TAG_PER_CALL),
        ("narration", NARRATION),
    ]
}

fn chunk(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

fn stream_once(extractor: &MultiFormatExtractor, deltas: &[String]) -> usize {
    let mut state = StreamState::new();
    let mut current = String::new();
    let mut surfaced = 0;

    for delta in deltas {
        let previous = current.clone();
        current.push_str(delta);
        if extractor.extract_delta(&mut state, &previous, &current, delta).is_some() {
            surfaced += 1;
        }
    }
    if extractor.finish_stream(&mut state, &current).is_some() {
        surfaced += 1;
    }
    surfaced
}

fn generate_envelopes(num_calls: usize) -> String {
    (0..num_calls)
        .map(|i| {
            format!(
                "<tool_call>{{\"name\": \"read_file\", \"arguments\": {{\"path\": \"src/module_{i}.rs\", \"start_line\": {i}}}}}</tool_call>\n"
            )
        })
        .collect()
}

fn bench_batch_extraction(c: &mut Criterion) {
    let extractor = MultiFormatExtractor::new();
    let mut group = c.benchmark_group("batch_extraction");

    for (name, input) in cases() {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| black_box(extractor.extract(black_box(input))));
        });
    }

    group.finish();
}

fn bench_streaming_extraction(c: &mut Criterion) {
    let extractor = MultiFormatExtractor::new();
    let mut group = c.benchmark_group("streaming_extraction");

    for (name, input) in cases() {
        let deltas = chunk(input, 4);
        group.throughput(Throughput::Elements(deltas.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| black_box(stream_once(&extractor, &deltas)));
        });
    }

    group.finish();
}

fn bench_concurrent_extraction(c: &mut Criterion) {
    let extractor = Arc::new(MultiFormatExtractor::new());
    let mut group = c.benchmark_group("concurrent_extraction");

    for num_threads in [1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            &num_threads,
            |b, &num_threads| {
                b.iter_custom(|iters| {
                    let start = Instant::now();
                    let handles: Vec<_> = (0..num_threads)
                        .map(|_| {
                            let extractor = extractor.clone();
                            thread::spawn(move || {
                                for _ in 0..iters {
                                    for (_, input) in cases() {
                                        black_box(extractor.extract(input));
                                    }
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

fn bench_large_payloads(c: &mut Criterion) {
    let extractor = MultiFormatExtractor::new();
    let config = ExtractorConfig::builder().multi_call_streaming(true).build().unwrap();
    let multi = MultiFormatExtractor::from_config(&config).unwrap();
    let mut group = c.benchmark_group("large_payloads");

    for size in [1, 10, 50, 100] {
        let input = generate_envelopes(size);
        group.throughput(Throughput::Bytes(input.len() as u64));

        group.bench_with_input(BenchmarkId::new("batch", size), &input, |b, input| {
            b.iter(|| black_box(extractor.extract(input)));
        });

        let deltas = chunk(&input, 16);
        group.bench_with_input(
            BenchmarkId::new("streaming_multi_call", size),
            &deltas,
            |b, deltas| {
                b.iter(|| black_box(stream_once(&multi, deltas)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_batch_extraction,
    bench_streaming_extraction,
    bench_concurrent_extraction,
    bench_large_payloads
);
criterion_main!(benches);
