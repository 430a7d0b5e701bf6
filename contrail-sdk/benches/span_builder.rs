use contrail::trace::{InstrumentationType, Span, SpanKind, Tracer, TracerProvider};
use contrail::{Context, InstrumentationScope, KeyValue};
use contrail_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider, SuppressionStrategy};
use criterion::{criterion_group, criterion_main, Criterion};

fn criterion_benchmark(c: &mut Criterion) {
    span_builder_benchmark_group(c);
    suppression_benchmark_group(c);
}

fn span_builder_benchmark_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("span_builder");
    group.bench_function("simplest", |b| {
        let (_provider, tracer) = not_sampled_provider();
        b.iter(|| {
            let mut span = tracer.span_builder("span").start(&tracer);
            span.end();
        })
    });
    group.bench_function("with_attributes_4", |b| {
        let (_provider, tracer) = not_sampled_provider();
        b.iter(|| {
            let mut span = tracer
                .span_builder("span")
                .with_attributes([
                    KeyValue::new("key1", false),
                    KeyValue::new("key2", "value"),
                    KeyValue::new("key3", 123i64),
                    KeyValue::new("key4", 123.456),
                ])
                .start(&tracer);
            span.end();
        })
    });
    group.finish();
}

fn suppression_benchmark_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("suppression");
    group.bench_function("pre_check_marked", |b| {
        let (_provider, tracer) = suppressing_provider();
        let span = tracer
            .span_builder("outer")
            .with_kind(SpanKind::Client)
            .start(&tracer);
        let cx = span.store_in_context(&Context::new());
        b.iter(|| tracer.should_start_span(SpanKind::Client, &cx))
    });
    group.bench_function("suppressed_start", |b| {
        let (_provider, tracer) = suppressing_provider();
        let span = tracer
            .span_builder("outer")
            .with_kind(SpanKind::Client)
            .start(&tracer);
        let cx = span.store_in_context(&Context::new());
        b.iter(|| {
            let mut inner = tracer
                .span_builder("inner")
                .with_kind(SpanKind::Client)
                .start_with_context(&tracer, &cx);
            inner.end();
        })
    });
    group.finish();
}

fn not_sampled_provider() -> (SdkTracerProvider, SdkTracer) {
    let provider = SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOff)
        .build();
    let tracer = provider.tracer("not-sampled");
    (provider, tracer)
}

fn suppressing_provider() -> (SdkTracerProvider, SdkTracer) {
    // Recording spans arm the suppression marker when stored in a context.
    let provider = SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_suppression_strategy(SuppressionStrategy::ByKindAndType)
        .build();
    let tracer = provider.tracer_with_scope(
        InstrumentationScope::builder("db-driver")
            .with_instrumentation_type(InstrumentationType::DB)
            .build(),
    );
    (provider, tracer)
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
