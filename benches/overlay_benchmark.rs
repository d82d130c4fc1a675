//! Benchmarks for region mapping, preview compositing and page processing.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use lopdf::{dictionary, Document, Object, Stream};

use pagewipe::session::draw_overlays;
use pagewipe::{
    default_region_set, overlay_rects, set_enabled, DocumentProcessingService, FooterAnnotation,
    LopdfProcessor, PaginationConfig, ProcessOptions, ProcessRequest, RegionKind,
    RegionSet, Viewport,
};

fn all_regions() -> RegionSet {
    RegionKind::ALL
        .iter()
        .fold(default_region_set(), |set, kind| set_enabled(&set, *kind, true))
}

/// Creates an A4 document with the given number of pages; every fourth page
/// is stored upside down.
fn create_test_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..page_count)
        .map(|i| {
            let text = format!("BT 100 700 Td (Scanned page {}) Tj ET\n", i + 1);
            let content_id = doc.add_object(Stream::new(dictionary! {}, text.into_bytes()));
            let rotate = if i % 4 == 3 { 180 } else { 0 };
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Rotate" => rotate,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_count as i64,
            "Kids" => kids,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("serialize benchmark pdf");
    buf
}

/// Benchmark region-to-pixel mapping.
fn bench_overlay_rects(c: &mut Criterion) {
    let viewport = Viewport::new(892.5, 1263.0);
    let footer_only = default_region_set();
    let all = all_regions();

    c.bench_function("overlay_rects_footer", |b| {
        b.iter(|| overlay_rects(black_box(&footer_only), black_box(viewport), 1.5));
    });

    c.bench_function("overlay_rects_all", |b| {
        b.iter(|| overlay_rects(black_box(&all), black_box(viewport), 1.5));
    });
}

/// Benchmark tinting a preview surface.
fn bench_compositing(c: &mut Criterion) {
    let viewport = Viewport::new(892.5, 1263.0);
    let (width, height) = viewport.pixel_size();
    let rects = overlay_rects(&all_regions(), viewport, 1.5);
    let blank = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

    c.bench_function("draw_overlays_a4", |b| {
        b.iter(|| {
            let mut surface = blank.clone();
            draw_overlays(&mut surface, black_box(&rects));
            surface
        });
    });
}

/// Benchmark processing at various sizes.
fn bench_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("process");
    let regions = set_enabled(&default_region_set(), RegionKind::HeaderRight, true);
    let request = ProcessRequest::new(
        regions,
        PaginationConfig::new(1, 1),
        FooterAnnotation::default(),
    );

    for page_count in [1, 10, 50].iter() {
        let data = create_test_pdf(*page_count);

        group.bench_function(format!("{}_pages_parallel", page_count), |b| {
            let processor = LopdfProcessor::default();
            b.iter(|| processor.process(black_box(&data), &request));
        });

        group.bench_function(format!("{}_pages_sequential", page_count), |b| {
            let processor = LopdfProcessor::new(ProcessOptions::new().with_parallel(false));
            b.iter(|| processor.process(black_box(&data), &request));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_overlay_rects,
    bench_compositing,
    bench_processing,
);
criterion_main!(benches);
