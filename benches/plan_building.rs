//! Benchmarks for job planning
//!
//! Covers filter graph and argument assembly, mask rendering and ffprobe
//! report parsing. None of these spawn a process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use circle_clip::adapters::exec_ffmpeg::FfmpegEngine;
use circle_clip::adapters::probe_ffprobe::parse_ffprobe_json;
use circle_clip::domain::model::{Dimensions, JobPaths};
use circle_clip::domain::rules::TransformPlanner;
use circle_clip::engine::mask::render_mask;
use circle_clip::engine::{CircleTranscoder, MaskStrategy, TranscoderSettings};
use circle_clip::{QualityPresetRegistry, TranscodeJob};

const FFPROBE_PHONE_CLIP: &str = r#"{
    "streams": [
        {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1080, "height": 1920,
         "disposition": {"default": 1, "attached_pic": 0}},
        {"index": 1, "codec_type": "audio", "codec_name": "aac", "channels": 2,
         "sample_rate": "44100", "disposition": {"default": 1}},
        {"index": 2, "codec_type": "video", "codec_name": "mjpeg", "width": 320, "height": 320,
         "disposition": {"default": 0, "attached_pic": 1}}
    ],
    "format": {"duration": "14.533000", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"}
}"#;

fn job(key: &str) -> TranscodeJob {
    let root = PathBuf::from("/tmp/circle-job-bench");
    let paths = JobPaths {
        input: root.join("input.mp4"),
        intermediate: root.join("square.mp4"),
        mask: root.join("mask.png"),
        output: root.join("circle.mp4"),
    };
    let preset = QualityPresetRegistry::global().lookup(key).unwrap().clone();
    let crop = TransformPlanner::plan(Dimensions::new(1920, 1080).unwrap());
    TranscodeJob::new(paths, preset, crop, true, Duration::from_secs(60))
}

fn transcoder(mask: MaskStrategy) -> CircleTranscoder {
    CircleTranscoder::new(Arc::new(FfmpegEngine::new("ffmpeg"))).with_settings(
        TranscoderSettings {
            mask,
            ..TranscoderSettings::default()
        },
    )
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    let job = job("balanced");

    for mask in [MaskStrategy::Procedural, MaskStrategy::Bitmap] {
        let transcoder = transcoder(mask);
        group.bench_with_input(BenchmarkId::new("stages", mask), &job, |b, job| {
            b.iter(|| transcoder.plan(black_box(job)))
        });
    }

    let plan = transcoder(MaskStrategy::Bitmap).plan(&job);
    group.bench_function("command_args", |b| {
        b.iter(|| {
            for stage in &plan.stages {
                black_box(FfmpegEngine::command_args(black_box(stage)));
            }
        })
    });
    group.finish();
}

fn bench_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_mask");
    group.sample_size(20);
    for size in [240u32, 480, 640] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| render_mask(black_box(size)))
        });
    }
    group.finish();
}

fn bench_probe_parsing(c: &mut Criterion) {
    let path = Path::new("/uploads/phone.mov");
    c.bench_function("parse_ffprobe_json", |b| {
        b.iter(|| parse_ffprobe_json(path, black_box(FFPROBE_PHONE_CLIP)).unwrap())
    });
}

criterion_group!(benches, bench_plan, bench_mask, bench_probe_parsing);
criterion_main!(benches);
