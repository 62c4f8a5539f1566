// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use beetbox::audio::mixer::Mixer;
use beetbox::audio::SampleBuffer;
use beetbox::capture::Normalizer;
use beetbox::samples::{SlotId, Voice};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const SAMPLE_RATE: u32 = 44100;

fn generate_test_audio(duration_seconds: f32, sample_rate: u32) -> Vec<f32> {
    let num_samples = (duration_seconds * sample_rate as f32) as usize;
    let mut samples = Vec::with_capacity(num_samples);

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let sample = 0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            + 0.2 * (2.0 * std::f32::consts::PI * 880.0 * t).sin()
            + 0.1 * (2.0 * std::f32::consts::PI * 1320.0 * t).sin();
        samples.push(sample);
    }

    samples
}

fn benchmark_mixer(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer");

    let normalizer = Normalizer::default();
    let audio = [generate_test_audio(1.0, SAMPLE_RATE)];
    let buffer: SampleBuffer = match normalizer.normalize(&audio) {
        Ok(buffer) => buffer,
        Err(e) => panic!("test audio failed to normalize: {}", e),
    };

    for voices in [1usize, 8, 32] {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (retired_tx, _retired_rx) = crossbeam_channel::bounded(voices);
        let mut mixer = Mixer::new(rx, retired_tx, 2, voices);
        for _ in 0..voices {
            let _ = tx.send(Voice::new(SlotId(0), buffer.clone(), true));
        }
        // A typical period of 512 stereo frames.
        let mut out = vec![0.0f32; 1024];

        group.bench_with_input(BenchmarkId::new("render_512", voices), &voices, |b, _| {
            b.iter(|| {
                mixer.render(black_box(&mut out));
            })
        });
    }

    group.finish();
}

fn benchmark_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let normalizer = Normalizer::default();

    for seconds in [1u32, 10] {
        let audio = generate_test_audio(seconds as f32, SAMPLE_RATE);
        let chunks: Vec<Vec<f32>> = audio.chunks(512).map(<[f32]>::to_vec).collect();

        group.bench_with_input(BenchmarkId::new("capture", seconds), &chunks, |b, chunks| {
            b.iter(|| black_box(normalizer.normalize(black_box(chunks))))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_mixer, benchmark_normalize);
criterion_main!(benches);
