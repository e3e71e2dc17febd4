//! Synthetic spectrum source for the demo producer.
//!
//! A slowly sweeping sine is windowed, transformed, folded into log bands
//! and converted to 0..1 meter values, one frame per audio buffer.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::frame::encode_frame;
use crate::logbins::{LogBins, LogBinsConfig};

pub const SWEEP_START_HZ: f32 = 220.0;
pub const SWEEP_MIN_HZ: f32 = 110.0;
pub const SWEEP_MAX_HZ: f32 = 1760.0;
/// Frequency change per generated buffer.
pub const SWEEP_STEP_HZ: f32 = 0.5;
pub const TONE_AMPLITUDE: f32 = 0.2;

/// Meter floor in dB; anything quieter reads as 0.
pub const METER_FLOOR_DB: f32 = -80.0;

// ---------------------------------------------------------------------------
// ToneSweep
// ---------------------------------------------------------------------------

/// Sine oscillator whose pitch bounces between [`SWEEP_MIN_HZ`] and
/// [`SWEEP_MAX_HZ`].
#[derive(Debug, Clone)]
pub struct ToneSweep {
    sample_rate: f32,
    tone_hz: f32,
    direction: f32,
    phase: f32,
    amplitude: f32,
}

impl ToneSweep {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1) as f32,
            tone_hz: SWEEP_START_HZ,
            direction: 1.0,
            phase: 0.0,
            amplitude: TONE_AMPLITUDE,
        }
    }

    pub fn tone_hz(&self) -> f32 {
        self.tone_hz
    }

    /// Move the pitch one step, reversing at either bound.
    pub fn step(&mut self) {
        self.tone_hz += self.direction * SWEEP_STEP_HZ;
        if self.tone_hz > SWEEP_MAX_HZ {
            self.tone_hz = SWEEP_MAX_HZ;
            self.direction = -1.0;
        }
        if self.tone_hz < SWEEP_MIN_HZ {
            self.tone_hz = SWEEP_MIN_HZ;
            self.direction = 1.0;
        }
    }

    /// Step the pitch, then fill `out` with the next samples. Phase is
    /// continuous across buffers.
    pub fn next_buffer(&mut self, out: &mut [f32]) {
        self.step();
        fill_sine(out, self.tone_hz, self.sample_rate, self.amplitude, &mut self.phase);
    }
}

fn fill_sine(out: &mut [f32], hz: f32, sample_rate: f32, amplitude: f32, phase: &mut f32) {
    let inc = 2.0 * PI * hz / sample_rate;
    for s in out.iter_mut() {
        *s = amplitude * phase.sin();
        *phase += inc;
        if *phase > 2.0 * PI {
            *phase -= 2.0 * PI;
        }
    }
}

// ---------------------------------------------------------------------------
// SpectrumAnalyzer
// ---------------------------------------------------------------------------

/// Convert a linear magnitude to a 0..1 meter reading over an 80 dB range.
pub fn mag_to_meter(mag: f32) -> f32 {
    let db = 20.0 * mag.max(1e-9).log10();
    let clamped = db.clamp(METER_FLOOR_DB, 0.0);
    (clamped - METER_FLOOR_DB) / -METER_FLOOR_DB
}

fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}

/// Hann window → FFT → log bands → meter values.
pub struct SpectrumAnalyzer {
    bands: LogBins,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl SpectrumAnalyzer {
    /// A non-power-of-two FFT size falls back to the default layout's size.
    pub fn new(config: LogBinsConfig) -> Self {
        let mut bands = LogBins::new(config);
        if !bands.config().fft_size.is_power_of_two() {
            log::warn!(
                "fft size {} is not a power of two, using {}",
                bands.config().fft_size,
                LogBinsConfig::default().fft_size
            );
            bands = LogBins::new(LogBinsConfig {
                fft_size: LogBinsConfig::default().fft_size,
                ..*bands.config()
            });
        }
        let n = bands.config().fft_size;
        let fft = FftPlanner::new().plan_fft_forward(n);
        Self {
            bands,
            fft,
            window: hann_window(n),
            buffer: vec![Complex::new(0.0, 0.0); n],
            magnitudes: vec![0.0; n / 2 + 1],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    pub fn bands(&self) -> &LogBins {
        &self.bands
    }

    /// Analyze one buffer of `fft_size` samples (shorter input is
    /// zero-padded, longer input truncated).
    pub fn analyze(&mut self, samples: &[f32]) -> Vec<f32> {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let norm = 1.0 / self.fft_size() as f32;
        for (mag, c) in self.magnitudes.iter_mut().zip(&self.buffer) {
            *mag = c.norm() * norm;
        }

        let mut out = self.bands.compute(&self.magnitudes);
        for v in &mut out {
            *v = mag_to_meter(*v);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// SyntheticSource
// ---------------------------------------------------------------------------

/// One producer stream: its own oscillator and analyzer.
pub struct SyntheticSource {
    sweep: ToneSweep,
    analyzer: SpectrumAnalyzer,
    centers: Vec<f32>,
    samples: Vec<f32>,
}

impl SyntheticSource {
    pub fn new(config: LogBinsConfig) -> Self {
        let analyzer = SpectrumAnalyzer::new(config);
        let sweep = ToneSweep::new(analyzer.bands().config().sample_rate);
        Self {
            centers: analyzer.bands().centers_hz(),
            samples: vec![0.0; analyzer.fft_size()],
            sweep,
            analyzer,
        }
    }

    pub fn centers(&self) -> &[f32] {
        &self.centers
    }

    pub fn tone_hz(&self) -> f32 {
        self.sweep.tone_hz()
    }

    /// Meter values for the next buffer.
    pub fn next_frame(&mut self) -> Vec<f32> {
        self.sweep.next_buffer(&mut self.samples);
        self.analyzer.analyze(&self.samples)
    }

    /// The next frame as a wire message, centers included.
    pub fn next_payload(&mut self) -> String {
        let bins = self.next_frame();
        encode_frame(&bins, Some(&self.centers))
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(LogBinsConfig::default())
    }
}
