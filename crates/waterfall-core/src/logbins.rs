//! Log-spaced frequency bands over an FFT magnitude spectrum.
//!
//! Band `i` spans `[lo_i, hi_i]` with edges evenly spaced in `log10(Hz)` from
//! `min_hz` up to Nyquist. Each band's value is the mean of the FFT bins it
//! touches, rounding outwards, so adjacent bands may share an FFT bin.

/// Layout of the log bands. Invalid fields fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogBinsConfig {
    pub sample_rate: u32,
    pub fft_size: usize,
    pub bins: usize,
    pub min_hz: f32,
}

impl Default for LogBinsConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 2048,
            bins: 64,
            min_hz: 20.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogBins {
    config: LogBinsConfig,
}

impl LogBins {
    pub fn new(config: LogBinsConfig) -> Self {
        let defaults = LogBinsConfig::default();
        let mut config = config;
        if config.sample_rate == 0 {
            config.sample_rate = defaults.sample_rate;
        }
        if config.fft_size == 0 {
            config.fft_size = defaults.fft_size;
        }
        if config.bins == 0 {
            config.bins = defaults.bins;
        }
        if !(config.min_hz > 0.0) || !config.min_hz.is_finite() {
            config.min_hz = defaults.min_hz;
        }
        Self { config }
    }

    pub fn config(&self) -> &LogBinsConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.config.bins
    }

    pub fn is_empty(&self) -> bool {
        self.config.bins == 0
    }

    /// Band edges in Hz, `(lo, hi)` per band, with `hi >= lo` and `hi` capped
    /// at Nyquist.
    pub fn edges_hz(&self) -> Vec<(f32, f32)> {
        let nyquist = 0.5 * self.config.sample_rate as f32;
        let min_hz = self.config.min_hz.max(1.0).min(nyquist);
        let max_hz = min_hz.max(nyquist);

        let log_min = min_hz.log10();
        let step = (max_hz.log10() - log_min) / self.config.bins as f32;

        (0..self.config.bins)
            .map(|i| {
                let lo = 10f32.powf(log_min + step * i as f32);
                let hi = 10f32.powf(log_min + step * (i + 1) as f32).min(nyquist);
                (lo, hi.max(lo))
            })
            .collect()
    }

    /// Geometric center `sqrt(lo * hi)` of every band.
    pub fn centers_hz(&self) -> Vec<f32> {
        self.edges_hz()
            .into_iter()
            .map(|(lo, hi)| (lo.max(1e-6) * hi.max(1e-6)).sqrt())
            .collect()
    }

    /// Inclusive FFT-bin range covered by a band, clamped to `len` bins.
    fn fft_range(&self, lo: f32, hi: f32, len: usize) -> Option<(usize, usize)> {
        let hz_per_bin = self.config.sample_rate as f32 / self.config.fft_size as f32;
        let first = (lo / hz_per_bin).floor().max(0.0) as usize;
        let last = ((hi / hz_per_bin).ceil().max(0.0) as usize).min(len.checked_sub(1)?);
        (first <= last).then_some((first, last))
    }

    /// Fold a magnitude spectrum (ideally `fft_size / 2 + 1` values) into the
    /// log bands. Bands with no FFT bin in range stay 0.
    pub fn compute(&self, magnitude: &[f32]) -> Vec<f32> {
        self.edges_hz()
            .into_iter()
            .map(|(lo, hi)| match self.fft_range(lo, hi, magnitude.len()) {
                Some((first, last)) => {
                    let span = &magnitude[first..=last];
                    span.iter().sum::<f32>() / span.len() as f32
                }
                None => 0.0,
            })
            .collect()
    }
}

impl Default for LogBins {
    fn default() -> Self {
        Self::new(LogBinsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cd_layout() -> LogBins {
        LogBins::new(LogBinsConfig {
            sample_rate: 44_100,
            fft_size: 1024,
            bins: 64,
            min_hz: 20.0,
        })
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let lb = LogBins::new(LogBinsConfig {
            sample_rate: 0,
            fft_size: 0,
            bins: 0,
            min_hz: f32::NAN,
        });
        assert_eq!(*lb.config(), LogBinsConfig::default());
        assert_eq!(lb.len(), 64);
    }

    #[test]
    fn test_centers_are_geometric() {
        let lb = cd_layout();
        let centers = lb.centers_hz();
        assert_eq!(centers.len(), 64);
        assert!(centers.windows(2).all(|w| w[0] <= w[1]));
        assert!(centers[0] >= 20.0);
        assert!(*centers.last().unwrap() <= 22_050.0 + 1.0);

        let (f_min, f_max) = (20.0f64, 22_050.0f64);
        for (i, &c) in centers.iter().enumerate() {
            let lo = f_min * (f_max / f_min).powf(i as f64 / 64.0);
            let hi = f_min * (f_max / f_min).powf((i + 1) as f64 / 64.0);
            let expected = (lo * hi).sqrt();
            let rel = ((c as f64) - expected).abs() / expected;
            assert!(rel < 1e-4, "center {i}: {c} vs {expected}");
        }
    }

    #[test]
    fn test_compute_size_and_sign() {
        let lb = cd_layout();
        let mut mag = vec![0.0f32; 512];
        mag[10] = 1.0;
        let out = lb.compute(&mag);
        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_single_tone_lands_in_covering_bands() {
        let lb = cd_layout();
        let mut mag = vec![0.0f32; 512];
        let k = (1000.0f32 * 1024.0 / 44_100.0).floor() as usize;
        mag[k] = 1.0;

        let out = lb.compute(&mag);
        let covering: Vec<usize> = lb
            .edges_hz()
            .into_iter()
            .enumerate()
            .filter(|&(_, (lo, hi))| {
                lb.fft_range(lo, hi, mag.len())
                    .is_some_and(|(first, last)| first <= k && k <= last)
            })
            .map(|(i, _)| i)
            .collect();

        assert!(!covering.is_empty());
        for (i, &v) in out.iter().enumerate() {
            if covering.contains(&i) {
                assert!(v > 0.0, "band {i} should hold the tone");
            } else {
                assert_eq!(v, 0.0, "band {i} should be silent");
            }
        }
    }

    #[test]
    fn test_empty_spectrum_is_silent() {
        let out = LogBins::default().compute(&[]);
        assert_eq!(out, vec![0.0; 64]);
    }
}
