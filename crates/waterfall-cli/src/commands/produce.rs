use std::time::Duration;

use waterfall_core::LogBinsConfig;
use waterfall_server::producer::{MIN_INTERVAL, ProducerConfig, run_producer};

use crate::channel::cancelled;

pub struct ProduceCommandConfig<'a> {
    pub host: &'a str,
    pub port: u16,
    pub interval_ms: u64,
    pub bins: usize,
    pub sample_rate: u32,
    pub fft_size: usize,
}

pub fn run(cfg: ProduceCommandConfig<'_>) {
    let config = ProducerConfig {
        interval: Duration::from_millis(cfg.interval_ms).max(MIN_INTERVAL),
        bands: LogBinsConfig {
            sample_rate: cfg.sample_rate,
            fft_size: cfg.fft_size,
            bins: cfg.bins,
            ..LogBinsConfig::default()
        },
    };

    println!("🎵 waterfall demo producer v{}", waterfall_core::VERSION);
    println!("   ws://{}:{}", cfg.host, cfg.port);
    println!(
        "   {} bins every {:?} (sweeping tone, {} Hz, FFT {})",
        cfg.bins, config.interval, cfg.sample_rate, cfg.fft_size
    );
    println!("   Ctrl+C to stop");
    println!();

    let mut stop = super::ctrlc_signal();
    let rt = super::runtime();
    let result = rt.block_on(async {
        tokio::select! {
            result = run_producer(cfg.host, cfg.port, config) => result,
            _ = cancelled(&mut stop) => Ok(()),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: producer on {}:{} failed: {e}", cfg.host, cfg.port);
        std::process::exit(1);
    }
}
