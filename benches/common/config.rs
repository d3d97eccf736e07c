use std::env;

/// Configuration for benchmarks, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Number of distinct keys per workload (from BENCH_KEYS env var, defaults to 1000)
    pub num_keys: usize,

    /// Sample size for benchmarks (from BENCH_SAMPLE_SIZE env var, defaults to 50)
    pub sample_size: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            num_keys: env::var("BENCH_KEYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            sample_size: env::var("BENCH_SAMPLE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        let config = Self::default();
        eprintln!("Benchmark Configuration:");
        eprintln!("  Keys: {}", config.num_keys);
        eprintln!("  Sample Size: {}", config.sample_size);
        config
    }
}
