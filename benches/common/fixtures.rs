use rand::Rng;
use serde::{Deserialize, Serialize};

/// Test data structure for benchmarks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub score: u32,
}

impl BenchUser {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("User {}", id),
            email: format!("user{}@example.com", id),
            score: (id % 1000) as u32,
        }
    }
}

/// Generate test keys for different workload patterns
pub struct KeyGenerator {
    num_keys: usize,
}

impl KeyGenerator {
    pub fn new(num_keys: usize) -> Self {
        Self { num_keys }
    }

    /// Generate sequential keys (for populating a cache)
    pub fn sequential(&self) -> Vec<String> {
        (0..self.num_keys).map(|i| format!("user:{}", i)).collect()
    }

    /// Generate keys with Zipf distribution (realistic - few hot keys)
    pub fn zipf_random(&self, count: usize) -> Vec<String> {
        let mut rng = rand::rng();
        let mut keys = Vec::with_capacity(count);

        for _ in 0..count {
            // Simplified Zipf: 80% of requests go to 20% of keys
            let key_id = if rng.random_bool(0.8) {
                // Hot keys (first 20%)
                rng.random_range(0..(self.num_keys / 5).max(1))
            } else {
                // Cold keys (remaining 80%)
                rng.random_range((self.num_keys / 5)..self.num_keys)
            };
            keys.push(format!("user:{}", key_id));
        }

        keys
    }

    /// Generate keys for mixed workload: `hit_ratio` of them fall inside the first
    /// `num_keys` keys, the rest are never written.
    pub fn mixed(&self, hit_ratio: f64, count: usize) -> Vec<String> {
        let mut rng = rand::rng();

        (0..count)
            .map(|_| {
                if rng.random_bool(hit_ratio) {
                    format!("user:{}", rng.random_range(0..self.num_keys))
                } else {
                    format!("user:{}", self.num_keys + rng.random_range(0..self.num_keys))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_key_generator() {
        use super::KeyGenerator;

        let key_gen = KeyGenerator::new(100);

        let seq = key_gen.sequential();
        assert_eq!(seq.len(), 100);
        assert_eq!(seq[0], "user:0");

        let zipf = key_gen.zipf_random(100);
        assert_eq!(zipf.len(), 100);

        let misses = key_gen.mixed(0.0, 10);
        assert!(misses.iter().all(|k| k.as_str() >= "user:100"));
    }
}
