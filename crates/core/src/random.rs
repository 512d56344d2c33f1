//! Deterministic random-number streams.
//!
//! Every event owns a [`RandomStream`] derived only from the global seed
//! and the event index, so results do not depend on which worker runs the
//! event or in which order events are scheduled. Stages draw from
//! independent ChaCha streams keyed by a consumer name, and may split
//! further per item (e.g. per particle) with [`RandomStream::spawn_indexed`].

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;
use tracklab_types::EventIndex;

/// Factory for per-event random streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomNumbers {
    seed: u64,
}

impl RandomNumbers {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derive the substream for an event.
    pub fn event_stream(&self, event: EventIndex) -> RandomStream {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"tracklab/event");
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(&event.0.to_le_bytes());
        RandomStream {
            key: *hasher.finalize().as_bytes(),
        }
    }
}

/// Random substream private to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomStream {
    key: [u8; 32],
}

impl RandomStream {
    /// Generator for a named consumer.
    pub fn spawn(&self, consumer: &str) -> ChaCha8Rng {
        self.spawn_indexed(consumer, 0)
    }

    /// Generator for one item of a named consumer.
    pub fn spawn_indexed(&self, consumer: &str, index: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::from_seed(self.key);
        rng.set_stream(stream_id(consumer, index));
        rng
    }
}

fn stream_id(consumer: &str, index: u64) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(consumer.as_bytes());
    hasher.update(&index.to_le_bytes());
    let bytes = hasher.finalize();
    let bytes = bytes.as_bytes();
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Sample from a Gaussian distribution using the Box-Muller transform.
pub fn sample_gaussian(rng: &mut impl Rng, mean: f64, std_dev: f64) -> f64 {
    // gen() is in [0, 1); shift to (0, 1] so the logarithm stays finite.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + std_dev * z
}

/// Sample uniformly from `[min, max)`; a collapsed range returns `min`.
pub fn sample_uniform(rng: &mut impl Rng, min: f64, max: f64) -> f64 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// Sample from an exponential distribution with the given mean.
pub fn sample_exponential(rng: &mut impl Rng, mean: f64) -> f64 {
    let u: f64 = 1.0 - rng.gen::<f64>();
    -mean * u.ln()
}

/// Sample from a Poisson distribution.
///
/// Uses Knuth's multiplication method for small means and a rounded
/// Gaussian approximation above 500.
pub fn sample_poisson(rng: &mut impl Rng, mean: f64) -> u64 {
    if mean <= 0.0 {
        return 0;
    }
    if mean > 500.0 {
        let sample = sample_gaussian(rng, mean, mean.sqrt()).round();
        return sample.max(0.0) as u64;
    }
    let limit = (-mean).exp();
    let mut count = 0u64;
    let mut product: f64 = rng.gen();
    while product > limit {
        count += 1;
        product *= rng.gen::<f64>();
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_stream_is_pure_function_of_seed_and_index() {
        let a = RandomNumbers::new(42).event_stream(EventIndex(7));
        let b = RandomNumbers::new(42).event_stream(EventIndex(7));
        assert_eq!(a, b);

        let mut ra = a.spawn("gun");
        let mut rb = b.spawn("gun");
        let xs: Vec<u64> = (0..8).map(|_| ra.gen()).collect();
        let ys: Vec<u64> = (0..8).map(|_| rb.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_streams_differ_between_events_and_consumers() {
        let numbers = RandomNumbers::new(42);
        let first: u64 = numbers.event_stream(EventIndex(0)).spawn("gun").gen();
        let second: u64 = numbers.event_stream(EventIndex(1)).spawn("gun").gen();
        let other: u64 = numbers.event_stream(EventIndex(0)).spawn("digitization").gen();
        let reseeded: u64 = RandomNumbers::new(43)
            .event_stream(EventIndex(0))
            .spawn("gun")
            .gen();
        assert_ne!(first, second);
        assert_ne!(first, other);
        assert_ne!(first, reseeded);
    }

    #[test]
    fn test_indexed_streams_are_independent() {
        let stream = RandomNumbers::new(1).event_stream(EventIndex(0));
        let a: u64 = stream.spawn_indexed("fatras", 1).gen();
        let b: u64 = stream.spawn_indexed("fatras", 2).gen();
        assert_ne!(a, b);
        let again: u64 = stream.spawn_indexed("fatras", 1).gen();
        assert_eq!(a, again);
    }

    #[test]
    fn test_gaussian_moments() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| sample_gaussian(&mut rng, 3.0, 2.0)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 3.0).abs() < 0.1, "mean {mean}");
        assert!((variance.sqrt() - 2.0).abs() < 0.1, "std {}", variance.sqrt());
    }

    #[test]
    fn test_poisson_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 5_000;
        let total: u64 = (0..n).map(|_| sample_poisson(&mut rng, 20.0)).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 20.0).abs() < 0.5, "mean {mean}");
        assert_eq!(sample_poisson(&mut rng, 0.0), 0);
    }

    #[test]
    fn test_uniform_collapsed_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(sample_uniform(&mut rng, 2.5, 2.5), 2.5);
        let x = sample_uniform(&mut rng, -1.0, 1.0);
        assert!((-1.0..1.0).contains(&x));
    }
}
