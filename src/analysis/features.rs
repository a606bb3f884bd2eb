//! Simple signal statistics over mono samples

/// Level and brightness measurements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalStats {
    /// Peak absolute amplitude
    pub peak: f32,
    /// Root mean square level
    pub rms: f32,
    /// Sign changes per second
    pub zero_crossing_rate: f32,
}

/// Compute level statistics for a mono signal
pub fn signal_stats(samples: &[f32], sample_rate: u32) -> SignalStats {
    if samples.is_empty() || sample_rate == 0 {
        return SignalStats {
            peak: 0.0,
            rms: 0.0,
            zero_crossing_rate: 0.0,
        };
    }

    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

    // Accumulate in f64, long files overflow f32 precision
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum_sq / samples.len() as f64).sqrt() as f32;

    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    let seconds = samples.len() as f32 / sample_rate as f32;

    SignalStats {
        peak,
        rms,
        zero_crossing_rate: crossings as f32 / seconds,
    }
}
