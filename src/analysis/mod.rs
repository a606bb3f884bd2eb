//! Audio analysis layer
//!
//! This module provides audio analysis through a trait-based abstraction.
//! `StubAnalyzer` only records file-level data, `RealAnalyzer` decodes the
//! audio with symphonia and runs stratum-dsp for tempo and key.

mod decode;
mod features;
mod real;
mod stub;
mod tempo;
mod traits;

pub use decode::{decode_to_mono, DecodedAudio};
pub use features::{signal_stats, SignalStats};
pub use real::RealAnalyzer;
pub use stub::StubAnalyzer;
pub use tempo::{detect_tempo, fold_bpm, TempoResult};
pub use traits::SoundAnalyzer;
