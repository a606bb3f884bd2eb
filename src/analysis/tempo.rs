//! Tempo and key detection using stratum-dsp

use anyhow::Result;
use stratum_dsp::{analyze_audio, AnalysisConfig};

/// Shortest signal worth running tempo detection on (one second at 44.1kHz)
const MIN_TEMPO_SAMPLES: usize = 44100;

/// Tempo/key estimate for a signal
#[derive(Debug, Clone, PartialEq)]
pub struct TempoResult {
    pub bpm: f32,
    pub key: Option<String>,
}

/// Detect BPM and key from mono samples
pub fn detect_tempo(
    samples: &[f32],
    sample_rate: u32,
    min_bpm: f32,
    max_bpm: f32,
) -> Result<TempoResult> {
    if samples.len() < MIN_TEMPO_SAMPLES {
        anyhow::bail!("Audio too short for tempo detection");
    }

    let result = analyze_audio(samples, sample_rate, AnalysisConfig::default())
        .map_err(|e| anyhow::anyhow!("Tempo analysis failed: {:?}", e))?;

    let bpm = fold_bpm(result.bpm, min_bpm, max_bpm);

    let key_name = result.key.name().to_string();
    let key = if key_name.is_empty() {
        None
    } else {
        Some(key_name)
    };

    Ok(TempoResult { bpm, key })
}

/// Double or halve a BPM estimate until it lands inside `[min_bpm, max_bpm]`
///
/// Values that can't be folded into range are returned unchanged.
pub fn fold_bpm(bpm: f32, min_bpm: f32, max_bpm: f32) -> f32 {
    if bpm <= 0.0 || min_bpm <= 0.0 || max_bpm <= 0.0 {
        return bpm;
    }

    let mut folded = bpm;
    while folded < min_bpm && folded * 2.0 <= max_bpm {
        folded *= 2.0;
    }
    while folded > max_bpm && folded / 2.0 >= min_bpm {
        folded /= 2.0;
    }

    if folded != bpm {
        log::debug!("BPM folded from {:.1} to {:.1}", bpm, folded);
    }
    folded
}
