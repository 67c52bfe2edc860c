//! Signal energy measurement.

/// Calculates the Root Mean Square (RMS) of normalized audio samples.
///
/// # Arguments
/// * `samples` - Audio samples in the range [-1.0, 1.0]
///
/// # Returns
/// RMS value (0.0 to 1.0), where:
/// - 0.0 represents silence
/// - ~0.707 represents a full-scale sine wave
/// - 1.0 represents maximum amplitude
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let s = sample as f64;
            s * s
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}
