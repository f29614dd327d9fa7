// Synchronous demodulation - response extraction at one known frequency
//
// The engine only ever needs the response magnitude at a single known
// frequency per sample window (the tracked harmonic of the excitation), so
// instead of a full spectral transform the window is correlated against
// reference sine/cosine at that frequency and the magnitude of the complex
// coefficient is taken. Accumulation runs in f64 to keep long windows
// numerically stable.

use crate::hardware::SampleWindow;

/// Response magnitude of `window` at `frequency_hz`
///
/// Returns the amplitude of a sinusoid at the given frequency embedded in
/// the window (2/N normalization). Degenerate windows yield 0.
pub fn response_magnitude(window: &SampleWindow, frequency_hz: f32) -> f32 {
    let n = window.samples.len();
    if n == 0 || window.sample_rate_hz <= 0.0 || frequency_hz <= 0.0 {
        return 0.0;
    }

    let omega = std::f64::consts::TAU * frequency_hz as f64 / window.sample_rate_hz as f64;
    let mut in_phase = 0.0f64;
    let mut quadrature = 0.0f64;

    for (k, &sample) in window.samples.iter().enumerate() {
        let phase = omega * k as f64;
        in_phase += sample as f64 * phase.cos();
        quadrature += sample as f64 * phase.sin();
    }

    let magnitude = (in_phase * in_phase + quadrature * quadrature).sqrt() * 2.0 / n as f64;
    magnitude as f32
}
