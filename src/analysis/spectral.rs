use std::f64::consts::PI;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Guard against out-of-band power being exactly zero in SNR ratios.
const SNR_EPSILON: f64 = 1e-12;

/// Above this many samples the direct O(N²) transform gets slow enough
/// to matter; log it rather than silently stalling.
const SAMPLE_WARN_CEILING: usize = 100_000;

// ---------------------------------------------------------------------------
// Window functions
// ---------------------------------------------------------------------------

/// Window applied before the transform to reduce spectral leakage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowFunction {
    Rectangular,
    Hamming,
    Hanning,
    Blackman,
}

impl WindowFunction {
    /// Per-sample multiplier for sample `i` of an `n`-sample window.
    pub fn coefficient(self, i: usize, n: usize) -> f64 {
        if n < 2 {
            return 1.0;
        }
        let x = i as f64 / (n - 1) as f64;
        match self {
            WindowFunction::Rectangular => 1.0,
            WindowFunction::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
            WindowFunction::Hanning => 0.5 * (1.0 - (2.0 * PI * x).cos()),
            WindowFunction::Blackman => {
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FftResult
// ---------------------------------------------------------------------------

/// One spectrum: parallel arrays over the `⌊N/2⌋` positive-frequency
/// bins, ascending, plus the dominant component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FftResult {
    /// Bin center frequencies, ascending, positive only.
    pub frequencies: Vec<f64>,
    /// Per-bin magnitude, normalized by the sample count `N`.
    pub magnitudes: Vec<f64>,
    /// Per-bin phase via `atan2(imag, real)`.
    pub phases: Vec<f64>,
    /// Per-bin power (magnitude squared).
    pub power_spectrum: Vec<f64>,
    /// Frequency of the maximum-magnitude bin.
    pub dominant_frequency: f64,
    /// Magnitude of that bin.
    pub dominant_magnitude: f64,
}

impl FftResult {
    /// Frequency spacing between adjacent bins.
    pub fn resolution(&self) -> f64 {
        if self.frequencies.len() > 1 {
            self.frequencies[1] - self.frequencies[0]
        } else {
            0.0
        }
    }
}

// ---------------------------------------------------------------------------
// Forward transform
// ---------------------------------------------------------------------------

/// Windowed discrete Fourier transform by direct summation.
///
/// Deliberately O(N²): each of the first `⌊N/2⌋` bins (Nyquist-limited,
/// positive frequencies only) is summed over all `N` samples. Magnitude
/// is normalized by `N`, phase is `atan2(imag, real)`, power is the
/// squared magnitude. An upgraded transform must preserve bin count,
/// ordering and normalization.
pub fn perform_fft(
    samples: &[f64],
    sampling_rate: f64,
    window: WindowFunction,
) -> Result<FftResult, CoreError> {
    if samples.len() < 2 {
        return Err(CoreError::InvalidInput(
            "FFT needs at least two samples".to_string(),
        ));
    }
    if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "sampling rate must be positive, got {sampling_rate}"
        )));
    }
    if samples.len() > SAMPLE_WARN_CEILING {
        warn!(
            "direct DFT over {} samples; expect quadratic runtime",
            samples.len()
        );
    }

    let n = samples.len();
    let windowed: Vec<f64> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| s * window.coefficient(i, n))
        .collect();

    let bins = n / 2;
    let mut frequencies = Vec::with_capacity(bins);
    let mut magnitudes = Vec::with_capacity(bins);
    let mut phases = Vec::with_capacity(bins);
    let mut power_spectrum = Vec::with_capacity(bins);

    for k in 0..bins {
        let mut real = 0.0;
        let mut imag = 0.0;
        for (i, &s) in windowed.iter().enumerate() {
            let angle = -2.0 * PI * k as f64 * i as f64 / n as f64;
            real += s * angle.cos();
            imag += s * angle.sin();
        }
        let magnitude = (real * real + imag * imag).sqrt() / n as f64;
        frequencies.push(k as f64 * sampling_rate / n as f64);
        magnitudes.push(magnitude);
        phases.push(imag.atan2(real));
        power_spectrum.push(magnitude * magnitude);
    }

    let (dominant_frequency, dominant_magnitude) = frequencies
        .iter()
        .zip(&magnitudes)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(&f, &m)| (f, m))
        .unwrap_or((0.0, 0.0));

    Ok(FftResult {
        frequencies,
        magnitudes,
        phases,
        power_spectrum,
        dominant_frequency,
        dominant_magnitude,
    })
}

// ---------------------------------------------------------------------------
// Inverse reconstruction
// ---------------------------------------------------------------------------

/// Approximate time-domain reconstruction by summing one cosine per
/// retained bin.
///
/// Lossy relative to a true inverse: only the positive-frequency half
/// is available, so non-DC amplitudes are doubled and the discarded
/// half is never restored — by design.
pub fn perform_ifft(
    frequencies: &[f64],
    magnitudes: &[f64],
    phases: &[f64],
) -> Result<Vec<f64>, CoreError> {
    if frequencies.is_empty() {
        return Err(CoreError::InvalidInput(
            "IFFT needs at least one bin".to_string(),
        ));
    }
    if frequencies.len() != magnitudes.len() || frequencies.len() != phases.len() {
        return Err(CoreError::InvalidInput(format!(
            "bin arrays differ in length: {} / {} / {}",
            frequencies.len(),
            magnitudes.len(),
            phases.len()
        )));
    }

    let bins = frequencies.len();
    let n = bins * 2;
    // The forward transform spaced bins at fs/N, so fs follows from the
    // bin spacing (or from the single retained bin).
    let df = if bins > 1 {
        frequencies[1] - frequencies[0]
    } else {
        frequencies[0].max(1.0)
    };
    let dt = if df > 0.0 { 1.0 / (df * n as f64) } else { 1.0 };

    let mut signal = vec![0.0; n];
    for (i, sample) in signal.iter_mut().enumerate() {
        let t = i as f64 * dt;
        for k in 0..bins {
            let amplitude = if frequencies[k] == 0.0 {
                magnitudes[k]
            } else {
                2.0 * magnitudes[k]
            };
            *sample += amplitude * (2.0 * PI * frequencies[k] * t + phases[k]).cos();
        }
    }
    Ok(signal)
}

// ---------------------------------------------------------------------------
// Power spectral density (Welch)
// ---------------------------------------------------------------------------

/// Segmenting options for [`compute_psd`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsdOptions {
    /// Samples per segment.
    pub segment_size: usize,
    /// Fraction of a segment shared with its successor, in `[0, 1)`.
    pub overlap: f64,
    /// Window applied per segment.
    pub window: WindowFunction,
}

impl Default for PsdOptions {
    fn default() -> Self {
        Self {
            segment_size: 256,
            overlap: 0.5,
            window: WindowFunction::Hanning,
        }
    }
}

/// Welch-style power spectral density: overlapping windowed segments,
/// per-bin power averaged across them. A series shorter than one
/// segment falls back to a single transform over the whole series.
pub fn compute_psd(
    samples: &[f64],
    sampling_rate: f64,
    options: PsdOptions,
) -> Result<(Vec<f64>, Vec<f64>), CoreError> {
    if options.segment_size < 2 || !(0.0..1.0).contains(&options.overlap) {
        return Err(CoreError::InvalidInput(format!(
            "bad PSD options: segment_size={}, overlap={}",
            options.segment_size, options.overlap
        )));
    }

    if samples.len() < options.segment_size {
        let spectrum = perform_fft(samples, sampling_rate, options.window)?;
        return Ok((spectrum.frequencies, spectrum.power_spectrum));
    }

    let step = ((options.segment_size as f64) * (1.0 - options.overlap)).max(1.0) as usize;
    let bins = options.segment_size / 2;
    let mut averaged = vec![0.0; bins];
    let mut frequencies = Vec::new();
    let mut segments = 0usize;

    let mut start = 0;
    while start + options.segment_size <= samples.len() {
        let spectrum = perform_fft(
            &samples[start..start + options.segment_size],
            sampling_rate,
            options.window,
        )?;
        if frequencies.is_empty() {
            frequencies = spectrum.frequencies;
        }
        for (acc, p) in averaged.iter_mut().zip(&spectrum.power_spectrum) {
            *acc += p;
        }
        segments += 1;
        start += step;
    }

    for acc in &mut averaged {
        *acc /= segments as f64;
    }
    Ok((frequencies, averaged))
}

// ---------------------------------------------------------------------------
// Frequency-domain filtering
// ---------------------------------------------------------------------------

/// Pass/stop band for [`apply_frequency_filter`], in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterBand {
    Lowpass { cutoff: f64 },
    Highpass { cutoff: f64 },
    Bandpass { low: f64, high: f64 },
    Bandstop { low: f64, high: f64 },
}

impl FilterBand {
    fn keeps(self, frequency: f64) -> bool {
        match self {
            FilterBand::Lowpass { cutoff } => frequency <= cutoff,
            FilterBand::Highpass { cutoff } => frequency >= cutoff,
            FilterBand::Bandpass { low, high } => frequency >= low && frequency <= high,
            FilterBand::Bandstop { low, high } => frequency < low || frequency > high,
        }
    }
}

/// Ideal brick-wall filter: transform, zero the magnitude of every bin
/// the band rejects, reconstruct via [`perform_ifft`]. Ringing from the
/// hard band edges is expected, not a defect.
pub fn apply_frequency_filter(
    samples: &[f64],
    sampling_rate: f64,
    band: FilterBand,
) -> Result<Vec<f64>, CoreError> {
    let spectrum = perform_fft(samples, sampling_rate, WindowFunction::Rectangular)?;

    let magnitudes: Vec<f64> = spectrum
        .frequencies
        .iter()
        .zip(&spectrum.magnitudes)
        .map(|(&f, &m)| if band.keeps(f) { m } else { 0.0 })
        .collect();

    perform_ifft(&spectrum.frequencies, &magnitudes, &spectrum.phases)
}

// ---------------------------------------------------------------------------
// Frequency peaks, SNR, periodic components
// ---------------------------------------------------------------------------

/// One local maximum of the magnitude spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPeak {
    pub frequency: f64,
    pub magnitude: f64,
    /// The smaller of the two adjacent magnitude drops.
    pub prominence: f64,
}

/// Local-maxima scan over the magnitude spectrum, sorted descending by
/// magnitude.
pub fn find_frequency_peaks(spectrum: &FftResult, min_magnitude: f64) -> Vec<FrequencyPeak> {
    let m = &spectrum.magnitudes;
    let mut peaks = Vec::new();
    for i in 1..m.len().saturating_sub(1) {
        if m[i] > m[i - 1] && m[i] > m[i + 1] && m[i] >= min_magnitude {
            peaks.push(FrequencyPeak {
                frequency: spectrum.frequencies[i],
                magnitude: m[i],
                prominence: (m[i] - m[i - 1]).min(m[i] - m[i + 1]),
            });
        }
    }
    peaks.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    peaks
}

/// Ratio of total power inside `[low, high]` to total power outside,
/// with an epsilon guard when the out-of-band power is exactly zero.
pub fn compute_snr(spectrum: &FftResult, low: f64, high: f64) -> Result<f64, CoreError> {
    if !(low <= high) {
        return Err(CoreError::InvalidInput(format!(
            "SNR band is inverted: [{low}, {high}]"
        )));
    }
    let mut in_band = 0.0;
    let mut out_of_band = 0.0;
    for (&f, &p) in spectrum.frequencies.iter().zip(&spectrum.power_spectrum) {
        if f >= low && f <= high {
            in_band += p;
        } else {
            out_of_band += p;
        }
    }
    Ok(in_band / (out_of_band + SNR_EPSILON))
}

/// One periodic component of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicComponent {
    pub frequency: f64,
    /// `1 / frequency`, in the time unit of the sampling rate.
    pub period: f64,
    pub magnitude: f64,
    /// SNR over a one-bin-wide band around the component.
    pub snr: f64,
}

/// Detect periodic components: frequency peaks annotated with a
/// per-peak SNR over a band one frequency-resolution wide. At most the
/// ten strongest components are returned, ranked by magnitude.
pub fn detect_periodic_components(
    samples: &[f64],
    sampling_rate: f64,
) -> Result<Vec<PeriodicComponent>, CoreError> {
    let spectrum = perform_fft(samples, sampling_rate, WindowFunction::Hanning)?;
    let resolution = spectrum.resolution();

    let mut components = Vec::new();
    for peak in find_frequency_peaks(&spectrum, 0.0) {
        if peak.frequency <= 0.0 {
            continue;
        }
        let snr = compute_snr(
            &spectrum,
            peak.frequency - resolution,
            peak.frequency + resolution,
        )?;
        components.push(PeriodicComponent {
            frequency: peak.frequency,
            period: 1.0 / peak.frequency,
            magnitude: peak.magnitude,
            snr,
        });
        if components.len() == 10 {
            break;
        }
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f64, sampling_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * frequency * i as f64 / sampling_rate).sin())
            .collect()
    }

    #[test]
    fn pure_sine_dominates_at_its_frequency() {
        let fs = 100.0;
        let samples = sine(10.0, fs, 200);
        let spectrum = perform_fft(&samples, fs, WindowFunction::Rectangular).unwrap();

        let bins = samples.len() / 2;
        assert_eq!(spectrum.frequencies.len(), bins);
        assert_eq!(spectrum.magnitudes.len(), bins);
        assert_eq!(spectrum.phases.len(), bins);
        assert_eq!(spectrum.power_spectrum.len(), bins);

        // Within one bin width of the true frequency.
        let bin_width = fs / samples.len() as f64;
        assert!((spectrum.dominant_frequency - 10.0).abs() <= bin_width);
        // A pure tone at a bin center carries magnitude 1/2 after the
        // 1/N normalization.
        assert!((spectrum.dominant_magnitude - 0.5).abs() < 1e-6);
    }

    #[test]
    fn windowing_still_finds_the_tone() {
        let fs = 100.0;
        let samples = sine(10.0, fs, 200);
        for window in [
            WindowFunction::Hamming,
            WindowFunction::Hanning,
            WindowFunction::Blackman,
        ] {
            let spectrum = perform_fft(&samples, fs, window).unwrap();
            let bin_width = fs / samples.len() as f64;
            assert!(
                (spectrum.dominant_frequency - 10.0).abs() <= bin_width,
                "{window:?} missed the tone"
            );
        }
    }

    #[test]
    fn too_short_or_bad_rate_rejected() {
        assert!(matches!(
            perform_fft(&[1.0], 10.0, WindowFunction::Rectangular),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            perform_fft(&[1.0, 2.0], 0.0, WindowFunction::Rectangular),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn ifft_roughly_restores_a_tone() {
        let fs = 64.0;
        let samples = sine(8.0, fs, 64);
        let spectrum = perform_fft(&samples, fs, WindowFunction::Rectangular).unwrap();
        let restored = perform_ifft(
            &spectrum.frequencies,
            &spectrum.magnitudes,
            &spectrum.phases,
        )
        .unwrap();

        assert_eq!(restored.len(), samples.len());
        for (a, b) in samples.iter().zip(&restored) {
            assert!((a - b).abs() < 0.05, "{a} vs {b}");
        }
    }

    #[test]
    fn lowpass_removes_the_high_tone() {
        let fs = 128.0;
        let n = 256;
        let samples: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 4.0 * t).sin() + (2.0 * PI * 40.0 * t).sin()
            })
            .collect();

        let filtered =
            apply_frequency_filter(&samples, fs, FilterBand::Lowpass { cutoff: 10.0 }).unwrap();
        let spectrum = perform_fft(&filtered, fs, WindowFunction::Rectangular).unwrap();

        let bin_width = fs / filtered.len() as f64;
        assert!((spectrum.dominant_frequency - 4.0).abs() <= bin_width);
        // The 40 Hz line is gone: its bin power is tiny now.
        let hi_bin = (40.0 / spectrum.resolution()).round() as usize;
        assert!(spectrum.power_spectrum[hi_bin] < 1e-3);
    }

    #[test]
    fn psd_short_series_falls_back_to_single_fft() {
        let fs = 50.0;
        let samples = sine(5.0, fs, 100);
        let (freqs, psd) = compute_psd(&samples, fs, PsdOptions::default()).unwrap();
        assert_eq!(freqs.len(), samples.len() / 2);
        assert_eq!(psd.len(), freqs.len());
    }

    #[test]
    fn psd_averages_across_segments() {
        let fs = 256.0;
        let samples = sine(16.0, fs, 1024);
        let (freqs, psd) = compute_psd(&samples, fs, PsdOptions::default()).unwrap();
        assert_eq!(freqs.len(), 128);

        // The strongest PSD bin should sit at the tone.
        let (best, _) = freqs
            .iter()
            .zip(&psd)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .unwrap();
        assert!((best - 16.0).abs() <= fs / 256.0);
    }

    #[test]
    fn snr_of_pure_tone_is_high() {
        let fs = 100.0;
        let samples = sine(10.0, fs, 400);
        let spectrum = perform_fft(&samples, fs, WindowFunction::Rectangular).unwrap();

        let snr = compute_snr(&spectrum, 9.0, 11.0).unwrap();
        assert!(snr > 100.0, "snr = {snr}");
        assert!(compute_snr(&spectrum, 11.0, 9.0).is_err());
    }

    #[test]
    fn periodic_component_detection_ranks_the_tone_first() {
        let fs = 100.0;
        let n = 500;
        let samples: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                3.0 * (2.0 * PI * 10.0 * t).sin() + 0.5 * (2.0 * PI * 23.0 * t).sin()
            })
            .collect();

        let components = detect_periodic_components(&samples, fs).unwrap();
        assert!(!components.is_empty());
        assert!(components.len() <= 10);

        let strongest = &components[0];
        let bin_width = fs / n as f64;
        assert!((strongest.frequency - 10.0).abs() <= bin_width);
        assert!((strongest.period - 0.1).abs() <= 0.01);
        assert!(strongest.snr > 1.0);
    }
}
