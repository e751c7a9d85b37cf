/// Analysis layer: stateless numerics over columns extracted from a
/// parsed table.
///
/// Every function is pure — it reads its arguments and returns fresh
/// values — so concurrent use needs no coordination.

pub mod fitting;
pub mod signal;
pub mod spectral;

pub use fitting::{
    fit_exponential, fit_linear, fit_logarithmic, fit_polynomial, fit_power, FitFamily, FitResult,
};
pub use signal::{
    baseline_correct, calculate_statistics, differentiate, find_peaks, smooth_data, PeakOptions,
    PeakResult, Statistics,
};
pub use spectral::{
    apply_frequency_filter, compute_psd, compute_snr, detect_periodic_components,
    find_frequency_peaks, perform_fft, perform_ifft, FftResult, FilterBand, FrequencyPeak,
    PeriodicComponent, PsdOptions, WindowFunction,
};
