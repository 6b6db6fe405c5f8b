//! Spectral features for audio windows
//!
//! Every window is reduced to a fixed 32 × 32 matrix before classification:
//! 32 cepstral coefficients by 32 analysis frames. The built-in extractor
//! computes MFCCs with the parameters the disfluency model was trained on.

use crate::classifiers::AudioFeatureExtractor;
use crate::error::{AnalysisError, AnalysisResult};
use ndarray::{s, Array2};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::warn;

/// Coefficient rows per feature matrix
pub const FEATURE_ROWS: usize = 32;

/// Analysis-frame columns per feature matrix
pub const FEATURE_COLS: usize = 32;

/// FFT size of the built-in extractor
pub const MFCC_N_FFT: usize = 2048;

/// Hop between analysis frames; 8000 samples / 255 + 1 = 32 frames
pub const MFCC_HOP_LENGTH: usize = 255;

/// Dynamic range kept by the dB conversion
const TOP_DB: f64 = 80.0;

/// Floor applied to power before taking the log
const AMIN: f64 = 1e-10;

/// A classifier-ready 32 × 32 feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f32>,
}

impl FeatureMatrix {
    pub fn zeros() -> Self {
        Self {
            values: Array2::zeros((FEATURE_ROWS, FEATURE_COLS)),
        }
    }

    /// Shape raw extractor output to exactly 32 × 32.
    ///
    /// Fewer columns are right-padded with zeros, extra columns are dropped.
    /// Output with no columns becomes all zeros. A non-empty matrix with a row
    /// count other than 32 is a `FeatureShape` error.
    pub fn fit(raw: Array2<f32>) -> AnalysisResult<Self> {
        let (rows, cols) = raw.dim();
        if cols == 0 || rows == 0 {
            return Ok(Self::zeros());
        }
        if rows != FEATURE_ROWS {
            return Err(AnalysisError::FeatureShape(format!(
                "expected {FEATURE_ROWS} rows, extractor returned {rows}x{cols}"
            )));
        }
        if cols == FEATURE_COLS {
            return Ok(Self { values: raw });
        }

        if cols > FEATURE_COLS {
            warn!(
                columns = cols,
                expected = FEATURE_COLS,
                "Feature matrix wider than expected, truncating"
            );
        }

        let keep = cols.min(FEATURE_COLS);
        let mut values = Array2::zeros((FEATURE_ROWS, FEATURE_COLS));
        values
            .slice_mut(s![.., ..keep])
            .assign(&raw.slice(s![.., ..keep]));
        Ok(Self { values })
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }
}

/// Min-max scale samples into `[0, 1]`.
///
/// A constant signal maps to all zeros.
pub fn normalize_amplitude(samples: &[f32]) -> Vec<f32> {
    let (min, max) = samples
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        });
    let range = max - min;
    let scale = if range > 0.0 { range } else { 1.0 };
    samples.iter().map(|&s| (s - min) / scale).collect()
}

/// MFCC extractor: Hann-windowed STFT, Slaney mel filterbank, power in dB,
/// orthonormal DCT-II.
pub struct MfccExtractor {
    n_fft: usize,
    hop_length: usize,
    n_mels: usize,
    n_mfcc: usize,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    /// Filterbank per sample rate, built lazily for the first rate seen
    filterbank: std::sync::Mutex<Option<(u32, Array2<f64>)>>,
}

impl std::fmt::Debug for MfccExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MfccExtractor")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .field("n_mels", &self.n_mels)
            .field("n_mfcc", &self.n_mfcc)
            .finish()
    }
}

impl Default for MfccExtractor {
    fn default() -> Self {
        Self::new(MFCC_N_FFT, MFCC_HOP_LENGTH, FEATURE_ROWS, FEATURE_ROWS)
    }
}

impl MfccExtractor {
    /// `n_fft` is raised to 2 and `hop_length` to 1 when smaller
    pub fn new(n_fft: usize, hop_length: usize, n_mels: usize, n_mfcc: usize) -> Self {
        let n_fft = n_fft.max(2);
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n_fft);
        Self {
            n_fft,
            hop_length: hop_length.max(1),
            n_mels,
            n_mfcc: n_mfcc.min(n_mels),
            fft,
            window: hann_window(n_fft),
            filterbank: std::sync::Mutex::new(None),
        }
    }

    /// Power spectrogram, `[frame][bin]`, with the signal zero-padded by
    /// `n_fft / 2` on both sides so frames are centered
    fn power_spectrogram(&self, samples: &[f32]) -> Vec<Vec<f64>> {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f64; samples.len() + 2 * pad];
        for (dst, &src) in padded[pad..pad + samples.len()].iter_mut().zip(samples) {
            *dst = src as f64;
        }

        let n_frames = 1 + (padded.len() - self.n_fft) / self.hop_length;
        let n_bins = self.n_fft / 2 + 1;
        let mut buffer = vec![Complex::new(0.0, 0.0); self.n_fft];

        (0..n_frames)
            .map(|frame| {
                let start = frame * self.hop_length;
                for (i, slot) in buffer.iter_mut().enumerate() {
                    *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
                }
                self.fft.process(&mut buffer);
                buffer[..n_bins].iter().map(|c| c.norm_sqr()).collect()
            })
            .collect()
    }

    fn mel_filterbank(&self, sample_rate: u32) -> Array2<f64> {
        let mut cached = match self.filterbank.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((rate, bank)) = cached.as_ref() {
            if *rate == sample_rate {
                return bank.clone();
            }
        }
        let bank = slaney_mel_filterbank(
            sample_rate as f64,
            self.n_fft,
            self.n_mels,
            0.0,
            sample_rate as f64 / 2.0,
        );
        *cached = Some((sample_rate, bank.clone()));
        bank
    }
}

impl AudioFeatureExtractor for MfccExtractor {
    fn extract(&self, samples: &[f32], sample_rate: u32) -> AnalysisResult<Array2<f32>> {
        if samples.is_empty() {
            return Ok(Array2::zeros((self.n_mfcc, 0)));
        }

        let power = self.power_spectrogram(samples);
        let filterbank = self.mel_filterbank(sample_rate);
        let n_frames = power.len();

        // mel energies in dB, [mel][frame]
        let mut mel_db = Array2::<f64>::zeros((self.n_mels, n_frames));
        for (t, frame) in power.iter().enumerate() {
            for m in 0..self.n_mels {
                let energy: f64 = filterbank
                    .row(m)
                    .iter()
                    .zip(frame)
                    .map(|(w, p)| w * p)
                    .sum();
                mel_db[[m, t]] = 10.0 * energy.max(AMIN).log10();
            }
        }
        let peak = mel_db.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        mel_db.mapv_inplace(|v| v.max(peak - TOP_DB));

        let dct = dct_ortho_matrix(self.n_mfcc, self.n_mels);
        Ok(dct.dot(&mel_db).mapv(|v| v as f32))
    }
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f64> {
    let factor = 2.0 * PI / size as f64;
    (0..size)
        .map(|i| 0.5 - 0.5 * (i as f64 * factor).cos())
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters with Slaney area normalization, `[mel][bin]`
fn slaney_mel_filterbank(
    sample_rate: f64,
    n_fft: usize,
    n_mels: usize,
    fmin: f64,
    fmax: f64,
) -> Array2<f64> {
    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();

    let (mel_min, mel_max) = (hz_to_mel(fmin), hz_to_mel(fmax));
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut weights = Array2::<f64>::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let (lo, center, hi) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        let enorm = 2.0 / (hi - lo);
        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - lo) / (center - lo);
            let upper = (hi - f) / (hi - center);
            weights[[m, k]] = lower.min(upper).max(0.0) * enorm;
        }
    }
    weights
}

/// Orthonormal DCT-II basis, `[coefficient][input]`
fn dct_ortho_matrix(n_out: usize, n_in: usize) -> Array2<f64> {
    Array2::from_shape_fn((n_out, n_in), |(k, n)| {
        let scale = if k == 0 {
            (1.0 / n_in as f64).sqrt()
        } else {
            (2.0 / n_in as f64).sqrt()
        };
        scale * (PI * k as f64 * (2 * n + 1) as f64 / (2 * n_in) as f64).cos()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_pads_narrow_matrix() {
        let raw = Array2::from_elem((32, 20), 1.5f32);
        let fitted = FeatureMatrix::fit(raw).unwrap();

        assert_eq!(fitted.values().dim(), (32, 32));
        assert_eq!(fitted.values()[[0, 19]], 1.5);
        assert_eq!(fitted.values()[[31, 20]], 0.0);
        assert_eq!(fitted.values()[[5, 31]], 0.0);
    }

    #[test]
    fn test_fit_truncates_wide_matrix() {
        let raw = Array2::from_shape_fn((32, 40), |(_, c)| c as f32);
        let fitted = FeatureMatrix::fit(raw).unwrap();

        assert_eq!(fitted.values().dim(), (32, 32));
        assert_eq!(fitted.values()[[0, 31]], 31.0);
    }

    #[test]
    fn test_fit_empty_is_zeros() {
        let fitted = FeatureMatrix::fit(Array2::zeros((32, 0))).unwrap();
        assert!(fitted.is_zero());
        assert_eq!(fitted, FeatureMatrix::zeros());
    }

    #[test]
    fn test_fit_rejects_wrong_row_count() {
        let err = FeatureMatrix::fit(Array2::zeros((13, 32))).unwrap_err();
        assert!(matches!(err, AnalysisError::FeatureShape(_)));
    }

    #[test]
    fn test_normalize_amplitude() {
        let normalized = normalize_amplitude(&[-1.0, 0.0, 1.0]);
        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);

        // Constant input maps to zeros
        assert_eq!(normalize_amplitude(&[0.3, 0.3]), vec![0.0, 0.0]);
        assert!(normalize_amplitude(&[]).is_empty());
    }

    #[test]
    fn test_hann_window() {
        let window = hann_window(400);
        assert!((window[0] - 0.0).abs() < 1e-9);
        assert!((window[200] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mel_scale_round_trip() {
        for hz in [0.0, 500.0, 1000.0, 2500.0, 4000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
        // Linear region below 1 kHz
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_filterbank_shape_and_coverage() {
        let bank = slaney_mel_filterbank(8000.0, 2048, 32, 0.0, 4000.0);
        assert_eq!(bank.dim(), (32, 1025));
        for row in bank.rows() {
            assert!(row.iter().all(|&w| w >= 0.0));
            assert!(row.iter().any(|&w| w > 0.0));
        }
    }

    #[test]
    fn test_dct_is_orthonormal() {
        let dct = dct_ortho_matrix(32, 32);
        let identity = dct.dot(&dct.t());
        for i in 0..32 {
            for j in 0..32 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((identity[[i, j]] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_one_second_window_yields_32_frames() {
        let extractor = MfccExtractor::default();
        let samples: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin())
            .collect();
        let mfcc = extractor.extract(&normalize_amplitude(&samples), 8000).unwrap();

        assert_eq!(mfcc.dim(), (32, 32));
        assert!(mfcc.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_short_window_yields_fewer_frames() {
        let extractor = MfccExtractor::default();
        let mfcc = extractor.extract(&vec![0.5f32; 2000], 8000).unwrap();
        assert_eq!(mfcc.dim(), (32, 1 + 2000 / 255));

        let fitted = FeatureMatrix::fit(mfcc).unwrap();
        assert_eq!(fitted.values().dim(), (32, 32));
    }

    #[test]
    fn test_degenerate_sizes_are_clamped() {
        let extractor = MfccExtractor::new(0, 0, 32, 32);
        let mfcc = extractor.extract(&vec![0.25f32; 800], 8000).unwrap();

        // n_fft 2 pads one sample per side; hop 1 gives a frame per sample
        assert_eq!(mfcc.dim(), (32, 801));
        assert!(mfcc.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_window() {
        let extractor = MfccExtractor::default();
        let mfcc = extractor.extract(&[], 8000).unwrap();
        assert_eq!(mfcc.ncols(), 0);
    }
}
