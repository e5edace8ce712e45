//! Affine int8 quantization and the classification helpers built on it.
//!
//! One convention is used in both directions:
//!
//! ```text
//! q = clamp(round(x / scale) + zero_point, -128, 127)
//! x = scale * (q - zero_point)
//! ```
//!
//! Mixing the sign of the zero-point between the two directions yields
//! probabilities that look plausible and are wrong, so nothing outside this
//! module does the arithmetic itself.

use serde::{Deserialize, Serialize};

use thermo_types::{Class, ClassificationResult, QuantizedOutput, NUM_CLASSES};

pub const QMIN: i32 = i8::MIN as i32;
pub const QMAX: i32 = i8::MAX as i32;

/// Scale and zero-point of one quantized tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl QuantParams {
    pub const fn new(scale: f32, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }

    pub fn validate(&self, name: &str) -> Result<(), String> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(format!("{} scale must be a positive number, got {}", name, self.scale));
        }
        if !(QMIN..=QMAX).contains(&self.zero_point) {
            return Err(format!(
                "{} zero_point must be within [{}, {}], got {}",
                name, QMIN, QMAX, self.zero_point
            ));
        }
        Ok(())
    }

    /// Smallest and largest real values representable without saturating.
    pub fn representable_range(&self) -> (f32, f32) {
        (
            self.scale * (QMIN - self.zero_point) as f32,
            self.scale * (QMAX - self.zero_point) as f32,
        )
    }
}

/// Training-time standardisation applied before quantizing the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: f32,
    pub std: f32,
}

impl Normalization {
    pub const IDENTITY: Normalization = Normalization { mean: 0.0, std: 1.0 };

    pub fn validate(&self) -> Result<(), String> {
        if !self.mean.is_finite() {
            return Err(format!("normalization mean must be finite, got {}", self.mean));
        }
        if !self.std.is_finite() || self.std <= 0.0 {
            return Err(format!("normalization std must be a positive number, got {}", self.std));
        }
        Ok(())
    }

    pub fn apply(&self, raw: f32) -> f64 {
        (raw as f64 - self.mean as f64) / self.std as f64
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Quantize without normalization.
pub fn quantize(raw: f32, params: QuantParams) -> i8 {
    quantize_normalized(raw, params, Normalization::IDENTITY)
}

/// Normalize, then quantize, saturating at the int8 bounds.
///
/// Never fails. NaN maps to the zero-point.
pub fn quantize_normalized(raw: f32, params: QuantParams, norm: Normalization) -> i8 {
    let q = (norm.apply(raw) / params.scale as f64).round() + params.zero_point as f64;
    if q.is_nan() {
        return params.zero_point.clamp(QMIN, QMAX) as i8;
    }
    q.clamp(QMIN as f64, QMAX as f64) as i8
}

pub fn dequantize(q: i8, params: QuantParams) -> f32 {
    params.scale * (q as i32 - params.zero_point) as f32
}

pub fn dequantize_scores<const N: usize>(scores: &[i8; N], params: QuantParams) -> [f32; N] {
    scores.map(|q| dequantize(q, params))
}

/// Index and value of the largest element. Ties go to the lowest index.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut iter = values.iter().copied().enumerate();
    let (mut best_index, mut best) = iter.next()?;
    for (index, value) in iter {
        if value > best {
            best_index = index;
            best = value;
        }
    }
    Some((best_index, best))
}

/// Dequantize the classifier output and pick the winning class.
pub fn classify(output: &QuantizedOutput, params: QuantParams) -> ClassificationResult {
    let probabilities: [f32; NUM_CLASSES] = dequantize_scores(&output.scores, params);
    // NUM_CLASSES > 0, so there is always a winner
    let (index, confidence) = argmax(&probabilities).unwrap_or((0, probabilities[0]));
    ClassificationResult {
        class: Class::from_index(index).unwrap_or(Class::Cold),
        confidence,
        probabilities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const INPUT: QuantParams = QuantParams::new(0.0180, -12);
    const OUTPUT: QuantParams = QuantParams::new(0.0039, -128);
    const NORM: Normalization = Normalization { mean: 21.7625, std: 6.1161 };

    #[test]
    fn quantizes_reference_temperature() {
        let expected = ((((25.0f64 - 21.7625) / 6.1161) / 0.0180).round() as i32 - 12).clamp(QMIN, QMAX);
        assert_eq!(expected, 17);
        assert_eq!(quantize_normalized(25.0, INPUT, NORM) as i32, expected);
    }

    #[test]
    fn dequantizes_reference_output() {
        let probs = dequantize_scores(&[-128, 0, 90], OUTPUT);
        let expected = [0.0, 0.4992, 0.8502];
        for (p, e) in probs.iter().zip(expected) {
            assert!((p - e).abs() < 0.001, "{} vs {}", p, e);
        }
    }

    #[test]
    fn saturates_far_outside_calibration_range() {
        assert_eq!(quantize(1.0e9, INPUT), i8::MAX);
        assert_eq!(quantize(-1.0e9, INPUT), i8::MIN);
        assert_eq!(quantize_normalized(500.0, INPUT, NORM), i8::MAX);
        assert_eq!(quantize_normalized(-273.15, INPUT, NORM), i8::MIN);
        assert_eq!(quantize(f32::INFINITY, INPUT), i8::MAX);
        assert_eq!(quantize(f32::NEG_INFINITY, INPUT), i8::MIN);
        assert_eq!(quantize(f32::NAN, INPUT), -12);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        let unit = QuantParams::new(1.0, 0);
        assert_eq!(quantize(2.5, unit), 3);
        assert_eq!(quantize(-2.5, unit), -3);
        assert_eq!(quantize(2.49, unit), 2);
    }

    #[test]
    fn tie_break_prefers_lower_index() {
        assert_eq!(argmax(&[0.5, 0.5, 0.3]).map(|(i, _)| i), Some(0));
        assert_eq!(argmax(&[0.2, 0.5, 0.5]).map(|(i, _)| i), Some(1));
        assert_eq!(argmax(&[0.1, 0.1, 0.1]).map(|(i, _)| i), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn classify_reference_output_is_hot() {
        let result = classify(&QuantizedOutput::new([-128, 0, 90], 1), OUTPUT);
        assert_eq!(result.class, Class::Hot);
        assert!((result.confidence - 0.8502).abs() < 0.001);
    }

    #[test]
    fn classify_ties_on_quantized_scores() {
        let result = classify(&QuantizedOutput::new([10, 10, -5], 1), OUTPUT);
        assert_eq!(result.class, Class::Cold);
        let result = classify(&QuantizedOutput::new([-5, 10, 10], 1), OUTPUT);
        assert_eq!(result.class, Class::Warm);
    }

    #[test]
    fn validation_rejects_bad_params() {
        assert!(QuantParams::new(0.0, 0).validate("input").is_err());
        assert!(QuantParams::new(f32::NAN, 0).validate("input").is_err());
        assert!(QuantParams::new(0.1, 128).validate("input").is_err());
        assert!(QuantParams::new(0.1, -128).validate("input").is_ok());
        assert!(Normalization { mean: 0.0, std: 0.0 }.validate().is_err());
    }

    proptest! {
        #[test]
        fn round_trip_within_one_step(
            scale in 0.001f32..1.0,
            zero_point in -128i32..=127,
            t in 0.0f64..=1.0,
        ) {
            let params = QuantParams::new(scale, zero_point);
            let (lo, hi) = params.representable_range();
            let raw = lo + ((hi - lo) as f64 * t) as f32;
            let back = dequantize(quantize(raw, params), params);
            prop_assert!((back - raw).abs() <= scale, "raw={} back={} scale={}", raw, back, scale);
        }

        #[test]
        fn saturates_instead_of_wrapping(
            scale in 0.001f32..1.0,
            zero_point in -128i32..=127,
            magnitude in 1.0e3f32..1.0e30,
        ) {
            let params = QuantParams::new(scale, zero_point);
            let (lo, hi) = params.representable_range();
            prop_assert_eq!(quantize(hi + magnitude, params), i8::MAX);
            prop_assert_eq!(quantize(lo - magnitude, params), i8::MIN);
        }

        #[test]
        fn normalized_round_trip_recovers_standardised_value(raw in 10.0f32..33.0) {
            let q = quantize_normalized(raw, INPUT, NORM);
            let standardised = NORM.apply(raw) as f32;
            prop_assert!((dequantize(q, INPUT) - standardised).abs() <= INPUT.scale);
        }
    }
}
