//! Validation and encoding of weather feature maps into circuit inputs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ProverError, ProverResult};

use super::features::{FEATURE_COUNT, INPUT_WIDTH, RADAR_FEATURES, is_known_feature};

/// Named feature values for one model evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherModelInputs {
    pub features: HashMap<String, f64>,
}

impl WeatherModelInputs {
    pub fn new(features: HashMap<String, f64>) -> Self {
        WeatherModelInputs { features }
    }
}

impl FromIterator<(String, f64)> for WeatherModelInputs {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        WeatherModelInputs {
            features: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// Blocking problems, all of them
    pub errors: Vec<String>,
    /// Out-of-range values; proof generation still proceeds
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// `Err(Validation)` carrying every error when invalid.
    pub fn into_result(self) -> ProverResult<Vec<String>> {
        if self.valid {
            Ok(self.warnings)
        } else {
            Err(ProverError::Validation(self.errors))
        }
    }
}

/// Check a feature map against the canonical feature set.
///
/// Errors are reported in a stable order: missing features in canonical
/// order, then unknown keys and non-finite values sorted by key.
pub fn validate(features: &HashMap<String, f64>, min: f64, max: f64) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for name in RADAR_FEATURES {
        if !features.contains_key(name) {
            errors.push(format!("Missing required feature: {name}"));
        }
    }

    let mut keys: Vec<&String> = features.keys().collect();
    keys.sort();

    for key in &keys {
        if !is_known_feature(key) {
            errors.push(format!("Unknown feature: {key}"));
        }
    }

    for key in keys {
        let value = features[key];
        if !value.is_finite() {
            errors.push(format!("Invalid value for {key}: {value}"));
        } else if value < min || value > max {
            warnings.push(format!(
                "Value for {key} ({value}) is outside the expected range [{min}, {max}]"
            ));
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Render a feature map as the circuit's input vector.
///
/// Always returns [`INPUT_WIDTH`] decimal strings: the features in canonical
/// order (absent ones as 0) followed by zero padding.
pub fn encode(features: &HashMap<String, f64>) -> Vec<String> {
    let mut out: Vec<String> = RADAR_FEATURES
        .iter()
        .map(|name| features.get(*name).copied().unwrap_or(0.0).to_string())
        .collect();
    out.resize(INPUT_WIDTH, "0".to_string());
    out
}

/// Parse the final public input as the model's prediction.
///
/// Unparseable or missing values decode to 0; see [`try_decode_prediction`]
/// for the strict form.
pub fn decode_prediction(public_inputs: &[String]) -> i64 {
    match try_decode_prediction(public_inputs) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("prediction decoded as 0: {e}");
            0
        }
    }
}

pub fn try_decode_prediction(public_inputs: &[String]) -> ProverResult<i64> {
    let last = public_inputs
        .last()
        .ok_or_else(|| ProverError::Message("proof has no public inputs".into()))?;
    parse_field_element(last)
        .ok_or_else(|| ProverError::Message(format!("cannot parse prediction '{last}'")))
}

/// BN254 scalar field modulus as little-endian 64-bit limbs.
const FIELD_MODULUS: [u64; 4] = [
    0x43e1f593f0000001,
    0x2833e84879b97091,
    0xb85045b68181585d,
    0x30644e72e131a029,
];

/// Parse a field element as a signed integer.
///
/// Elements above `p / 2` are the field encoding of negatives and decode
/// to `-(p - v)`. Elements that do not fit an `i64` either way, or are not
/// reduced below `p`, yield `None`.
fn parse_field_element(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.starts_with('-') {
        return raw.parse::<i64>().ok();
    }
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => limbs_from_digits(hex, 16)?,
        None => limbs_from_digits(raw, 10)?,
    };
    if cmp_limbs(&value, &FIELD_MODULUS).is_ge() {
        return None;
    }
    let negated = sub_limbs(&FIELD_MODULUS, &value);
    if cmp_limbs(&value, &negated).is_gt() {
        limbs_to_i64(&negated).map(|n| -n)
    } else {
        limbs_to_i64(&value)
    }
}

fn limbs_from_digits(digits: &str, radix: u32) -> Option<[u64; 4]> {
    if digits.is_empty() {
        return None;
    }
    let mut out = [0u64; 4];
    for c in digits.chars() {
        let mut carry = u128::from(c.to_digit(radix)?);
        for limb in out.iter_mut() {
            let v = u128::from(*limb) * u128::from(radix) + carry;
            *limb = v as u64;
            carry = v >> 64;
        }
        if carry != 0 {
            return None;
        }
    }
    Some(out)
}

fn cmp_limbs(a: &[u64; 4], b: &[u64; 4]) -> std::cmp::Ordering {
    a.iter().rev().cmp(b.iter().rev())
}

/// `a - b`, assuming `a >= b`.
fn sub_limbs(a: &[u64; 4], b: &[u64; 4]) -> [u64; 4] {
    let mut out = [0u64; 4];
    let mut borrow = false;
    for i in 0..4 {
        let (d, b1) = a[i].overflowing_sub(b[i]);
        let (d, b2) = d.overflowing_sub(u64::from(borrow));
        out[i] = d;
        borrow = b1 || b2;
    }
    out
}

fn limbs_to_i64(v: &[u64; 4]) -> Option<i64> {
    if v[1..].iter().any(|&l| l != 0) {
        return None;
    }
    i64::try_from(v[0]).ok()
}

/// Positional feature vector plus the claimed prediction and its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherProofData {
    pub features: Vec<f64>,
    pub prediction: f64,
    /// In `[0, 1]`
    pub confidence: f64,
}

impl WeatherProofData {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.features.len() != FEATURE_COUNT {
            errors.push(format!(
                "Expected {FEATURE_COUNT} features, got {}",
                self.features.len()
            ));
        }
        if !self.features.iter().all(|f| f.is_finite()) {
            errors.push("All features must be valid numbers".to_string());
        }
        if !self.prediction.is_finite() {
            errors.push("Prediction must be a valid number".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            errors.push("Confidence must be a number between 0 and 1".to_string());
        }
        errors
    }

    /// Features, then the prediction, then the confidence scaled to thousandths.
    pub fn to_inputs(&self) -> Vec<String> {
        let mut inputs: Vec<String> = self.features.iter().map(|f| f.to_string()).collect();
        inputs.push(self.prediction.to_string());
        inputs.push(((self.confidence * 1000.0).floor() as i64).to_string());
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_map() -> HashMap<String, f64> {
        RADAR_FEATURES
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i as f64))
            .collect()
    }

    #[test]
    fn test_valid_map() {
        let report = validate(&full_map(), -1e12, 1e12);
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_single_missing_feature() {
        let mut map = full_map();
        map.remove("Zdr_mean");
        let report = validate(&map, -1e12, 1e12);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Missing required feature: Zdr_mean"]);

        let mut map = full_map();
        map.remove("RR1_mean");
        let report = validate(&map, -1e12, 1e12);
        assert!(!report.valid);
        assert!(report.errors[0].contains("RR1_mean"));
    }

    #[test]
    fn test_unknown_and_non_finite() {
        let mut map = full_map();
        map.insert("Hydro_13".into(), 1.0);
        map.insert("RR1_mean".into(), f64::NAN);
        let report = validate(&map, -1e12, 1e12);
        assert_eq!(
            report.errors,
            vec!["Unknown feature: Hydro_13", "Invalid value for RR1_mean: NaN"]
        );
    }

    #[test]
    fn test_out_of_range_is_warning() {
        let mut map = full_map();
        map.insert("Velocity_max".into(), 5e12);
        let report = validate(&map, -1e12, 1e12);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("Velocity_max"));
        assert_eq!(report.into_result().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_report_into_result() {
        let report = validate(&HashMap::new(), -1.0, 1.0);
        match report.into_result() {
            Err(ProverError::Validation(errors)) => assert_eq!(errors.len(), FEATURE_COUNT),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_encode_width_and_order() {
        let encoded = encode(&full_map());
        assert_eq!(encoded.len(), INPUT_WIDTH);
        assert_eq!(encoded[0], "0");
        assert_eq!(encoded[5], "5");
        assert_eq!(&encoded[FEATURE_COUNT..], ["0", "0", "0"]);
    }

    #[test]
    fn test_encode_missing_defaults_to_zero() {
        let mut map = HashMap::new();
        map.insert("Hydro_9".to_string(), 2.5);
        let encoded = encode(&map);
        assert_eq!(encoded.len(), INPUT_WIDTH);
        assert_eq!(encoded[FEATURE_COUNT - 1], "2.5");
        assert_eq!(encoded[0], "0");
    }

    #[test]
    fn test_decode_prediction() {
        let hex = format!("0x{:064x}", 42);
        assert_eq!(decode_prediction(&["1".into(), hex]), 42);
        assert_eq!(decode_prediction(&["-7".into()]), -7);
        assert_eq!(decode_prediction(&["not-a-number".into()]), 0);
        assert_eq!(decode_prediction(&[]), 0);
        assert!(try_decode_prediction(&["0xzz".into()]).is_err());
        assert!(try_decode_prediction(&["0x".into()]).is_err());
        assert_eq!(try_decode_prediction(&["0x0".into()]).unwrap(), 0);
    }

    #[test]
    fn test_decode_negative_field_elements() {
        // p - 7 and p - 1 in BN254
        let minus_seven =
            "0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593effffffa".to_string();
        assert_eq!(try_decode_prediction(&[minus_seven]).unwrap(), -7);
        let minus_one = "21888242871839275222246405745257275088548364400416034343698204186575808495616"
            .to_string();
        assert_eq!(try_decode_prediction(&[minus_one]).unwrap(), -1);

        // the modulus itself is not a reduced element
        let modulus =
            "0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001".to_string();
        assert!(try_decode_prediction(&[modulus]).is_err());

        // 2^80 is a valid positive element but does not fit an i64
        let wide = format!("0x1{}", "0".repeat(20));
        assert!(try_decode_prediction(&[wide.clone()]).is_err());
        assert_eq!(decode_prediction(&[wide]), 0);
    }

    #[test]
    fn test_proof_data_inputs() {
        let data = WeatherProofData {
            features: vec![1.0; FEATURE_COUNT],
            prediction: 3.0,
            confidence: 0.8567,
        };
        assert!(data.validate().is_empty());
        let inputs = data.to_inputs();
        assert_eq!(inputs.len(), FEATURE_COUNT + 2);
        assert_eq!(inputs[FEATURE_COUNT], "3");
        assert_eq!(inputs[FEATURE_COUNT + 1], "856");
    }

    #[test]
    fn test_proof_data_validation() {
        let data = WeatherProofData {
            features: vec![1.0; 4],
            prediction: f64::INFINITY,
            confidence: 1.5,
        };
        assert_eq!(data.validate().len(), 3);
    }
}
