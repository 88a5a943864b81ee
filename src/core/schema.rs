//! Artifact and proof data model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ProverError, ProverResult};

/// Kind of proving operation, used to tag retries and error records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Compile,
    Setup,
    GenerateProof,
    ExportVerifier,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Compile => "compile",
            OperationKind::Setup => "setup",
            OperationKind::GenerateProof => "generateProof",
            OperationKind::ExportVerifier => "exportVerifier",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled circuit program as produced by the backend.
///
/// The bytes are opaque to this crate and passed through unmodified. The ABI
/// is whatever the backend reports (`Null` when unknown, e.g. after loading
/// a persisted program).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub bytes: Vec<u8>,
    #[serde(default)]
    pub abi: serde_json::Value,
}

impl CompiledProgram {
    pub fn new(bytes: Vec<u8>, abi: serde_json::Value) -> Self {
        CompiledProgram { bytes, abi }
    }
}

/// Proving and verification keys derived together from one program.
///
/// Keys are only meaningful for the program they came from; pairing is by
/// circuit name and is not checked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyPair {
    pub proving_key: Vec<u8>,
    pub verification_key: Vec<u8>,
}

/// Groth16 proof in the layout ZoKrates writes to `proof.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
}

impl Groth16Proof {
    /// True when every coordinate is non-empty.
    pub fn is_populated(&self) -> bool {
        self.a.iter().all(|s| !s.is_empty())
            && self.b.iter().flatten().all(|s| !s.is_empty())
            && self.c.iter().all(|s| !s.is_empty())
    }

    /// Convert into the point-struct shape expected by an on-chain pairing verifier.
    pub fn to_verifier_format(&self) -> VerifierProof {
        VerifierProof {
            a: G1Point {
                x: self.a[0].clone(),
                y: self.a[1].clone(),
            },
            b: G2Point {
                x: [self.b[0][0].clone(), self.b[0][1].clone()],
                y: [self.b[1][0].clone(), self.b[1][1].clone()],
            },
            c: G1Point {
                x: self.c[0].clone(),
                y: self.c[1].clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct G1Point {
    #[serde(rename = "X")]
    pub x: String,
    #[serde(rename = "Y")]
    pub y: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct G2Point {
    #[serde(rename = "X")]
    pub x: [String; 2],
    #[serde(rename = "Y")]
    pub y: [String; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierProof {
    pub a: G1Point,
    pub b: G2Point,
    pub c: G1Point,
}

/// Proof plus the two public inputs a pairing verifier contract takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierCalldata {
    pub proof: VerifierProof,
    pub inputs: [String; 2],
}

impl VerifierCalldata {
    /// Build calldata from a proof artifact, using the final two public inputs.
    pub fn from_artifact(artifact: &ProofArtifact) -> ProverResult<Self> {
        let n = artifact.inputs.len();
        if n < 2 {
            return Err(ProverError::Message(format!(
                "verifier calldata needs at least 2 public inputs, proof has {n}"
            )));
        }
        Ok(VerifierCalldata {
            proof: artifact.proof.to_verifier_format(),
            inputs: [artifact.inputs[n - 2].clone(), artifact.inputs[n - 1].clone()],
        })
    }

    /// Collect every format problem; an empty list means well-formed.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let p = &self.proof;
        for (label, value) in [
            ("a.X", &p.a.x),
            ("a.Y", &p.a.y),
            ("b.X[0]", &p.b.x[0]),
            ("b.X[1]", &p.b.x[1]),
            ("b.Y[0]", &p.b.y[0]),
            ("b.Y[1]", &p.b.y[1]),
            ("c.X", &p.c.x),
            ("c.Y", &p.c.y),
        ] {
            if value.is_empty() {
                errors.push(format!("Invalid '{label}' field"));
            }
        }
        for (i, input) in self.inputs.iter().enumerate() {
            if !is_hex_word(input) {
                errors.push(format!("Input {i} must be a 0x-prefixed hex value"));
            }
        }
        errors
    }
}

fn is_hex_word(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofMetadata {
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub feature_count: usize,
    pub prediction: i64,
    /// Wall-clock time across validation, encoding, proving and decoding
    pub proof_generation_time_ms: f64,
}

/// Result of one successful weather proof generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofArtifact {
    pub proof: Groth16Proof,
    pub inputs: Vec<String>,
    pub metadata: ProofMetadata,
}

/// Readiness of a named circuit, derived from artifact presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitStatus {
    pub compiled: bool,
    pub keys_setup: bool,
    pub ready: bool,
}

impl CircuitStatus {
    pub fn from_presence(compiled: bool, keys_setup: bool) -> Self {
        CircuitStatus {
            compiled,
            keys_setup,
            ready: compiled && keys_setup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proof() -> Groth16Proof {
        Groth16Proof {
            a: ["0x01".into(), "0x02".into()],
            b: [["0x03".into(), "0x04".into()], ["0x05".into(), "0x06".into()]],
            c: ["0x07".into(), "0x08".into()],
        }
    }

    fn sample_artifact(inputs: Vec<&str>) -> ProofArtifact {
        ProofArtifact {
            proof: sample_proof(),
            inputs: inputs.into_iter().map(String::from).collect(),
            metadata: ProofMetadata {
                timestamp: 0,
                feature_count: 113,
                prediction: 1,
                proof_generation_time_ms: 1.0,
            },
        }
    }

    #[test]
    fn test_status_ready_requires_both() {
        assert!(!CircuitStatus::from_presence(true, false).ready);
        assert!(!CircuitStatus::from_presence(false, true).ready);
        assert!(CircuitStatus::from_presence(true, true).ready);
    }

    #[test]
    fn test_verifier_format_layout() {
        let v = sample_proof().to_verifier_format();
        assert_eq!(v.a.x, "0x01");
        assert_eq!(v.b.x, ["0x03".to_string(), "0x04".to_string()]);
        assert_eq!(v.b.y, ["0x05".to_string(), "0x06".to_string()]);
        assert_eq!(v.c.y, "0x08");

        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["a"]["X"], "0x01");
        assert_eq!(json["b"]["Y"][1], "0x06");
    }

    #[test]
    fn test_calldata_uses_last_two_inputs() {
        let artifact = sample_artifact(vec!["0x0a", "0x0b", "0x0c"]);
        let calldata = VerifierCalldata::from_artifact(&artifact).unwrap();
        assert_eq!(calldata.inputs, ["0x0b".to_string(), "0x0c".to_string()]);
        assert!(calldata.validate().is_empty());
    }

    #[test]
    fn test_calldata_rejects_short_inputs() {
        let artifact = sample_artifact(vec!["0x0a"]);
        assert!(VerifierCalldata::from_artifact(&artifact).is_err());
    }

    #[test]
    fn test_calldata_validate_reports_all_problems() {
        let mut artifact = sample_artifact(vec!["12", "0xzz"]);
        artifact.proof.a[0] = String::new();
        let calldata = VerifierCalldata::from_artifact(&artifact).unwrap();
        let errors = calldata.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("a.X"));
    }

    #[test]
    fn test_operation_kind_display() {
        assert_eq!(OperationKind::GenerateProof.to_string(), "generateProof");
        assert_eq!(
            serde_json::to_string(&OperationKind::ExportVerifier).unwrap(),
            "\"exportVerifier\""
        );
    }
}
