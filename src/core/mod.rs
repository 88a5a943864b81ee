//! Core types, configuration and environment detection for weather-zk.
//!
//! `schema` holds the artifact and proof data model shared by every layer.

pub mod config;
pub mod env;
pub mod schema;

// Re-export key types for convenience
pub use config::{
    BackendConfig, LimitsConfig, MonitoringConfig, PathsConfig, ProofConfig, ProverConfig,
    RetryConfig, WeatherConfig, load_config,
};
pub use env::EnvironmentInfo;
pub use schema::{
    CircuitStatus, CompiledProgram, G1Point, G2Point, Groth16Proof, KeyPair, OperationKind,
    ProofArtifact, ProofMetadata, VerifierCalldata, VerifierProof,
};
