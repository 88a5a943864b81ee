//! Weather model domain: the fixed radar feature contract and its encoding.

pub mod encoding;
pub mod features;

pub use encoding::{
    ValidationReport, WeatherModelInputs, WeatherProofData, decode_prediction, encode,
    try_decode_prediction, validate,
};
pub use features::{
    FEATURE_COUNT, FEATURE_GROUPS, INPUT_WIDTH, RADAR_FEATURES, feature_description, feature_group,
};
