//! The canonical radar feature set and its grouping.

/// Number of model features.
pub const FEATURE_COUNT: usize = 113;

/// Width of the circuit's input vector: the features plus zero padding.
pub const INPUT_WIDTH: usize = 116;

/// Number of zero scalars appended after the features.
pub const PADDING: usize = INPUT_WIDTH - FEATURE_COUNT;

/// Radar-derived feature names in circuit input order.
pub const RADAR_FEATURES: [&str; FEATURE_COUNT] = [
    "MassWeightedMean_num_non_null",
    "MassWeightedMean_mean",
    "MassWeightedMean_min",
    "MassWeightedMean_max",
    "MassWeightedMean_med",
    "MassWeightedMean_sum",
    "MassWeightedSD_num_non_null",
    "MassWeightedSD_mean",
    "MassWeightedSD_min",
    "MassWeightedSD_max",
    "MassWeightedSD_med",
    "MassWeightedSD_sum",
    "RR1_num_00",
    "RR1_num_non_null",
    "RR1_mean",
    "RR1_min",
    "RR1_max",
    "RR1_med",
    "RR1_sum",
    "ReflectivityQC_num_00",
    "ReflectivityQC_num_03",
    "ReflectivityQC_num_non_null",
    "ReflectivityQC_mean",
    "ReflectivityQC_min",
    "ReflectivityQC_max",
    "ReflectivityQC_med",
    "ReflectivityQC_sum",
    "LogWaterVolume_num_non_null",
    "LogWaterVolume_mean",
    "LogWaterVolume_min",
    "LogWaterVolume_max",
    "LogWaterVolume_med",
    "LogWaterVolume_sum",
    "Reflectivity_num_non_null",
    "Reflectivity_mean",
    "Reflectivity_min",
    "Reflectivity_max",
    "Reflectivity_med",
    "Reflectivity_sum",
    "Composite_num_00",
    "Composite_num_non_null",
    "Composite_mean",
    "Composite_min",
    "Composite_max",
    "Composite_med",
    "Composite_sum",
    "RR3_num_00",
    "RR3_num_non_null",
    "RR3_mean",
    "RR3_min",
    "RR3_max",
    "RR3_med",
    "RR3_sum",
    "Zdr_num_00",
    "Zdr_num_03",
    "Zdr_num_non_null",
    "Zdr_mean",
    "Zdr_min",
    "Zdr_max",
    "Zdr_med",
    "Zdr_sum",
    "Velocity_num_00",
    "Velocity_num_01",
    "Velocity_num_03",
    "Velocity_num_non_null",
    "Velocity_mean",
    "Velocity_min",
    "Velocity_max",
    "Velocity_med",
    "Velocity_sum",
    "HybridScan_num_non_null",
    "HybridScan_mean",
    "HybridScan_min",
    "HybridScan_max",
    "HybridScan_med",
    "HybridScan_sum",
    "TimeToEnd_num_non_null",
    "TimeToEnd_mean",
    "TimeToEnd_min",
    "TimeToEnd_max",
    "TimeToEnd_med",
    "TimeToEnd_sum",
    "RhoHV_num_00",
    "RhoHV_num_03",
    "RhoHV_num_non_null",
    "RhoHV_mean",
    "RhoHV_min",
    "RhoHV_max",
    "RhoHV_med",
    "RhoHV_sum",
    "RR2_num_00",
    "RR2_num_non_null",
    "RR2_mean",
    "RR2_min",
    "RR2_max",
    "RR2_med",
    "RR2_sum",
    "RadarQualityIndex_num_non_null",
    "RadarQualityIndex_mean",
    "RadarQualityIndex_min",
    "RadarQualityIndex_max",
    "RadarQualityIndex_med",
    "RadarQualityIndex_sum",
    "Hydro_0",
    "Hydro_1",
    "Hydro_2",
    "Hydro_3",
    "Hydro_4",
    "Hydro_5",
    "Hydro_6",
    "Hydro_7",
    "Hydro_8",
    "Hydro_9",
];

/// Feature categories, in display order. Every canonical feature appears in
/// exactly one group.
pub const FEATURE_GROUPS: &[(&str, &[&str])] = &[
    (
        "Mass Weighted Statistics",
        &[
            "MassWeightedMean_num_non_null",
            "MassWeightedMean_mean",
            "MassWeightedMean_min",
            "MassWeightedMean_max",
            "MassWeightedMean_med",
            "MassWeightedMean_sum",
            "MassWeightedSD_num_non_null",
            "MassWeightedSD_mean",
            "MassWeightedSD_min",
            "MassWeightedSD_max",
            "MassWeightedSD_med",
            "MassWeightedSD_sum",
        ],
    ),
    (
        "Rain Rates",
        &[
            "RR1_num_00",
            "RR1_num_non_null",
            "RR1_mean",
            "RR1_min",
            "RR1_max",
            "RR1_med",
            "RR1_sum",
            "RR2_num_00",
            "RR2_num_non_null",
            "RR2_mean",
            "RR2_min",
            "RR2_max",
            "RR2_med",
            "RR2_sum",
            "RR3_num_00",
            "RR3_num_non_null",
            "RR3_mean",
            "RR3_min",
            "RR3_max",
            "RR3_med",
            "RR3_sum",
        ],
    ),
    (
        "Reflectivity",
        &[
            "ReflectivityQC_num_00",
            "ReflectivityQC_num_03",
            "ReflectivityQC_num_non_null",
            "ReflectivityQC_mean",
            "ReflectivityQC_min",
            "ReflectivityQC_max",
            "ReflectivityQC_med",
            "ReflectivityQC_sum",
            "Reflectivity_num_non_null",
            "Reflectivity_mean",
            "Reflectivity_min",
            "Reflectivity_max",
            "Reflectivity_med",
            "Reflectivity_sum",
        ],
    ),
    (
        "Volume and Composite",
        &[
            "LogWaterVolume_num_non_null",
            "LogWaterVolume_mean",
            "LogWaterVolume_min",
            "LogWaterVolume_max",
            "LogWaterVolume_med",
            "LogWaterVolume_sum",
            "Composite_num_00",
            "Composite_num_non_null",
            "Composite_mean",
            "Composite_min",
            "Composite_max",
            "Composite_med",
            "Composite_sum",
        ],
    ),
    (
        "Polarimetric Data",
        &[
            "Zdr_num_00",
            "Zdr_num_03",
            "Zdr_num_non_null",
            "Zdr_mean",
            "Zdr_min",
            "Zdr_max",
            "Zdr_med",
            "Zdr_sum",
            "RhoHV_num_00",
            "RhoHV_num_03",
            "RhoHV_num_non_null",
            "RhoHV_mean",
            "RhoHV_min",
            "RhoHV_max",
            "RhoHV_med",
            "RhoHV_sum",
        ],
    ),
    (
        "Velocity",
        &[
            "Velocity_num_00",
            "Velocity_num_01",
            "Velocity_num_03",
            "Velocity_num_non_null",
            "Velocity_mean",
            "Velocity_min",
            "Velocity_max",
            "Velocity_med",
            "Velocity_sum",
        ],
    ),
    (
        "Scan Data",
        &[
            "HybridScan_num_non_null",
            "HybridScan_mean",
            "HybridScan_min",
            "HybridScan_max",
            "HybridScan_med",
            "HybridScan_sum",
            "TimeToEnd_num_non_null",
            "TimeToEnd_mean",
            "TimeToEnd_min",
            "TimeToEnd_max",
            "TimeToEnd_med",
            "TimeToEnd_sum",
        ],
    ),
    (
        "Quality Metrics",
        &[
            "RadarQualityIndex_num_non_null",
            "RadarQualityIndex_mean",
            "RadarQualityIndex_min",
            "RadarQualityIndex_max",
            "RadarQualityIndex_med",
            "RadarQualityIndex_sum",
        ],
    ),
    (
        "Hydrometeor Classification",
        &[
            "Hydro_0", "Hydro_1", "Hydro_2", "Hydro_3", "Hydro_4", "Hydro_5", "Hydro_6",
            "Hydro_7", "Hydro_8", "Hydro_9",
        ],
    ),
];

pub fn is_known_feature(name: &str) -> bool {
    RADAR_FEATURES.contains(&name)
}

/// Position of `name` in the circuit input vector.
pub fn feature_index(name: &str) -> Option<usize> {
    RADAR_FEATURES.iter().position(|f| *f == name)
}

pub fn feature_group(name: &str) -> Option<&'static str> {
    FEATURE_GROUPS
        .iter()
        .find(|(_, members)| members.contains(&name))
        .map(|(group, _)| *group)
}

fn source_label(prefix: &str) -> &str {
    match prefix {
        "MassWeightedMean" => "mass-weighted mean",
        "MassWeightedSD" => "mass-weighted standard deviation",
        "RR1" => "rain rate (method 1)",
        "RR2" => "rain rate (method 2)",
        "RR3" => "rain rate (method 3)",
        "ReflectivityQC" => "quality-controlled reflectivity",
        "Reflectivity" => "reflectivity",
        "LogWaterVolume" => "log water volume",
        "Composite" => "composite reflectivity",
        "Zdr" => "differential reflectivity",
        "RhoHV" => "correlation coefficient",
        "Velocity" => "radial velocity",
        "HybridScan" => "hybrid scan reflectivity",
        "TimeToEnd" => "time to end of observation",
        "RadarQualityIndex" => "radar quality index",
        other => other,
    }
}

fn statistic_label(stat: &str) -> String {
    match stat {
        "num_non_null" => "count of non-null samples".to_string(),
        "mean" => "mean".to_string(),
        "min" => "minimum".to_string(),
        "max" => "maximum".to_string(),
        "med" => "median".to_string(),
        "sum" => "sum".to_string(),
        other => match other.strip_prefix("num_") {
            Some(code) => format!("count of samples flagged {code}"),
            None => other.to_string(),
        },
    }
}

/// Human-readable description of a canonical feature.
pub fn feature_description(name: &str) -> Option<String> {
    let group = feature_group(name)?;
    if let Some(class) = name.strip_prefix("Hydro_") {
        return Some(format!("{group}: share of hydrometeor class {class}"));
    }
    let (prefix, stat) = name.split_once('_')?;
    Some(format!(
        "{group}: {} of {}",
        statistic_label(stat),
        source_label(prefix)
    ))
}
