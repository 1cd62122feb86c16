// Engine defaults and domain constants

/// Minutes in one calendar day.
pub const ONEDAY_M: i64 = 24 * 60;

// Periodic activities (seconds)
pub const POLL_INTERVAL_SECS: u64 = 60;
pub const LIST_FETCH_FIRST_SECS: u64 = 3;
pub const LIST_FETCH_RETRY_SECS: u64 = 180;
pub const ARC_FETCH_RETRY_SECS: u64 = 30;

// One week of minute samples; gaps in the feed keep older samples around longer
pub const DATA_HOLD_COUNT: usize = 7 * 24 * 60;

pub const ARC_CACHE_SIZE: usize = 20;
pub const ARC_FETCH_BATCH: usize = 9;

/// Default view range (24h) in minutes.
pub const DEF_RANGE_M: i64 = 24 * 60;
/// Longest accepted view range (one leap year) in minutes.
pub const MAX_RANGE_M: i64 = 366 * ONEDAY_M;

// Device keys and names
pub const AGGREGATE_KEY: &str = "aiseg";
pub const TOP_GENERATION_NAME: &str = "太陽光発電";

// Psychrometric chart range (°C)
pub const PC_X_BEGIN: f64 = -10.0;
pub const PC_X_END: f64 = 40.0;

// Comfort zone: 20-26°C, 40-60%RH, 8-14 g/m³
pub const PC_ZONE_TMIN: f64 = 20.0;
pub const PC_ZONE_TMAX: f64 = 26.0;
pub const PC_ZONE_RMIN: f64 = 40.0;
pub const PC_ZONE_RMAX: f64 = 60.0;
pub const PC_ZONE_VMIN: f64 = 8.0;
pub const PC_ZONE_VMAX: f64 = 14.0;

// CO2 alert thresholds (ppm, WHO levels)
pub const CO2_WARNING: f64 = 1400.0;
pub const CO2_CAUTION: f64 = 1000.0;

// Archive endpoints relative to the source base URL
pub const LIST_PATH: &str = "list/0";
pub const ARC_PATH: &str = "arc";
pub const DIF_PATH: &str = "dif";
