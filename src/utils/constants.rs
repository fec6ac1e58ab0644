/// Warehouse table names
pub const TABLE_AVALANCHE_REGIONS: &str = "avalanche_regions";
pub const TABLE_WEATHER_GRIDS: &str = "weather_grids";
pub const TABLE_WEATHER_HISTORIC: &str = "weather_historic";
pub const TABLE_WEATHER_FORECAST: &str = "weather_forecast";
pub const TABLE_AVALANCHE_WARNINGS: &str = "avalanche_danger_levels";

/// Watermark resource names
pub const RESOURCE_WEATHER_HISTORIC: &str = "weather_historic";
pub const RESOURCE_WEATHER_FORECAST: &str = "weather_forecast";
pub const RESOURCE_AVALANCHE_WARNINGS: &str = "avalanche_warnings";

/// Upstream API defaults
pub const DEFAULT_ARCHIVE_API_BASE: &str = "https://archive-api.open-meteo.com/v1";
pub const DEFAULT_FORECAST_API_BASE: &str = "https://api.open-meteo.com/v1";
pub const DEFAULT_AVALANCHE_API_BASE: &str =
    "https://api01.nve.no/hydrology/forecast/avalanche/v6.3.0/api";

/// Ingestion defaults
pub const DEFAULT_START_DATE: &str = "2026-01-10T00:00";
pub const DEFAULT_TIMEZONE: &str = "Europe/Oslo";
pub const DEFAULT_LANGUAGE_KEY: &str = "1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHUNK_DAYS: u32 = 30;
pub const DEFAULT_WARNING_HORIZON_DAYS: u32 = 7;
pub const DEFAULT_HOURLY_PARAMS: [&str; 4] = [
    "temperature_2m",
    "relative_humidity_2m",
    "precipitation",
    "windspeed_10m",
];

/// Timestamp format used by the hourly APIs and the watermark store
pub const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Norway geographic bounds
pub const NORWAY_MIN_LAT: f64 = 58.0;
pub const NORWAY_MAX_LAT: f64 = 71.0;
pub const NORWAY_MIN_LON: f64 = 4.5;
pub const NORWAY_MAX_LON: f64 = 31.0;

/// Weather grid sizing
pub const GRID_CELL_KM: f64 = 100.0;
pub const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Parquet defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Watermark state file name within the warehouse directory
pub const WATERMARKS_FILE: &str = "watermarks.json";
