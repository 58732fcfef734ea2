use chrono::Datelike;

use crate::app_config::AppConfig;
use crate::period::YearMonth;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    let today = chrono::Local::now().date_naive();
    build_app_config(|key| std::env::var(key), today.year(), today.month())
}

/// Build application configuration using the provided env-var lookup function.
///
/// `current_year`/`current_month` are the defaults for the analysis period.
fn build_app_config<F>(
    lookup: F,
    current_year: i32,
    current_month: u32,
) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;
    use std::str::FromStr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    fn parse_as<T: FromStr>(var: &str, raw: &str) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    }

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        parse_as::<usize>(var, &or_default(var, default))
    };

    let openai_api_key = require("OPENAI_API_KEY")?;
    let openai_base_url = or_default("MONTHDASH_OPENAI_BASE_URL", "https://api.openai.com/v1");
    let model = or_default("MONTHDASH_MODEL", "gpt-4o-mini");
    let temperature = parse_as::<f32>(
        "MONTHDASH_TEMPERATURE",
        &or_default("MONTHDASH_TEMPERATURE", "0.2"),
    )?;
    let max_output_tokens = parse_as::<u32>(
        "MONTHDASH_MAX_OUTPUT_TOKENS",
        &or_default("MONTHDASH_MAX_OUTPUT_TOKENS", "2000"),
    )?;
    let log_level = or_default("MONTHDASH_LOG_LEVEL", "info");

    let new_data_dir = PathBuf::from(or_default("MONTHDASH_NEW_DATA_DIR", "./new_data"));
    let output_dir = PathBuf::from(or_default("MONTHDASH_OUTPUT_DIR", "./dashboard_data"));
    let brands_path = PathBuf::from(or_default("MONTHDASH_BRANDS_PATH", "./config/brands.yaml"));
    let analysis_control_path = PathBuf::from(or_default(
        "MONTHDASH_ANALYSIS_CONTROL_PATH",
        "./config/analysis_control.yaml",
    ));

    let year = parse_as::<i32>(
        "ANALYSIS_YEAR",
        &or_default("ANALYSIS_YEAR", &current_year.to_string()),
    )?;
    let month = parse_as::<u32>(
        "ANALYSIS_MONTH",
        &or_default("ANALYSIS_MONTH", &current_month.to_string()),
    )?;
    let period = YearMonth::new(year, month).map_err(|e| ConfigError::InvalidEnvVar {
        var: "ANALYSIS_YEAR/ANALYSIS_MONTH".to_string(),
        reason: e.to_string(),
    })?;

    let max_items_per_brand = parse_usize("MAX_ADS_PER_BRAND", "50")?;
    let top_k_per_brand = parse_usize("TOP_K_PER_BRAND", "10")?;
    let max_chars_per_item = parse_usize("MAX_CHARS_PER_AD", "1000")?;
    let min_items_for_analysis = parse_usize("MIN_ADS_FOR_ANALYSIS", "5")?;
    let min_posts_for_analysis = parse_usize("MIN_POSTS_FOR_ANALYSIS", "5")?;
    let max_workers = parse_usize("MONTHDASH_MAX_WORKERS", "20")?;

    let request_timeout_secs = parse_as::<u64>(
        "MONTHDASH_REQUEST_TIMEOUT_SECS",
        &or_default("MONTHDASH_REQUEST_TIMEOUT_SECS", "60"),
    )?;
    let max_retries = parse_as::<u32>(
        "MONTHDASH_MAX_RETRIES",
        &or_default("MONTHDASH_MAX_RETRIES", "4"),
    )?;
    let retry_backoff_base_ms = parse_as::<u64>(
        "MONTHDASH_RETRY_BACKOFF_BASE_MS",
        &or_default("MONTHDASH_RETRY_BACKOFF_BASE_MS", "1000"),
    )?;

    if max_workers == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MONTHDASH_MAX_WORKERS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if top_k_per_brand == 0 || top_k_per_brand > max_items_per_brand {
        return Err(ConfigError::InvalidEnvVar {
            var: "TOP_K_PER_BRAND".to_string(),
            reason: format!("must be in 1..={max_items_per_brand} (MAX_ADS_PER_BRAND)"),
        });
    }
    if max_chars_per_item == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MAX_CHARS_PER_AD".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        openai_api_key,
        openai_base_url,
        model,
        temperature,
        max_output_tokens,
        log_level,
        new_data_dir,
        output_dir,
        brands_path,
        analysis_control_path,
        period,
        max_items_per_brand,
        top_k_per_brand,
        max_chars_per_item,
        min_items_for_analysis,
        min_posts_for_analysis,
        max_workers,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    /// Returns a map with all required env vars populated.
    fn full_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("OPENAI_API_KEY", "sk-test");
        m
    }

    fn build(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        build_app_config(lookup_from_map(map), 2025, 9)
    }

    #[test]
    fn fails_without_api_key() {
        let map: HashMap<&str, &str> = HashMap::new();
        let result = build(&map);
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "OPENAI_API_KEY"),
            "expected MissingEnvVar(OPENAI_API_KEY), got: {result:?}"
        );
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut map = HashMap::new();
        map.insert("OPENAI_API_KEY", "   ");
        assert!(matches!(build(&map), Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn succeeds_with_defaults() {
        let cfg = build(&full_env()).unwrap();
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.period.to_string(), "2025-09");
        assert_eq!(cfg.max_items_per_brand, 50);
        assert_eq!(cfg.top_k_per_brand, 10);
        assert_eq!(cfg.max_chars_per_item, 1000);
        assert_eq!(cfg.min_items_for_analysis, 5);
        assert_eq!(cfg.min_posts_for_analysis, 5);
        assert_eq!(cfg.max_workers, 20);
        assert_eq!(cfg.max_retries, 4);
        assert_eq!(cfg.retry_backoff_base_ms, 1000);
        assert_eq!(cfg.output_dir.to_str(), Some("./dashboard_data"));
    }

    #[test]
    fn period_override() {
        let mut map = full_env();
        map.insert("ANALYSIS_YEAR", "2025");
        map.insert("ANALYSIS_MONTH", "8");
        let cfg = build(&map).unwrap();
        assert_eq!(cfg.period.to_string(), "2025-08");
    }

    #[test]
    fn invalid_month_is_rejected() {
        let mut map = full_env();
        map.insert("ANALYSIS_MONTH", "13");
        let result = build(&map);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
    }

    #[test]
    fn non_numeric_limit_is_rejected() {
        let mut map = full_env();
        map.insert("MIN_ADS_FOR_ANALYSIS", "five");
        let result = build(&map);
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "MIN_ADS_FOR_ANALYSIS"),
            "got: {result:?}"
        );
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut map = full_env();
        map.insert("MONTHDASH_MAX_WORKERS", "0");
        let result = build(&map);
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "MONTHDASH_MAX_WORKERS")
        );
    }

    #[test]
    fn top_k_above_cap_is_rejected() {
        let mut map = full_env();
        map.insert("MAX_ADS_PER_BRAND", "5");
        map.insert("TOP_K_PER_BRAND", "10");
        let result = build(&map);
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "TOP_K_PER_BRAND")
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = build(&full_env()).unwrap();
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("sk-test"));
        assert!(printed.contains("[redacted]"));
    }
}
