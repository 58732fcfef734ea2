use std::path::PathBuf;

use crate::period::YearMonth;

#[derive(Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub log_level: String,
    pub new_data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub brands_path: PathBuf,
    pub analysis_control_path: PathBuf,
    pub period: YearMonth,
    pub max_items_per_brand: usize,
    pub top_k_per_brand: usize,
    pub max_chars_per_item: usize,
    pub min_items_for_analysis: usize,
    pub min_posts_for_analysis: usize,
    pub max_workers: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &"[redacted]")
            .field("openai_base_url", &self.openai_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("log_level", &self.log_level)
            .field("new_data_dir", &self.new_data_dir)
            .field("output_dir", &self.output_dir)
            .field("brands_path", &self.brands_path)
            .field("analysis_control_path", &self.analysis_control_path)
            .field("period", &self.period)
            .field("max_items_per_brand", &self.max_items_per_brand)
            .field("top_k_per_brand", &self.top_k_per_brand)
            .field("max_chars_per_item", &self.max_chars_per_item)
            .field("min_items_for_analysis", &self.min_items_for_analysis)
            .field("min_posts_for_analysis", &self.min_posts_for_analysis)
            .field("max_workers", &self.max_workers)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .finish()
    }
}
