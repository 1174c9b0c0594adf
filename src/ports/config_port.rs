//! Configuration access port trait.

use crate::domain::error::BacktestError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Trimmed, non-empty string value or `InvalidConfiguration`.
    fn require_string(&self, section: &str, key: &str) -> Result<String, BacktestError> {
        self.get_string(section, key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BacktestError::InvalidConfiguration {
                key: format!("[{section}] {key}"),
                reason: "missing value".to_string(),
            })
    }
}
