use std::env;

use crate::filename::DEFAULT_FILENAME_TEMPLATE;

pub const BASE_URL_ENV: &str = "VSME_API_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

pub const REPORT_PATH: &str = "/excel-update";
pub const LEGACY_SUBMIT_PATH: &str = "/api/submit";

/// Where reports are requested and how downloaded files are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    filename_template: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
        }
    }

    /// Reads the base URL from `VSME_API_BASE_URL`, falling back to the
    /// local development server.
    pub fn from_env() -> Self {
        match env::var(BASE_URL_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::new(value.trim()),
            _ => Self::new(DEFAULT_BASE_URL),
        }
    }

    pub fn with_filename_template(mut self, template: impl Into<String>) -> Self {
        self.filename_template = template.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn filename_template(&self) -> &str {
        &self.filename_template
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_without_double_slash() {
        let config = ClientConfig::new("https://reports.example.com/");
        assert_eq!(
            config.endpoint(REPORT_PATH),
            "https://reports.example.com/excel-update"
        );
    }
}
