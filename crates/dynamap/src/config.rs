use std::env;

use dynamap_core::TableOptions;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Table name prefix (default: "dev")
    pub table_prefix: String,
    /// Items requested per backend page (default: 100)
    pub page_size: u32,
    /// Custom DynamoDB endpoint, e.g. DynamoDB Local (default: none)
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: String,
    /// Whether primary-key queries read consistently (default: false)
    pub consistent_read: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DYNAMAP_TABLE_PREFIX` - Table name prefix (default: "dev")
    /// - `DYNAMAP_PAGE_SIZE` - Items per backend page (default: 100)
    /// - `DYNAMODB_ENDPOINT_URL` - Custom DynamoDB endpoint (default: none)
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    /// - `DYNAMAP_CONSISTENT_READ` - "true"/"1" for consistent queries (default: false)
    pub fn from_env() -> Self {
        Self {
            table_prefix: env::var("DYNAMAP_TABLE_PREFIX").unwrap_or_else(|_| "dev".to_string()),
            page_size: env::var("DYNAMAP_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(100),
            endpoint_url: env::var("DYNAMODB_ENDPOINT_URL").ok(),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            consistent_read: env::var("DYNAMAP_CONSISTENT_READ")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    /// Options for binding entity schemas to tables.
    pub fn table_options(&self) -> TableOptions {
        TableOptions::new(&self.table_prefix).with_page_size(self.page_size)
    }

    /// Returns a display string for the DynamoDB target.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({url})"),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            table_prefix: "test".to_string(),
            page_size: 25,
            endpoint_url: None,
            region: "eu-west-1".to_string(),
            consistent_read: false,
        }
    }

    #[test]
    fn test_table_options() {
        let options = config().table_options();
        assert_eq!(options.prefix, "test");
        assert_eq!(options.page_size, Some(25));
    }

    #[test]
    fn test_target_display() {
        let mut config = config();
        assert_eq!(config.target_display(), "AWS DynamoDB (region: eu-west-1)");

        config.endpoint_url = Some("http://localhost:8000".to_string());
        assert_eq!(
            config.target_display(),
            "Local DynamoDB (http://localhost:8000)"
        );
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("1"));
        assert!(parse_flag(" YES "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_default_values() {
        // Clear environment variables to test defaults
        env::remove_var("DYNAMAP_TABLE_PREFIX");
        env::remove_var("DYNAMAP_PAGE_SIZE");
        env::remove_var("DYNAMODB_ENDPOINT_URL");
        env::remove_var("AWS_REGION");
        env::remove_var("DYNAMAP_CONSISTENT_READ");

        let config = Config::from_env();

        assert_eq!(config.table_prefix, "dev");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.endpoint_url, None);
        assert_eq!(config.region, "us-east-1");
        assert!(!config.consistent_read);
    }
}
