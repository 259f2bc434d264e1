//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{RaceConfig, RaceError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<RaceConfig, RaceError> {
    toml::from_str(content).map_err(|e| RaceError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<RaceConfig, RaceError> {
    serde_json::from_str(content).map_err(|e| RaceError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<RaceConfig, RaceError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[laps]
safe_interval_ms = 500
circuit = [10, 20, 30, 40]
pit_stop_duration_ms = 3000
time_send_interval_ms = 1000

[server]
host = "127.0.0.1"
port = 9001
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.laps.safe_interval_ms, 500);
        assert_eq!(config.laps.circuit, vec![10, 20, 30, 40]);
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.path, "/ws");
    }

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let config = parse_toml("").unwrap();
        assert_eq!(config.laps.circuit, vec![1, 2, 3]);
        assert_eq!(config.laps.time_send_interval_ms, 10_000);
        assert_eq!(config.server.session_queue_capacity, 256);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "laps": { "circuit": [7, 8], "safe_interval_ms": 200 },
            "server": { "port": 8080 }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.laps.circuit, vec![7, 8]);
        assert_eq!(config.laps.pit_stop_duration_ms, 5000);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, RaceError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
