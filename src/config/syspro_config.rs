// ==========================================
// Syspro BOM 展开 - 连接配置
// ==========================================
// 约束: 连接串缺失为致命错误，必须在任何查询之前暴露
// ==========================================

use crate::domain::bom::DetailVariant;
use crate::perf::PerfSettings;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// 配置键
pub mod config_keys {
    pub const CONNECTION_STRING: &str = "SYSPRO_CONNECTION_STRING";
    pub const DETAIL_VARIANT: &str = "SYSPRO_BOM_DETAIL_VARIANT";
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("缺少配置 {key}: 请在环境变量或项目根目录的 .env 中设置")]
    MissingValue { key: &'static str },

    #[error("配置值无效 ({key}): {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error(".env 读取失败 ({path}): {message}")]
    DotEnv { path: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// SysproConfig
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SysproConfig {
    /// 数据库连接串（文件路径或 `file:` URI）
    pub connection_string: String,
    /// 库存明细查询口径
    pub detail_variant: DetailVariant,
    /// SQL 性能追踪
    pub perf: PerfSettings,
}

impl SysproConfig {
    /// 直接以连接串构造（其余取默认值）
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            detail_variant: DetailVariant::default(),
            perf: PerfSettings::default(),
        }
    }

    pub fn with_detail_variant(mut self, variant: DetailVariant) -> Self {
        self.detail_variant = variant;
        self
    }

    /// 从进程环境加载
    ///
    /// 顺序: 当前目录 .env → (仍缺连接串时) 用户配置目录 `syspro-bom/.env` → 环境变量
    /// 已存在的环境变量不会被 .env 覆盖
    pub fn from_env() -> ConfigResult<Self> {
        load_dotenv()?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connection_string = lookup(config_keys::CONNECTION_STRING)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingValue {
                key: config_keys::CONNECTION_STRING,
            })?;

        let detail_variant = match lookup(config_keys::DETAIL_VARIANT) {
            Some(raw) if !raw.trim().is_empty() => {
                raw.parse::<DetailVariant>()
                    .map_err(|message| ConfigError::InvalidValue {
                        key: config_keys::DETAIL_VARIANT,
                        message,
                    })?
            }
            _ => DetailVariant::default(),
        };

        let perf = PerfSettings::from_lookup(&lookup);

        info!(
            detail_variant = %detail_variant,
            perf_sql = perf.enabled,
            "Syspro 配置已加载"
        );

        Ok(Self {
            connection_string,
            detail_variant,
            perf,
        })
    }
}

/// 用户级 .env 路径: `<config_dir>/syspro-bom/.env`
pub fn user_dotenv_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("syspro-bom").join(".env"))
}

fn load_dotenv() -> ConfigResult<()> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "已加载 .env"),
        Err(e) if e.not_found() => debug!("当前目录无 .env"),
        Err(e) => {
            return Err(ConfigError::DotEnv {
                path: ".env".to_string(),
                message: e.to_string(),
            })
        }
    }

    if std::env::var(config_keys::CONNECTION_STRING).is_ok() {
        return Ok(());
    }

    if let Some(path) = user_dotenv_path().filter(|p| p.is_file()) {
        dotenvy::from_path(&path).map_err(|e| ConfigError::DotEnv {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "已加载用户级 .env");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::ENV_PERF_SQL;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_connection_string_is_fatal() {
        let err = SysproConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingValue {
                key: config_keys::CONNECTION_STRING
            }
        ));

        let err =
            SysproConfig::from_lookup(lookup_from(&[(config_keys::CONNECTION_STRING, "   ")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue { .. }));
    }

    #[test]
    fn test_full_config() {
        let config = SysproConfig::from_lookup(lookup_from(&[
            (config_keys::CONNECTION_STRING, " /data/syspro.db "),
            (config_keys::DETAIL_VARIANT, "extended"),
            (ENV_PERF_SQL, "0"),
        ]))
        .unwrap();

        assert_eq!(config.connection_string, "/data/syspro.db");
        assert_eq!(config.detail_variant, DetailVariant::Extended);
        assert!(!config.perf.enabled);
    }

    #[test]
    fn test_invalid_detail_variant() {
        let err = SysproConfig::from_lookup(lookup_from(&[
            (config_keys::CONNECTION_STRING, "x.db"),
            (config_keys::DETAIL_VARIANT, "everything"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_user_dotenv_path_shape() {
        if let Some(path) = user_dotenv_path() {
            assert!(path.ends_with("syspro-bom/.env"));
        }
    }
}
