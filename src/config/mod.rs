// ==========================================
// Syspro BOM 展开 - 配置层
// ==========================================
// 职责: 连接串与运行参数加载
// 来源: 进程环境变量 / 项目根目录 .env / 用户配置目录 .env
// ==========================================

pub mod syspro_config;

pub use syspro_config::{config_keys, ConfigError, ConfigResult, SysproConfig};
