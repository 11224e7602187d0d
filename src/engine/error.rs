// ==========================================
// Syspro BOM 展开 - 引擎层错误类型
// ==========================================
// 配置错误与查询错误直接上抛；循环/缺失明细以告警形式随结果返回
// ==========================================

use crate::config::ConfigError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BomError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("数据访问错误: {0}")]
    Repository(#[from] RepositoryError),
}

pub type BomResult<T> = Result<T, BomError>;
