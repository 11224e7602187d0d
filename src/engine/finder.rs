// ==========================================
// Syspro BOM 展开 - BomFinder 入口
// ==========================================
// 一个引擎，两种取数策略，统一输出:
// - InMemory: 构造时加载 BomStructure 全表，客户端递归展开 + 一次批量明细查询
// - ServerSide: 每次展开发起一条递归查询，服务端完成闭包与明细关联
// 统一口径: LEFT JOIN 明细 / MaterialCost 降序 / 位置参数绑定
// ==========================================

use crate::config::SysproConfig;
use crate::domain::bom::{DetailVariant, ExplosionResult, ExplosionWarning};
use crate::domain::table::Value;
use crate::engine::error::BomResult;
use crate::engine::explosion::{explode_nodes, EdgeSet};
use crate::engine::merge::DetailMerger;
use crate::engine::recursive::RecursiveBomQuery;
use crate::perf::PerfGuard;
use crate::repository::bom_repo::{BomStructureRepository, BOM_STRUCTURE_TABLE};
use crate::repository::executor::{QueryExecutor, SysproExecutor};
use crate::repository::inventory_repo::INV_MASTER_TABLE;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// 展开策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExplosionStrategy {
    #[default]
    InMemory,
    ServerSide,
}

impl fmt::Display for ExplosionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplosionStrategy::InMemory => write!(f, "IN_MEMORY"),
            ExplosionStrategy::ServerSide => write!(f, "SERVER_SIDE"),
        }
    }
}

enum Backend {
    InMemory {
        edges: EdgeSet,
        merger: DetailMerger,
    },
    ServerSide(RecursiveBomQuery),
}

// ==========================================
// BomFinder
// ==========================================
pub struct BomFinder {
    executor: Arc<dyn QueryExecutor>,
    variant: DetailVariant,
    backend: Backend,
}

impl BomFinder {
    /// 内存策略: 立即加载 BomStructure 全表（一次全表查询）
    pub fn load(executor: Arc<dyn QueryExecutor>, variant: DetailVariant) -> BomResult<Self> {
        let _perf = PerfGuard::new("bom.load_edges");
        let edges = BomStructureRepository::new(Arc::clone(&executor)).load_all_edges()?;
        let edges = EdgeSet::from_edges(edges);

        info!(
            parents = edges.parent_count(),
            edges = edges.edge_count(),
            variant = %variant,
            "BOM 结构已缓存"
        );

        let merger = DetailMerger::new(Arc::clone(&executor), variant);
        Ok(Self {
            executor,
            variant,
            backend: Backend::InMemory { edges, merger },
        })
    }

    /// 服务端策略: 不加载边集
    pub fn server_side(executor: Arc<dyn QueryExecutor>, variant: DetailVariant) -> Self {
        let query = RecursiveBomQuery::new(Arc::clone(&executor), variant);
        Self {
            executor,
            variant,
            backend: Backend::ServerSide(query),
        }
    }

    /// 按配置打开连接并构造
    ///
    /// BomStructure / InvMaster 缺失时报 MissingTable，不等到首次展开
    pub fn from_config(config: &SysproConfig, strategy: ExplosionStrategy) -> BomResult<Self> {
        let executor = SysproExecutor::new(config)?;
        executor.ensure_tables(&[BOM_STRUCTURE_TABLE, INV_MASTER_TABLE])?;
        let executor: Arc<dyn QueryExecutor> = Arc::new(executor);
        match strategy {
            ExplosionStrategy::InMemory => Self::load(executor, config.detail_variant),
            ExplosionStrategy::ServerSide => {
                Ok(Self::server_side(executor, config.detail_variant))
            }
        }
    }

    /// 从环境加载配置并构造（连接串缺失时在任何查询之前报错）
    pub fn from_env(strategy: ExplosionStrategy) -> BomResult<Self> {
        let config = SysproConfig::from_env()?;
        Self::from_config(&config, strategy)
    }

    pub fn strategy(&self) -> ExplosionStrategy {
        match self.backend {
            Backend::InMemory { .. } => ExplosionStrategy::InMemory,
            Backend::ServerSide(_) => ExplosionStrategy::ServerSide,
        }
    }

    pub fn detail_variant(&self) -> DetailVariant {
        self.variant
    }

    /// 内存策略下的边集
    pub fn edge_set(&self) -> Option<&EdgeSet> {
        match &self.backend {
            Backend::InMemory { edges, .. } => Some(edges),
            Backend::ServerSide(_) => None,
        }
    }

    /// 代码是否拥有 BOM（作为父件出现）
    pub fn has_bom(&self, code: &str) -> BomResult<bool> {
        let code = code.trim();
        match &self.backend {
            Backend::InMemory { edges, .. } => Ok(edges.has_bom(code)),
            Backend::ServerSide(_) => {
                let exists = self.executor.execute_scalar(
                    "SELECT EXISTS(SELECT 1 FROM BomStructure WHERE TRIM(ParentPart) = ?1)",
                    &[Value::from(code)],
                )?;
                Ok(exists.as_f64().unwrap_or(0.0) != 0.0)
            }
        }
    }

    /// 所有拥有 BOM 的代码（升序）
    pub fn valid_codes(&self) -> BomResult<Vec<String>> {
        match &self.backend {
            Backend::InMemory { edges, .. } => Ok(edges
                .valid_codes()
                .into_iter()
                .map(str::to_string)
                .collect()),
            Backend::ServerSide(_) => {
                let table = self.executor.execute_table(
                    "SELECT DISTINCT TRIM(ParentPart) AS ParentPart FROM BomStructure \
                     ORDER BY 1",
                    &[],
                )?;
                Ok(table
                    .rows
                    .iter()
                    .filter_map(|row| row.first().and_then(Value::to_trimmed_string))
                    .filter(|code| !code.is_empty())
                    .collect())
            }
        }
    }

    /// 展开根件
    ///
    /// # 返回
    /// - 根件无 BOM（或不存在）: 空结果，不报错
    /// - 循环引用 / 明细缺失: 记录在 warnings 中
    pub fn explode(&self, root_code: &str) -> BomResult<ExplosionResult> {
        let _perf = PerfGuard::new("bom.explode");
        let root = root_code.trim();

        let mut result = match &self.backend {
            Backend::InMemory { edges, merger } => {
                if !edges.has_bom(root) {
                    info!(root = %root, "根件无 BOM，返回空结果");
                    return Ok(ExplosionResult::empty(root));
                }
                let explosion = explode_nodes(edges, root);
                let merged = merger.merge(explosion.nodes)?;

                let mut warnings = explosion.cycles;
                warnings.extend(merged.warnings);
                let mut result = ExplosionResult {
                    root: root.to_string(),
                    rows: merged.rows,
                    warnings,
                };
                result.sort_rows();
                result
            }
            Backend::ServerSide(query) => query.explode(root)?,
        };
        result.sort_warnings();

        let cycles = result
            .warnings
            .iter()
            .filter(|w| matches!(w, ExplosionWarning::CycleDetected { .. }))
            .count();
        if cycles > 0 {
            warn!(root = %root, cycles, "展开过程中发现 BOM 循环引用");
        }

        info!(
            root = %root,
            strategy = %self.strategy(),
            rows = result.rows.len(),
            warnings = result.warnings.len(),
            "BOM 展开完成"
        );
        Ok(result)
    }
}
