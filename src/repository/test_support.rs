// ==========================================
// 测试辅助: 内存查询执行器
// ==========================================
// 按 SQL 中的表名返回预置表格，并记录每一次调用
// ==========================================

use crate::domain::table::{TabularResult, Value};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::executor::QueryExecutor;
use std::sync::Mutex;

/// 一次被记录的调用
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub sql: String,
    pub params: Vec<Value>,
}

/// 内存执行器
///
/// - BomStructure 查询返回预置边表
/// - InvMaster 查询按 IN 参数过滤预置明细
pub struct StubExecutor {
    bom: TabularResult,
    inventory: TabularResult,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubExecutor {
    pub fn new(edges: &[(&str, &str, f64)]) -> Self {
        let bom = TabularResult {
            columns: vec!["ParentPart".into(), "Component".into(), "QtyPer".into()],
            rows: edges
                .iter()
                .map(|(p, c, q)| vec![Value::from(*p), Value::from(*c), Value::Real(*q)])
                .collect(),
        };
        Self {
            bom,
            inventory: TabularResult::new(vec![
                "StockCode".into(),
                "Description".into(),
                "MaterialCost".into(),
                "LabourCost".into(),
            ]),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条库存明细 (StockCode, Description, MaterialCost, LabourCost)
    pub fn with_detail(mut self, code: &str, description: &str, material: f64, labour: f64) -> Self {
        self.inventory.rows.push(vec![
            Value::from(code),
            Value::from(description),
            Value::Real(material),
            Value::Real(labour),
        ]);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// 命中 InvMaster 的调用
    pub fn detail_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.sql.contains("InvMaster"))
            .collect()
    }
}

impl QueryExecutor for StubExecutor {
    fn execute_table_raw(&self, sql: &str, params: &[Value]) -> RepositoryResult<TabularResult> {
        self.calls.lock().unwrap().push(RecordedCall {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        if sql.contains("InvMaster") {
            let mut table = TabularResult::new(self.inventory.columns.clone());
            table.rows = self
                .inventory
                .rows
                .iter()
                .filter(|row| {
                    let code = row[0].to_trimmed_string();
                    params
                        .iter()
                        .any(|p| p.to_trimmed_string() == code)
                })
                .cloned()
                .collect();
            return Ok(table);
        }
        if sql.contains("BomStructure") {
            return Ok(self.bom.clone());
        }
        Err(RepositoryError::DatabaseQueryError(format!(
            "stub 不支持的查询: {}",
            sql
        )))
    }
}
