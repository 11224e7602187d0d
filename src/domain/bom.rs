// ==========================================
// Syspro BOM 展开 - BOM 领域模型
// ==========================================
// 对齐: BomStructure (ParentPart, Component, QtyPer)
// 对齐: InvMaster (StockCode, Description, MaterialCost, LabourCost, ...)
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::io;

// ==========================================
// BomEdge - BOM 结构边
// ==========================================
// 一个单位的 parent 消耗 qty_per 个单位的 component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomEdge {
    pub parent_part: String,
    pub component: String,
    pub qty_per: f64,
}

// ==========================================
// ExplodedNode - 展开节点（尚未合并明细）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplodedNode {
    pub component: String,   // 子件
    pub parent_part: String, // 直接父件（来源）
    pub level: u32,          // 层级，根的直接子件为 1
    pub cumulative_qty: f64, // 根 -> 本节点路径上 qty_per 的连乘
}

// ==========================================
// DetailVariant - 明细查询口径
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetailVariant {
    /// StockCode, Description, MaterialCost, LabourCost
    #[default]
    Basic,
    /// 额外带 UnitCost, LastPurchaseDate
    Extended,
}

impl fmt::Display for DetailVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailVariant::Basic => write!(f, "BASIC"),
            DetailVariant::Extended => write!(f, "EXTENDED"),
        }
    }
}

impl std::str::FromStr for DetailVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(DetailVariant::Basic),
            "extended" => Ok(DetailVariant::Extended),
            other => Err(format!("未知的明细口径: {}（可选 basic / extended）", other)),
        }
    }
}

// ==========================================
// InventoryDetail - 库存/成本明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryDetail {
    pub stock_code: String,
    pub description: Option<String>,
    pub material_cost: Option<f64>,
    pub labour_cost: Option<f64>,
    pub unit_cost: Option<f64>,                  // 仅 Extended
    pub last_purchase_date: Option<NaiveDate>,   // 仅 Extended
}

// ==========================================
// ExplosionRow - 展开结果行 (节点 LEFT JOIN 明细)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosionRow {
    pub component: String,
    pub parent_part: String,
    pub level: u32,
    pub cumulative_qty: f64,
    pub description: Option<String>,
    pub material_cost: Option<f64>,
    pub labour_cost: Option<f64>,
    pub unit_cost: Option<f64>,
    pub last_purchase_date: Option<NaiveDate>,
}

impl ExplosionRow {
    /// 节点 + 可选明细 -> 结果行
    pub fn from_node(node: ExplodedNode, detail: Option<&InventoryDetail>) -> Self {
        Self {
            component: node.component,
            parent_part: node.parent_part,
            level: node.level,
            cumulative_qty: node.cumulative_qty,
            description: detail.and_then(|d| d.description.clone()),
            material_cost: detail.and_then(|d| d.material_cost),
            labour_cost: detail.and_then(|d| d.labour_cost),
            unit_cost: detail.and_then(|d| d.unit_cost),
            last_purchase_date: detail.and_then(|d| d.last_purchase_date),
        }
    }

    /// 展开材料成本 = cumulative_qty × MaterialCost
    pub fn extended_material_cost(&self) -> Option<f64> {
        self.material_cost.map(|c| c * self.cumulative_qty)
    }

    /// 展开人工成本 = cumulative_qty × LabourCost
    pub fn extended_labour_cost(&self) -> Option<f64> {
        self.labour_cost.map(|c| c * self.cumulative_qty)
    }
}

/// 结果排序规则（两种展开策略共用）
///
/// MaterialCost 降序（无成本排最后）→ level 升序 → component → parent_part → cumulative_qty 降序
/// 浮点比较使用 total_cmp，保证全序
pub fn compare_rows(a: &ExplosionRow, b: &ExplosionRow) -> Ordering {
    let by_cost = match (a.material_cost, b.material_cost) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_cost
        .then_with(|| a.level.cmp(&b.level))
        .then_with(|| a.component.cmp(&b.component))
        .then_with(|| a.parent_part.cmp(&b.parent_part))
        .then_with(|| b.cumulative_qty.total_cmp(&a.cumulative_qty))
}

// ==========================================
// ExplosionWarning - 非致命告警
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExplosionWarning {
    /// 子件已在当前祖先链上，该边未展开
    CycleDetected {
        path: Vec<String>,
        parent_part: String,
        component: String,
    },
    /// 子件在 InvMaster 中无记录，明细字段为空
    MissingDetail { stock_code: String },
}

impl fmt::Display for ExplosionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplosionWarning::CycleDetected {
                path,
                parent_part,
                component,
            } => write!(
                f,
                "BOM 循环引用: {} -> {} (路径: {})",
                parent_part,
                component,
                path.join(" > ")
            ),
            ExplosionWarning::MissingDetail { stock_code } => {
                write!(f, "库存明细缺失: {}", stock_code)
            }
        }
    }
}

// ==========================================
// CostRollup - 成本汇总
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostRollup {
    pub material: f64,
    pub labour: f64,
    pub priced_rows: usize,   // 有 MaterialCost 的行数
    pub unpriced_rows: usize, // 无 MaterialCost 的行数
}

// ==========================================
// ExplosionResult - 展开结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExplosionResult {
    pub root: String,
    pub rows: Vec<ExplosionRow>,
    pub warnings: Vec<ExplosionWarning>,
}

impl ExplosionResult {
    pub fn empty(root: &str) -> Self {
        Self {
            root: root.to_string(),
            rows: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_cycles(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ExplosionWarning::CycleDetected { .. }))
    }

    /// 无明细的子件代码
    pub fn missing_details(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                ExplosionWarning::MissingDetail { stock_code } => Some(stock_code.as_str()),
                _ => None,
            })
            .collect()
    }

    /// 按统一规则排序
    pub fn sort_rows(&mut self) {
        self.rows.sort_by(compare_rows);
    }

    /// 告警排序: 循环告警在前（按路径、边），缺失明细在后（按代码）
    pub fn sort_warnings(&mut self) {
        fn key(w: &ExplosionWarning) -> (u8, Vec<String>, &str, &str) {
            match w {
                ExplosionWarning::CycleDetected {
                    path,
                    parent_part,
                    component,
                } => (0, path.clone(), parent_part.as_str(), component.as_str()),
                ExplosionWarning::MissingDetail { stock_code } => {
                    (1, Vec::new(), stock_code.as_str(), "")
                }
            }
        }
        self.warnings.sort_by(|a, b| key(a).cmp(&key(b)));
    }

    /// 成本汇总（按 cumulative_qty 展开）
    pub fn cost_rollup(&self) -> CostRollup {
        let mut rollup = CostRollup::default();
        for row in &self.rows {
            match row.extended_material_cost() {
                Some(cost) => {
                    rollup.material += cost;
                    rollup.priced_rows += 1;
                }
                None => rollup.unpriced_rows += 1,
            }
            rollup.labour += row.extended_labour_cost().unwrap_or(0.0);
        }
        rollup
    }

    /// 导出 CSV（含表头）
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(component: &str, level: u32, qty: f64, cost: Option<f64>) -> ExplosionRow {
        ExplosionRow::from_node(
            ExplodedNode {
                component: component.to_string(),
                parent_part: "P".to_string(),
                level,
                cumulative_qty: qty,
            },
            cost.map(|c| InventoryDetail {
                stock_code: component.to_string(),
                description: Some(format!("{} desc", component)),
                material_cost: Some(c),
                labour_cost: Some(1.0),
                unit_cost: None,
                last_purchase_date: None,
            })
            .as_ref(),
        )
    }

    #[test]
    fn test_sort_cost_desc_missing_last() {
        let mut result = ExplosionResult {
            root: "P".into(),
            rows: vec![
                row("A", 1, 1.0, None),
                row("B", 2, 1.0, Some(5.0)),
                row("C", 1, 1.0, Some(9.0)),
                row("D", 1, 1.0, Some(5.0)),
            ],
            warnings: vec![],
        };
        result.sort_rows();
        let order: Vec<&str> = result.rows.iter().map(|r| r.component.as_str()).collect();
        assert_eq!(order, vec!["C", "D", "B", "A"]);
    }

    #[test]
    fn test_sort_is_total_with_nan_cost() {
        let mut result = ExplosionResult {
            root: "P".into(),
            rows: vec![
                row("A", 1, 1.0, Some(f64::NAN)),
                row("B", 1, 1.0, Some(2.0)),
                row("C", 1, 1.0, None),
                row("D", 1, 1.0, Some(7.0)),
            ],
            warnings: vec![],
        };
        result.sort_rows();
        let order: Vec<&str> = result.rows.iter().map(|r| r.component.as_str()).collect();
        assert_eq!(order, vec!["A", "D", "B", "C"]);
        for pair in result.rows.windows(2) {
            assert_ne!(compare_rows(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn test_cost_rollup_uses_cumulative_qty() {
        let result = ExplosionResult {
            root: "P".into(),
            rows: vec![row("A", 1, 2.0, Some(3.0)), row("B", 1, 4.0, None)],
            warnings: vec![],
        };
        let rollup = result.cost_rollup();
        assert_eq!(rollup.material, 6.0);
        assert_eq!(rollup.labour, 2.0);
        assert_eq!(rollup.priced_rows, 1);
        assert_eq!(rollup.unpriced_rows, 1);
    }

    #[test]
    fn test_write_csv_has_header_and_rows() {
        let result = ExplosionResult {
            root: "P".into(),
            rows: vec![row("A", 1, 2.0, Some(3.0))],
            warnings: vec![],
        };
        let mut buf = Vec::new();
        result.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("component,parent_part,level,cumulative_qty"));
        assert!(lines.next().unwrap().starts_with("A,P,1,2.0,A desc,3.0"));
    }

    #[test]
    fn test_detail_variant_parse() {
        assert_eq!("Extended".parse::<DetailVariant>(), Ok(DetailVariant::Extended));
        assert_eq!(" basic ".parse::<DetailVariant>(), Ok(DetailVariant::Basic));
        assert!("full".parse::<DetailVariant>().is_err());
    }
}
