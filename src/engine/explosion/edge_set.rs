// ==========================================
// Syspro BOM 展开 - BOM 边集合（内存缓存）
// ==========================================
// 构造时一次性加载，之后只读，不随数据库变化失效
// ==========================================

use crate::domain::bom::BomEdge;
use std::collections::HashMap;

/// 父件的一条子件边
#[derive(Debug, Clone, PartialEq)]
pub struct ChildEdge {
    pub component: String,
    pub qty_per: f64,
}

/// 父件 -> 子件列表（保持加载顺序）
#[derive(Debug, Clone, Default)]
pub struct EdgeSet {
    children: HashMap<String, Vec<ChildEdge>>,
    edge_count: usize,
}

impl EdgeSet {
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = BomEdge>,
    {
        let mut children: HashMap<String, Vec<ChildEdge>> = HashMap::new();
        let mut edge_count = 0;
        for edge in edges {
            children
                .entry(edge.parent_part)
                .or_default()
                .push(ChildEdge {
                    component: edge.component,
                    qty_per: edge.qty_per,
                });
            edge_count += 1;
        }
        Self {
            children,
            edge_count,
        }
    }

    /// 是否作为父件出现（即拥有 BOM）
    pub fn has_bom(&self, code: &str) -> bool {
        self.children.contains_key(code)
    }

    /// 直接子件；无 BOM 时返回空切片
    pub fn children(&self, code: &str) -> &[ChildEdge] {
        self.children.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 所有拥有 BOM 的父件代码（升序）
    pub fn valid_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.children.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn parent_count(&self) -> usize {
        self.children.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }
}
