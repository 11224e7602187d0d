// ==========================================
// Syspro BOM 展开 - 内存展开核心
// ==========================================
// 算法: 深度优先 + 祖先链防环 + 子树记忆化
// 红线: 同一子件经不同路径到达时各出一行，不去重
// 红线: 遇到祖先链上的子件时不展开该边，记循环告警，不报错
// ==========================================
// 记忆化: 仅缓存展开过程中未触发循环的子树。
// 无环子树的内容与到达路径无关，可在任意引用点复用。
// 缓存中保存每个节点沿途的 qty_per 序列，输出时按 根 -> 子件 顺序连乘，
// 与服务端递归查询的浮点结果逐位一致。
// ==========================================

use super::edge_set::EdgeSet;
use crate::domain::bom::{ExplodedNode, ExplosionWarning};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// 一次展开的产物（未合并明细）
#[derive(Debug, Clone, Default)]
pub struct Explosion {
    pub nodes: Vec<ExplodedNode>,
    pub cycles: Vec<ExplosionWarning>,
    /// 实际展开（未命中缓存）的父件次数
    pub expanded: usize,
    /// 子树缓存命中次数
    pub memo_hits: usize,
}

/// 展开根件的全部子件
///
/// 根件不在边集中作为父件出现时返回空结果
pub fn explode_nodes(edges: &EdgeSet, root: &str) -> Explosion {
    if !edges.has_bom(root) {
        return Explosion::default();
    }

    let mut walker = Walker::new(edges, root);
    let subtree = walker.expand(root);

    debug!(
        root = %root,
        nodes = subtree.nodes.len(),
        expanded = walker.expanded,
        memo_hits = walker.memo_hits,
        cycles = walker.cycles.len(),
        "内存展开完成"
    );

    Explosion {
        nodes: subtree.nodes.iter().map(RelativeNode::to_node).collect(),
        cycles: walker.cycles,
        expanded: walker.expanded,
        memo_hits: walker.memo_hits,
    }
}

/// 相对子树中的节点（level 从 1 起，factors 为自子树根起的逐边用量）
#[derive(Debug, Clone)]
struct RelativeNode {
    component: String,
    parent_part: String,
    level: u32,
    factors: Vec<f64>,
}

impl RelativeNode {
    /// 根 -> 子件 顺序连乘
    fn cumulative_qty(&self) -> f64 {
        self.factors.iter().fold(1.0, |acc, qty| acc * qty)
    }

    fn to_node(&self) -> ExplodedNode {
        ExplodedNode {
            component: self.component.clone(),
            parent_part: self.parent_part.clone(),
            level: self.level,
            cumulative_qty: self.cumulative_qty(),
        }
    }
}

/// 以某父件为根的相对子树
struct SubTree {
    nodes: Rc<Vec<RelativeNode>>,
    cyclic: bool,
}

pub(crate) struct Walker<'a> {
    edges: &'a EdgeSet,
    memo: HashMap<String, Rc<Vec<RelativeNode>>>,
    path: Vec<String>,
    cycles: Vec<ExplosionWarning>,
    expanded: usize,
    memo_hits: usize,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(edges: &'a EdgeSet, root: &str) -> Self {
        Self {
            edges,
            memo: HashMap::new(),
            path: vec![root.to_string()],
            cycles: Vec::new(),
            expanded: 0,
            memo_hits: 0,
        }
    }

    fn on_path(&self, code: &str) -> bool {
        self.path.iter().any(|p| p == code)
    }

    /// 展开 code 的子树；调用前 code 必须已在祖先链末尾
    fn expand(&mut self, code: &str) -> SubTree {
        if let Some(cached) = self.memo.get(code) {
            self.memo_hits += 1;
            return SubTree {
                nodes: Rc::clone(cached),
                cyclic: false,
            };
        }
        self.expanded += 1;

        let edges = self.edges;
        let children = edges.children(code);
        let mut nodes = Vec::with_capacity(children.len());
        let mut cyclic = false;

        // 先输出全部直接子件
        let mut descend = Vec::with_capacity(children.len());
        for child in children {
            if self.on_path(&child.component) {
                warn!(
                    parent = %code,
                    component = %child.component,
                    path = %self.path.join(" > "),
                    "BOM 循环引用，该边不再展开"
                );
                self.cycles.push(ExplosionWarning::CycleDetected {
                    path: self.path.clone(),
                    parent_part: code.to_string(),
                    component: child.component.clone(),
                });
                cyclic = true;
                continue;
            }
            nodes.push(RelativeNode {
                component: child.component.clone(),
                parent_part: code.to_string(),
                level: 1,
                factors: vec![child.qty_per],
            });
            descend.push(child);
        }

        // 再按子件顺序追加各自的子树
        for child in descend {
            if !edges.has_bom(&child.component) {
                continue;
            }
            self.path.push(child.component.clone());
            let sub = self.expand(&child.component);
            self.path.pop();

            cyclic |= sub.cyclic;
            nodes.extend(sub.nodes.iter().map(|n| {
                let mut factors = Vec::with_capacity(n.factors.len() + 1);
                factors.push(child.qty_per);
                factors.extend_from_slice(&n.factors);
                RelativeNode {
                    component: n.component.clone(),
                    parent_part: n.parent_part.clone(),
                    level: n.level + 1,
                    factors,
                }
            }));
        }

        let nodes = Rc::new(nodes);
        if !cyclic {
            self.memo.insert(code.to_string(), Rc::clone(&nodes));
        }
        SubTree { nodes, cyclic }
    }

    /// 测试用: 展开任意 code 的相对子树
    #[cfg(test)]
    pub(crate) fn subtree(&mut self, code: &str) -> Vec<ExplodedNode> {
        self.path.push(code.to_string());
        let sub = self.expand(code);
        self.path.pop();
        sub.nodes.iter().map(RelativeNode::to_node).collect()
    }
}
