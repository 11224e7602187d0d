// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 创建临时 ERP 数据库（BomStructure / InvMaster）并写入测试数据
// 说明: 代码按定长字段写入（右侧补空格），模拟 Syspro 的 CHAR 列
// ==========================================

#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::error::Error;
use tempfile::NamedTempFile;

/// Syspro 定长代码列宽
pub const CODE_WIDTH: usize = 30;

/// 右侧补空格到定长
pub fn pad(code: &str) -> String {
    format!("{:<width$}", code, width = CODE_WIDTH)
}

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开可写连接（仅用于写入测试数据）
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(Connection::open(db_path)?)
}

/// 初始化数据库 schema
fn init_schema(conn: &Connection) -> Result<(), Box<dyn Error>> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS BomStructure (
            ParentPart TEXT NOT NULL,
            Component TEXT NOT NULL,
            QtyPer REAL NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS InvMaster (
            StockCode TEXT PRIMARY KEY,
            Description TEXT,
            MaterialCost REAL,
            LabourCost REAL,
            UnitCost REAL,
            DateLastPurchase TEXT
        )
        "#,
        [],
    )?;

    Ok(())
}

/// 写入 BOM 边（代码补齐定长）
pub fn insert_edges(conn: &Connection, edges: &[(&str, &str, f64)]) -> Result<(), Box<dyn Error>> {
    let mut stmt =
        conn.prepare("INSERT INTO BomStructure (ParentPart, Component, QtyPer) VALUES (?1, ?2, ?3)")?;
    for (parent, component, qty) in edges {
        stmt.execute(params![pad(parent), pad(component), qty])?;
    }
    Ok(())
}

/// 写入一条原始 BOM 边（QtyPer 按文本写入，可构造非数值用量）
pub fn insert_raw_edge(
    conn: &Connection,
    parent: &str,
    component: &str,
    qty_per: &str,
) -> Result<(), Box<dyn Error>> {
    conn.execute(
        "INSERT INTO BomStructure (ParentPart, Component, QtyPer) VALUES (?1, ?2, ?3)",
        params![pad(parent), pad(component), qty_per],
    )?;
    Ok(())
}

/// 写入库存明细 (StockCode, Description, MaterialCost, LabourCost)
pub fn insert_inventory(
    conn: &Connection,
    items: &[(&str, &str, f64, f64)],
) -> Result<(), Box<dyn Error>> {
    let mut stmt = conn.prepare(
        "INSERT INTO InvMaster (StockCode, Description, MaterialCost, LabourCost, UnitCost, DateLastPurchase)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (code, desc, material, labour) in items {
        stmt.execute(params![
            pad(code),
            format!("{:<50}", desc),
            material,
            labour,
            material + labour,
            "2024-01-15 00:00:00.000",
        ])?;
    }
    Ok(())
}

/// 自行车 BOM 场景
///
/// ```text
/// BIKE ─┬─ FRAME x1 ─┬─ TUBE x3 ── STEEL x2.5
///       │            └─ BOLT x6
///       ├─ WHEEL x2 ─┬─ SPOKE x36
///       │            ├─ RIM x1      (无库存明细)
///       │            └─ BOLT x1
///       └─ BOLT x4
/// ```
pub fn seed_bike_scenario(conn: &Connection) -> Result<(), Box<dyn Error>> {
    insert_edges(
        conn,
        &[
            ("BIKE", "FRAME", 1.0),
            ("BIKE", "WHEEL", 2.0),
            ("BIKE", "BOLT", 4.0),
            ("FRAME", "TUBE", 3.0),
            ("FRAME", "BOLT", 6.0),
            ("TUBE", "STEEL", 2.5),
            ("WHEEL", "SPOKE", 36.0),
            ("WHEEL", "RIM", 1.0),
            ("WHEEL", "BOLT", 1.0),
        ],
    )?;

    insert_inventory(
        conn,
        &[
            ("BIKE", "Complete bike", 300.0, 40.0),
            ("FRAME", "Frame assembly", 50.0, 10.0),
            ("WHEEL", "Wheel assembly", 20.0, 5.0),
            ("TUBE", "Frame tube", 8.0, 1.0),
            ("STEEL", "Steel bar", 2.0, 0.0),
            ("SPOKE", "Spoke", 0.25, 0.0),
            ("BOLT", "Bolt M6", 0.5, 0.0),
        ],
    )?;

    Ok(())
}

/// 循环 BOM 场景: LOOP_A -> LOOP_B x2 -> LOOP_A x3，LOOP_B -> LEAF x5
pub fn seed_cycle_scenario(conn: &Connection) -> Result<(), Box<dyn Error>> {
    insert_edges(
        conn,
        &[
            ("LOOP_A", "LOOP_B", 2.0),
            ("LOOP_B", "LOOP_A", 3.0),
            ("LOOP_B", "LEAF", 5.0),
        ],
    )?;
    insert_inventory(
        conn,
        &[
            ("LOOP_A", "Loop A", 10.0, 1.0),
            ("LOOP_B", "Loop B", 4.0, 1.0),
            ("LEAF", "Leaf", 1.0, 0.0),
        ],
    )?;
    Ok(())
}

/// 小数用量 + 含 '/' 的代码
///
/// ```text
/// KIT ─┬─ MOD x0.1 ── SUBMOD x0.2 ── PART x0.3
///      └─ BR/01 x1.5 ── 01 x0.7 ── PART x0.3
/// ```
pub fn seed_precision_scenario(conn: &Connection) -> Result<(), Box<dyn Error>> {
    insert_edges(
        conn,
        &[
            ("KIT", "MOD", 0.1),
            ("MOD", "SUBMOD", 0.2),
            ("SUBMOD", "PART", 0.3),
            ("KIT", "BR/01", 1.5),
            ("BR/01", "01", 0.7),
            ("01", "PART", 0.3),
        ],
    )?;
    insert_inventory(
        conn,
        &[
            ("MOD", "Module", 0.5, 0.1),
            ("BR/01", "Bracket", 0.5, 0.0),
            ("PART", "Part", 1.1, 0.0),
        ],
    )?;
    Ok(())
}

/// 创建数据库并写入自行车 + 循环场景
pub fn create_seeded_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let (file, db_path) = create_test_db()?;
    let conn = open_test_connection(&db_path)?;
    seed_bike_scenario(&conn)?;
    seed_cycle_scenario(&conn)?;
    drop(conn);
    Ok((file, db_path))
}
