//! 行映射辅助函数

use std::str::FromStr;

use fleet_errors::{FleetError, FleetResult};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub struct MappingHelpers;

impl MappingHelpers {
    /// 读取以文本保存的枚举列
    pub fn parse_enum<T>(row: &SqliteRow, field_name: &str) -> FleetResult<T>
    where
        T: FromStr<Err = FleetError>,
    {
        let text: String = row.try_get(field_name)?;
        text.parse()
    }

    /// 读取以文本保存的 JSON 列，空值视为 `null`
    pub fn parse_json(row: &SqliteRow, field_name: &str) -> FleetResult<serde_json::Value> {
        match row.try_get::<Option<String>, _>(field_name)? {
            Some(text) if !text.trim().is_empty() => serde_json::from_str(&text)
                .map_err(|e| FleetError::Serialization(format!("解析字段 {field_name} 失败: {e}"))),
            _ => Ok(serde_json::Value::Null),
        }
    }

    /// 生成 `?2, ?3, ...` 形式的占位符
    pub fn placeholders(start: usize, count: usize) -> String {
        (start..start + count)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
