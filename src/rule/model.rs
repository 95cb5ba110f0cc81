//! 规则数据模型定义
//! 原始指纹表、编译后的指纹库以及检测结果

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compiler::{RuleCompiler, Technology};
use crate::error::RswResult;

/// 原始指纹表（保持 JSON 中的键顺序）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTables {
    #[serde(default)]
    pub technologies: Map<String, Value>,
    #[serde(default)]
    pub categories: Map<String, Value>,
    #[serde(default)]
    pub groups: Map<String, Value>,
}

impl RawTables {
    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }
}

/// 分类定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub group_ids: Vec<String>,
}

/// 分组定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
}

/// 编译后的指纹库，加载后只读
#[derive(Debug, Clone, Default)]
pub struct FingerprintStore {
    /// 技术表，顺序即检测结果的平局排序依据
    pub technologies: Vec<Technology>,
    pub categories: HashMap<String, Category>,
    pub groups: HashMap<String, Group>,
}

impl FingerprintStore {
    pub fn from_tables(raw: &RawTables) -> Self {
        RuleCompiler::compile(raw)
    }

    /// 从三份 JSON 文本直接构建
    pub fn from_json_str(technologies: &str, categories: &str, groups: &str) -> RswResult<Self> {
        let raw = RawTables {
            technologies: serde_json::from_str(technologies)?,
            categories: serde_json::from_str(categories)?,
            groups: serde_json::from_str(groups)?,
        };
        Ok(Self::from_tables(&raw))
    }

    pub fn technology(&self, name: &str) -> Option<&Technology> {
        self.technologies.iter().find(|tech| tech.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }
}

/// 技术检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub name: String,
    pub confidence: u8,
    pub versions: BTreeSet<String>,
    /// 命中的信号标签，如 `headers:Server`
    #[serde(skip_serializing)]
    pub matches: Vec<String>,
    pub categories: Vec<String>,
    pub groups: Vec<String>,
}

// ======== 为 Detection 实现 Display trait（用于 CLI pretty 输出） ========
impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |items: Vec<&str>| {
            if items.is_empty() {
                "n/a".to_string()
            } else {
                items.join(", ")
            }
        };
        writeln!(f, "- {} (confidence {}%)", self.name, self.confidence)?;
        writeln!(f, "  versions: {}", join(self.versions.iter().map(String::as_str).collect()))?;
        writeln!(f, "  categories: {}", join(self.categories.iter().map(String::as_str).collect()))?;
        write!(f, "  groups: {}", join(self.groups.iter().map(String::as_str).collect()))
    }
}

/// 序列化为格式化 JSON
pub fn detections_to_pretty_json(detections: &[Detection]) -> RswResult<String> {
    Ok(serde_json::to_string_pretty(detections)?)
}

/// 人类可读格式
pub fn detections_to_pretty_text(detections: &[Detection]) -> String {
    detections
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
