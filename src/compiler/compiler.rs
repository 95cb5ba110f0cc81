//! 规则编译器核心
//! 将原始 JSON 指纹表解析为 PatternSpec 并一次性编译全部正则

use std::collections::HashMap;
use std::time::Instant;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::pattern::{CompiledPattern, PatternSpec, Technology, VersionedPattern};
use crate::rule::model::{Category, FingerprintStore, Group, RawTables};

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则库（单条异常数据只跳过自身）
    pub fn compile(raw: &RawTables) -> FingerprintStore {
        let start = Instant::now();
        let mut stats = CompileStats::default();

        let technologies: Vec<Technology> = raw
            .technologies
            .iter()
            .filter_map(|(name, value)| {
                let tech = Self::compile_technology(name, value, &mut stats);
                if tech.is_none() {
                    stats.skipped_entries += 1;
                    debug!("Skipping non-technology entry | name: {}", name);
                }
                tech
            })
            .collect();

        let categories: HashMap<String, Category> = raw
            .categories
            .iter()
            .filter_map(|(id, value)| match Self::compile_category(id, value) {
                Some(cat) => Some((cat.id.clone(), cat)),
                None => {
                    stats.skipped_entries += 1;
                    debug!("Skipping malformed category | id: {}", id);
                    None
                }
            })
            .collect();

        let groups: HashMap<String, Group> = raw
            .groups
            .iter()
            .filter_map(|(id, value)| match Self::compile_group(id, value) {
                Some(group) => Some((group.id.clone(), group)),
                None => {
                    stats.skipped_entries += 1;
                    debug!("Skipping malformed group | id: {}", id);
                    None
                }
            })
            .collect();

        if stats.invalid_patterns > 0 {
            warn!(
                "{} of {} fingerprint regexes failed to compile and will never match",
                stats.invalid_patterns, stats.patterns
            );
        }
        debug!(
            "Rule compilation finished | Time: {:?} | Technologies: {} | Categories: {} | Groups: {} | Patterns: {} | Skipped entries: {}",
            start.elapsed(),
            technologies.len(),
            categories.len(),
            groups.len(),
            stats.patterns,
            stats.skipped_entries
        );

        FingerprintStore {
            technologies,
            categories,
            groups,
        }
    }

    /// 编译单个技术规则，非对象条目返回 None
    fn compile_technology(name: &str, value: &Value, stats: &mut CompileStats) -> Option<Technology> {
        let obj = value.as_object()?;

        let tech = Technology {
            name: name.to_string(),
            url: Self::compile_field(obj, "url"),
            html: Self::compile_field(obj, "html"),
            scripts: Self::compile_field(obj, "scripts"),
            headers: Self::compile_keyed(obj, "headers"),
            cookies: Self::compile_keyed(obj, "cookies"),
            meta: Self::compile_keyed(obj, "meta"),
            dns: Self::compile_keyed(obj, "dns"),
            cert_issuer: Self::compile_field(obj, "certIssuer"),
            category_ids: obj
                .get("cats")
                .and_then(Value::as_array)
                .map(|cats| cats.iter().filter_map(normalize_id).collect())
                .unwrap_or_default(),
        };

        let count = tech.pattern_count();
        let invalid = Self::invalid_count(&tech);
        if invalid > 0 {
            debug!("Technology {} has {} invalid regex(es)", name, invalid);
        }
        stats.patterns += count;
        stats.invalid_patterns += invalid;

        Some(tech)
    }

    fn compile_field(obj: &Map<String, Value>, key: &str) -> Option<PatternSpec> {
        let value = obj.get(key)?;
        let spec = Self::compile_spec(value);
        if spec.is_none() {
            debug!("Unsupported pattern shape for field {}: {}", key, value);
        }
        spec
    }

    /// 具名模式（headers/cookies/meta/dns），保留声明顺序
    fn compile_keyed(obj: &Map<String, Value>, key: &str) -> Vec<(String, PatternSpec)> {
        let Some(Value::Object(entries)) = obj.get(key) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|(name, value)| Self::compile_spec(value).map(|spec| (name.clone(), spec)))
            .collect()
    }

    /// 解析多形态模式值：字符串 → Single，数组 → List，对象 → VersionedMap
    pub fn compile_spec(value: &Value) -> Option<PatternSpec> {
        match value {
            Value::String(s) => Some(PatternSpec::Single(CompiledPattern::new(s))),
            Value::Array(items) => Some(PatternSpec::List(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(CompiledPattern::new)
                    .collect(),
            )),
            Value::Object(entries) => Some(PatternSpec::VersionedMap(
                entries
                    .iter()
                    .map(|(pattern, template)| VersionedPattern {
                        pattern: CompiledPattern::new(pattern),
                        version_template: template.as_str().unwrap_or_default().to_string(),
                    })
                    .collect(),
            )),
            _ => None,
        }
    }

    fn compile_category(id: &str, value: &Value) -> Option<Category> {
        let obj = value.as_object()?;
        let name = obj.get("name")?.as_str()?.to_string();
        let group_ids = obj
            .get("groups")
            .and_then(Value::as_array)
            .map(|groups| groups.iter().filter_map(normalize_id).collect())
            .unwrap_or_default();
        Some(Category {
            id: id.to_string(),
            name,
            group_ids,
        })
    }

    fn compile_group(id: &str, value: &Value) -> Option<Group> {
        let name = value.as_object()?.get("name")?.as_str()?.to_string();
        Some(Group {
            id: id.to_string(),
            name,
        })
    }

    fn invalid_count(tech: &Technology) -> usize {
        let single = [&tech.url, &tech.html, &tech.scripts, &tech.cert_issuer]
            .into_iter()
            .flatten()
            .map(PatternSpec::invalid_count)
            .sum::<usize>();
        let keyed = [&tech.headers, &tech.cookies, &tech.meta, &tech.dns]
            .into_iter()
            .flat_map(|list| list.iter())
            .map(|(_, spec)| spec.invalid_count())
            .sum::<usize>();
        single + keyed
    }
}

/// 分类/分组 ID 统一为字符串键，兼容数字与数字字符串
fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_u64().map(|id| id.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    patterns: usize,
    invalid_patterns: usize,
    skipped_entries: usize,
}
