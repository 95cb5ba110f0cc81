//! 检测结果更新工具
//! 单个技术在一次分析内的命中记录（标签 + 版本）

use std::collections::BTreeSet;

/// 置信度上限
pub const MAX_CONFIDENCE: u8 = 100;
/// 每个命中标签贡献的置信度
pub const CONFIDENCE_PER_MATCH: usize = 10;

/// 单个技术的命中记录，仅存活于一次 analyze 调用内
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TechHits {
    /// 命中标签，允许重复
    pub matches: Vec<String>,
    pub versions: BTreeSet<String>,
}

impl TechHits {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn confidence(&self) -> u8 {
        DetectionUpdater::confidence(self.matches.len())
    }
}

/// 检测结果更新工具
pub struct DetectionUpdater;

impl DetectionUpdater {
    /// 记录一次成功检查
    pub fn update(hits: &mut TechHits, label: impl Into<String>, version: Option<String>) {
        hits.matches.push(label.into());
        if let Some(version) = version {
            hits.versions.insert(version);
        }
    }

    /// confidence = min(10 × 命中数, 100)
    pub fn confidence(match_count: usize) -> u8 {
        match_count
            .saturating_mul(CONFIDENCE_PER_MATCH)
            .min(MAX_CONFIDENCE as usize) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_keeps_duplicate_labels() {
        let mut hits = TechHits::default();
        DetectionUpdater::update(&mut hits, "scripts", Some("3.6.0".to_string()));
        DetectionUpdater::update(&mut hits, "scripts", Some("3.6.0".to_string()));
        DetectionUpdater::update(&mut hits, "html", None);

        assert_eq!(hits.matches, vec!["scripts", "scripts", "html"]);
        assert_eq!(hits.versions.len(), 1);
        assert_eq!(hits.confidence(), 30);
    }

    #[test]
    fn test_confidence_is_capped() {
        assert_eq!(DetectionUpdater::confidence(0), 0);
        assert_eq!(DetectionUpdater::confidence(7), 70);
        assert_eq!(DetectionUpdater::confidence(10), 100);
        assert_eq!(DetectionUpdater::confidence(23), 100);
        assert_eq!(DetectionUpdater::confidence(usize::MAX), 100);
    }
}
