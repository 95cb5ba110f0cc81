//! 检测器核心：整合各类分析器，输出检测结果
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use super::analyzer::{run_all, PageSignals};
use crate::compiler::Technology;
use crate::extractor::{HtmlExtractor, SignalBundle, SignalExtractor};
use crate::rule::{Detection, FingerprintStore};
use crate::utils::TechHits;

/// 技术检测器
///
/// 只持有不可变的指纹库，可在多个线程间共享并发调用 `analyze`
#[derive(Debug, Clone)]
pub struct TechDetector {
    store: Arc<FingerprintStore>,
    extractor: Arc<HtmlExtractor>,
}

impl TechDetector {
    /// 创建检测器
    pub fn new(store: Arc<FingerprintStore>) -> Self {
        Self {
            store,
            extractor: Arc::new(HtmlExtractor::new()),
        }
    }

    /// 自定义 HTML 解析策略链
    pub fn with_extractor(store: Arc<FingerprintStore>, extractor: HtmlExtractor) -> Self {
        Self {
            store,
            extractor: Arc::new(extractor),
        }
    }

    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    /// 核心检测接口：按置信度降序输出，同分保持指纹表顺序
    pub fn analyze(&self, bundle: &SignalBundle) -> Vec<Detection> {
        let start = Instant::now();

        // 1. 从 HTML 中重新提取 script-src
        let markup_script_srcs = if bundle.html.is_empty() {
            Vec::new()
        } else {
            self.extractor
                .extract(&bundle.html)
                .map(|markup| markup.script_srcs)
                .unwrap_or_default()
        };
        let page = PageSignals {
            bundle,
            markup_script_srcs: &markup_script_srcs,
        };

        // 2. 逐个技术执行全部检查
        let mut detections: Vec<Detection> = self
            .store
            .technologies
            .iter()
            .filter_map(|tech| {
                let hits = run_all(tech, &page);
                if hits.is_empty() {
                    return None;
                }
                debug!("Tech matched | Name: {} | Signals: {:?}", tech.name, hits.matches);
                Some(self.build_detection(tech, hits))
            })
            .collect();

        // 3. 稳定排序
        detections.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        debug!(
            "[Analyze] Technologies: {} | Detected: {} | Time: {:?}",
            self.store.technologies.len(),
            detections.len(),
            start.elapsed()
        );
        detections
    }

    /// 解析 HAR 文件后检测
    pub fn analyze_har(&self, har_path: impl AsRef<Path>) -> Vec<Detection> {
        self.analyze(&SignalExtractor::from_path_with(har_path, &self.extractor))
    }

    /// JSON 输入：含 `har_path` 时按 HAR 文件处理，否则按信号包反序列化
    pub fn analyze_json(&self, json: &Value) -> Vec<Detection> {
        if let Some(har_path) = json.get("har_path").and_then(Value::as_str) {
            return self.analyze_har(har_path);
        }
        match serde_json::from_value::<SignalBundle>(json.clone()) {
            Ok(bundle) => self.analyze(&bundle),
            Err(e) => {
                warn!("Invalid signal bundle JSON: {}", e);
                Vec::new()
            }
        }
    }

    /// 组装检测结果：分类按技术声明顺序解析，分组按首次出现去重
    fn build_detection(&self, tech: &Technology, hits: TechHits) -> Detection {
        let confidence = hits.confidence();
        let mut categories = Vec::new();
        let mut group_ids: Vec<&str> = Vec::new();

        for cat_id in &tech.category_ids {
            let Some(category) = self.store.categories.get(cat_id) else {
                continue;
            };
            categories.push(category.name.clone());
            for group_id in &category.group_ids {
                if !group_ids.contains(&group_id.as_str()) {
                    group_ids.push(group_id);
                }
            }
        }

        let groups = group_ids
            .into_iter()
            .filter_map(|id| self.store.groups.get(id))
            .map(|group| group.name.clone())
            .collect();

        Detection {
            name: tech.name.clone(),
            confidence,
            versions: hits.versions,
            matches: hits.matches,
            categories,
            groups,
        }
    }
}
