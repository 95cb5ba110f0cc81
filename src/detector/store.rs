//! 指纹库持有者
//! 首次使用时加载并编译指纹库，并发的首次调用只会加载一次；之后以 Arc 共享只读实例

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::info;

use super::detector::TechDetector;
use crate::compiler::RuleCompiler;
use crate::config::GlobalConfig;
use crate::error::RswResult;
use crate::rule::{FingerprintStore, RuleLoader};

/// 延迟初始化的指纹库缓存
#[derive(Debug)]
pub struct FingerprintCache {
    config: GlobalConfig,
    slot: RwLock<Option<Arc<FingerprintStore>>>,
}

impl FingerprintCache {
    pub fn new(config: GlobalConfig) -> Self {
        Self {
            config,
            slot: RwLock::new(None),
        }
    }

    /// 使用已构建好的指纹库
    pub fn with_store(config: GlobalConfig, store: FingerprintStore) -> Self {
        Self {
            config,
            slot: RwLock::new(Some(Arc::new(store))),
        }
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// 获取指纹库，未加载时加载
    pub async fn get(&self) -> RswResult<Arc<FingerprintStore>> {
        if let Some(store) = self.slot.read().await.as_ref() {
            return Ok(Arc::clone(store));
        }

        let mut slot = self.slot.write().await;
        // 等待写锁期间可能已被其他调用方加载
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }

        let start = Instant::now();
        let raw = RuleLoader::load(&self.config).await?;
        let store = Arc::new(RuleCompiler::compile(&raw));
        info!(
            "[Init] Fingerprints ready | Technologies: {} | Time: {:?}",
            store.technologies.len(),
            start.elapsed()
        );
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// 强制刷新：删除本地数据后重新加载；已分发的旧实例不受影响
    pub async fn refresh(&self) -> RswResult<Arc<FingerprintStore>> {
        let mut slot = self.slot.write().await;
        *slot = None;

        let start = Instant::now();
        let raw = RuleLoader::refresh(&self.config).await?;
        let store = Arc::new(RuleCompiler::compile(&raw));
        info!(
            "[Refresh] Fingerprints reloaded | Technologies: {} | Time: {:?}",
            store.technologies.len(),
            start.elapsed()
        );
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// 基于当前指纹库创建检测器
    pub async fn detector(&self) -> RswResult<TechDetector> {
        Ok(TechDetector::new(self.get().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::extractor::SignalBundle;
    use serde_json::json;

    #[tokio::test]
    async fn test_concurrent_first_use_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigManager::custom().data_dir(dir.path().to_path_buf()).build();
        tokio::fs::write(config.technologies_path(), json!({"Nginx": {"headers": {"Server": "nginx"}}}).to_string())
            .await
            .unwrap();
        tokio::fs::write(config.categories_path(), json!({"1": {"name": "Web servers"}}).to_string())
            .await
            .unwrap();
        tokio::fs::write(config.groups_path(), json!({"7": {"name": "Servers"}}).to_string())
            .await
            .unwrap();

        let cache = Arc::new(FingerprintCache::new(config));
        let (a, b) = tokio::join!(cache.get(), cache.get());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.technologies.len(), 1);

        let detector = cache.detector().await.unwrap();
        let detections = detector.analyze(&SignalBundle::default().with_header("server", "nginx"));
        assert_eq!(detections[0].name, "Nginx");
    }

    #[tokio::test]
    async fn test_with_store_skips_loading() {
        let config = ConfigManager::custom()
            .data_dir(std::path::PathBuf::from("/definitely/missing"))
            .build();
        let store = FingerprintStore::from_json_str(r#"{"A": {"html": "a"}}"#, "{}", "{}").unwrap();

        let cache = FingerprintCache::with_store(config, store);
        assert_eq!(cache.get().await.unwrap().technologies.len(), 1);
    }
}
