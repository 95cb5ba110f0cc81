//! 规则缓存管理
//! 仅处理原始指纹表的本地序列化（MessagePack）和反序列化

use rmp_serde::{Serializer, from_slice};
use serde::Serialize;
use tracing::debug;

use super::model::RawTables;
use crate::error::{RswResult, RswappalyzerError};
use crate::config::GlobalConfig;

/// 规则缓存管理器
pub struct RuleCacheManager;

impl RuleCacheManager {
    /// 从本地快照加载原始指纹表
    pub async fn load_from_cache(config: &GlobalConfig) -> RswResult<RawTables> {
        let cache_path = &config.rule_cache_path;
        let cache_data = tokio::fs::read(cache_path).await?;

        // MessagePack反序列化
        let raw: RawTables = from_slice(&cache_data)?;
        if raw.is_empty() {
            return Err(RswappalyzerError::EmptySnapshot(cache_path.clone()));
        }

        debug!(
            "Snapshot decoded | Technologies: {} | Categories: {} | Groups: {}",
            raw.technologies.len(),
            raw.categories.len(),
            raw.groups.len()
        );

        Ok(raw)
    }

    /// 将原始指纹表写入本地快照
    pub async fn save_to_cache(config: &GlobalConfig, raw: &RawTables) -> RswResult<()> {
        let cache_path = &config.rule_cache_path;
        let mut cache_data = Vec::new();

        // 以 map 形式序列化，保证字段可按名还原
        raw.serialize(&mut Serializer::new(&mut cache_data).with_struct_map())?;

        debug!("Snapshot encoded | Size: {} bytes", cache_data.len());

        if let Some(parent) = cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(cache_path, cache_data).await?;
        Ok(())
    }

    /// 清除本地快照
    pub async fn clear_cache(config: &GlobalConfig) -> RswResult<()> {
        let cache_path = &config.rule_cache_path;
        if tokio::fs::try_exists(cache_path).await? {
            tokio::fs::remove_file(cache_path).await?;
        }
        Ok(())
    }
}
