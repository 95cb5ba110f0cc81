//! 规则加载管理器
//! 加载顺序：MessagePack 快照 → 数据目录下的 JSON 文件 → 远程 enthec/webappanalyzer 数据源

use std::path::Path;
use std::time::{Duration, Instant};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use super::cache::RuleCacheManager;
use super::model::RawTables;
use crate::config::GlobalConfig;
use crate::error::{RswResult, RswappalyzerError};

/// 技术指纹分片文件名，按此顺序合并，后者覆盖前者同名条目
fn technology_shards() -> impl Iterator<Item = String> {
    std::iter::once('_')
        .chain('a'..='z')
        .map(|c| format!("technologies/{}.json", c))
}

/// 三张表之一
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    Technologies,
    Categories,
    Groups,
}

impl TableKind {
    fn local_path(self, config: &GlobalConfig) -> std::path::PathBuf {
        match self {
            TableKind::Technologies => config.technologies_path(),
            TableKind::Categories => config.categories_path(),
            TableKind::Groups => config.groups_path(),
        }
    }

    fn remote_files(self) -> Vec<String> {
        match self {
            TableKind::Technologies => technology_shards().collect(),
            TableKind::Categories => vec!["categories.json".to_string()],
            TableKind::Groups => vec!["groups.json".to_string()],
        }
    }
}

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 加载原始指纹表（优先本地快照，其次本地 JSON，最后远程）
    pub async fn load(config: &GlobalConfig) -> RswResult<RawTables> {
        let start = Instant::now();

        // 1. 优先加载本地快照
        match RuleCacheManager::load_from_cache(config).await {
            Ok(raw) => {
                info!(
                    "[Load] Source: snapshot | Technologies: {} | Time: {:?}",
                    raw.technologies.len(),
                    start.elapsed()
                );
                return Ok(raw);
            }
            Err(e) => debug!("Snapshot unavailable ({}), falling back to JSON tables", e),
        }

        // 2. 逐表加载：本地文件缺失或为空时拉取远程
        let mut client = None;
        let mut raw = RawTables::default();
        for kind in [TableKind::Groups, TableKind::Categories, TableKind::Technologies] {
            let table = Self::load_table(config, kind, &mut client).await?;
            match kind {
                TableKind::Technologies => raw.technologies = table,
                TableKind::Categories => raw.categories = table,
                TableKind::Groups => raw.groups = table,
            }
        }

        if raw.is_empty() {
            warn!("No technology fingerprints available, detection will yield no results");
            return Ok(raw);
        }

        // 3. 写入快照，失败不影响本次加载
        if let Err(e) = RuleCacheManager::save_to_cache(config, &raw).await {
            warn!("Failed to write snapshot {}: {}", config.rule_cache_path.display(), e);
        }

        info!(
            "[Load] Source: json | Technologies: {} | Categories: {} | Groups: {} | Time: {:?}",
            raw.technologies.len(),
            raw.categories.len(),
            raw.groups.len(),
            start.elapsed()
        );
        Ok(raw)
    }

    /// 强制刷新：删除快照与本地 JSON 后重新加载
    pub async fn refresh(config: &GlobalConfig) -> RswResult<RawTables> {
        if let Err(e) = RuleCacheManager::clear_cache(config).await {
            warn!("Failed to remove snapshot: {}", e);
        }
        for kind in [TableKind::Technologies, TableKind::Categories, TableKind::Groups] {
            let path = kind.local_path(config);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        Self::load(config).await
    }

    async fn load_table(
        config: &GlobalConfig,
        kind: TableKind,
        client: &mut Option<Client>,
    ) -> RswResult<Map<String, Value>> {
        let path = kind.local_path(config);
        if let Some(table) = Self::read_local(&path).await.filter(|t| !t.is_empty()) {
            debug!("Loaded {:?} from {} ({} entries)", kind, path.display(), table.len());
            return Ok(table);
        }

        if kind == TableKind::Technologies {
            warn!(
                "Technologies file not found locally, fetching remote shards; set {} to use local data",
                crate::config::DATA_DIR_ENV
            );
        }

        let client = match client {
            Some(client) => client,
            None => client.insert(Self::build_client(config)?),
        };
        let table = Self::fetch_table(client, config, kind).await?;
        if !table.is_empty() {
            Self::write_local(&path, &table).await;
        }
        Ok(table)
    }

    /// 读取本地 JSON 表；不存在或格式错误时返回 None
    async fn read_local(path: &Path) -> Option<Map<String, Value>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<Map<String, Value>>(&text) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// 持久化 JSON 表，失败仅记录日志
    async fn write_local(path: &Path, table: &Map<String, Value>) {
        if let Err(e) = Self::try_write_local(path, table).await {
            warn!("Failed to write {}: {}", path.display(), e);
        }
    }

    async fn try_write_local(path: &Path, table: &Map<String, Value>) -> RswResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_vec(table)?).await?;
        Ok(())
    }

    fn build_client(config: &GlobalConfig) -> RswResult<Client> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(config.http_timeout))
            .user_agent(concat!("rswappalyzer-har/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }

    /// 拉取并合并一张表的全部远程文件；单个文件失败时跳过
    async fn fetch_table(client: &Client, config: &GlobalConfig, kind: TableKind) -> RswResult<Map<String, Value>> {
        let base = Self::base_url(&config.remote_base)?;
        let mut table = Map::new();
        for file in kind.remote_files() {
            let url = base.join(&file)?;
            match Self::fetch_json_object(client, &url).await {
                Ok(part) => {
                    debug!("Fetched {} ({} entries)", url, part.len());
                    table.extend(part);
                }
                Err(e) => warn!("Failed to download {}: {}", url, e),
            }
        }
        Ok(table)
    }

    async fn fetch_json_object(client: &Client, url: &Url) -> RswResult<Map<String, Value>> {
        let response = client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(RswappalyzerError::RemoteStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let value: Value = response.json().await?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(RswappalyzerError::TableShape { source_name: url.to_string() }),
        }
    }

    /// 根地址补齐末尾斜杠，保证 join 追加而非替换最后一段
    fn base_url(remote_base: &str) -> RswResult<Url> {
        if remote_base.ends_with('/') {
            Ok(Url::parse(remote_base)?)
        } else {
            Ok(Url::parse(&format!("{}/", remote_base))?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use serde_json::json;

    // 远程地址指向不可达端口，确保测试不触网
    fn offline_config(dir: &Path) -> GlobalConfig {
        ConfigManager::custom()
            .data_dir(dir.to_path_buf())
            .remote_base("http://127.0.0.1:9/wappalyzer".to_string())
            .http_timeout(1)
            .build()
    }

    async fn write_tables(config: &GlobalConfig) {
        tokio::fs::write(
            config.technologies_path(),
            json!({"Zeta": {"html": "zeta"}, "Alpha": {"headers": {"Server": "alpha"}}}).to_string(),
        )
        .await
        .unwrap();
        tokio::fs::write(config.categories_path(), json!({"1": {"name": "CMS", "groups": [3]}}).to_string())
            .await
            .unwrap();
        tokio::fs::write(config.groups_path(), json!({"3": {"name": "Content"}}).to_string())
            .await
            .unwrap();
    }

    #[test]
    fn test_shard_order() {
        let shards: Vec<String> = technology_shards().collect();
        assert_eq!(shards.len(), 27);
        assert_eq!(shards[0], "technologies/_.json");
        assert_eq!(shards[1], "technologies/a.json");
        assert_eq!(shards[26], "technologies/z.json");
    }

    #[test]
    fn test_base_url_join_appends() {
        let base = RuleLoader::base_url("https://raw.example.test/repo/main/src").unwrap();
        assert_eq!(
            base.join("technologies/a.json").unwrap().as_str(),
            "https://raw.example.test/repo/main/src/technologies/a.json"
        );
        assert!(RuleLoader::base_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_load_local_tables_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        write_tables(&config).await;

        let raw = RuleLoader::load(&config).await.unwrap();
        let names: Vec<&String> = raw.technologies.keys().collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
        assert_eq!(raw.categories.len(), 1);
        assert_eq!(raw.groups.len(), 1);
        assert!(config.rule_cache_path.exists());
    }

    #[tokio::test]
    async fn test_snapshot_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        write_tables(&config).await;
        RuleLoader::load(&config).await.unwrap();

        // 快照存在时不再读取 JSON
        tokio::fs::write(config.technologies_path(), "{}").await.unwrap();
        let raw = RuleLoader::load(&config).await.unwrap();
        assert_eq!(raw.technologies.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_removes_local_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path());
        write_tables(&config).await;
        RuleLoader::load(&config).await.unwrap();

        // 远程不可达：刷新后三张表均为空
        let raw = RuleLoader::refresh(&config).await.unwrap();
        assert!(raw.is_empty());
        assert!(raw.categories.is_empty());
        assert!(!config.technologies_path().exists());
        assert!(!config.rule_cache_path.exists());
    }
}
