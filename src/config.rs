//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;

/// 指纹数据目录的环境变量
pub const DATA_DIR_ENV: &str = "WAPPALYZER_DATA_DIR";

/// 默认数据目录
pub const DEFAULT_DATA_DIR: &str = "data/wappalyzer-data";

/// enthec/webappanalyzer 数据源
pub const DEFAULT_REMOTE_BASE: &str = "https://raw.githubusercontent.com/enthec/webappanalyzer/main/src";

/// MessagePack 快照文件名
pub const SNAPSHOT_FILE_NAME: &str = "fingerprints.mp";

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // technologies.json / categories.json / groups.json 所在目录
    pub data_dir: PathBuf,
    // 规则快照路径（MessagePack）
    pub rule_cache_path: PathBuf,
    // 远程数据源根地址
    pub remote_base: String,
    // 超时配置（单位：秒）
    pub http_timeout: u64,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let data_dir = std::env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self {
            rule_cache_path: data_dir.join(SNAPSHOT_FILE_NAME),
            data_dir,
            remote_base: DEFAULT_REMOTE_BASE.to_string(),
            http_timeout: 15,
            verbose: false,
        }
    }
}

impl GlobalConfig {
    pub fn technologies_path(&self) -> PathBuf {
        self.data_dir.join("technologies.json")
    }

    pub fn categories_path(&self) -> PathBuf {
        self.data_dir.join("categories.json")
    }

    pub fn groups_path(&self) -> PathBuf {
        self.data_dir.join("groups.json")
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
    // 未显式指定快照路径时，跟随 data_dir
    cache_path_set: bool,
}

impl Default for CustomConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
            cache_path_set: false,
        }
    }

    pub fn data_dir(mut self, path: PathBuf) -> Self {
        self.config.data_dir = path;
        self
    }

    pub fn rule_cache_path(mut self, path: PathBuf) -> Self {
        self.config.rule_cache_path = path;
        self.cache_path_set = true;
        self
    }

    pub fn remote_base(mut self, url: String) -> Self {
        self.config.remote_base = url;
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(mut self) -> GlobalConfig {
        if !self.cache_path_set {
            self.config.rule_cache_path = self.config.data_dir.join(SNAPSHOT_FILE_NAME);
        }
        self.config
    }
}
