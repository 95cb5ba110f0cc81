//! 规则模块：负责指纹表的加载、缓存、数据模型定义
pub mod model;
pub mod cache;
pub mod loader;

// 导出核心接口
pub use self::model::{
    Category, Detection, FingerprintStore, Group, RawTables,
    detections_to_pretty_json, detections_to_pretty_text
};
pub use self::loader::RuleLoader;
pub use self::cache::RuleCacheManager;
