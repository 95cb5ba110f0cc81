//! rswappalyzer-har - 基于 HAR 抓包的网站技术栈检测引擎

// 导出全局错误类型
pub use self::error::{RswappalyzerError, RswResult};

// 导出配置模块
pub use self::config::{GlobalConfig, ConfigManager, CustomConfigBuilder};

// 导出规则模块核心接口
pub use self::rule::{
    Category, Detection, FingerprintStore, Group, RawTables,
    RuleLoader, RuleCacheManager, detections_to_pretty_json, detections_to_pretty_text
};

// 导出提取模块核心接口
pub use self::extractor::{HtmlExtractor, SignalBundle, SignalExtractor};

// 导出工具模块核心接口
pub use self::utils::{
    VersionExtractor, HeaderConverter, DetectionUpdater
};

// 导出编译模块核心接口
pub use self::compiler::{
    CompiledPattern, PatternSpec, RuleCompiler, Technology
};

// 导出检测模块核心接口
pub use self::detector::{FingerprintCache, PatternMatcher, TechDetector};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod extractor;
pub mod utils;
pub mod compiler;
pub mod detector;
