//! 检测模块：技术检测核心逻辑
pub mod matcher;
pub mod analyzer;
pub mod detector;
pub mod store;

// 导出核心接口
pub use self::matcher::PatternMatcher;
pub use self::analyzer::{
    Analyzer, PageSignals, UrlAnalyzer, HtmlAnalyzer, ScriptAnalyzer, HeaderAnalyzer,
    CookieAnalyzer, MetaAnalyzer, DnsAnalyzer, CertIssuerAnalyzer
};
pub use self::detector::TechDetector;
pub use self::store::FingerprintCache;
