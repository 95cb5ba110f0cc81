//! 检测分析器：每类信号一个分析器，对单个技术执行该类检查并记录命中标签

use tracing::trace;

use super::matcher::PatternMatcher;
use crate::compiler::{PatternSpec, Technology};
use crate::extractor::SignalBundle;
use crate::utils::{DetectionUpdater, HeaderConverter, TechHits};

/// 一次分析的页面输入：信号包 + 从 HTML 重新解析出的 script-src
#[derive(Debug, Clone, Copy)]
pub struct PageSignals<'a> {
    pub bundle: &'a SignalBundle,
    pub markup_script_srcs: &'a [String],
}

/// 信号分析器
pub trait Analyzer {
    /// 分析器名称，用于日志
    const TYPE_NAME: &'static str;

    fn analyze(tech: &Technology, page: &PageSignals<'_>, hits: &mut TechHits);
}

/// 带版本的检查：命中时记录标签与版本
fn check_with_version(text: &str, spec: &PatternSpec, label: &str, tech: &Technology, hits: &mut TechHits) {
    let (matched, version) = PatternMatcher::match_with_version(text, spec);
    if matched {
        trace!("Matched | Tech: {} | Signal: {} | Version: {:?}", tech.name, label, version);
        DetectionUpdater::update(hits, label, version);
    }
}

/// 仅判定的检查
fn check(text: &str, spec: &PatternSpec, label: &str, tech: &Technology, hits: &mut TechHits) {
    if PatternMatcher::matches(text, spec) {
        trace!("Matched | Tech: {} | Signal: {}", tech.name, label);
        DetectionUpdater::update(hits, label, None);
    }
}

/// URL分析器
pub struct UrlAnalyzer;

impl Analyzer for UrlAnalyzer {
    const TYPE_NAME: &'static str = "url";

    fn analyze(tech: &Technology, page: &PageSignals<'_>, hits: &mut TechHits) {
        if let Some(spec) = &tech.url {
            check(&page.bundle.url, spec, Self::TYPE_NAME, tech, hits);
        }
    }
}

/// HTML分析器
pub struct HtmlAnalyzer;

impl Analyzer for HtmlAnalyzer {
    const TYPE_NAME: &'static str = "html";

    fn analyze(tech: &Technology, page: &PageSignals<'_>, hits: &mut TechHits) {
        if let Some(spec) = &tech.html {
            check_with_version(&page.bundle.html, spec, Self::TYPE_NAME, tech, hits);
        }
    }
}

/// Script分析器：先检查 HTML 中的 script-src，再检查信号包中的脚本，每次命中单独计数
pub struct ScriptAnalyzer;

impl Analyzer for ScriptAnalyzer {
    const TYPE_NAME: &'static str = "scripts";

    fn analyze(tech: &Technology, page: &PageSignals<'_>, hits: &mut TechHits) {
        let Some(spec) = &tech.scripts else {
            return;
        };
        for script in page.markup_script_srcs.iter().chain(page.bundle.scripts.iter()) {
            check_with_version(script, spec, Self::TYPE_NAME, tech, hits);
        }
    }
}

/// Header分析器：先按原名查找，再按小写名查找
pub struct HeaderAnalyzer;

impl Analyzer for HeaderAnalyzer {
    const TYPE_NAME: &'static str = "headers";

    fn analyze(tech: &Technology, page: &PageSignals<'_>, hits: &mut TechHits) {
        for (header_name, spec) in &tech.headers {
            let Some(value) = HeaderConverter::lookup(&page.bundle.headers, header_name) else {
                continue;
            };
            let label = format!("{}:{}", Self::TYPE_NAME, header_name);
            check_with_version(value, spec, &label, tech, hits);
        }
    }
}

/// Cookie分析器（不提取版本）
pub struct CookieAnalyzer;

impl Analyzer for CookieAnalyzer {
    const TYPE_NAME: &'static str = "cookies";

    fn analyze(tech: &Technology, page: &PageSignals<'_>, hits: &mut TechHits) {
        for (cookie_name, spec) in &tech.cookies {
            let Some(value) = page.bundle.cookies.get(cookie_name) else {
                continue;
            };
            let label = format!("{}:{}", Self::TYPE_NAME, cookie_name);
            check(value, spec, &label, tech, hits);
        }
    }
}

/// Meta分析器
pub struct MetaAnalyzer;

impl Analyzer for MetaAnalyzer {
    const TYPE_NAME: &'static str = "meta";

    fn analyze(tech: &Technology, page: &PageSignals<'_>, hits: &mut TechHits) {
        for (meta_name, spec) in &tech.meta {
            let Some(value) = page.bundle.meta.get(meta_name) else {
                continue;
            };
            let label = format!("{}:{}", Self::TYPE_NAME, meta_name);
            check_with_version(value, spec, &label, tech, hits);
        }
    }
}

/// DNS分析器：记录类型按大写查找，每个命中的记录值单独计数
pub struct DnsAnalyzer;

impl Analyzer for DnsAnalyzer {
    const TYPE_NAME: &'static str = "dns";

    fn analyze(tech: &Technology, page: &PageSignals<'_>, hits: &mut TechHits) {
        for (record_type, spec) in &tech.dns {
            let Some(values) = page.bundle.dns.get(&record_type.to_uppercase()) else {
                continue;
            };
            let label = format!("{}:{}", Self::TYPE_NAME, record_type);
            for value in values {
                check(value, spec, &label, tech, hits);
            }
        }
    }
}

/// 证书颁发者分析器
pub struct CertIssuerAnalyzer;

impl Analyzer for CertIssuerAnalyzer {
    const TYPE_NAME: &'static str = "certIssuer";

    fn analyze(tech: &Technology, page: &PageSignals<'_>, hits: &mut TechHits) {
        if let Some(spec) = &tech.cert_issuer {
            check(&page.bundle.cert_issuer, spec, Self::TYPE_NAME, tech, hits);
        }
    }
}

/// 按固定顺序执行全部分析器
pub fn run_all(tech: &Technology, page: &PageSignals<'_>) -> TechHits {
    let mut hits = TechHits::default();
    UrlAnalyzer::analyze(tech, page, &mut hits);
    HtmlAnalyzer::analyze(tech, page, &mut hits);
    ScriptAnalyzer::analyze(tech, page, &mut hits);
    HeaderAnalyzer::analyze(tech, page, &mut hits);
    CookieAnalyzer::analyze(tech, page, &mut hits);
    MetaAnalyzer::analyze(tech, page, &mut hits);
    DnsAnalyzer::analyze(tech, page, &mut hits);
    CertIssuerAnalyzer::analyze(tech, page, &mut hits);
    hits
}
