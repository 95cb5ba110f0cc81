//! 信号包：一次页面抓取归一化后的全部可观测信号，检测引擎的唯一输入

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalBundle {
    pub url: String,
    pub html: String,
    /// 键名按小写存储，查找时兼容原始大小写
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    /// 外部脚本 URL 与内联脚本片段，有序去重
    pub scripts: Vec<String>,
    pub meta: HashMap<String, String>,
    /// 记录类型 → 记录值列表
    pub dns: HashMap<String, Vec<String>>,
    #[serde(rename = "certIssuer")]
    pub cert_issuer: String,
}

impl SignalBundle {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.scripts.push(script.into());
        self
    }

    pub fn with_meta(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.meta.insert(name.into(), content.into());
        self
    }

    pub fn with_dns(mut self, record_type: impl Into<String>, values: Vec<String>) -> Self {
        self.dns.insert(record_type.into(), values);
        self
    }

    pub fn with_cert_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.cert_issuer = issuer.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_deserializes_partial_json() {
        let bundle: SignalBundle = serde_json::from_str(
            r#"{"url": "https://example.com", "certIssuer": "Let's Encrypt", "dns": {"TXT": ["v=spf1"]}}"#,
        )
        .unwrap();

        assert_eq!(bundle.url, "https://example.com");
        assert_eq!(bundle.cert_issuer, "Let's Encrypt");
        assert_eq!(bundle.dns["TXT"], vec!["v=spf1".to_string()]);
        assert!(bundle.html.is_empty());
        assert!(bundle.scripts.is_empty());
    }

    #[test]
    fn test_default_bundle_is_empty() {
        assert!(SignalBundle::default().is_empty());
        assert!(!SignalBundle::new("https://a.test", "").is_empty());
    }
}
