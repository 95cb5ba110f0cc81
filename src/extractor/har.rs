//! HAR 抓包解析
//! 将一次页面抓取（HAR 记录）归一化为 SignalBundle；任何读取/解析失败都返回空信号包

use std::collections::HashSet;
use std::path::Path;
use base64::Engine;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use super::html_extractor::HtmlExtractor;
use super::signal::SignalBundle;
use crate::utils::HeaderConverter;

/// null 与缺省字段一律按默认值处理
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// HAR 根对象
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarCapture {
    #[serde(default, deserialize_with = "null_as_default")]
    pub log: HarLog,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarLog {
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub request: HarRequest,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: HarResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: Vec<HarNameValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cookies: Vec<HarNameValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: HarContent,
}

/// header / cookie 名值对
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarNameValue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarContent {
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl HarEntry {
    fn mime_type(&self) -> &str {
        self.response.content.mime_type.as_deref().unwrap_or_default()
    }

    fn url(&self) -> &str {
        self.request.url.as_deref().unwrap_or_default()
    }

    fn is_html(&self) -> bool {
        self.mime_type().to_lowercase().contains("html")
    }

    fn is_script(&self) -> bool {
        self.mime_type().to_lowercase().contains("javascript") || self.url().ends_with(".js")
    }
}

/// 信号提取器
pub struct SignalExtractor;

impl SignalExtractor {
    /// 读取 HAR 文件；文件缺失或结构非法时返回空信号包
    pub fn from_path(path: impl AsRef<Path>) -> SignalBundle {
        Self::from_path_with(path, &HtmlExtractor::new())
    }

    /// 同 `from_path`，使用指定的 HTML 解析策略链
    pub fn from_path_with(path: impl AsRef<Path>, extractor: &HtmlExtractor) -> SignalBundle {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json_str_with(&text, extractor),
            Err(e) => {
                warn!("Failed to read HAR {}: {}", path.display(), e);
                SignalBundle::default()
            }
        }
    }

    pub fn from_json_str(text: &str) -> SignalBundle {
        Self::from_json_str_with(text, &HtmlExtractor::new())
    }

    fn from_json_str_with(text: &str, extractor: &HtmlExtractor) -> SignalBundle {
        match serde_json::from_str::<HarCapture>(text) {
            Ok(capture) => Self::from_capture_with(&capture, extractor),
            Err(e) => {
                warn!("Failed to parse HAR: {}", e);
                SignalBundle::default()
            }
        }
    }

    pub fn from_capture(capture: &HarCapture) -> SignalBundle {
        Self::from_capture_with(capture, &HtmlExtractor::new())
    }

    /// HTML 解析全部失败时仍返回 url、headers、cookies 与 html 原文
    pub fn from_capture_with(capture: &HarCapture, extractor: &HtmlExtractor) -> SignalBundle {
        let entries = &capture.log.entries;
        // 主条目：首个 HTML 响应，否则第一条
        let Some(main_entry) = entries.iter().find(|e| e.is_html()).or_else(|| entries.first()) else {
            return SignalBundle::default();
        };
        let response = &main_entry.response;

        let headers = HeaderConverter::to_single_value(response.headers.iter().map(|h| {
            (h.name.as_deref().unwrap_or_default(), h.value.as_deref().unwrap_or_default())
        }));

        let cookies = response
            .cookies
            .iter()
            .filter_map(|c| {
                let name = c.name.as_deref().filter(|n| !n.is_empty())?;
                Some((name.to_string(), c.value.clone().unwrap_or_default()))
            })
            .collect();

        let html = Self::decode_body(&response.content);

        let mut scripts: Vec<String> = entries
            .iter()
            .filter(|e| e.is_script() && !e.url().is_empty())
            .map(|e| e.url().to_string())
            .collect();

        let mut meta = Default::default();
        if !html.is_empty() {
            match extractor.extract(&html) {
                Some(markup) => {
                    meta = markup.meta_map();
                    scripts.extend(markup.inline_scripts);
                }
                None => debug!("HTML unparseable, skipping markup-derived signals"),
            }
        }

        SignalBundle {
            url: main_entry.url().to_string(),
            html,
            headers,
            cookies,
            scripts: dedup_keep_first(scripts),
            meta,
            ..SignalBundle::default()
        }
    }

    /// 响应正文；声明 base64 时解码，解码失败保留原文
    ///
    /// 解码前丢弃非 base64 字母表字符，兼容按行折断（CRLF）的正文
    fn decode_body(content: &HarContent) -> String {
        let text = content.text.clone().unwrap_or_default();
        if text.is_empty() || content.encoding.as_deref() != Some("base64") {
            return text;
        }
        let alphabet_only: Vec<u8> = text
            .bytes()
            .filter(|b| b.is_ascii_alphanumeric() || matches!(*b, b'+' | b'/' | b'='))
            .collect();
        match base64::engine::general_purpose::STANDARD.decode(&alphabet_only) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                debug!("Base64 body decode failed, keeping raw text: {}", e);
                text
            }
        }
    }
}

fn dedup_keep_first(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
