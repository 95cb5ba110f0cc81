//! HTML标签提取器
//! 负责从HTML中提取 script-src、内联脚本和 meta 标签
//! 按顺序尝试多种解析策略：DOM 树解析（scraper）→ 流式分词（html5ever tokenizer），
//! 前者失败时回退到后者，全部失败时返回 None

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts
};
use markup5ever::interface::Attribute;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tendril::StrTendril;
use tracing::debug;

/// 内联脚本截断长度（字符数）
pub const INLINE_SCRIPT_MAX_CHARS: usize = 500;

/// DOM 解析的最大 HTML 长度（2MB），超出后交给流式分词
pub const MAX_DOM_HTML_LEN: usize = 2 * 1024 * 1024;

static SCRIPT_SELECTOR: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("script").ok());
static META_SELECTOR: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("meta").ok());

/// 解析结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedMarkup {
    /// 带 src 的 script 标签地址，文档顺序
    pub script_srcs: Vec<String>,
    /// 无 src 的 script 标签正文，已截断
    pub inline_scripts: Vec<String>,
    /// (名称, content)，文档顺序
    pub meta_tags: Vec<(String, String)>,
}

impl ParsedMarkup {
    fn push_script(&mut self, src: Option<&str>, body: Option<String>) {
        match src.filter(|s| !s.is_empty()) {
            Some(src) => self.script_srcs.push(src.to_string()),
            None => {
                if let Some(body) = body.filter(|b| !b.is_empty()) {
                    self.inline_scripts
                        .push(body.chars().take(INLINE_SCRIPT_MAX_CHARS).collect());
                }
            }
        }
    }

    /// 名称依次取 name → property → http-equiv，名称与 content 都非空才记录
    fn push_meta(&mut self, name: Option<&str>, property: Option<&str>, http_equiv: Option<&str>, content: Option<&str>) {
        fn non_empty(v: Option<&str>) -> Option<&str> {
            v.filter(|s| !s.is_empty())
        }
        let key = non_empty(name)
            .or_else(|| non_empty(property))
            .or_else(|| non_empty(http_equiv));
        if let (Some(key), Some(content)) = (key, non_empty(content)) {
            self.meta_tags.push((key.to_string(), content.to_string()));
        }
    }

    /// meta 映射，同名时后者覆盖前者
    pub fn meta_map(&self) -> HashMap<String, String> {
        self.meta_tags.iter().cloned().collect()
    }
}

/// HTML 解析策略
pub trait MarkupParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// 无法处理时返回 None，由下一个策略接手
    fn parse(&self, html: &str) -> Option<ParsedMarkup>;
}

/// DOM 树解析（scraper）
#[derive(Debug, Clone)]
pub struct DomParser {
    pub max_len: usize,
}

impl Default for DomParser {
    fn default() -> Self {
        Self { max_len: MAX_DOM_HTML_LEN }
    }
}

impl MarkupParser for DomParser {
    fn name(&self) -> &'static str {
        "dom"
    }

    fn parse(&self, html: &str) -> Option<ParsedMarkup> {
        if html.len() > self.max_len {
            return None;
        }
        let script_selector = SCRIPT_SELECTOR.as_ref()?;
        let meta_selector = META_SELECTOR.as_ref()?;

        let document = Html::parse_document(html);
        let mut markup = ParsedMarkup::default();

        for element in document.select(script_selector) {
            let src = element.value().attr("src");
            let body = element.text().collect::<String>();
            markup.push_script(src, Some(body));
        }

        for element in document.select(meta_selector) {
            let el = element.value();
            markup.push_meta(el.attr("name"), el.attr("property"), el.attr("http-equiv"), el.attr("content"));
        }

        Some(markup)
    }
}

/// 流式分词解析（html5ever tokenizer），不建树，适合超大或畸形文档
#[derive(Debug, Clone, Default)]
pub struct TokenParser;

impl MarkupParser for TokenParser {
    fn name(&self) -> &'static str {
        "tokenizer"
    }

    fn parse(&self, html: &str) -> Option<ParsedMarkup> {
        let tokenizer = Tokenizer::new(MarkupSink::default(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        Some(tokenizer.sink.finish())
    }
}

/// 分词回调
#[derive(Debug, Default)]
struct MarkupSink {
    markup: RefCell<ParsedMarkup>,
    // 正在读取的内联脚本正文
    inline_script: RefCell<Option<String>>,
}

impl MarkupSink {
    fn attr<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
        attrs
            .iter()
            .find(|attr| attr.name.local.as_ref() == name)
            .map(|attr| &*attr.value)
    }

    fn close_inline_script(&self) {
        if let Some(body) = self.inline_script.borrow_mut().take() {
            self.markup.borrow_mut().push_script(None, Some(body));
        }
    }

    fn finish(self) -> ParsedMarkup {
        // 未闭合的内联脚本按已读内容收尾
        self.close_inline_script();
        self.markup.into_inner()
    }
}

impl TokenSink for MarkupSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(Tag { kind: TagKind::StartTag, name, attrs, .. }) => match name.as_ref() {
                "script" => {
                    self.close_inline_script();
                    match Self::attr(&attrs, "src").filter(|s| !s.is_empty()) {
                        Some(src) => self.markup.borrow_mut().push_script(Some(src), None),
                        None => *self.inline_script.borrow_mut() = Some(String::new()),
                    }
                    // 脚本正文按原始文本读取
                    return TokenSinkResult::RawData(RawKind::ScriptData);
                }
                "meta" => self.markup.borrow_mut().push_meta(
                    Self::attr(&attrs, "name"),
                    Self::attr(&attrs, "property"),
                    Self::attr(&attrs, "http-equiv"),
                    Self::attr(&attrs, "content"),
                ),
                _ => {}
            },
            Token::TagToken(Tag { kind: TagKind::EndTag, name, .. }) if name.as_ref() == "script" => {
                self.close_inline_script();
            }
            Token::CharacterTokens(text) => {
                if let Some(body) = self.inline_script.borrow_mut().as_mut() {
                    body.push_str(&text);
                }
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

/// 对外暴露的HTML提取器：有序的解析策略链
pub struct HtmlExtractor {
    parsers: Vec<Box<dyn MarkupParser>>,
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::with_parsers(vec![Box::new(DomParser::default()), Box::new(TokenParser)])
    }
}

impl std::fmt::Debug for HtmlExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.parsers.iter().map(|p| p.name()))
            .finish()
    }
}

impl HtmlExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parsers(parsers: Vec<Box<dyn MarkupParser>>) -> Self {
        Self { parsers }
    }

    /// 依次尝试各策略；解析器 panic 视同失败
    pub fn extract(&self, html: &str) -> Option<ParsedMarkup> {
        for parser in &self.parsers {
            match panic::catch_unwind(AssertUnwindSafe(|| parser.parse(html))) {
                Ok(Some(markup)) => return Some(markup),
                Ok(None) => debug!("HTML parser [{}] declined input, trying next", parser.name()),
                Err(_) => debug!("HTML parser [{}] panicked, trying next", parser.name()),
            }
        }
        debug!("All HTML parsers failed, markup-derived signals unavailable");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <!DOCTYPE html>
        <html>
        <head>
            <script src="/jquery.min.js"></script>
            <meta name="author" content="test_user">
            <meta property="og:site_name" content="Demo">
            <meta http-equiv="X-UA-Compatible" content="IE=edge">
            <meta name="generator" content="WordPress 6.0" />
            <meta name="empty" content="">
            <script src="/vue.global.js"></script>
            <script>var a = "<div>"; console.log('inline')</script>
        </head>
        </html>
    "#;

    fn assert_page(markup: &ParsedMarkup) {
        assert_eq!(markup.script_srcs, vec!["/jquery.min.js", "/vue.global.js"]);
        assert_eq!(markup.inline_scripts, vec![r#"var a = "<div>"; console.log('inline')"#]);
        assert_eq!(
            markup.meta_tags,
            vec![
                ("author".to_string(), "test_user".to_string()),
                ("og:site_name".to_string(), "Demo".to_string()),
                ("X-UA-Compatible".to_string(), "IE=edge".to_string()),
                ("generator".to_string(), "WordPress 6.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_dom_parser() {
        assert_page(&DomParser::default().parse(PAGE).unwrap());
    }

    #[test]
    fn test_token_parser() {
        assert_page(&TokenParser.parse(PAGE).unwrap());
    }

    #[test]
    fn test_inline_script_truncated() {
        let html = format!("<script>{}</script>", "x".repeat(800));
        let markup = HtmlExtractor::new().extract(&html).unwrap();
        assert_eq!(markup.inline_scripts[0].chars().count(), INLINE_SCRIPT_MAX_CHARS);
    }

    #[test]
    fn test_falls_back_when_dom_declines() {
        let extractor = HtmlExtractor::with_parsers(vec![
            Box::new(DomParser { max_len: 4 }),
            Box::new(TokenParser),
        ]);
        let markup = extractor.extract(PAGE).unwrap();
        assert_eq!(markup.script_srcs.len(), 2);
    }

    #[test]
    fn test_all_parsers_fail() {
        let extractor = HtmlExtractor::with_parsers(vec![Box::new(DomParser { max_len: 0 })]);
        assert!(extractor.extract(PAGE).is_none());
    }

    #[test]
    fn test_meta_map_last_wins() {
        let markup = TokenParser
            .parse(r#"<meta name="generator" content="A"><meta name="generator" content="B">"#)
            .unwrap();
        assert_eq!(markup.meta_map()["generator"], "B");
    }

    #[test]
    fn test_meta_empty_name_falls_through() {
        let html = r#"<meta name="" property="og:title" content="Demo"><meta name="x" content="">"#;
        for markup in [DomParser::default().parse(html).unwrap(), TokenParser.parse(html).unwrap()] {
            assert_eq!(markup.meta_tags, vec![("og:title".to_string(), "Demo".to_string())]);
        }
    }
}
