//! 编译后模式模型
//! 指纹中的多形态模式值（字符串/数组/对象）在加载期一次性解析为 PatternSpec，
//! 匹配热路径上不再做任何类型判断

use regex::{Captures, Regex, RegexBuilder};

/// Wappalyzer 模式元数据分隔符（`\;version:\1`、`\;confidence:50` 等）
pub const PATTERN_META_SEPARATOR: &str = "\\;";

/// 编译后的单条正则
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// 去除元数据后缀后的正则文本
    pub source: String,
    /// 编译失败时为 None，按不匹配处理
    pub regex: Option<Regex>,
    /// 原始模式为空串；仅含元数据的模式（如 `\;confidence:50`）不算空
    pub raw_empty: bool,
}

impl CompiledPattern {
    /// 剥离 `\;` 后缀并以忽略大小写方式编译
    pub fn new(raw_pattern: &str) -> Self {
        let source = strip_pattern_meta(raw_pattern).to_string();
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .ok();
        Self {
            source,
            regex,
            raw_empty: raw_pattern.is_empty(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    #[inline]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    #[inline]
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.regex.as_ref().and_then(|re| re.captures(text))
    }
}

/// 去除模式中 `\;` 及其之后的全部内容
pub fn strip_pattern_meta(raw_pattern: &str) -> &str {
    match raw_pattern.find(PATTERN_META_SEPARATOR) {
        Some(idx) => &raw_pattern[..idx],
        None => raw_pattern,
    }
}

/// 带版本模板的模式条目
#[derive(Debug, Clone)]
pub struct VersionedPattern {
    pub pattern: CompiledPattern,
    pub version_template: String,
}

/// 多形态模式规格
#[derive(Debug, Clone)]
pub enum PatternSpec {
    /// 单条正则
    Single(CompiledPattern),
    /// 有序正则列表，任一命中即可
    List(Vec<CompiledPattern>),
    /// 有序 (正则, 版本模板) 列表，保持指纹文件中的声明顺序，首个命中生效
    VersionedMap(Vec<VersionedPattern>),
}

impl PatternSpec {
    pub fn single(pattern: &str) -> Self {
        PatternSpec::Single(CompiledPattern::new(pattern))
    }

    pub fn list<S: AsRef<str>>(patterns: &[S]) -> Self {
        PatternSpec::List(patterns.iter().map(|p| CompiledPattern::new(p.as_ref())).collect())
    }

    pub fn versioned<P: AsRef<str>, V: AsRef<str>>(entries: &[(P, V)]) -> Self {
        PatternSpec::VersionedMap(
            entries
                .iter()
                .map(|(p, v)| VersionedPattern {
                    pattern: CompiledPattern::new(p.as_ref()),
                    version_template: v.as_ref().to_string(),
                })
                .collect(),
        )
    }

    /// 空规格永不匹配
    pub fn is_empty(&self) -> bool {
        match self {
            PatternSpec::Single(p) => p.raw_empty,
            PatternSpec::List(list) => list.is_empty(),
            PatternSpec::VersionedMap(entries) => entries.is_empty(),
        }
    }

    /// 按声明顺序遍历所有正则
    pub fn patterns(&self) -> PatternIter<'_> {
        match self {
            PatternSpec::Single(p) => PatternIter::Slice(std::slice::from_ref(p).iter()),
            PatternSpec::List(list) => PatternIter::Slice(list.iter()),
            PatternSpec::VersionedMap(entries) => PatternIter::Versioned(entries.iter()),
        }
    }

    pub fn pattern_count(&self) -> usize {
        match self {
            PatternSpec::Single(_) => 1,
            PatternSpec::List(list) => list.len(),
            PatternSpec::VersionedMap(entries) => entries.len(),
        }
    }

    pub fn invalid_count(&self) -> usize {
        self.patterns().filter(|p| !p.is_valid()).count()
    }
}

pub enum PatternIter<'a> {
    Slice(std::slice::Iter<'a, CompiledPattern>),
    Versioned(std::slice::Iter<'a, VersionedPattern>),
}

impl<'a> Iterator for PatternIter<'a> {
    type Item = &'a CompiledPattern;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            PatternIter::Slice(iter) => iter.next(),
            PatternIter::Versioned(iter) => iter.next().map(|entry| &entry.pattern),
        }
    }
}

/// 技术指纹（编译后）
#[derive(Debug, Clone, Default)]
pub struct Technology {
    pub name: String,
    pub url: Option<PatternSpec>,
    pub html: Option<PatternSpec>,
    pub scripts: Option<PatternSpec>,
    // 具名信号保持声明顺序
    pub headers: Vec<(String, PatternSpec)>,
    pub cookies: Vec<(String, PatternSpec)>,
    pub meta: Vec<(String, PatternSpec)>,
    pub dns: Vec<(String, PatternSpec)>,
    pub cert_issuer: Option<PatternSpec>,
    pub category_ids: Vec<String>,
}

impl Technology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 所有信号类型的正则总数
    pub fn pattern_count(&self) -> usize {
        let single = [&self.url, &self.html, &self.scripts, &self.cert_issuer]
            .into_iter()
            .flatten()
            .map(PatternSpec::pattern_count)
            .sum::<usize>();
        let keyed = [&self.headers, &self.cookies, &self.meta, &self.dns]
            .into_iter()
            .flat_map(|list| list.iter())
            .map(|(_, spec)| spec.pattern_count())
            .sum::<usize>();
        single + keyed
    }
}
