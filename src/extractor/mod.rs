//! 提取模块：从原始抓包中提取检测所需信号
pub mod signal;
pub mod html_extractor;
pub mod har;

pub use self::signal::SignalBundle;
pub use self::html_extractor::{DomParser, HtmlExtractor, MarkupParser, ParsedMarkup, TokenParser};
pub use self::har::{HarCapture, SignalExtractor};
