//! 版本提取工具模块
//! 负责从正则捕获结果中，根据版本模板提取技术版本号
//! 模板中的 \1..\9 引用对应捕获组；未参与匹配或为空的分组保留原样

use regex::Captures;

/// 版本提取工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 从正则捕获结果中提取版本号
    ///
    /// # 返回值
    /// - `Some(String)`: 至少有一个分组引用被替换后的版本
    /// - `None`: 模板为空 / 正则无捕获组 / 没有任何引用被替换
    ///
    /// 不含分组引用的字面量模板（如 `"2"`）同样返回 None，版本只来自捕获内容
    pub fn extract(version_template: &str, captures: &Captures) -> Option<String> {
        // 无模板或无捕获组不产生版本
        if version_template.is_empty() || captures.len() <= 1 {
            return None;
        }

        let mut version = String::with_capacity(version_template.len() + 8);
        let mut replaced = false;
        let mut chars = version_template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '\\' {
                version.push(c);
                continue;
            }

            let group_index = match chars.peek() {
                Some(&d) if ('1'..='9').contains(&d) => d.to_digit(10).unwrap_or(0) as usize,
                _ => {
                    version.push(c);
                    continue;
                }
            };
            let digit = chars.next().unwrap_or_default();

            match captures.get(group_index).map(|m| m.as_str()) {
                Some(group_text) if !group_text.is_empty() => {
                    version.push_str(group_text);
                    replaced = true;
                }
                // 分组未参与匹配或为空：保留引用原文
                _ => {
                    version.push(c);
                    version.push(digit);
                }
            }
        }

        replaced.then_some(version)
    }
}

// 单元测试
#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_extract_single_group() {
        let regex = Regex::new(r#"nginx(?:/([\d.]+))?"#).unwrap();
        let captures = regex.captures("nginx/1.21.6").unwrap();

        assert_eq!(VersionExtractor::extract("\\1", &captures), Some("1.21.6".to_string()));
    }

    #[test]
    fn test_extract_unset_group_yields_none() {
        let regex = Regex::new(r#"nginx(?:/([\d.]+))?"#).unwrap();
        let captures = regex.captures("nginx").unwrap();

        assert_eq!(VersionExtractor::extract("\\1", &captures), None);
    }

    #[test]
    fn test_extract_keeps_unresolved_tokens() {
        let regex = Regex::new(r#"app/(\d+)(?:\.(\d+))?"#).unwrap();
        let captures = regex.captures("app/3").unwrap();

        assert_eq!(VersionExtractor::extract("\\1.\\2", &captures), Some("3.\\2".to_string()));
    }

    #[test]
    fn test_extract_multi_group_template() {
        let regex = Regex::new(r#"(\w+)/v([\d.]+)-(\w+)"#).unwrap();
        let captures = regex.captures("rust/v1.75.0-stable").unwrap();

        assert_eq!(
            VersionExtractor::extract("\\1-\\2-\\3", &captures),
            Some("rust-1.75.0-stable".to_string())
        );
    }

    #[test]
    fn test_extract_without_groups_or_template() {
        let regex = Regex::new(r#"wordpress"#).unwrap();
        let captures = regex.captures("WordPress wordpress").unwrap();
        assert_eq!(VersionExtractor::extract("\\1", &captures), None);

        let regex = Regex::new(r#"wp-([\d.]+)"#).unwrap();
        let captures = regex.captures("wp-6.4").unwrap();
        assert_eq!(VersionExtractor::extract("", &captures), None);
        assert_eq!(VersionExtractor::extract("2", &captures), None);
    }

    #[test]
    fn test_extract_ignores_non_numeric_escapes() {
        let regex = Regex::new(r#"v([\d.]+)"#).unwrap();
        let captures = regex.captures("v2.0").unwrap();

        assert_eq!(VersionExtractor::extract("\\0\\x\\1", &captures), Some("\\0\\x2.0".to_string()));
    }
}
