//! 模式匹配器：单个 PatternSpec 对单段文本的判定与版本提取

use crate::compiler::PatternSpec;
use crate::utils::VersionExtractor;

/// 模式匹配器
pub struct PatternMatcher;

impl PatternMatcher {
    /// 任一正则命中即为真；空文本、空规格、无效正则均不命中
    pub fn matches(text: &str, spec: &PatternSpec) -> bool {
        if text.is_empty() || spec.is_empty() {
            return false;
        }
        spec.patterns().any(|pattern| pattern.is_match(text))
    }

    /// 命中判定 + 版本提取
    ///
    /// 仅 VersionedMap 产生版本：按声明顺序取首个命中条目，之后的条目不再尝试
    pub fn match_with_version(text: &str, spec: &PatternSpec) -> (bool, Option<String>) {
        if text.is_empty() || spec.is_empty() {
            return (false, None);
        }

        let PatternSpec::VersionedMap(entries) = spec else {
            return (Self::matches(text, spec), None);
        };

        for entry in entries {
            let Some(captures) = entry.pattern.captures(text) else {
                continue;
            };
            let version = VersionExtractor::extract(&entry.version_template, &captures);
            return (true, version);
        }
        (false, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_list_match_case_insensitive() {
        assert!(PatternMatcher::matches("Powered by WordPress", &PatternSpec::single("wordpress")));
        assert!(PatternMatcher::matches("x-jquery-3.6", &PatternSpec::list(&["react", "jquery"])));
        assert!(!PatternMatcher::matches("vue", &PatternSpec::list(&["react", "jquery"])));
    }

    #[test]
    fn test_empty_text_or_spec_never_matches() {
        assert!(!PatternMatcher::matches("", &PatternSpec::single(".*")));
        assert!(!PatternMatcher::matches("anything", &PatternSpec::single("")));
        assert!(!PatternMatcher::matches("anything", &PatternSpec::list::<&str>(&[])));
        assert_eq!(
            PatternMatcher::match_with_version("", &PatternSpec::versioned(&[("x", "\\1")])),
            (false, None)
        );
    }

    #[test]
    fn test_meta_suffix_is_stripped() {
        let spec = PatternSpec::single("jquery\\;confidence:50");
        assert!(PatternMatcher::matches("/js/jquery.min.js", &spec));
        assert!(!PatternMatcher::matches("confidence:50", &PatternSpec::single("^jquery\\;confidence:50")));
    }

    #[test]
    fn test_meta_only_pattern_matches_any_text() {
        let raw = r"\;confidence:50";
        assert!(PatternMatcher::matches("nginx", &PatternSpec::single(raw)));
        assert_eq!(
            PatternMatcher::matches("nginx", &PatternSpec::single(raw)),
            PatternMatcher::matches("nginx", &PatternSpec::list(&[raw]))
        );
        assert!(!PatternMatcher::matches("", &PatternSpec::single(raw)));
    }

    #[test]
    fn test_invalid_regex_is_skipped() {
        let spec = PatternSpec::list(&["(unclosed", "nginx"]);
        assert!(PatternMatcher::matches("nginx", &spec));
        assert!(!PatternMatcher::matches("(unclosed", &PatternSpec::single("(unclosed")));
    }

    #[test]
    fn test_versioned_map_first_match_wins() {
        let spec = PatternSpec::versioned(&[
            ("ExampleCMS ([0-9.]+)", "\\1"),
            ("ExampleCMS (\\d+)", "major-\\1"),
        ]);
        assert_eq!(
            PatternMatcher::match_with_version("ExampleCMS 2.3", &spec),
            (true, Some("2.3".to_string()))
        );

        // 前一条无效时由后一条接手
        let spec = PatternSpec::versioned(&[("ExampleCMS ([0-9.]+", "\\1"), ("ExampleCMS (\\d+)", "major-\\1")]);
        assert_eq!(
            PatternMatcher::match_with_version("ExampleCMS 2.3", &spec),
            (true, Some("major-2".to_string()))
        );
    }

    #[test]
    fn test_versioned_map_without_groups_or_template() {
        let spec = PatternSpec::versioned(&[("examplecms", "\\1")]);
        assert_eq!(PatternMatcher::match_with_version("ExampleCMS", &spec), (true, None));

        let spec = PatternSpec::versioned(&[("examplecms ([0-9.]+)", "")]);
        assert_eq!(PatternMatcher::match_with_version("ExampleCMS 1.0", &spec), (true, None));
        assert!(PatternMatcher::matches("ExampleCMS 1.0", &spec));
    }

    #[test]
    fn test_list_never_yields_version() {
        let spec = PatternSpec::list(&["nginx/([0-9.]+)"]);
        assert_eq!(PatternMatcher::match_with_version("nginx/1.18.0", &spec), (true, None));
        assert_eq!(PatternMatcher::match_with_version("apache", &spec), (false, None));
    }
}
