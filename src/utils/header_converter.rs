//! Header格式转换工具
//! HAR 名值对与检测用单值 Map 之间的转换

use std::collections::HashMap;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将名值对转换为单值 HashMap，键名小写，重名时后者覆盖前者
    pub fn to_single_value<'a, I>(pairs: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map = HashMap::new();
        for (name, value) in pairs {
            if name.is_empty() {
                continue;
            }
            map.insert(name.to_lowercase(), value.to_string());
        }
        map
    }

    /// 按原始名称查找，取不到非空值时回退到小写名称
    pub fn lookup<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
        headers
            .get(name)
            .filter(|v| !v.is_empty())
            .or_else(|| headers.get(&name.to_lowercase()).filter(|v| !v.is_empty()))
            .map(String::as_str)
    }
}
