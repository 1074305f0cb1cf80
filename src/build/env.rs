//! 构建环境变量与宏展开

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// `${NAME}` 或 `$NAME`
static MACRO_PATTERN: OnceLock<Regex> = OnceLock::new();

fn macro_pattern() -> &'static Regex {
    MACRO_PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z0-9_][A-Za-z0-9_.]*)\}|\$([A-Za-z0-9_][A-Za-z0-9_]*)").unwrap()
    })
}

/// 一次构建的环境变量快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// 合并另一份环境变量，同名时以 `other` 为准
    pub fn extend(&mut self, other: EnvVars) {
        self.0.extend(other.0);
    }

    /// 展开模板中的 `$NAME` / `${NAME}`，未定义的变量原样保留
    pub fn expand(&self, template: &str) -> String {
        macro_pattern()
            .replace_all(template, |caps: &Captures| {
                let key = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.0.get(key) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// 解析 `KEY=VALUE` 行（`env` 命令的输出格式），忽略空行和 `#` 注释
    pub fn parse_lines(content: &str) -> Self {
        let mut vars = Self::new();
        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if !key.is_empty() {
                    vars.insert(key, value);
                }
            }
        }
        vars
    }
}

impl FromIterator<(String, String)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for EnvVars {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}
