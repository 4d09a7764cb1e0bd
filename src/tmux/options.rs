use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::config::{Alphabet, Config};

const OPTION_PREFIX: &str = "@fastcopy-";
const REGEX_PREFIX: &str = "@fastcopy-regex-";

/// Parsed output of `show-options`: one `name value` pair per line, values
/// unquoted.
#[derive(Debug, Default)]
pub struct Options(BTreeMap<String, String>);

/// Parses raw show-options output. Lines without a value are skipped.
pub fn parse(out: &str) -> Options {
    let mut map = BTreeMap::new();
    for line in out.lines() {
        if let Some((name, value)) = line.split_once(' ') {
            map.insert(name.to_string(), unquote(value));
        }
    }
    Options(map)
}

impl Options {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn destroy_unattached(&self) -> bool {
        self.get("destroy-unattached") == Some("on")
    }

    /// Extracts the `@fastcopy-*` options into a Config suitable for
    /// filling in under command-line flags.
    pub fn fastcopy_config(&self) -> Result<Config> {
        let mut cfg = Config::default();
        for (name, value) in &self.0 {
            if let Some(rname) = name.strip_prefix(REGEX_PREFIX) {
                if !rname.is_empty() {
                    cfg.regexes.insert(rname.to_string(), value.clone());
                }
                continue;
            }
            match name.strip_prefix(OPTION_PREFIX) {
                Some("action") => cfg.action = value.clone(),
                Some("shift-action") => cfg.shift_action = value.clone(),
                Some("alphabet") => {
                    cfg.alphabet = Alphabet::parse(value)
                        .with_context(|| format!("option {:?}", name))?;
                }
                _ => {}
            }
        }
        Ok(cfg)
    }
}

/// Strips tmux's shell-style quoting from an option value. Double-quoted
/// values process backslash escapes; single-quoted values are literal;
/// anything else is returned as is.
fn unquote(v: &str) -> String {
    let bytes = v.as_bytes();
    if bytes.len() >= 2 {
        if bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
            let inner = &v[1..v.len() - 1];
            let mut out = String::with_capacity(inner.len());
            let mut escaped = false;
            for c in inner.chars() {
                if escaped {
                    out.push(c);
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else {
                    out.push(c);
                }
            }
            return out;
        }
        if bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'' {
            return v[1..v.len() - 1].to_string();
        }
    }
    v.to_string()
}
