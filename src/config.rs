use std::collections::BTreeMap;
use std::fmt;

use anyhow::{anyhow, bail, Result};

pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// The built-in regex set. An empty value in the map disables the name.
pub fn default_regexes() -> BTreeMap<String, String> {
    let defaults = [
        ("ipv4", r"\b\d{1,3}(?:\.\d{1,3}){3}\b"),
        ("gitsha", r"\b[0-9a-f]{7,40}\b"),
        ("hexaddr", r"\b(?i)0x[0-9a-f]{2,}\b"),
        ("hexcolor", r"(?i)#(?:[0-9a-f]{3}|[0-9a-f]{6})\b"),
        ("int", r"(?:-?|\b)\d{4,}\b"),
        ("path", r"(?:[^\w\-\.~/]|\A)(([\w\-\.]+|~)?(/[\w\-\.]+){2,})\b"),
        ("uuid", r"\b(?i)[0-9a-f]{8}(?:-[0-9a-f]{4}){3}-[0-9a-f]{12}\b"),
        ("isodate", r"\d{4}-\d{2}-\d{2}"),
    ];
    defaults
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The runes hint labels are built from. Valid alphabets have at least two
/// distinct runes; an empty alphabet means "not set" during config merging.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Alphabet(String);

impl Alphabet {
    pub fn parse(s: &str) -> Result<Alphabet> {
        let runes: Vec<char> = s.chars().collect();
        if runes.len() < 2 {
            bail!("alphabet must have at least two items");
        }

        let mut seen = Vec::with_capacity(runes.len());
        let mut dupes = Vec::new();
        for &r in &runes {
            if seen.contains(&r) {
                if !dupes.contains(&r) {
                    dupes.push(r);
                }
            } else {
                seen.push(r);
            }
        }
        if !dupes.is_empty() {
            dupes.sort_unstable();
            bail!("alphabet has duplicates: {:?}", dupes);
        }

        Ok(Alphabet(s.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn chars(&self) -> Vec<char> {
        self.0.chars().collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runtime configuration, merged from command-line flags, tmux global
/// options, and built-in defaults, in that priority order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub pane: String,
    pub action: String,
    pub shift_action: String,
    pub alphabet: Alphabet,
    pub verbose: bool,
    pub regexes: BTreeMap<String, String>,
    pub tmux: String,
    pub log_file: String,
}

/// Splits a `-regex NAME:PATTERN` flag value.
pub fn parse_regex_flag(v: &str) -> Result<(String, String)> {
    let (name, pattern) = v
        .split_once(':')
        .ok_or_else(|| anyhow!("regex flags must be in the form NAME:PATTERN"))?;
    if name.is_empty() {
        bail!("regex must have a name");
    }
    Ok((name.to_string(), pattern.to_string()))
}

impl Config {
    /// The defaults for everything the user left unset. The default action
    /// copies the selection into the tmux paste buffer.
    pub fn defaults(tmux: &str) -> Config {
        Config {
            action: format!("{} load-buffer -", tmux),
            alphabet: Alphabet(DEFAULT_ALPHABET.to_string()),
            regexes: default_regexes(),
            ..Config::default()
        }
    }

    /// Fills empty fields from `other` without overwriting anything already
    /// set. Regex entries merge by name, existing names win.
    pub fn fill_from(&mut self, other: &Config) {
        if self.pane.is_empty() {
            self.pane = other.pane.clone();
        }
        if self.action.is_empty() {
            self.action = other.action.clone();
        }
        if self.shift_action.is_empty() {
            self.shift_action = other.shift_action.clone();
        }
        if self.alphabet.is_empty() {
            self.alphabet = other.alphabet.clone();
        }
        if self.log_file.is_empty() {
            self.log_file = other.log_file.clone();
        }
        if self.tmux.is_empty() {
            self.tmux = other.tmux.clone();
        }
        for (k, v) in &other.regexes {
            self.regexes.entry(k.clone()).or_insert_with(|| v.clone());
        }
        self.verbose = self.verbose || other.verbose;
    }

    /// Rebuilds the argument list from which this configuration may be
    /// parsed back. This is how the outer stage hands its merged view to
    /// the inner stage.
    pub fn flags(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.pane.is_empty() {
            args.push("-pane".to_string());
            args.push(self.pane.clone());
        }
        if !self.action.is_empty() {
            args.push("-action".to_string());
            args.push(self.action.clone());
        }
        if !self.shift_action.is_empty() {
            args.push("-shift-action".to_string());
            args.push(self.shift_action.clone());
        }
        if !self.alphabet.is_empty() {
            args.push("-alphabet".to_string());
            args.push(self.alphabet.to_string());
        }
        for (name, pattern) in &self.regexes {
            args.push("-regex".to_string());
            args.push(format!("{}:{}", name, pattern));
        }
        if self.verbose {
            args.push("-verbose".to_string());
        }
        if !self.log_file.is_empty() {
            args.push("-log".to_string());
            args.push(self.log_file.clone());
        }
        if !self.tmux.is_empty() {
            args.push("-tmux".to_string());
            args.push(self.tmux.clone());
        }
        args
    }
}
