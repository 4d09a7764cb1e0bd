use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;

/// A half-open `[start, end)` byte range into the captured text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// A single region found by a named matcher. `full` is the whole regex match
/// and is what overlap resolution operates on; `sel` is the portion the user
/// copies (capture group 1 if the regex has one, the whole match otherwise).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub matcher: String,
    pub full: Range,
    pub sel: Range,
}

#[derive(Debug)]
struct RegexMatcher {
    name: String,
    regex: Regex,
    use_group: bool,
}

/// A compiled set of named matchers.
#[derive(Debug)]
pub struct MatcherSet {
    matchers: Vec<RegexMatcher>,
}

impl MatcherSet {
    /// Compiles the given name => pattern map. An empty pattern disables the
    /// named matcher. Any pattern that fails to compile aborts the whole set.
    /// Matchers are kept in name order so ties during overlap resolution are
    /// deterministic.
    pub fn compile(regexes: &BTreeMap<String, String>) -> Result<MatcherSet> {
        let mut matchers = Vec::with_capacity(regexes.len());
        for (name, pattern) in regexes {
            if pattern.is_empty() {
                continue;
            }
            let regex = Regex::new(pattern)
                .with_context(|| format!("compile regex {:?}", name))?;
            matchers.push(RegexMatcher {
                name: name.clone(),
                use_group: regex.captures_len() > 1,
                regex,
            });
        }
        Ok(MatcherSet { matchers })
    }

    /// Runs every matcher over the text and resolves overlaps across
    /// matchers: earliest start wins, then longest match, then the matcher
    /// found first. The result is ordered by start offset and contains no
    /// two entries whose full ranges overlap.
    pub fn match_text(&self, text: &str) -> Vec<Match> {
        let mut matches = Vec::new();
        for m in &self.matchers {
            for caps in m.regex.captures_iter(text) {
                let whole = caps.get(0).unwrap();
                let full = Range { start: whole.start(), end: whole.end() };
                let sel = if m.use_group {
                    caps.get(1)
                        .map(|g| Range { start: g.start(), end: g.end() })
                        .unwrap_or(full)
                } else {
                    full
                };
                matches.push(Match { matcher: m.name.clone(), full, sel });
            }
        }
        remove_overlaps(matches)
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

fn remove_overlaps(mut matches: Vec<Match>) -> Vec<Match> {
    if matches.len() < 2 {
        return matches;
    }

    // Starts earliest, then runs longest. The sort is stable, so equal
    // candidates keep discovery order.
    matches.sort_by(|a, b| {
        a.full
            .start
            .cmp(&b.full.start)
            .then(b.full.len().cmp(&a.full.len()))
    });

    let mut out: Vec<Match> = Vec::with_capacity(matches.len());
    for m in matches {
        match out.last() {
            Some(last) if m.full.start < last.full.end => continue,
            _ => out.push(m),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_regexes;

    fn compile_defaults() -> MatcherSet {
        MatcherSet::compile(&default_regexes()).unwrap()
    }

    fn texts<'a>(text: &'a str, ms: &[Match]) -> Vec<(&'a str, String)> {
        ms.iter()
            .map(|m| (&text[m.sel.start..m.sel.end], m.matcher.clone()))
            .collect()
    }

    #[test]
    fn ipv4_in_prose() {
        let text = "there's no place like 127.0.0.1";
        let ms = compile_defaults().match_text(text);
        assert_eq!(texts(text, &ms), vec![("127.0.0.1", "ipv4".to_string())]);
    }

    #[test]
    fn custom_regex_with_word_boundaries() {
        let mut regexes = BTreeMap::new();
        regexes.insert("phab-diff".to_string(), r"\bD\d{3,}\b".to_string());
        let set = MatcherSet::compile(&regexes).unwrap();
        let text = "applied D1234567 to the repo";
        let ms = set.match_text(text);
        assert_eq!(texts(text, &ms), vec![("D1234567", "phab-diff".to_string())]);
    }

    #[test]
    fn uuid_beats_inner_matches() {
        let text = "a13bbde2-2fab-40a3-b00c-949ac6ebdd79 425a6a91";
        let ms = compile_defaults().match_text(text);
        assert_eq!(
            texts(text, &ms),
            vec![
                ("a13bbde2-2fab-40a3-b00c-949ac6ebdd79", "uuid".to_string()),
                ("425a6a91", "gitsha".to_string()),
            ]
        );
    }

    #[test]
    fn capture_group_selects_subrange() {
        let mut regexes = BTreeMap::new();
        regexes.insert("short-sha".to_string(), r"\b([0-9a-f]{7})[0-9a-f]{5,33}\b".to_string());
        let set = MatcherSet::compile(&regexes).unwrap();
        let text = "commit 01234567deadbeef done";
        let ms = set.match_text(text);
        assert_eq!(ms.len(), 1);
        assert_eq!(&text[ms[0].sel.start..ms[0].sel.end], "0123456");
        assert_eq!(&text[ms[0].full.start..ms[0].full.end], "01234567deadbeef");
    }

    #[test]
    fn empty_pattern_disables_matcher() {
        let mut regexes = default_regexes();
        regexes.insert("ipv4".to_string(), String::new());
        let set = MatcherSet::compile(&regexes).unwrap();
        let ms = set.match_text("see 127.0.0.1");
        assert!(texts("see 127.0.0.1", &ms).iter().all(|(_, m)| m != "ipv4"));
    }

    #[test]
    fn bad_regex_names_the_offender() {
        let mut regexes = BTreeMap::new();
        regexes.insert("broken".to_string(), "(".to_string());
        let err = MatcherSet::compile(&regexes).unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }

    #[test]
    fn no_two_matches_overlap() {
        let text = "0x1234abcd 2021-01-02 /usr/local/bin/tmux 1234567 \
                    #ff00ff 10.0.0.1 0x1234abcd";
        let ms = compile_defaults().match_text(text);
        for w in ms.windows(2) {
            assert!(w[0].full.end <= w[1].full.start, "{:?} overlaps {:?}", w[0], w[1]);
        }
    }
}
