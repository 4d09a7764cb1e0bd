use std::collections::BTreeMap;

use ratatui::style::Style;

use crate::huffman;
use crate::matcher::Match;
use crate::text::TextAnnotation;

/// A labelled group of matches whose selected text is byte-identical. The
/// user types the label once to select that text.
#[derive(Clone, Debug)]
pub struct Hint {
    pub label: String,
    pub text: String,
    pub matches: Vec<Match>,
}

/// Generates one hint per unique selected text, with prefix-free labels
/// assigned so the most frequently matched texts get the shortest labels.
/// Unique texts are labelled in lexicographic order, keeping output
/// deterministic across runs.
pub fn generate_hints(alphabet: &[char], text: &str, matches: &[Match]) -> Vec<Hint> {
    let mut by_text: BTreeMap<&str, Vec<Match>> = BTreeMap::new();
    for m in matches {
        by_text.entry(&text[m.sel.start..m.sel.end]).or_default().push(m.clone());
    }

    let freqs: Vec<u64> = by_text.values().map(|ms| ms.len() as u64).collect();
    let labels = huffman::label(alphabet.len(), &freqs);

    by_text
        .into_iter()
        .zip(labels)
        .map(|((text, matches), indexes)| Hint {
            label: indexes.iter().map(|&ix| alphabet[ix]).collect(),
            text: text.to_string(),
            matches,
        })
        .collect()
}

/// Styles a hint's annotations are drawn with. The widget swaps these out
/// for the deselect variants when a hint is toggled in multi-select mode.
pub struct AnnotationStyle {
    pub matched: Style,
    pub skipped: Style,
    pub label: Style,
    pub label_typed: Style,
}

impl Hint {
    /// Produces the annotations for this hint given the user's partial
    /// input. While the input is still a prefix of the label, the label is
    /// overlaid on each matched position (typed part styled differently)
    /// and the rest of the match is highlighted; otherwise the whole match
    /// fades to the skipped style.
    pub fn annotations(&self, input: &str, style: &AnnotationStyle) -> Vec<TextAnnotation> {
        let matched = self.label.starts_with(input);
        let match_style = if matched { style.matched } else { style.skipped };

        let mut anns = Vec::new();
        for m in &self.matches {
            let mut start = m.sel.start;
            if matched {
                if !input.is_empty() {
                    anns.push(TextAnnotation::Overlay {
                        offset: start,
                        text: input.to_string(),
                        style: style.label_typed,
                    });
                }
                if input.len() < self.label.len() {
                    anns.push(TextAnnotation::Overlay {
                        offset: start + input.len(),
                        text: self.label[input.len()..].to_string(),
                        style: style.label,
                    });
                }
                start += self.label.len();
            }

            // Whatever the label didn't cover renders as matched text.
            if m.sel.end > start {
                anns.push(TextAnnotation::Style {
                    offset: start,
                    len: m.sel.end - start,
                    style: match_style,
                });
            }
        }
        anns
    }
}
