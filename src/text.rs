use std::mem;

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// A positioned change to how a slice of the text renders. Annotations must
/// not overlap; the renderer drops any that do.
#[derive(Clone, Debug)]
pub enum TextAnnotation {
    /// Re-styles `len` bytes of the underlying text starting at `offset`.
    Style { offset: usize, len: usize, style: Style },
    /// Draws `text` over the underlying text starting at `offset`.
    Overlay { offset: usize, text: String, style: Style },
}

impl TextAnnotation {
    fn offset(&self) -> usize {
        match self {
            TextAnnotation::Style { offset, .. } => *offset,
            TextAnnotation::Overlay { offset, .. } => *offset,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            TextAnnotation::Style { len, .. } => *len == 0,
            TextAnnotation::Overlay { text, .. } => text.is_empty(),
        }
    }
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
}

impl LineBuilder {
    fn push(&mut self, s: &str, style: Style) {
        for (i, part) in s.split('\n').enumerate() {
            if i > 0 {
                self.lines.push(Line::from(mem::take(&mut self.current)));
            }
            if !part.is_empty() {
                self.current.push(Span::styled(part.to_string(), style));
            }
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.lines.push(Line::from(self.current));
        self.lines
    }
}

/// Renders the text with the given annotations applied on top, one ratatui
/// line per text line.
pub fn render(text: &str, base: Style, mut anns: Vec<TextAnnotation>) -> Vec<Line<'static>> {
    anns.sort_by_key(TextAnnotation::offset);

    let mut out = LineBuilder::default();
    let mut last = 0;
    for ann in anns {
        // Zero-length annotations and anything overlapping the previous
        // annotation are skipped.
        if ann.is_empty() || ann.offset() < last || ann.offset() > text.len() {
            continue;
        }
        out.push(&text[last..ann.offset()], base);

        match ann {
            TextAnnotation::Style { offset, len, style } => {
                let end = (offset + len).min(text.len());
                out.push(&text[offset..end], style);
                last = end;
            }
            TextAnnotation::Overlay { offset, text: overlay, style } => {
                // The overlay covers as many underlying columns as it is
                // wide, stopping at the end of the line. Covering half of a
                // wide character leaves a pad space so later columns don't
                // shift.
                let want = UnicodeWidthStr::width(overlay.as_str());
                let mut got = 0;
                let mut end = offset;
                for (i, ch) in text[offset..].char_indices() {
                    if got >= want || ch == '\n' {
                        break;
                    }
                    got += UnicodeWidthChar::width(ch).unwrap_or(0);
                    end = offset + i + ch.len_utf8();
                }
                out.push(&overlay, style);
                if got > want {
                    out.push(&" ".repeat(got - want), base);
                }
                last = end;
            }
        }
    }
    out.push(&text[last..], base);
    out.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    fn spans(line: &Line<'_>) -> Vec<(String, Style)> {
        line.spans.iter().map(|s| (s.content.to_string(), s.style)).collect()
    }

    #[test]
    fn plain_text_splits_lines() {
        let base = Style::default();
        let lines = render("one\ntwo\n", base, Vec::new());
        assert_eq!(lines.len(), 3);
        assert_eq!(spans(&lines[0]), vec![("one".to_string(), base)]);
        assert_eq!(spans(&lines[1]), vec![("two".to_string(), base)]);
        assert!(lines[2].spans.is_empty());
    }

    #[test]
    fn style_annotation_recolors_a_slice() {
        let base = Style::default();
        let green = Style::default().fg(Color::Green);
        let lines = render(
            "hello world",
            base,
            vec![TextAnnotation::Style { offset: 6, len: 5, style: green }],
        );
        assert_eq!(
            spans(&lines[0]),
            vec![("hello ".to_string(), base), ("world".to_string(), green)]
        );
    }

    #[test]
    fn overlay_replaces_underlying_text() {
        let base = Style::default();
        let red = Style::default().fg(Color::Red);
        let lines = render(
            "hello world",
            base,
            vec![TextAnnotation::Overlay { offset: 0, text: "ab".to_string(), style: red }],
        );
        assert_eq!(
            spans(&lines[0]),
            vec![("ab".to_string(), red), ("llo world".to_string(), base)]
        );
    }

    #[test]
    fn overlay_pads_over_wide_characters() {
        let base = Style::default();
        let red = Style::default().fg(Color::Red);
        // "你" is two columns wide; a one-column overlay leaves a pad space.
        let lines = render(
            "你好",
            base,
            vec![TextAnnotation::Overlay { offset: 0, text: "a".to_string(), style: red }],
        );
        assert_eq!(
            spans(&lines[0]),
            vec![
                ("a".to_string(), red),
                (" ".to_string(), base),
                ("好".to_string(), base),
            ]
        );
    }

    #[test]
    fn overlapping_annotations_are_dropped() {
        let base = Style::default();
        let green = Style::default().fg(Color::Green);
        let lines = render(
            "abcdef",
            base,
            vec![
                TextAnnotation::Style { offset: 0, len: 4, style: green },
                TextAnnotation::Style { offset: 2, len: 2, style: green },
            ],
        );
        assert_eq!(
            spans(&lines[0]),
            vec![("abcd".to_string(), green), ("ef".to_string(), base)]
        );
    }

    #[test]
    fn annotations_apply_across_lines() {
        let base = Style::default();
        let green = Style::default().fg(Color::Green);
        let lines = render(
            "a\nbb\nc",
            base,
            vec![TextAnnotation::Style { offset: 2, len: 2, style: green }],
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(spans(&lines[1]), vec![("bb".to_string(), green)]);
    }
}
