use std::collections::HashMap;
use std::sync::RwLock;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Color, Style};
use ratatui::text::Line;

use crate::config::Alphabet;
use crate::hint::{generate_hints, AnnotationStyle, Hint};
use crate::matcher::Match;
use crate::text;

/// Display styles for the widget.
#[derive(Clone, Copy, Debug)]
pub struct StyleSet {
    pub normal: Style,
    pub matched: Style,
    pub skipped: Style,
    pub hint_label: Style,
    pub hint_label_typed: Style,
    // Multi-select mode:
    pub selected_match: Style,
    pub deselect_label: Style,
}

impl Default for StyleSet {
    fn default() -> StyleSet {
        let base = Style::default().fg(Color::White).bg(Color::Black);
        StyleSet {
            normal: base,
            matched: base.fg(Color::Green),
            skipped: base.fg(Color::DarkGray),
            hint_label: base.fg(Color::Red),
            hint_label_typed: base.fg(Color::Yellow),
            selected_match: base.fg(Color::Cyan),
            deselect_label: base.fg(Color::Magenta),
        }
    }
}

/// The user's final choice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub text: String,
    /// Names of the matchers that found this text, sorted and deduplicated.
    /// Never empty.
    pub matchers: Vec<String>,
    /// Whether Shift was held when the selection was made.
    pub shift: bool,
}

/// Receives the selection once the user picks one. May be invoked from the
/// input-processing thread; the widget never calls it while holding its own
/// lock.
pub type Handler = Box<dyn Fn(Selection) + Send + Sync>;

pub struct WidgetConfig {
    pub text: String,
    pub matches: Vec<Match>,
    pub alphabet: Alphabet,
    pub handler: Handler,
    pub style: StyleSet,
}

#[derive(Default)]
struct State {
    input: String,
    shift: bool,
    multi_select: bool,
    /// Indices of toggled hints, in toggle order.
    selected: Vec<usize>,
}

/// The fastcopy overlay widget: fixed text with labelled hints. Typing a
/// complete label selects its hint; prefix-free labels make the incremental
/// match unambiguous.
pub struct Widget {
    text: String,
    style: StyleSet,
    handler: Handler,
    hints: Vec<Hint>,
    by_label: HashMap<String, usize>,
    state: RwLock<State>,
}

impl Widget {
    pub fn new(cfg: WidgetConfig) -> Widget {
        let hints = generate_hints(&cfg.alphabet.chars(), &cfg.text, &cfg.matches);
        let by_label = hints
            .iter()
            .enumerate()
            .map(|(i, h)| (h.label.clone(), i))
            .collect();
        Widget {
            text: cfg.text,
            style: cfg.style,
            handler: cfg.handler,
            hints,
            by_label,
            state: RwLock::new(State::default()),
        }
    }

    pub fn hints(&self) -> &[Hint] {
        &self.hints
    }

    pub fn input(&self) -> String {
        self.state.read().unwrap().input.clone()
    }

    /// Handles a key event, reporting whether the widget consumed it.
    /// Escape and Ctrl-C are left to the event loop, which treats them as
    /// cancellation.
    pub fn handle_key(&self, ev: KeyEvent) -> bool {
        let mut fired = None;
        let handled = {
            let mut state = self.state.write().unwrap();
            match ev.code {
                KeyCode::Backspace => {
                    state.input.pop();
                    true
                }
                KeyCode::Tab => {
                    if state.multi_select {
                        state.multi_select = false;
                        fired = self.build_selection(&mut state);
                    } else {
                        state.multi_select = true;
                    }
                    true
                }
                KeyCode::Enter if state.multi_select => {
                    fired = self.build_selection(&mut state);
                    true
                }
                KeyCode::Char(r) => {
                    // Terminals commonly report an uppercase rune without a
                    // Shift modifier, so the rune itself is the signal.
                    if r.is_uppercase() {
                        state.shift = true;
                        state.input.extend(r.to_lowercase());
                    } else {
                        state.shift = ev.modifiers.contains(KeyModifiers::SHIFT);
                        state.input.push(r);
                    }
                    fired = self.input_changed(&mut state);
                    true
                }
                _ => false,
            }
        };

        if let Some(sel) = fired {
            (self.handler)(sel);
        }
        handled
    }

    // Prefix-free labels guarantee that an exact match on the input is
    // unambiguous: toggle that hint and clear the input. Outside of
    // multi-select mode a toggle completes the selection immediately.
    fn input_changed(&self, state: &mut State) -> Option<Selection> {
        let idx = *self.by_label.get(&state.input)?;
        match state.selected.iter().position(|&i| i == idx) {
            Some(at) => {
                state.selected.remove(at);
            }
            None => state.selected.push(idx),
        }
        state.input.clear();

        if state.multi_select {
            None
        } else {
            self.build_selection(state)
        }
    }

    // Builds the selection from the toggled hints, joined in toggle order,
    // and untoggles them. With nothing toggled there is no selection.
    fn build_selection(&self, state: &mut State) -> Option<Selection> {
        if state.selected.is_empty() {
            return None;
        }

        let mut text = String::new();
        let mut matchers: Vec<String> = Vec::new();
        for (n, &idx) in state.selected.iter().enumerate() {
            let hint = &self.hints[idx];
            if n > 0 {
                text.push(' ');
            }
            text.push_str(&hint.text);
            for m in &hint.matches {
                if !matchers.contains(&m.matcher) {
                    matchers.push(m.matcher.clone());
                }
            }
        }
        matchers.sort_unstable();
        state.selected.clear();

        Some(Selection { text, matchers, shift: state.shift })
    }

    /// Renders the annotated text. Toggled hints behave as if the input
    /// were empty so their label stays visible for deselection.
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        let state = self.state.read().unwrap();

        let mut anns = Vec::new();
        for (i, hint) in self.hints.iter().enumerate() {
            let selected = state.selected.contains(&i);
            let style = if selected {
                AnnotationStyle {
                    matched: self.style.selected_match,
                    skipped: self.style.skipped,
                    label: self.style.deselect_label,
                    label_typed: self.style.hint_label_typed,
                }
            } else {
                AnnotationStyle {
                    matched: self.style.matched,
                    skipped: self.style.skipped,
                    label: self.style.hint_label,
                    label_typed: self.style.hint_label_typed,
                }
            };
            let input = if selected { "" } else { state.input.as_str() };
            anns.extend(hint.annotations(input, &style));
        }

        text::render(&self.text, self.style.normal, anns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::config::default_regexes;
    use crate::matcher::MatcherSet;

    fn build(text: &str, alphabet: &str) -> (Widget, Arc<Mutex<Vec<Selection>>>) {
        let matches = MatcherSet::compile(&default_regexes()).unwrap().match_text(text);
        let seen: Arc<Mutex<Vec<Selection>>> = Arc::new(Mutex::new(Vec::new()));
        let handler = {
            let seen = Arc::clone(&seen);
            Box::new(move |sel| seen.lock().unwrap().push(sel))
        };
        let widget = Widget::new(WidgetConfig {
            text: text.to_string(),
            matches,
            alphabet: Alphabet::parse(alphabet).unwrap(),
            handler,
            style: StyleSet::default(),
        });
        (widget, seen)
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn press(widget: &Widget, code: KeyCode) -> bool {
        widget.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn single_select_fires_once() {
        let (widget, seen) = build("there's no place like 127.0.0.1", "abc");
        assert!(widget.handle_key(key('a')));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![Selection {
                text: "127.0.0.1".to_string(),
                matchers: vec!["ipv4".to_string()],
                shift: false,
            }]
        );
    }

    #[test]
    fn uppercase_rune_sets_shift() {
        let (widget, seen) = build("ship 127.0.0.1 now", "ab");
        widget.handle_key(key('A'));
        assert!(seen.lock().unwrap()[0].shift);
    }

    #[test]
    fn lowercase_rune_clears_shift() {
        let (widget, seen) = build("ship 127.0.0.1 now", "ab");
        widget.handle_key(key('a'));
        assert!(!seen.lock().unwrap()[0].shift);
    }

    #[test]
    fn backspace_edits_input() {
        let (widget, seen) = build("10.0.0.1 and 10.0.0.2", "ab");
        // Two hints: "10.0.0.1" -> "a", "10.0.0.2" -> "b". A wrong rune
        // followed by backspace leaves the widget usable.
        widget.handle_key(key('z'));
        assert_eq!(widget.input(), "z");
        press(&widget, KeyCode::Backspace);
        assert_eq!(widget.input(), "");
        widget.handle_key(key('b'));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "10.0.0.2");
    }

    #[test]
    fn multi_select_joins_in_toggle_order() {
        let (widget, seen) = build("10.0.0.1 and 10.0.0.2", "ab");
        press(&widget, KeyCode::Tab);
        widget.handle_key(key('b'));
        widget.handle_key(key('a'));
        press(&widget, KeyCode::Tab);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "10.0.0.2 10.0.0.1");
        assert_eq!(seen[0].matchers, vec!["ipv4".to_string()]);
    }

    #[test]
    fn multi_select_enter_confirms() {
        let (widget, seen) = build("10.0.0.1 and 10.0.0.2", "ab");
        press(&widget, KeyCode::Tab);
        widget.handle_key(key('a'));
        press(&widget, KeyCode::Enter);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn retyping_label_deselects() {
        let (widget, seen) = build("10.0.0.1 and 10.0.0.2", "ab");
        press(&widget, KeyCode::Tab);
        widget.handle_key(key('a'));
        widget.handle_key(key('a'));
        press(&widget, KeyCode::Tab);
        // Nothing toggled at confirm time: the confirm is a no-op.
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn enter_outside_multi_select_is_ignored() {
        let (widget, seen) = build("10.0.0.1", "ab");
        assert!(!press(&widget, KeyCode::Enter));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn matcher_names_union_sorted() {
        use crate::matcher::{Match, Range};

        // The same text found at different positions by different matchers
        // collapses into one hint carrying both names.
        let text = "foo bar foo";
        let matches = vec![
            Match {
                matcher: "beta".to_string(),
                full: Range { start: 8, end: 11 },
                sel: Range { start: 8, end: 11 },
            },
            Match {
                matcher: "alpha".to_string(),
                full: Range { start: 0, end: 3 },
                sel: Range { start: 0, end: 3 },
            },
        ];
        let seen: Arc<Mutex<Vec<Selection>>> = Arc::new(Mutex::new(Vec::new()));
        let handler = {
            let seen = Arc::clone(&seen);
            Box::new(move |sel| seen.lock().unwrap().push(sel))
        };
        let widget = Widget::new(WidgetConfig {
            text: text.to_string(),
            matches,
            alphabet: Alphabet::parse("ab").unwrap(),
            handler,
            style: StyleSet::default(),
        });
        widget.handle_key(key('a'));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "foo");
        assert_eq!(seen[0].matchers, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn arrows_are_not_consumed() {
        let (widget, _) = build("10.0.0.1", "ab");
        assert!(!press(&widget, KeyCode::Up));
        assert!(!press(&widget, KeyCode::Esc));
    }
}
