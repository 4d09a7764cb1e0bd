use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::text::Text;
use ratatui::widgets::Paragraph;
use ratatui::Terminal;

use crate::widget::Widget;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the full-screen overlay until the widget completes (the handler
/// flips `done`) or the user cancels with Escape or Ctrl-C. Returns whether
/// the run was cancelled.
pub fn run(widget: &Widget, done: &AtomicBool) -> Result<bool> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let result = event_loop(&mut terminal, widget, done);

    // Best-effort teardown; the terminal must come back even if the loop
    // errored out.
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    widget: &Widget,
    done: &AtomicBool,
) -> Result<bool> {
    terminal.hide_cursor()?;

    let mut redraw = true;
    loop {
        if done.load(Ordering::SeqCst) {
            return Ok(false);
        }
        if redraw {
            terminal.draw(|f| {
                let para = Paragraph::new(Text::from(widget.render_lines()));
                f.render_widget(para, f.size());
            })?;
            redraw = false;
        }

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) => {
                let ctrl_c = matches!(key.code, KeyCode::Char('c'))
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if key.code == KeyCode::Esc || ctrl_c {
                    log::debug!("cancelled by user");
                    return Ok(true);
                }
                if widget.handle_key(key) {
                    redraw = true;
                }
            }
            Event::Resize(..) => redraw = true,
            _ => {}
        }
    }
}
