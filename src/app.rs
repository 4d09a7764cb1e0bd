use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::action;
use crate::config::Config;
use crate::matcher::MatcherSet;
use crate::tmux::{self, CapturePaneRequest, Driver, PaneMode, ResizeWindowRequest};
use crate::ui;
use crate::widget::{Selection, StyleSet, Widget, WidgetConfig};

/// The inner stage. Runs inside the detached session the wrapper created,
/// with full ownership of its window: captures the target pane, drives the
/// overlay widget, and hands the selection to the configured action. The
/// wrapper takes care of swapping this window in front of the user.
pub struct App<'a> {
    pub tmux: &'a dyn Driver,
}

impl App<'_> {
    pub fn run(&self, cfg: &mut Config) -> Result<()> {
        cfg.fill_from(&Config::defaults(&cfg.tmux));

        let target = tmux::inspect_pane(self.tmux, &cfg.pane)?;
        let my_pane = tmux::inspect_pane(self.tmux, "")?;

        // new-session's size flags don't always take; make sure our window
        // matches the target before the wrapper swaps it in.
        if my_pane.width != target.width || my_pane.height != target.height {
            let req = ResizeWindowRequest {
                window: my_pane.window_id.clone(),
                width: target.width,
                height: target.height,
            };
            if let Err(err) = self.tmux.resize_window(req) {
                log::error!("unable to resize {:?}: {:#}", my_pane.window_id, err);
            }
        }

        let mut creq = CapturePaneRequest { pane: target.id.clone(), ..CapturePaneRequest::default() };
        if target.mode == PaneMode::Copy {
            // A pane scrolled up in copy-mode captures as the bottom of its
            // history by default. Ask for the lines the user actually sees.
            creq.start_line = -target.scroll_position;
            creq.end_line = creq.start_line + i32::from(target.height) - 1;
        }
        let text = self
            .tmux
            .capture_pane(creq)
            .with_context(|| format!("capture pane {:?}", target.id))?;

        let matchers = MatcherSet::compile(&cfg.regexes)?;
        let matches = matchers.match_text(&text);
        log::debug!("found {} matches", matches.len());

        let slot: Arc<Mutex<Option<Selection>>> = Arc::new(Mutex::new(None));
        let done = Arc::new(AtomicBool::new(false));
        let handler = {
            let slot = Arc::clone(&slot);
            let done = Arc::clone(&done);
            Box::new(move |sel| {
                *slot.lock().unwrap() = Some(sel);
                done.store(true, Ordering::SeqCst);
            })
        };

        let widget = Widget::new(WidgetConfig {
            text,
            matches,
            alphabet: cfg.alphabet.clone(),
            handler,
            style: StyleSet::default(),
        });

        let cancelled = ui::run(&widget, &done)?;
        if cancelled {
            return Ok(());
        }
        let sel = match slot.lock().unwrap().take() {
            Some(sel) => sel,
            None => return Ok(()),
        };

        let action_str = if sel.shift { &cfg.shift_action } else { &cfg.action };
        if action_str.is_empty() {
            // No action configured for this selection. Nothing to do.
            return Ok(());
        }

        log::debug!("selected {:?} ({})", sel.text, sel.matchers.join(" "));
        let action = action::new(action_str, &target.current_path, &target.id)
            .with_context(|| format!("load action {:?}", action_str))?;
        action.run(&sel)
    }
}
