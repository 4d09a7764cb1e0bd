use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::tail::LogTail;
use crate::tmux::{
    self, options, Driver, NewSessionRequest, PaneInfo, ResizePaneRequest, ResizeWindowRequest,
    SetOptionRequest, SwapPaneRequest,
};

/// Environment variable marking a process as the inner stage; holds the
/// outer stage's pid.
pub const WRAPPED_BY_ENV: &str = "TMUX_FASTCOPY_WRAPPED_BY";

/// Prefix of the wait-for token both stages rendezvous on. The full token
/// appends the outer stage's pid; tmux's signal namespace is global, so the
/// pid keeps concurrent invocations apart.
pub const SIGNAL_PREFIX: &str = "TMUX_FASTCOPY_WRAPPER_";

const DESTROY_UNATTACHED: &str = "destroy-unattached";

/// The outer stage. Re-runs this binary inside a throwaway detached tmux
/// session sized like the target pane, swaps that session's pane in place
/// of the target so the overlay appears atomically, and blocks on the
/// rendezvous signal until the inner stage finishes. Everything the setup
/// changed is restored on the way out, error or not.
pub struct Wrapper<'a> {
    pub tmux: &'a dyn Driver,
    pub executable: PathBuf,
    pub pid: u32,
}

impl Wrapper<'_> {
    pub fn run(&self, cfg: &mut Config) -> Result<()> {
        // Disambiguate the pane identifier into a pane ID, unique across
        // sessions.
        let target = tmux::inspect_pane(self.tmux, &cfg.pane)?;
        cfg.pane = target.id.clone();

        let opts = options::parse(&self.tmux.show_options(true).context("load options")?);
        let tmux_cfg = opts.fastcopy_config().context("load options")?;

        // The inner stage logs to a temp file we tail until it exits; its
        // stderr is otherwise lost inside the detached session. Overriding
        // any user-set log path here is intentional, the wrapper reproduces
        // the lines into its own sink.
        let tmp = NamedTempFile::new().context("create temp log")?;
        cfg.log_file = tmp.path().display().to_string();
        cfg.fill_from(&tmux_cfg);

        let tail = LogTail::start(tmp.path());

        // destroy-unattached would reap the detached session the moment it
        // starts. Park it while the overlay lives.
        let destroy_unattached = opts.destroy_unattached();
        let result = if destroy_unattached {
            self.set_destroy_unattached("off")
                .context("disable destroy-unattached")
                .and_then(|()| self.overlay(cfg, &target))
        } else {
            self.overlay(cfg, &target)
        };

        if destroy_unattached {
            if let Err(err) = self.set_destroy_unattached("on") {
                log::error!("restore {}: {:#}", DESTROY_UNATTACHED, err);
            }
        }

        let captured = tail.stop();
        match (result, captured) {
            (Err(err), _) => Err(err),
            // The inner stage died screaming; its panic line is the error.
            (Ok(()), Some(line)) => Err(anyhow!("{}", line)),
            (Ok(()), None) => Ok(()),
        }
    }

    fn set_destroy_unattached(&self, value: &str) -> Result<()> {
        self.tmux.set_option(SetOptionRequest {
            name: DESTROY_UNATTACHED.to_string(),
            value: value.to_string(),
            global: true,
        })
    }

    // Spawns the inner stage, swaps it in, waits for its signal, and swaps
    // back. Once the swap-in has happened every exit path restores the
    // original layout.
    fn overlay(&self, cfg: &Config, target: &PaneInfo) -> Result<()> {
        let mut command = vec![self.executable.display().to_string()];
        command.extend(cfg.flags());

        let session = self
            .tmux
            .new_session(NewSessionRequest {
                format: "#{session_id}".to_string(),
                width: target.width,
                height: target.height,
                detached: true,
                env: vec![(WRAPPED_BY_ENV.to_string(), self.pid.to_string())],
                command,
                ..NewSessionRequest::default()
            })
            .context("start tmux session")?;
        let session = session.trim().to_string();

        let overlay = match self.overlay_pane(&session, target) {
            Ok(pane) => pane,
            Err(err) => {
                let _ = self.tmux.kill_session(&session);
                return Err(err);
            }
        };

        if let Err(err) = self.tmux.swap_pane(SwapPaneRequest {
            source: target.id.clone(),
            destination: overlay.id.clone(),
        }) {
            let _ = self.tmux.kill_session(&session);
            return Err(err).context("swap in overlay");
        }

        // Zoomed windows stay zoomed: toggle the overlay in now and the
        // target back after the swap-back.
        if target.window_zoomed {
            let _ = self.tmux.resize_pane(ResizePaneRequest {
                target: overlay.id.clone(),
                toggle_zoom: true,
            });
        }

        let waited = self
            .tmux
            .wait_for_signal(&format!("{}{}", SIGNAL_PREFIX, self.pid));

        if target.window_zoomed {
            let _ = self.tmux.resize_pane(ResizePaneRequest {
                target: target.id.clone(),
                toggle_zoom: true,
            });
        }
        let _ = self.tmux.swap_pane(SwapPaneRequest {
            source: overlay.id,
            destination: target.id.clone(),
        });

        waited
    }

    // Finds the new session's sole pane and forces its window to the
    // target's size. new-session's size flags don't always take, and a
    // wrongly sized window flickers when swapped in.
    fn overlay_pane(&self, session: &str, target: &PaneInfo) -> Result<PaneInfo> {
        let panes = self.tmux.list_panes(session).context("list panes")?;
        if panes.len() != 1 {
            bail!("expected 1 pane, got {}: {}", panes.len(), panes.join(", "));
        }

        let pane = tmux::inspect_pane(self.tmux, &panes[0])?;
        if pane.width != target.width || pane.height != target.height {
            let req = ResizeWindowRequest {
                window: pane.window_id.clone(),
                width: target.width,
                height: target.height,
            };
            if let Err(err) = self.tmux.resize_window(req) {
                // Not the end of the world. Keep going.
                log::error!("unable to resize {:?}: {:#}", pane.window_id, err);
            }
        }
        Ok(pane)
    }
}
