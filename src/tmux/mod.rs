pub mod options;
pub mod shell;

use anyhow::{bail, Context, Result};

/// The mode a pane is in. Copy-mode panes may be scrolled up into history,
/// which changes how their visible text must be captured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaneMode {
    #[default]
    Normal,
    Copy,
}

/// A read-only snapshot of a tmux pane.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaneInfo {
    pub id: String,
    pub window_id: String,
    pub width: u16,
    pub height: u16,
    pub mode: PaneMode,
    /// Lines scrolled up into history; only meaningful in copy-mode.
    pub scroll_position: i32,
    pub window_zoomed: bool,
    pub current_path: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewSessionRequest {
    pub name: String,
    /// Output format; without it new-session prints nothing.
    pub format: String,
    pub width: u16,
    pub height: u16,
    pub detached: bool,
    /// Extra environment for the command in the new session.
    pub env: Vec<(String, String)>,
    /// Command to run in the session's window. Must be non-empty when env
    /// is set.
    pub command: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapturePaneRequest {
    pub pane: String,
    /// Start and end lines of the capture. Negative lines index into
    /// history; zero means the default.
    pub start_line: i32,
    pub end_line: i32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayMessageRequest {
    pub pane: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SwapPaneRequest {
    pub source: String,
    pub destination: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResizePaneRequest {
    pub target: String,
    pub toggle_zoom: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResizeWindowRequest {
    pub window: String,
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetOptionRequest {
    pub name: String,
    pub value: String,
    pub global: bool,
}

/// Low-level access to tmux. Maps directly onto tmux commands; every
/// operation blocks until tmux replies, and errors carry tmux's own stderr
/// text. Tests substitute mock implementations.
pub trait Driver {
    /// Runs new-session and returns its (format-controlled) output.
    fn new_session(&self, req: NewSessionRequest) -> Result<String>;

    /// Runs display-message -p and returns the expanded message.
    fn display_message(&self, req: DisplayMessageRequest) -> Result<String>;

    /// Runs capture-pane -p and returns the captured text.
    fn capture_pane(&self, req: CapturePaneRequest) -> Result<String>;

    /// Lists the pane ids of a session.
    fn list_panes(&self, session: &str) -> Result<Vec<String>>;

    fn swap_pane(&self, req: SwapPaneRequest) -> Result<()>;

    fn resize_pane(&self, req: ResizePaneRequest) -> Result<()>;

    fn resize_window(&self, req: ResizeWindowRequest) -> Result<()>;

    /// Runs wait-for, blocking until a matching send_signal from any
    /// process on the same tmux server. The token namespace is global;
    /// callers are responsible for unique tokens.
    fn wait_for_signal(&self, signal: &str) -> Result<()>;

    /// Runs wait-for -S, waking anyone blocked on this signal.
    fn send_signal(&self, signal: &str) -> Result<()>;

    /// Runs show-options and returns its raw output.
    fn show_options(&self, global: bool) -> Result<String>;

    fn set_option(&self, req: SetOptionRequest) -> Result<()>;

    fn kill_session(&self, session: &str) -> Result<()>;
}

// The display-message template inspect_pane sends. Fields are tab-separated
// so the reply can be split without quoting concerns.
const INSPECT_FORMAT: &str = concat!(
    "#{pane_id}\t",
    "#{window_id}\t",
    "#{pane_width}\t",
    "#{pane_height}\t",
    "#{?pane_in_mode,#{pane_mode},normal-mode}\t",
    "#{?#{==:#{pane_mode},copy-mode},#{scroll_position},0}\t",
    "#{window_zoomed_flag}\t",
    "#{pane_current_path}",
);

/// Inspects a pane, identified by index or unique id, defaulting to the
/// current pane. Implemented on top of display-message with a tab-separated
/// format template.
pub fn inspect_pane(driver: &dyn Driver, identifier: &str) -> Result<PaneInfo> {
    let out = driver
        .display_message(DisplayMessageRequest {
            pane: identifier.to_string(),
            message: INSPECT_FORMAT.to_string(),
        })
        .with_context(|| format!("inspect pane {:?}", identifier))?;

    let line = out.trim_end_matches('\n');
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() != 8 {
        bail!("inspect pane {:?}: expected 8 fields, got {}: {:?}", identifier, parts.len(), line);
    }

    Ok(PaneInfo {
        id: parts[0].to_string(),
        window_id: parts[1].to_string(),
        width: parts[2].parse().with_context(|| format!("pane width {:?}", parts[2]))?,
        height: parts[3].parse().with_context(|| format!("pane height {:?}", parts[3]))?,
        mode: match parts[4] {
            "copy-mode" => PaneMode::Copy,
            _ => PaneMode::Normal,
        },
        scroll_position: parts[5].parse().unwrap_or(0),
        window_zoomed: parts[6] == "1",
        current_path: parts[7].to_string(),
    })
}
