use std::process::Command;

use anyhow::{anyhow, bail, Result};

use super::{
    CapturePaneRequest, DisplayMessageRequest, Driver, NewSessionRequest, ResizePaneRequest,
    ResizeWindowRequest, SetOptionRequest, SwapPaneRequest,
};

const DEFAULT_TMUX: &str = "tmux";
const DEFAULT_ENV: &str = "/usr/bin/env";

/// A Driver that shells out to the tmux binary.
pub struct ShellDriver {
    path: String,
    env: String,
}

impl ShellDriver {
    pub fn new(path: &str) -> ShellDriver {
        ShellDriver {
            path: if path.is_empty() { DEFAULT_TMUX.to_string() } else { path.to_string() },
            env: DEFAULT_ENV.to_string(),
        }
    }

    fn run(&self, args: &[String]) -> Result<String> {
        log::debug!("tmux {}", args.join(" "));
        let out = Command::new(&self.path)
            .args(args)
            .output()
            .map_err(|e| anyhow!("run {}: {}", self.path, e))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            bail!("tmux {}: {}", args.first().map(String::as_str).unwrap_or(""), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

// Argument construction is split out per command so tests can check it
// without a tmux server around.

fn new_session_args(env_cmd: &str, req: &NewSessionRequest) -> Result<Vec<String>> {
    let mut args = vec!["new-session".to_string()];
    if !req.name.is_empty() {
        args.push("-s".to_string());
        args.push(req.name.clone());
    }
    if !req.format.is_empty() {
        args.push("-P".to_string());
        args.push("-F".to_string());
        args.push(req.format.clone());
    }
    if req.width > 0 {
        args.push("-x".to_string());
        args.push(req.width.to_string());
    }
    if req.height > 0 {
        args.push("-y".to_string());
        args.push(req.height.to_string());
    }
    if req.detached {
        args.push("-d".to_string());
    }

    // tmux grew `-e` for environment variables only in 3.2. Spelling it as
    //   /usr/bin/env K=V ... cmd args...
    // works everywhere.
    if !req.env.is_empty() {
        if req.command.is_empty() {
            bail!("env can be set only if command is set");
        }
        args.push(env_cmd.to_string());
        for (k, v) in &req.env {
            args.push(format!("{}={}", k, v));
        }
    }
    args.extend(req.command.iter().cloned());
    Ok(args)
}

fn capture_pane_args(req: &CapturePaneRequest) -> Vec<String> {
    let mut args = vec!["capture-pane".to_string(), "-p".to_string(), "-J".to_string()];
    if !req.pane.is_empty() {
        args.push("-t".to_string());
        args.push(req.pane.clone());
    }
    if req.start_line != 0 {
        args.push("-S".to_string());
        args.push(req.start_line.to_string());
    }
    if req.end_line != 0 {
        args.push("-E".to_string());
        args.push(req.end_line.to_string());
    }
    args
}

fn display_message_args(req: &DisplayMessageRequest) -> Vec<String> {
    let mut args = vec!["display-message".to_string(), "-p".to_string()];
    if !req.pane.is_empty() {
        args.push("-t".to_string());
        args.push(req.pane.clone());
    }
    args.push(req.message.clone());
    args
}

fn swap_pane_args(req: &SwapPaneRequest) -> Vec<String> {
    let mut args = vec!["swap-pane".to_string(), "-t".to_string(), req.destination.clone()];
    if !req.source.is_empty() {
        args.push("-s".to_string());
        args.push(req.source.clone());
    }
    args
}

fn resize_pane_args(req: &ResizePaneRequest) -> Vec<String> {
    let mut args = vec!["resize-pane".to_string(), "-t".to_string(), req.target.clone()];
    if req.toggle_zoom {
        args.push("-Z".to_string());
    }
    args
}

fn resize_window_args(req: &ResizeWindowRequest) -> Vec<String> {
    let mut args = vec!["resize-window".to_string()];
    if !req.window.is_empty() {
        args.push("-t".to_string());
        args.push(req.window.clone());
    }
    if req.width > 0 {
        args.push("-x".to_string());
        args.push(req.width.to_string());
    }
    if req.height > 0 {
        args.push("-y".to_string());
        args.push(req.height.to_string());
    }
    args
}

fn set_option_args(req: &SetOptionRequest) -> Vec<String> {
    let mut args = vec!["set-option".to_string()];
    if req.global {
        args.push("-g".to_string());
    }
    args.push(req.name.clone());
    args.push(req.value.clone());
    args
}

impl Driver for ShellDriver {
    fn new_session(&self, req: NewSessionRequest) -> Result<String> {
        self.run(&new_session_args(&self.env, &req)?)
    }

    fn display_message(&self, req: DisplayMessageRequest) -> Result<String> {
        self.run(&display_message_args(&req))
    }

    fn capture_pane(&self, req: CapturePaneRequest) -> Result<String> {
        self.run(&capture_pane_args(&req))
    }

    fn list_panes(&self, session: &str) -> Result<Vec<String>> {
        let out = self.run(&[
            "list-panes".to_string(),
            "-t".to_string(),
            session.to_string(),
            "-F".to_string(),
            "#{pane_id}".to_string(),
        ])?;
        Ok(out.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    fn swap_pane(&self, req: SwapPaneRequest) -> Result<()> {
        self.run(&swap_pane_args(&req)).map(drop)
    }

    fn resize_pane(&self, req: ResizePaneRequest) -> Result<()> {
        self.run(&resize_pane_args(&req)).map(drop)
    }

    fn resize_window(&self, req: ResizeWindowRequest) -> Result<()> {
        self.run(&resize_window_args(&req)).map(drop)
    }

    fn wait_for_signal(&self, signal: &str) -> Result<()> {
        self.run(&["wait-for".to_string(), signal.to_string()]).map(drop)
    }

    fn send_signal(&self, signal: &str) -> Result<()> {
        self.run(&["wait-for".to_string(), "-S".to_string(), signal.to_string()]).map(drop)
    }

    fn show_options(&self, global: bool) -> Result<String> {
        let mut args = vec!["show-options".to_string()];
        if global {
            args.push("-g".to_string());
        }
        self.run(&args)
    }

    fn set_option(&self, req: SetOptionRequest) -> Result<()> {
        self.run(&set_option_args(&req)).map(drop)
    }

    fn kill_session(&self, session: &str) -> Result<()> {
        self.run(&["kill-session".to_string(), "-t".to_string(), session.to_string()]).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_builds_env_prefix() {
        let req = NewSessionRequest {
            format: "#{session_id}".to_string(),
            width: 80,
            height: 24,
            detached: true,
            env: vec![("TMUX_FASTCOPY_WRAPPED_BY".to_string(), "42".to_string())],
            command: vec!["/bin/fastcopy".to_string(), "-verbose".to_string()],
            ..NewSessionRequest::default()
        };
        let args = new_session_args("/usr/bin/env", &req).unwrap();
        assert_eq!(
            args,
            vec![
                "new-session", "-P", "-F", "#{session_id}", "-x", "80", "-y", "24", "-d",
                "/usr/bin/env", "TMUX_FASTCOPY_WRAPPED_BY=42", "/bin/fastcopy", "-verbose",
            ]
        );
    }

    #[test]
    fn new_session_env_requires_command() {
        let req = NewSessionRequest {
            env: vec![("K".to_string(), "V".to_string())],
            ..NewSessionRequest::default()
        };
        assert!(new_session_args("/usr/bin/env", &req).is_err());
    }

    #[test]
    fn capture_pane_passes_history_positions() {
        let req = CapturePaneRequest {
            pane: "%2".to_string(),
            start_line: -17,
            end_line: 6,
        };
        assert_eq!(
            capture_pane_args(&req),
            vec!["capture-pane", "-p", "-J", "-t", "%2", "-S", "-17", "-E", "6"]
        );
    }

    #[test]
    fn capture_pane_defaults_to_visible_screen() {
        let req = CapturePaneRequest { pane: "%2".to_string(), ..CapturePaneRequest::default() };
        assert_eq!(capture_pane_args(&req), vec!["capture-pane", "-p", "-J", "-t", "%2"]);
    }

    #[test]
    fn swap_pane_orders_flags() {
        let req = SwapPaneRequest { source: "%1".to_string(), destination: "%9".to_string() };
        assert_eq!(swap_pane_args(&req), vec!["swap-pane", "-t", "%9", "-s", "%1"]);
    }

    #[test]
    fn resize_pane_toggles_zoom() {
        let req = ResizePaneRequest { target: "%3".to_string(), toggle_zoom: true };
        assert_eq!(resize_pane_args(&req), vec!["resize-pane", "-t", "%3", "-Z"]);
    }

    #[test]
    fn set_option_global() {
        let req = SetOptionRequest {
            name: "destroy-unattached".to_string(),
            value: "off".to_string(),
            global: true,
        };
        assert_eq!(set_option_args(&req), vec!["set-option", "-g", "destroy-unattached", "off"]);
    }
}
