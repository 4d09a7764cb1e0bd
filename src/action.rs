use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

use crate::widget::Selection;

const PLACEHOLDER: &str = "{}";
const REGEX_NAME_ENV: &str = "FASTCOPY_REGEX_NAME";
const TARGET_PANE_ENV: &str = "FASTCOPY_TARGET_PANE_ID";

/// A parsed selection handler: a shell command that receives the selected
/// text either as an argument (in place of the first `{}`) or over stdin.
pub struct Action {
    cmd: String,
    args: Vec<String>,
    /// Index in `args` to replace with the selection; stdin mode if None.
    placeholder: Option<usize>,
    dir: String,
    pane_id: String,
}

/// Parses an action string with shell-style word splitting. The command
/// runs in `dir` (the target pane's current path) and learns the matched
/// pane and regex names through its environment.
pub fn new(action: &str, dir: &str, pane_id: &str) -> Result<Action> {
    let mut words = shell_words::split(action).context("parse action")?;
    if words.is_empty() {
        bail!("empty action");
    }

    let cmd = words.remove(0);
    let placeholder = words.iter().position(|w| w == PLACEHOLDER);
    Ok(Action {
        cmd,
        args: words,
        placeholder,
        dir: dir.to_string(),
        pane_id: pane_id.to_string(),
    })
}

impl Action {
    pub fn run(&self, sel: &Selection) -> Result<()> {
        let mut args = self.args.clone();
        if let Some(at) = self.placeholder {
            args[at] = sel.text.clone();
        }

        let mut command = Command::new(&self.cmd);
        command
            .args(&args)
            .env(REGEX_NAME_ENV, sel.matchers.join(" "))
            .env(TARGET_PANE_ENV, &self.pane_id)
            .stdin(if self.placeholder.is_some() { Stdio::null() } else { Stdio::piped() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !self.dir.is_empty() {
            command.current_dir(&self.dir);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("run action {:?}", self.cmd))?;
        if self.placeholder.is_none() {
            // No placeholder: the selection goes over stdin.
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(sel.text.as_bytes())
                    .with_context(|| format!("write to {:?}", self.cmd))?;
            }
        }

        let out = child
            .wait_with_output()
            .with_context(|| format!("wait for {:?}", self.cmd))?;
        for line in String::from_utf8_lossy(&out.stdout).lines() {
            log::info!("{}: {}", self.cmd, line);
        }
        for line in String::from_utf8_lossy(&out.stderr).lines() {
            log::info!("{}: {}", self.cmd, line);
        }
        if !out.status.success() {
            bail!("action {:?} failed: {}", self.cmd, out.status);
        }
        Ok(())
    }
}
