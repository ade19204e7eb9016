use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Output;
use tokio::process::Command;

use super::{PaneCapture, Target, TargetType};
use crate::layout::{self, MalformedLayoutError, PaneArea};

/// stderr from tmux when there is simply nothing to list
static RE_NO_SERVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(no server running|no sessions|error connecting to|no such file or directory)")
        .expect("static regex")
});

/// Client for interacting with tmux via CLI
#[derive(Debug, Clone)]
pub struct TmuxClient {
    /// Path to tmux binary
    tmux_path: String,
}

impl TmuxClient {
    pub fn new(tmux_path: impl Into<String>) -> Self {
        Self {
            tmux_path: tmux_path.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(?args, "running tmux");
        Command::new(&self.tmux_path)
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to execute tmux {}", args.first().unwrap_or(&"")))
    }

    /// List sessions or windows, in tmux's order
    pub async fn list_targets(&self, target_type: TargetType) -> Result<Vec<Target>> {
        // Format: id|display name
        let args: &[&str] = match target_type {
            TargetType::Sessions => &["list-sessions", "-F", "#{session_id}|#{session_name}"],
            TargetType::Windows => &[
                "list-windows",
                "-a",
                "-F",
                "#{window_id}|#{session_name}: #{window_name}",
            ],
        };
        let output = self.run(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if RE_NO_SERVER.is_match(&stderr) {
                return Ok(Vec::new());
            }
            anyhow::bail!("tmux {} failed: {}", args[0], stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_target_line).collect())
    }

    /// Fetch and parse the visible layout of a window, or of a session's
    /// current window
    pub async fn get_layout(&self, target_id: &str) -> Result<Vec<PaneArea>> {
        let output = self
            .run(&[
                "display-message",
                "-p",
                "-F",
                "#{window_visible_layout}",
                "-t",
                target_id,
            ])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to get layout of {}: {}", target_id, stderr.trim());
        }

        let descriptor = String::from_utf8_lossy(&output.stdout);
        let panes = layout::parse(descriptor.trim())
            .inspect_err(|e: &MalformedLayoutError| {
                tracing::warn!(target_id, kind = %e.kind, offset = e.offset, "malformed layout");
            })
            .with_context(|| format!("Unreadable layout for {}", target_id))?;
        tracing::debug!(target_id, panes = panes.len(), "parsed layout");
        Ok(panes)
    }

    /// Capture the visible contents of a pane, escapes included
    pub async fn capture_pane(&self, pane_id: &str) -> Result<String> {
        let output = self
            .run(&["capture-pane", "-t", pane_id, "-epN"])
            .await
            .context("Failed to capture pane")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to capture pane {}: {}", pane_id, stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().collect::<Vec<_>>().join("\n"))
    }

    /// Layout plus contents of every pane of a target
    pub async fn capture_window(&self, target_id: &str) -> Result<Vec<PaneCapture>> {
        let areas = self.get_layout(target_id).await?;
        let mut captures = Vec::with_capacity(areas.len());
        for area in areas {
            let content = self.capture_pane(&area.pane_id).await?;
            captures.push(PaneCapture { area, content });
        }
        Ok(captures)
    }

    /// Command to move the current client to a target (when running inside tmux)
    pub fn switch_command(&self, target_id: &str) -> Vec<String> {
        vec![
            self.tmux_path.clone(),
            "switch-client".to_string(),
            "-t".to_string(),
            target_id.to_string(),
        ]
    }

    /// Command to attach to a target from outside tmux
    pub fn attach_command(&self, target_id: &str) -> Vec<String> {
        vec![
            self.tmux_path.clone(),
            "attach-session".to_string(),
            "-t".to_string(),
            target_id.to_string(),
        ]
    }

    /// Pick switch or attach depending on whether `$TMUX` is set
    pub fn enter_command(&self, target_id: &str, inside_tmux: bool) -> Vec<String> {
        if inside_tmux {
            self.switch_command(target_id)
        } else {
            self.attach_command(target_id)
        }
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new("tmux")
    }
}

/// Split an `id|name` line. The name may itself contain `|`.
fn parse_target_line(line: &str) -> Option<Target> {
    let (id, name) = line.split_once('|')?;
    if id.is_empty() {
        return None;
    }
    Some(Target::new(id, name))
}
