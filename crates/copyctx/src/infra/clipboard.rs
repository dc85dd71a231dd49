//! Clipboard integration utilities.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};

/// Cross-platform clipboard helper with fallbacks for headless environments.
pub struct Clipboard {
    system: Option<arboard::Clipboard>,
}

impl Clipboard {
    /// Attempt to initialize the system clipboard. When unavailable we fall
    /// back to shell-based clipboard utilities.
    pub fn new() -> Self {
        let system = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(err) => {
                tracing::debug!(error = %err, "system clipboard unavailable");
                None
            }
        };
        Self { system }
    }

    /// Copy text to the clipboard, falling back to platform-specific
    /// executables if needed.
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        if let Some(system) = self.system.as_mut() {
            match system.set_text(text.to_owned()) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    tracing::warn!(error = %err, "system clipboard rejected text, trying shell backends");
                    self.system = None;
                }
            }
        }

        copy_via_shell(text)
    }
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

fn copy_via_shell(text: &str) -> Result<()> {
    for backend in shell_backends() {
        match pipe_to_command(backend, text) {
            Ok(()) => return Ok(()),
            Err(err) => {
                tracing::debug!(command = backend[0], error = %err, "clipboard backend failed");
            }
        }
    }

    Err(anyhow!("no clipboard backend accepted the text"))
}

fn pipe_to_command(command: &[&str], text: &str) -> Result<()> {
    let (program, args) = command
        .split_first()
        .context("clipboard command missing program")?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn clipboard command: {program}"))?;

    // Stdin must be closed before waiting or the backend blocks on EOF.
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .context("failed to write clipboard contents")?;
    }

    let status = child
        .wait()
        .with_context(|| format!("clipboard command did not exit cleanly: {program}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("clipboard command exited with status {status}"))
    }
}

#[cfg(target_os = "macos")]
fn shell_backends() -> &'static [&'static [&'static str]] {
    &[&["pbcopy"]]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn shell_backends() -> &'static [&'static [&'static str]] {
    &[
        &["wl-copy"],
        &["xclip", "-selection", "clipboard"],
        &["xsel", "--clipboard", "--input"],
    ]
}

#[cfg(target_os = "windows")]
fn shell_backends() -> &'static [&'static [&'static str]] {
    &[&["powershell.exe", "-NoProfile", "-Command", "Set-Clipboard"]]
}

#[cfg(not(any(unix, target_os = "windows")))]
fn shell_backends() -> &'static [&'static [&'static str]] {
    &[]
}
