//! System clipboard access through the platform's command-line tools.
//!
//! | Platform | Copy                     | Paste                        |
//! |----------|--------------------------|------------------------------|
//! | macOS    | `pbcopy`                 | `pbpaste`                    |
//! | Linux    | `xclip`, then `xsel`     | `xclip -o`, then `xsel`      |
//! | Windows  | `clip`                   | `powershell Get-Clipboard`   |
//!
//! Only the text flavour is carried; a JSON payload is recognised on paste by
//! its content.

use anyhow::{anyhow, bail, Result};
use std::io::Write;
use std::process::{Child, Command, Stdio};

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        pipe_into(spawn("pbcopy", &[])?, "pbcopy", text)
    }

    #[cfg(target_os = "linux")]
    {
        let child = match spawn("xclip", &["-selection", "clipboard"]) {
            Ok(child) => child,
            Err(_) => spawn("xsel", &["--clipboard", "--input"])
                .map_err(|e| anyhow!("{}. Install xclip or xsel.", e))?,
        };
        pipe_into(child, "clipboard command", text)
    }

    #[cfg(target_os = "windows")]
    {
        pipe_into(spawn("clip", &[])?, "clip", text)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = text;
        bail!("Clipboard not supported on this platform")
    }
}

pub fn get_from_clipboard() -> Result<String> {
    #[cfg(target_os = "macos")]
    {
        read_from("pbpaste", &[])
    }

    #[cfg(target_os = "linux")]
    {
        read_from("xclip", &["-selection", "clipboard", "-o"])
            .or_else(|_| read_from("xsel", &["--clipboard", "--output"]))
            .map_err(|e| anyhow!("{}. Install xclip or xsel.", e))
    }

    #[cfg(target_os = "windows")]
    {
        read_from("powershell", &["-command", "Get-Clipboard"])
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        bail!("Clipboard not supported on this platform")
    }
}

#[allow(dead_code)]
fn spawn(program: &str, args: &[&str]) -> Result<Child> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow!("Failed to spawn {}: {}", program, e))
}

#[allow(dead_code)]
fn pipe_into(mut child: Child, name: &str, text: &str) -> Result<()> {
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| anyhow!("Failed to write to {}: {}", name, e))?;
    }
    let status = child
        .wait()
        .map_err(|e| anyhow!("Failed to wait for {}: {}", name, e))?;
    if !status.success() {
        bail!("{} exited with error", name);
    }
    Ok(())
}

#[allow(dead_code)]
fn read_from(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| anyhow!("Failed to execute {}: {}", program, e))?;
    if !output.status.success() {
        bail!("{} exited with error", program);
    }
    String::from_utf8(output.stdout).map_err(|e| anyhow!("Invalid UTF-8 in clipboard: {}", e))
}
