//! Helpers for the site repository clone the tool works in.

use crate::error::{CatalogError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

fn git(args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CatalogError::Other(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// The root directory of the enclosing working tree.
pub fn root() -> Result<PathBuf> {
    git(&["rev-parse", "--show-toplevel"]).map(PathBuf::from)
}

/// Changes the working directory to the repository root.
pub fn chdir_root() -> Result<PathBuf> {
    let root = root()?;
    std::env::set_current_dir(&root)?;
    log::debug!("Working in {}", root.display());
    Ok(root)
}

/// Repository name from a remote URL: the last path element without `.git`.
pub fn repo_name(url: &str) -> String {
    let base = url
        .trim()
        .trim_end_matches('/')
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or("");
    base.strip_suffix(".git").unwrap_or(base).to_string()
}

/// The repository name of the given git remote.
pub fn remote_repo(remote: &str) -> Result<String> {
    git(&["remote", "get-url", remote]).map(|url| repo_name(&url))
}

/// Moves to the repository root and, unless `expected` is empty, checks
/// that `origin` names the expected repository.
pub fn ensure_repo(expected: &str) -> Result<PathBuf> {
    let root = chdir_root()
        .map_err(|e| CatalogError::Config(format!("this tool requires a repository clone: {}", e)))?;
    if expected.is_empty() {
        return Ok(root);
    }
    let remote = remote_repo("origin")?;
    if remote != expected {
        return Err(CatalogError::Config(format!(
            "remote is {:?}, but should be {:?}",
            remote, expected
        )));
    }
    Ok(root)
}

/// Opens `paths` in `$EDITOR` on the controlling terminal.
pub fn edit_files(paths: &[PathBuf]) -> Result<()> {
    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| CatalogError::Config("no EDITOR is defined".to_string()))?;

    let tty = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(Path::new("/dev/tty"))?;
    let output = Command::new(&editor)
        .args(paths)
        .stdin(Stdio::from(tty.try_clone()?))
        .stdout(Stdio::from(tty))
        .stderr(Stdio::piped())
        .output()?;
    if !output.status.success() {
        let msg = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CatalogError::Other(if msg.is_empty() {
            format!("{} exited with {}", editor, output.status)
        } else {
            msg
        }));
    }
    Ok(())
}
