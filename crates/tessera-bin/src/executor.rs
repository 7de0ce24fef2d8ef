//! Shell-backed executor: the `cd` builtin, `sh -c` for everything else, and
//! directive handling.

use anyhow::{Context, Result, bail};
use core_actions::{Executor, Seed};
use core_keymap::{Directive, DirectiveKind};
use core_text::TextLine;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

pub struct ShellExecutor {
    home: Option<PathBuf>,
    /// Substituted for `{hist}` in external payloads.
    history_path: Option<PathBuf>,
}

impl ShellExecutor {
    pub fn from_env() -> Self {
        Self {
            home: env::var_os("HOME").map(PathBuf::from),
            history_path: None,
        }
    }

    pub fn with_history_path(mut self, path: PathBuf) -> Self {
        self.history_path = Some(path);
        self
    }

    fn change_dir(&self, arg: Option<&str>) -> Result<()> {
        let target = match arg {
            Some(arg) => expand_tilde(arg, self.home.as_deref()),
            None => self.home.clone().context("cd: HOME not set")?,
        };
        env::set_current_dir(&target).with_context(|| format!("cd: {}", target.display()))?;
        debug!(target: "runtime.exec", "cwd_changed");
        Ok(())
    }

    fn run_external(&self, directive: &Directive) -> Result<Seed> {
        let hist = self
            .history_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let command = substitute(
            directive.payload(),
            &directive.left().to_string(),
            &directive.right().to_string(),
            &hist,
        );
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .output()
            .context("failed to spawn sh")?;
        debug!(target: "runtime.exec", status = ?output.status.code(), bytes = output.stdout.len(), "external_directive_done");
        let picked = String::from_utf8_lossy(&output.stdout);
        Ok(Seed::new(
            directive.left() + &TextLine::from(picked.trim()),
            directive.right().clone(),
        ))
    }
}

impl Executor for ShellExecutor {
    fn run_command(&mut self, line: &str) -> Result<Seed> {
        let mut words = line.split_whitespace();
        if words.next() == Some("cd") {
            let arg = words.next();
            if words.next().is_some() {
                bail!("cd: too many arguments");
            }
            self.change_dir(arg)?;
            return Ok(Seed::default());
        }
        let status = Command::new("sh")
            .arg("-c")
            .arg(line)
            .status()
            .context("failed to spawn sh")?;
        debug!(target: "runtime.exec", status = ?status.code(), "command_done");
        Ok(Seed::default())
    }

    fn run_directive(&mut self, wire: &str) -> Result<Seed> {
        let directive = Directive::decode(wire).context("malformed directive")?;
        match directive.kind() {
            DirectiveKind::External => self.run_external(&directive),
            DirectiveKind::Internal => {
                let cwd = env::current_dir().unwrap_or_default();
                Ok(internal_seed(&directive, &cwd).unwrap_or_else(|| {
                    warn!(target: "runtime.exec", "unknown_internal_directive");
                    eprintln!("tessera: unknown internal directive `{}`", directive.payload());
                    Seed::new(directive.left().clone(), directive.right().clone())
                }))
            }
        }
    }
}

/// Next seed for a built-in internal directive, `None` when the payload is
/// not one.
pub fn internal_seed(directive: &Directive, cwd: &Path) -> Option<Seed> {
    let left = directive.left();
    let right = directive.right();
    match directive.payload() {
        "clear-line" => Some(Seed::default()),
        "kill-right" => Some(Seed::new(left.clone(), "")),
        "insert-cwd" => Some(Seed::new(
            left + &TextLine::from(cwd.display().to_string()),
            right.clone(),
        )),
        _ => None,
    }
}

/// Replace `{left}`, `{right}` and `{hist}` (the history log path) in an
/// external payload.
pub fn substitute(payload: &str, left: &str, right: &str, hist: &str) -> String {
    payload
        .replace("{left}", left)
        .replace("{right}", right)
        .replace("{hist}", hist)
}

/// `~` and `~/rest` resolve against `home`; anything else is taken as is.
pub fn expand_tilde(arg: &str, home: Option<&Path>) -> PathBuf {
    match (arg, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (_, Some(home)) if arg.starts_with("~/") => home.join(&arg[2..]),
        _ => PathBuf::from(arg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn internal(left: &str, right: &str, payload: &str) -> Directive {
        Directive::new(DirectiveKind::Internal, left.into(), right.into(), payload).unwrap()
    }

    #[test]
    fn internal_payloads() {
        let cwd = Path::new("/srv/app");
        assert_eq!(
            internal_seed(&internal("ls ", "-l", "clear-line"), cwd),
            Some(Seed::default())
        );
        assert_eq!(
            internal_seed(&internal("ls ", "-l", "kill-right"), cwd),
            Some(Seed::new("ls ", ""))
        );
        assert_eq!(
            internal_seed(&internal("ls ", " -l", "insert-cwd"), cwd),
            Some(Seed::new("ls /srv/app", " -l"))
        );
        assert_eq!(internal_seed(&internal("a", "b", "launch"), cwd), None);
    }

    #[test]
    fn unknown_internal_keeps_split() {
        let mut exec = ShellExecutor::from_env();
        let wire = internal("git ", "log", "nope").encode();
        assert_eq!(exec.run_directive(&wire).unwrap(), Seed::new("git ", "log"));
    }

    #[test]
    fn external_output_extends_left() {
        let mut exec = ShellExecutor::from_env();
        let wire = Directive::new(DirectiveKind::External, "cd ".into(), "".into(), "echo '  picked  '")
            .unwrap()
            .encode();
        assert_eq!(exec.run_directive(&wire).unwrap(), Seed::new("cd picked", ""));
    }

    #[test]
    fn placeholders_substituted() {
        assert_eq!(substitute("fzf -q {left}|{right}", "gi", "t", ""), "fzf -q gi|t");
        assert_eq!(
            substitute("tac {hist} | fzf -q '{left}'", "gi", "", "/h/history.txt"),
            "tac /h/history.txt | fzf -q 'gi'"
        );
        assert_eq!(substitute("plain", "a", "b", "/h"), "plain");
    }

    #[test]
    fn hist_placeholder_reads_history_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("history.txt");
        std::fs::write(&log, "git status\nmake test\n").unwrap();
        let mut exec = ShellExecutor::from_env().with_history_path(log);
        let wire = Directive::new(DirectiveKind::External, "".into(), "".into(), "tail -n 1 {hist}")
            .unwrap()
            .encode();
        assert_eq!(exec.run_directive(&wire).unwrap(), Seed::new("make test", ""));
    }

    #[test]
    fn tilde_expansion() {
        let home = Path::new("/home/u");
        assert_eq!(expand_tilde("~", Some(home)), PathBuf::from("/home/u"));
        assert_eq!(expand_tilde("~/src", Some(home)), PathBuf::from("/home/u/src"));
        assert_eq!(expand_tilde("~other", Some(home)), PathBuf::from("~other"));
        assert_eq!(expand_tilde("~/x", None), PathBuf::from("~/x"));
        assert_eq!(expand_tilde("/tmp", Some(home)), PathBuf::from("/tmp"));
    }

    #[test]
    fn bad_wire_is_an_error() {
        let mut exec = ShellExecutor::from_env();
        assert!(exec.run_directive("not a directive").is_err());
    }
}
