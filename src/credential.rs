//! credential.rs
//!
//! Resolves the Slack webhook URL. Precedence:
//!   • cached file, when it exists and no flag was given
//!   • the `--webhook_url` flag, used verbatim and never persisted
//!   • an interactive prompt, whose answer is written back to the cache file
//!
//! The URL is never validated here; a bad value only shows up when posting.
//! On a terminal the prompt goes through `dialoguer`; piped stdin is read a
//! line at a time so `echo $URL | pypistats-notify ...` keeps working.

use anyhow::{Context, Result};
use dialoguer::Input;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

pub const PROMPT: &str = "Slack Webhook URL";

/// Asks the user for one value.
pub trait Prompt {
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

/// The process's own stdin: a line editor on a terminal, plain line reads when piped.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        if io::stdin().is_terminal() {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .context("Failed to read webhook URL from terminal")
        } else {
            LinePrompt::new(io::stdin().lock(), io::stdout().lock()).ask(prompt)
        }
    }
}

/// Writes `"<prompt>: "` to `output` and reads one line from `input`.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}: ")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read webhook URL from stdin")?;
        if read == 0 {
            return Err(anyhow::anyhow!("stdin closed before a webhook URL was entered"));
        }

        // Only the line terminator is dropped; the value is stored as typed.
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    CachedFile(PathBuf),
    Flag(String),
    InteractivePrompt(PathBuf),
}

impl CredentialSource {
    /// Picks the source for this run. An empty flag counts as no flag.
    pub fn select(flag: Option<String>, cache_path: PathBuf) -> Self {
        let flag = flag.filter(|f| !f.is_empty());

        match flag {
            None if cache_path.exists() => CredentialSource::CachedFile(cache_path),
            Some(url) => CredentialSource::Flag(url),
            None => CredentialSource::InteractivePrompt(cache_path),
        }
    }

    /// `prompt` is only consulted for [`CredentialSource::InteractivePrompt`].
    pub fn resolve<P: Prompt>(self, prompt: &mut P) -> Result<String> {
        match self {
            CredentialSource::CachedFile(path) => {
                tracing::debug!("Loading Slack webhook URL");
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(contents.trim().to_string())
            }
            CredentialSource::Flag(url) => Ok(url),
            CredentialSource::InteractivePrompt(path) => {
                tracing::debug!("Prompting for Slack webhook URL");
                let url = prompt.ask(PROMPT)?;
                tracing::debug!(
                    "Slack webhook URL file is missing, prompted user.\nslack_webhook_url variable: {url}"
                );
                persist(&path, &url)?;
                Ok(url)
            }
        }
    }
}

fn persist(path: &Path, url: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, url).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const URL: &str = "https://hooks.slack.com/services/T000/B000/XXX";

    fn resolve(source: CredentialSource, stdin: &str) -> (String, String) {
        let mut prompt = LinePrompt::new(Cursor::new(stdin.as_bytes().to_vec()), Vec::new());
        let url = source.resolve(&mut prompt).unwrap();
        (url, String::from_utf8(prompt.into_output()).unwrap())
    }

    #[test]
    fn cached_file_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slack_webhook_url");
        fs::write(&path, format!("  {URL}\n")).unwrap();

        let source = CredentialSource::select(None, path.clone());
        assert_eq!(source, CredentialSource::CachedFile(path));

        let (url, prompt) = resolve(source, "");
        assert_eq!(url, URL);
        assert!(prompt.is_empty());
    }

    #[test]
    fn flag_wins_and_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slack_webhook_url");
        fs::write(&path, "https://cached.example").unwrap();

        let source = CredentialSource::select(Some(" https://flag.example ".to_string()), path.clone());
        let (url, _) = resolve(source, "");

        assert_eq!(url, " https://flag.example ");
        assert_eq!(fs::read_to_string(&path).unwrap(), "https://cached.example");
    }

    #[test]
    fn flag_without_file_does_not_create_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slack_webhook_url");

        let (url, _) = resolve(CredentialSource::select(Some(URL.to_string()), path.clone()), "");

        assert_eq!(url, URL);
        assert!(!path.exists());
    }

    #[test]
    fn empty_flag_falls_back_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slack_webhook_url");
        fs::write(&path, URL).unwrap();

        let source = CredentialSource::select(Some(String::new()), path.clone());
        assert_eq!(source, CredentialSource::CachedFile(path));
    }

    #[test]
    fn prompt_answer_is_used_and_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("slack_webhook_url");

        let source = CredentialSource::select(None, path.clone());
        assert_eq!(source, CredentialSource::InteractivePrompt(path.clone()));

        let (url, prompt) = resolve(source, &format!("{URL} \r\n"));
        assert_eq!(url, format!("{URL} "));
        assert_eq!(prompt, "Slack Webhook URL: ");
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{URL} "));
    }

    #[test]
    fn prompt_on_closed_stdin_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slack_webhook_url");

        let mut prompt = LinePrompt::new(Cursor::new(Vec::new()), Vec::new());
        let result = CredentialSource::InteractivePrompt(path.clone()).resolve(&mut prompt);

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
