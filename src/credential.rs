/// API key resolution.
///
/// The key is looked up once at startup (process environment, then a local
/// `.env` file, then an interactive prompt) and handed to the remote clients
/// as a value. Nothing is written back to the environment or to disk.
use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result, bail};
use console::Term;
use tracing::{debug, info};

/// Secret API key. `Debug` output never contains the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() { None } else { Some(Self(key)) }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

/// Resolve the API key named by `env_var`, prompting on the terminal if it
/// is neither set in the environment nor present in `.env`.
pub fn resolve(env_var: &str) -> Result<ApiKey> {
    if let Some(key) = std::env::var(env_var).ok().and_then(ApiKey::new) {
        debug!("Using API key from environment variable {env_var}");
        return Ok(key);
    }

    if let Some(key) = from_dotenv(env_var) {
        info!("Using API key from .env");
        return Ok(key);
    }

    let key = match KeyPrompt::for_stdin(io::stdin().is_terminal()) {
        KeyPrompt::Hidden => prompt_hidden(env_var)?,
        KeyPrompt::Line => prompt_for_key(env_var, io::stdin().lock(), io::stderr().lock())?,
    };
    match key {
        Some(key) => Ok(key),
        None => bail!("no API key provided (set {env_var} or enter it when prompted)"),
    }
}

/// How the key is read when it has to be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyPrompt {
    /// Terminal input with echo turned off.
    Hidden,
    /// One line from piped stdin.
    Line,
}

impl KeyPrompt {
    fn for_stdin(is_terminal: bool) -> Self {
        if is_terminal { Self::Hidden } else { Self::Line }
    }
}

/// Ask for the key on the terminal without echoing what is typed.
fn prompt_hidden(env_var: &str) -> Result<Option<ApiKey>> {
    let term = Term::stderr();
    term.write_str(&format!("Enter your API key ({env_var}): "))?;
    let line = term.read_secure_line().context("failed to read API key")?;
    Ok(ApiKey::new(line))
}

/// Look `env_var` up in a `.env` file without loading it into the process.
fn from_dotenv(env_var: &str) -> Option<ApiKey> {
    let entries = dotenv::dotenv_iter().ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .find(|(name, _)| name == env_var)
        .and_then(|(_, value)| ApiKey::new(value))
}

/// Ask for the key on `output` and read one line from `input`. Used when
/// stdin is not a terminal.
///
/// Returns `None` on end of input or a blank line.
pub fn prompt_for_key<R: BufRead, W: Write>(
    env_var: &str,
    mut input: R,
    mut output: W,
) -> Result<Option<ApiKey>> {
    write!(output, "Enter your API key ({env_var}): ")?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read API key")?;
    Ok(ApiKey::new(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_rejected() {
        assert!(ApiKey::new("").is_none());
        assert!(ApiKey::new("   \n").is_none());
        assert_eq!(ApiKey::new(" abc \n").unwrap().expose(), "abc");
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = ApiKey::new("super-secret").unwrap();
        let printed = format!("{key:?}");
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn test_prompt_reads_line() {
        let mut out = Vec::new();
        let key = prompt_for_key("GOOGLE_API_KEY", "my-key\n".as_bytes(), &mut out)
            .unwrap()
            .unwrap();
        assert_eq!(key.expose(), "my-key");
        assert!(String::from_utf8(out).unwrap().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_prompt_end_of_input() {
        let key = prompt_for_key("GOOGLE_API_KEY", "".as_bytes(), Vec::new()).unwrap();
        assert!(key.is_none());
    }

    #[test]
    fn test_terminal_prompt_hides_input() {
        assert_eq!(KeyPrompt::for_stdin(true), KeyPrompt::Hidden);
        assert_eq!(KeyPrompt::for_stdin(false), KeyPrompt::Line);
    }
}
