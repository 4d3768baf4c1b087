//! Process-wide configuration for the Lanturn bots.
//!
//! Everything environment-sourced is resolved exactly once, here, into an explicit
//! [`Settings`] value that gets passed by reference into the bot entry points. Business
//! logic never reads the environment on its own.
//!
//! The credential check is deliberately the first thing that can fail at startup: a
//! missing API key surfaces as a clear configuration error before any transport or
//! session object exists.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default idle timeout applied when the environment does not override it (seconds).
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default settle delay between a client connecting and media input being unpaused
/// (seconds). Kept configurable rather than baked in; three seconds is simply how long
/// the embedded clients we've tested need before their audio path is stable.
pub const DEFAULT_SETTLE_SECS: u64 = 3;

/// Process-wide settings, constructed once at startup.
#[derive(Clone)]
pub struct Settings {
    /// API key for the hosted conversational model service.
    pub api_key: String,

    /// How long a pipeline task may sit with no frames flowing before it terminates.
    pub idle_timeout: Duration,

    /// How long to wait after a client connects before unpausing media input.
    pub settle_delay: Duration,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// Reads `GEMINI_API_KEY` (preferred) or `GOOGLE_API_KEY` for the credential, and
    /// `LANTURN_IDLE_TIMEOUT_SECS` / `LANTURN_SETTLE_SECS` for the timers. A `.env`
    /// file in the working directory is honored when present.
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine; only explicit variables are required.
        let _ = dotenvy::dotenv();

        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingCredential("GEMINI_API_KEY"))?;

        Ok(Self {
            api_key,
            idle_timeout: env_secs("LANTURN_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)?,
            settle_delay: env_secs("LANTURN_SETTLE_SECS", DEFAULT_SETTLE_SECS)?,
        })
    }

    /// Build settings with an explicit key and default timers.
    ///
    /// Intended for tests and for hosts that manage credentials themselves.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            settle_delay: Duration::from_secs(DEFAULT_SETTLE_SECS),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("idle_timeout", &self.idle_timeout)
            .field("settle_delay", &self.settle_delay)
            .finish()
    }
}

fn env_secs(var: &str, default: u64) -> Result<Duration> {
    let secs = match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("{var} must be a whole number of seconds")))?,
        Err(_) => default,
    };
    Ok(Duration::from_secs(secs))
}
