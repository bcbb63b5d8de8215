//! Runtime settings read from `PAYSLIP_*` environment variables.
//!
//! A `.env` file in the working directory is loaded first when present. SMTP settings are only
//! needed for delivery, so a missing SMTP block is not an error until [`Settings::smtp`] is asked
//! for it.

use std::time::Duration;

use lettre::message::Mailbox;
use log::debug;
use thiserror::Error;

use crate::assets::{first_available, AssetSource, BrandingAssets};
use crate::layout::DEFAULT_FOOTER;

pub const LOGO_VAR: &str = "PAYSLIP_LOGO";
pub const LOGO_FALLBACK_VAR: &str = "PAYSLIP_LOGO_FALLBACK";
pub const LETTERHEAD_VAR: &str = "PAYSLIP_LETTERHEAD";
pub const ASSET_TIMEOUT_VAR: &str = "PAYSLIP_ASSET_TIMEOUT_SECS";
pub const FOOTER_VAR: &str = "PAYSLIP_FOOTER";
pub const CURRENCY_SYMBOL_VAR: &str = "PAYSLIP_CURRENCY_SYMBOL";
pub const MARK_UNAVAILABLE_VAR: &str = "PAYSLIP_MARK_UNAVAILABLE";
pub const SMTP_HOST_VAR: &str = "PAYSLIP_SMTP_HOST";
pub const SMTP_PORT_VAR: &str = "PAYSLIP_SMTP_PORT";
pub const SMTP_USER_VAR: &str = "PAYSLIP_SMTP_USER";
pub const SMTP_PASSWORD_VAR: &str = "PAYSLIP_SMTP_PASSWORD";
pub const SMTP_FROM_VAR: &str = "PAYSLIP_SMTP_FROM";
pub const SMTP_TLS_VAR: &str = "PAYSLIP_SMTP_TLS";

pub const DEFAULT_CURRENCY_SYMBOL: &str = "₦";
pub const DEFAULT_ASSET_TIMEOUT: Duration = crate::assets::DEFAULT_FETCH_TIMEOUT;
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Errors raised while reading or validating settings.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("SMTP is not configured; set PAYSLIP_SMTP_HOST and PAYSLIP_SMTP_FROM")]
    SmtpNotConfigured,
    #[error("invalid SMTP settings: {0}")]
    InvalidSmtp(String),
}

/// Connection details for the outgoing mail server.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    pub use_tls: bool,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl SmtpSettings {
    /// Checks the settings before any connection is attempted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidSmtp("host is empty".to_owned()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidSmtp("port must be non-zero".to_owned()));
        }
        self.from_mailbox()?;
        if self.user.trim().is_empty() != self.password.is_empty() {
            return Err(ConfigError::InvalidSmtp(
                "user and password must be set together".to_owned(),
            ));
        }
        Ok(())
    }

    /// Parses the configured sender address.
    pub fn from_mailbox(&self) -> Result<Mailbox, ConfigError> {
        self.from
            .trim()
            .parse()
            .map_err(|err| {
                ConfigError::InvalidSmtp(format!("invalid from address '{}': {}", self.from, err))
            })
    }

    /// Whether credentials should be sent to the server.
    pub fn has_credentials(&self) -> bool {
        !self.user.trim().is_empty()
    }

    fn from_lookup<F>(lookup: &F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = match non_blank(lookup, SMTP_HOST_VAR) {
            Some(host) => host,
            None => return Ok(None),
        };

        let port = match non_blank(lookup, SMTP_PORT_VAR) {
            Some(raw) => raw.parse::<u16>().map_err(|err| ConfigError::InvalidValue {
                var: SMTP_PORT_VAR,
                value: raw.clone(),
                reason: err.to_string(),
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        Ok(Some(Self {
            host,
            port,
            user: lookup(SMTP_USER_VAR).unwrap_or_default(),
            password: lookup(SMTP_PASSWORD_VAR).unwrap_or_default(),
            from: lookup(SMTP_FROM_VAR).unwrap_or_default(),
            use_tls: flag(lookup, SMTP_TLS_VAR)?.unwrap_or(true),
        }))
    }
}

/// Everything a run needs besides the payslip data itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Logo locations tried in order; the first available one wins.
    pub logo_locations: Vec<String>,
    pub letterhead: Option<String>,
    pub asset_timeout: Duration,
    pub footer: Option<String>,
    pub mark_unavailable: bool,
    pub currency_symbol: String,
    /// Malformed SMTP values are kept as the error and only reported by [`Settings::smtp`].
    smtp: Result<Option<SmtpSettings>, ConfigError>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            logo_locations: Vec::new(),
            letterhead: None,
            asset_timeout: DEFAULT_ASSET_TIMEOUT,
            footer: Some(DEFAULT_FOOTER.to_owned()),
            mark_unavailable: false,
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_owned(),
            smtp: Ok(None),
        }
    }
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("loaded environment from {}", path.display()),
            Err(err) => debug!("no .env file loaded: {}", err),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let logo_locations = [LOGO_VAR, LOGO_FALLBACK_VAR]
            .into_iter()
            .filter_map(|var| non_blank(&lookup, var))
            .collect();

        let asset_timeout = match non_blank(&lookup, ASSET_TIMEOUT_VAR) {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|err| ConfigError::InvalidValue {
                    var: ASSET_TIMEOUT_VAR,
                    value: raw.clone(),
                    reason: err.to_string(),
                })?,
            None => defaults.asset_timeout,
        };

        // An explicitly empty footer turns the footer off.
        let footer = match lookup(FOOTER_VAR) {
            Some(text) if text.trim().is_empty() => None,
            Some(text) => Some(text),
            None => defaults.footer,
        };

        let smtp = SmtpSettings::from_lookup(&lookup);
        if let Err(err) = &smtp {
            debug!("SMTP settings unusable: {}", err);
        }

        Ok(Self {
            logo_locations,
            letterhead: non_blank(&lookup, LETTERHEAD_VAR),
            asset_timeout,
            footer,
            mark_unavailable: flag(&lookup, MARK_UNAVAILABLE_VAR)?.unwrap_or(false),
            currency_symbol: lookup(CURRENCY_SYMBOL_VAR).unwrap_or(defaults.currency_symbol),
            smtp,
        })
    }

    /// Replaces the SMTP settings.
    pub fn with_smtp(mut self, smtp: Option<SmtpSettings>) -> Self {
        self.smtp = Ok(smtp);
        self
    }

    /// Returns validated SMTP settings, or an error when delivery is not configured.
    ///
    /// Values that failed to parse while loading are reported here rather than by
    /// [`Settings::from_lookup`], so only the delivery path fails on them.
    pub fn smtp(&self) -> Result<&SmtpSettings, ConfigError> {
        let smtp = match &self.smtp {
            Ok(Some(smtp)) => smtp,
            Ok(None) => return Err(ConfigError::SmtpNotConfigured),
            Err(err) => return Err(err.clone()),
        };
        smtp.validate()?;
        Ok(smtp)
    }

    /// Fetches the logo and letterhead once through `source`.
    pub fn resolve_assets<S>(&self, source: &S) -> BrandingAssets
    where
        S: AssetSource + ?Sized,
    {
        let letterhead: Vec<String> = self.letterhead.iter().cloned().collect();
        BrandingAssets {
            logo: first_available(source, &self.logo_locations),
            letterhead: first_available(source, &letterhead),
        }
    }
}

fn non_blank<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn flag<F>(lookup: &F, var: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match non_blank(lookup, var) {
        Some(raw) => raw,
        None => return Ok(None),
    };
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw,
            reason: "expected true or false".to_owned(),
        }),
    }
}
