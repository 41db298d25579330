//! Send settings and `key = value` settings files.
//!
//! Command-line values win. A settings file only fills in what is still
//! unset, and only for the connection and identity keys:
//!
//! | key           | setting                  |
//! |---------------|--------------------------|
//! | `smtp-host`   | [`Settings::smtp_host`]  |
//! | `smtp-port`   | [`Settings::smtp_port`]  |
//! | `rootca`      | [`Settings::root_ca`]    |
//! | `security`    | [`Settings::security`]   |
//! | `auth-method` | [`Settings::auth_method`]|
//! | `login`       | [`Settings::login`]      |
//! | `password`    | [`Settings::password`]   |
//! | `sender`      | [`Settings::sender`]     |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mailpost_mime::Mailbox;
use mailpost_smtp::{AuthMethod, Credentials, Security};

use crate::error::{Error, Result};

/// Everything needed to compose and deliver one message.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// SMTP server hostname.
    pub smtp_host: Option<String>,
    /// SMTP server port.
    pub smtp_port: Option<u16>,
    /// PEM file with the root CA to trust instead of the system roots.
    pub root_ca: Option<PathBuf>,
    /// Connection security.
    pub security: Option<Security>,
    /// Authentication method.
    pub auth_method: Option<AuthMethod>,
    /// Login name.
    pub login: Option<String>,
    /// Password.
    pub password: Option<String>,

    /// Sender mailbox.
    pub sender: Option<Mailbox>,
    /// Reply-To mailboxes.
    pub reply_to: Vec<Mailbox>,
    /// To recipients.
    pub to: Vec<Mailbox>,
    /// Cc recipients.
    pub cc: Vec<Mailbox>,
    /// Bcc recipients.
    pub bcc: Vec<Mailbox>,
    /// Explicit Message-ID.
    pub message_id: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Extra header lines.
    pub headers: Vec<String>,

    /// Plain text body.
    pub body_text: String,
    /// HTML body.
    pub body_html: String,
    /// Files to attach.
    pub attachments: Vec<PathBuf>,
}

impl Settings {
    /// Returns the effective security mode.
    #[must_use]
    pub fn security(&self) -> Security {
        self.security.unwrap_or_default()
    }

    /// Returns the credentials, empty where unset.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.login.clone().unwrap_or_default(),
            self.password.clone().unwrap_or_default(),
        )
    }

    /// Fills unset settings from the server file, then the auth file.
    ///
    /// When both files set the same key, the auth file wins.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or holds an invalid value.
    pub fn apply_files(
        &mut self,
        server_file: Option<&Path>,
        auth_file: Option<&Path>,
    ) -> Result<()> {
        let mut file = SettingsFile::default();
        for path in [server_file, auth_file].into_iter().flatten() {
            file.extend(SettingsFile::load(path)?);
        }
        self.fill_from(&file)
    }

    /// Fills settings that are still unset from `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value needed for an unset setting is invalid.
    pub fn fill_from(&mut self, file: &SettingsFile) -> Result<()> {
        if self.smtp_host.is_none()
            && let Some(host) = file.get("smtp-host")
        {
            self.smtp_host = Some(host.to_string());
        }
        if self.smtp_port.is_none()
            && let Some(port) = file.get("smtp-port")
        {
            self.smtp_port = Some(parse_value("smtp-port", port)?);
        }
        if self.root_ca.is_none()
            && let Some(path) = file.get("rootca")
        {
            self.root_ca = Some(PathBuf::from(path));
        }
        if self.security.is_none_or(|s| s == Security::None)
            && let Some(security) = file.get("security")
        {
            self.security = Some(parse_value("security", security)?);
        }
        if self.auth_method.is_none()
            && let Some(method) = file.get("auth-method")
        {
            self.auth_method = Some(parse_value("auth-method", method)?);
        }
        if self.login.is_none()
            && let Some(login) = file.get("login")
        {
            self.login = Some(login.to_string());
        }
        if self.password.is_none()
            && let Some(password) = file.get("password")
        {
            self.password = Some(password.to_string());
        }
        if self.sender.is_none()
            && let Some(sender) = file.get("sender")
        {
            self.sender = Some(parse_value("sender", sender)?);
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Config(format!("invalid value for '{key}': {e}")))
}

/// Parsed `key = value` settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsFile {
    values: HashMap<String, String>,
}

impl SettingsFile {
    /// Parses settings text.
    ///
    /// Keys are trimmed and lower-cased; values are trimmed and stripped of
    /// surrounding double quotes. Lines without `=` are ignored, and a later
    /// line overrides an earlier one.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let values = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| {
                (
                    key.trim().to_lowercase(),
                    value.trim().trim_matches('"').to_string(),
                )
            })
            .collect();
        Self { values }
    }

    /// Reads and parses a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to open file {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Loaded settings file");
        Ok(Self::parse(&text))
    }

    /// Returns a non-empty value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Adds every entry of `other`, replacing existing keys.
    pub fn extend(&mut self, other: Self) {
        self.values.extend(other.values);
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings_file() {
        let file = SettingsFile::parse(
            "# comment without equals\n\
             SMTP-Host = mail.example.com\n\
             smtp-port=587\n\
             password = \"p=ss word\"\n\
             login =\n",
        );
        assert_eq!(file.get("smtp-host"), Some("mail.example.com"));
        assert_eq!(file.get("smtp-port"), Some("587"));
        assert_eq!(file.get("password"), Some("p=ss word"));
        assert_eq!(file.get("login"), None);
        assert_eq!(file.get("# comment without equals"), None);
    }

    #[test]
    fn test_fill_only_unset() {
        let mut settings = Settings {
            smtp_host: Some("cli.example.com".into()),
            ..Settings::default()
        };
        let file = SettingsFile::parse(
            "smtp-host = file.example.com\n\
             smtp-port = 465\n\
             security = ssl/tls\n\
             auth-method = cram-md5\n\
             login = user\n\
             sender = Sender <sender@example.com>\n",
        );
        settings.fill_from(&file).unwrap();

        assert_eq!(settings.smtp_host.as_deref(), Some("cli.example.com"));
        assert_eq!(settings.smtp_port, Some(465));
        assert_eq!(settings.security(), Security::Tls);
        assert_eq!(settings.auth_method, Some(AuthMethod::CramMd5));
        assert_eq!(settings.login.as_deref(), Some("user"));
        assert_eq!(settings.password, None);
        assert_eq!(settings.sender.unwrap().address(), "sender@example.com");
    }

    #[test]
    fn test_invalid_file_value() {
        let mut settings = Settings::default();
        let err = settings
            .fill_from(&SettingsFile::parse("smtp-port = mail"))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("smtp-port")));
    }

    #[test]
    fn test_auth_file_applied_after_server_file() {
        let dir = tempfile::tempdir().unwrap();
        let server = dir.path().join("server.conf");
        let auth = dir.path().join("auth.conf");
        std::fs::write(&server, "smtp-host = mail.example.com\nlogin = server-user\n").unwrap();
        std::fs::write(&auth, "login = auth-user\npassword = secret\n").unwrap();

        let mut settings = Settings::default();
        settings.apply_files(Some(&server), Some(&auth)).unwrap();
        assert_eq!(settings.smtp_host.as_deref(), Some("mail.example.com"));
        assert_eq!(settings.login.as_deref(), Some("auth-user"));
        assert_eq!(settings.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_missing_file() {
        let mut settings = Settings::default();
        let err = settings
            .apply_files(Some(Path::new("/does/not/exist.conf")), None)
            .unwrap_err();
        assert!(err.to_string().contains("failed to open file"));
    }
}
