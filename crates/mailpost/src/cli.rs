//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use mailpost_core::Settings;
use mailpost_mime::{Mailbox, check_header};
use mailpost_smtp::{AuthMethod, Security};

/// Compose one e-mail and send it over SMTP.
///
/// Server and authentication options may also come from `key = value`
/// settings files; values given on the command line take precedence.
#[derive(Debug, Parser)]
#[command(name = "mailpost", version)]
pub struct Cli {
    /// Settings file with server options
    #[arg(long, value_name = "FILE")]
    pub server_file: Option<PathBuf>,

    /// Hostname of the SMTP server
    #[arg(long, value_name = "HOST")]
    pub smtp_host: Option<String>,

    /// TCP port of the SMTP server
    #[arg(long, value_name = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub smtp_port: Option<u16>,

    /// PEM file with the root CA of a self-signed server certificate
    #[arg(long = "rootca", value_name = "FILE")]
    pub root_ca: Option<PathBuf>,

    /// Security protocol (starttls, ssl/tls)
    #[arg(long, value_name = "PROTOCOL")]
    pub security: Option<Security>,

    /// Settings file with authentication options
    #[arg(long, value_name = "FILE")]
    pub auth_file: Option<PathBuf>,

    /// Authentication method (plain, cram-md5)
    #[arg(long, value_name = "METHOD")]
    pub auth_method: Option<AuthMethod>,

    /// Login username
    #[arg(long)]
    pub login: Option<String>,

    /// Login password
    #[arg(long)]
    pub password: Option<String>,

    /// Sender address
    #[arg(long, value_name = "ADDRESS")]
    pub sender: Option<Mailbox>,

    /// Reply-To address; comma separated or repeated
    #[arg(long, value_name = "ADDRESS", value_delimiter = ',', value_parser = parse_address)]
    pub reply_to: Vec<String>,

    /// To recipient; comma separated or repeated
    #[arg(long, value_name = "ADDRESS", value_delimiter = ',', value_parser = parse_address)]
    pub to: Vec<String>,

    /// Cc recipient; comma separated or repeated
    #[arg(long, value_name = "ADDRESS", value_delimiter = ',', value_parser = parse_address)]
    pub cc: Vec<String>,

    /// Bcc recipient; comma separated or repeated
    #[arg(long, value_name = "ADDRESS", value_delimiter = ',', value_parser = parse_address)]
    pub bcc: Vec<String>,

    /// Custom Message-ID
    #[arg(long, value_name = "ID")]
    pub message_id: Option<String>,

    /// Subject line
    #[arg(long, default_value = "")]
    pub subject: String,

    /// Custom header line such as "X-Priority: 1"; may be repeated
    #[arg(long = "header", value_name = "HEADER", value_parser = parse_header)]
    pub headers: Vec<String>,

    /// Plain text body; new lines may be written as \n
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub body_text: String,

    /// HTML body
    #[arg(long, value_name = "HTML", default_value = "")]
    pub body_html: String,

    /// File to attach; comma separated or repeated
    #[arg(
        long = "attachment",
        value_name = "FILE",
        value_delimiter = ',',
        value_parser = parse_attachment
    )]
    pub attachments: Vec<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Converts the arguments into settings, filling gaps from the
    /// settings files.
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or holds an
    /// invalid value.
    pub fn into_settings(self) -> mailpost_core::Result<Settings> {
        let mut settings = Settings {
            smtp_host: self.smtp_host,
            smtp_port: self.smtp_port,
            root_ca: self.root_ca,
            security: self.security,
            auth_method: self.auth_method,
            login: self.login.filter(|login| !login.is_empty()),
            password: self.password.filter(|password| !password.is_empty()),
            sender: self.sender,
            reply_to: mailboxes(self.reply_to),
            to: mailboxes(self.to),
            cc: mailboxes(self.cc),
            bcc: mailboxes(self.bcc),
            message_id: self.message_id,
            subject: self.subject,
            headers: self.headers,
            body_text: self.body_text,
            body_html: self.body_html,
            attachments: self.attachments,
        };
        settings.apply_files(self.server_file.as_deref(), self.auth_file.as_deref())?;
        Ok(settings)
    }

    /// Returns the default log filter for the verbosity count.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn,mailpost=info",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Accepts an address list entry; empty entries are kept and dropped later.
fn parse_address(value: &str) -> Result<String, String> {
    let value = value.trim();
    if !value.is_empty() {
        Mailbox::parse(value).map_err(|e| e.to_string())?;
    }
    Ok(value.to_string())
}

fn mailboxes(values: Vec<String>) -> Vec<Mailbox> {
    values
        .iter()
        .filter(|value| !value.is_empty())
        .filter_map(|value| Mailbox::parse(value).ok())
        .collect()
}

fn parse_header(value: &str) -> Result<String, String> {
    check_header(value)
        .map(|()| value.to_string())
        .map_err(|e| e.to_string())
}

fn parse_attachment(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value.trim());
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("file {} does not exist", path.display()))
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
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_full_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "a").unwrap();
        let file = file.to_str().unwrap();

        let cli = Cli::try_parse_from([
            "mailpost",
            "--smtp-host",
            "mail.example.com",
            "--smtp-port",
            "465",
            "--security",
            "ssl/tls",
            "--auth-method",
            "cram-md5",
            "--sender",
            "Me <me@example.com>",
            "--to",
            "a@example.com,b@example.com",
            "--to",
            "c@example.com",
            "--header",
            "X-Priority: 1",
            "--attachment",
            file,
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.security, Some(Security::Tls));
        assert_eq!(cli.auth_method, Some(AuthMethod::CramMd5));
        assert_eq!(cli.to.len(), 3);
        assert_eq!(cli.sender.as_ref().unwrap().name(), Some("Me"));
        assert_eq!(cli.headers, ["X-Priority: 1"]);
        assert_eq!(cli.attachments.len(), 1);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_rejects_bad_values() {
        let kind = |args: &[&str]| {
            let mut argv = vec!["mailpost"];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).unwrap_err().kind()
        };
        assert_eq!(kind(&["--header", "no colon here"]), ErrorKind::ValueValidation);
        assert_eq!(kind(&["--attachment", "/does/not/exist"]), ErrorKind::ValueValidation);
        assert_eq!(kind(&["--security", "smime"]), ErrorKind::ValueValidation);
        assert_eq!(kind(&["--smtp-port", "0"]), ErrorKind::ValueValidation);
        assert_eq!(kind(&["--to", "not-an-address"]), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_empty_address_entries_are_skipped() {
        let cli = Cli::try_parse_from([
            "mailpost",
            "--to",
            "a@example.com,",
            "--cc",
            ",b@example.com, ,",
        ])
        .unwrap();
        let settings = cli.into_settings().unwrap();
        assert_eq!(settings.to.len(), 1);
        assert_eq!(settings.to[0].address(), "a@example.com");
        assert_eq!(settings.cc.len(), 1);
        assert_eq!(settings.cc[0].address(), "b@example.com");
        assert!(settings.bcc.is_empty());
    }

    #[test]
    fn test_into_settings_fills_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let server = dir.path().join("server.conf");
        std::fs::write(
            &server,
            "smtp-host = file.example.com\nsmtp-port = 587\nsecurity = starttls\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "mailpost",
            "--server-file",
            server.to_str().unwrap(),
            "--smtp-port",
            "2525",
        ])
        .unwrap();
        let settings = cli.into_settings().unwrap();
        assert_eq!(settings.smtp_host.as_deref(), Some("file.example.com"));
        assert_eq!(settings.smtp_port, Some(2525));
        assert_eq!(settings.security(), Security::StartTls);
    }
}
