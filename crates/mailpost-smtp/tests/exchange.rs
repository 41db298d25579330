//! End-to-end exchanges against a scripted in-process SMTP server.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mailpost_mime::{Mailbox, Message};
use mailpost_smtp::{
    AuthMethod, Authenticator, Authorized, Credentials, Error, Security, ServerConfig, Session,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const CHALLENGE: &str = "<1896.697170952@postoffice.reston.mci.net>";

/// What the server saw during one connection.
#[derive(Debug, Default)]
struct Transcript {
    commands: Vec<String>,
    data: String,
}

/// Accepts one connection and answers like a small submission server.
///
/// `ehlo_lines` are the extension lines advertised after the hostname.
async fn spawn_server(ehlo_lines: &'static [&'static str]) -> (u16, JoinHandle<Transcript>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);
        let mut transcript = Transcript::default();

        write.write_all(b"220 mock.test ESMTP ready\r\n").await.unwrap();

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            let line = line.trim_end().to_string();
            transcript.commands.push(line.clone());
            let verb = line
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase();

            let reply = match verb.as_str() {
                "EHLO" => {
                    let mut reply = String::from("250-mock.test\r\n");
                    for (i, ext) in ehlo_lines.iter().enumerate() {
                        let sep = if i + 1 == ehlo_lines.len() { ' ' } else { '-' };
                        reply.push_str(&format!("250{sep}{ext}\r\n"));
                    }
                    if ehlo_lines.is_empty() {
                        reply = "250 mock.test\r\n".to_string();
                    }
                    reply
                }
                "AUTH" if line.contains("CRAM-MD5") => {
                    let reply = format!("334 {}\r\n", STANDARD.encode(CHALLENGE));
                    write.write_all(reply.as_bytes()).await.unwrap();
                    let mut response = String::new();
                    reader.read_line(&mut response).await.unwrap();
                    transcript.commands.push(response.trim_end().to_string());
                    "235 2.7.0 Authentication successful\r\n".to_string()
                }
                "AUTH" => "235 2.7.0 Authentication successful\r\n".to_string(),
                "MAIL" | "RCPT" | "RSET" => "250 2.1.0 OK\r\n".to_string(),
                "DATA" => {
                    write.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await.unwrap();
                    loop {
                        let mut data_line = String::new();
                        reader.read_line(&mut data_line).await.unwrap();
                        if data_line == ".\r\n" {
                            break;
                        }
                        transcript.data.push_str(&data_line);
                    }
                    "250 2.0.0 Queued\r\n".to_string()
                }
                "QUIT" => {
                    write.write_all(b"221 2.0.0 Bye\r\n").await.unwrap();
                    break;
                }
                _ => "502 5.5.2 Command not recognized\r\n".to_string(),
            };
            write.write_all(reply.as_bytes()).await.unwrap();
        }
        transcript
    });

    (port, handle)
}

fn config(port: u16) -> ServerConfig {
    ServerConfig::builder("127.0.0.1")
        .port(port)
        .security(Security::None)
        .connect_timeout(Duration::from_secs(5))
        .build()
}

fn message() -> Message {
    let mut message = Message::new();
    message.set_deterministic_ids("ID_");
    message.set_sender(Mailbox::parse("Sender <sender@example.com>").unwrap());
    message.set_recipients(
        vec![Mailbox::parse("to@example.com").unwrap()],
        vec![Mailbox::parse("cc@example.com").unwrap()],
        vec![Mailbox::parse("bcc@example.com").unwrap()],
    );
    message.set_subject("Exchange");
    message.set_body_plain_text("Hello\n.dot line\n");
    message
}

#[tokio::test]
async fn test_plain_auth_and_delivery() {
    let (port, server) = spawn_server(&["AUTH PLAIN CRAM-MD5", "SIZE 1048576"]).await;

    let client = config(port).open().await.unwrap();
    assert_eq!(client_hostname(&client), "mock.test");

    let auth = Authenticator::new(
        Some(AuthMethod::Plain),
        Credentials::new("user", "secret"),
    );
    let Authorized::Authenticated(client) = auth.authenticate(client).await.unwrap() else {
        panic!("expected an authenticated client");
    };

    let mut session = Session::new(client);
    assert!(session.local_addr().unwrap().ip().is_loopback());
    let mut message = message();
    message.send_content(&mut session).await.unwrap();
    session.quit().await.unwrap();

    let transcript = server.await.unwrap();
    let plain = STANDARD.encode("\0user\0secret");
    assert_eq!(
        transcript.commands,
        vec![
            "EHLO localhost".to_string(),
            format!("AUTH PLAIN {plain}"),
            "MAIL FROM:<sender@example.com>".to_string(),
            "RCPT TO:<to@example.com>".to_string(),
            "RCPT TO:<cc@example.com>".to_string(),
            "RCPT TO:<bcc@example.com>".to_string(),
            "DATA".to_string(),
            "QUIT".to_string(),
        ]
    );

    assert!(transcript.data.starts_with("From: \"Sender\" <sender@example.com>\r\n"));
    assert!(transcript.data.contains("Cc: <cc@example.com>\r\n"));
    assert!(!transcript.data.contains("bcc@example.com"));
    // Dot-stuffed on the wire.
    assert!(transcript.data.contains("\r\n..dot line\r\n"));
}

#[tokio::test]
async fn test_cram_md5_exchange() {
    let (port, server) = spawn_server(&["AUTH CRAM-MD5"]).await;

    let client = config(port).open().await.unwrap();
    let auth = Authenticator::new(
        Some(AuthMethod::CramMd5),
        Credentials::new("tim", "tanstaaftanstaaf"),
    );
    let Authorized::Authenticated(client) = auth.authenticate(client).await.unwrap() else {
        panic!("expected an authenticated client");
    };
    client.quit().await.unwrap();

    let transcript = server.await.unwrap();
    assert_eq!(transcript.commands[1], "AUTH CRAM-MD5");
    assert_eq!(
        transcript.commands[2],
        "dGltIGI5MTNhNjAyYzdlZGE3YTQ5NWI0ZTZlNzMzNGQzODkw"
    );
}

#[tokio::test]
async fn test_anonymous_delivery() {
    let (port, server) = spawn_server(&[]).await;

    let client = config(port).open().await.unwrap();
    let Authorized::Anonymous(client) = Authenticator::None.authenticate(client).await.unwrap()
    else {
        panic!("expected an anonymous client");
    };

    let mut session = Session::new(client);
    message().send_content(&mut session).await.unwrap();
    session.quit().await.unwrap();

    let transcript = server.await.unwrap();
    assert_eq!(transcript.commands[1], "MAIL FROM:<sender@example.com>");
}

#[tokio::test]
async fn test_auth_without_server_support() {
    let (port, server) = spawn_server(&["SIZE 1000"]).await;

    let client = config(port).open().await.unwrap();
    let auth = Authenticator::new(Some(AuthMethod::Plain), Credentials::new("u", "p"));
    let err = auth.authenticate(client).await.unwrap_err();
    assert!(matches!(err, Error::NotSupported(ref what) if what == "AUTH"));

    server.abort();
}

#[tokio::test]
async fn test_starttls_required_but_not_offered() {
    let (port, server) = spawn_server(&["AUTH PLAIN"]).await;

    let config = ServerConfig::builder("127.0.0.1")
        .port(port)
        .security(Security::StartTls)
        .build();
    let err = config.open().await.unwrap_err();
    assert!(matches!(err, Error::NotSupported(ref what) if what == "STARTTLS"));

    server.abort();
}

fn client_hostname<S>(client: &mailpost_smtp::Client<S>) -> String {
    use mailpost_smtp::SmtpConnection;
    client.server_info().hostname.clone()
}
