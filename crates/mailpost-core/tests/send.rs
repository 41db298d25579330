//! Delivers a composed message through `Mailer` to an in-process server.

use std::fs;

use mailpost_core::{Error, Mailer, Settings, ValidationError};
use mailpost_mime::Mailbox;
use mailpost_smtp::AuthMethod;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Minimal server: accepts any AUTH and records the DATA payload.
async fn serve_once(listener: TcpListener) -> (Vec<String>, String) {
    let (socket, _) = listener.accept().await.unwrap();
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);
    let mut commands = Vec::new();
    let mut data = String::new();

    write.write_all(b"220 mock.test ESMTP\r\n").await.unwrap();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap() == 0 {
            break;
        }
        let line = line.trim_end().to_string();
        commands.push(line.clone());

        if line.starts_with("EHLO") {
            write
                .write_all(b"250-mock.test\r\n250 AUTH PLAIN CRAM-MD5\r\n")
                .await
                .unwrap();
        } else if line == "AUTH CRAM-MD5" {
            write.write_all(b"334 PDEyMzRAbW9jay50ZXN0Pg==\r\n").await.unwrap();
            let mut response = String::new();
            reader.read_line(&mut response).await.unwrap();
            write.write_all(b"235 OK\r\n").await.unwrap();
        } else if line == "DATA" {
            write.write_all(b"354 Go ahead\r\n").await.unwrap();
            loop {
                let mut data_line = String::new();
                reader.read_line(&mut data_line).await.unwrap();
                if data_line == ".\r\n" {
                    break;
                }
                data.push_str(&data_line);
            }
            write.write_all(b"250 Queued\r\n").await.unwrap();
        } else if line == "QUIT" {
            write.write_all(b"221 Bye\r\n").await.unwrap();
            break;
        } else {
            write.write_all(b"250 OK\r\n").await.unwrap();
        }
    }
    (commands, data)
}

#[tokio::test]
async fn test_mailer_delivers_with_attachment() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(serve_once(listener));

    let dir = tempfile::tempdir().unwrap();
    let attachment = dir.path().join("notes.txt");
    fs::write(&attachment, "plain notes\n").unwrap();

    let settings = Settings {
        smtp_host: Some("127.0.0.1".into()),
        smtp_port: Some(port),
        auth_method: Some(AuthMethod::CramMd5),
        login: Some("user".into()),
        password: Some("secret".into()),
        sender: Some(Mailbox::parse("sender@example.com").unwrap()),
        to: vec![Mailbox::parse("to@example.com").unwrap()],
        bcc: vec![Mailbox::parse("hidden@example.com").unwrap()],
        subject: "Report".into(),
        body_text: "See attached.\\nBye".into(),
        attachments: vec![attachment],
        ..Settings::default()
    };
    let mailer = Mailer::new(settings);
    let mut message = mailer.build_message().unwrap();

    let report = mailer.send(&mut message).await.unwrap();
    assert!(report.local_addr.ip().is_loopback());

    let (commands, data) = server.await.unwrap();
    assert_eq!(commands[1], "AUTH CRAM-MD5");
    assert!(commands.contains(&"RCPT TO:<hidden@example.com>".to_string()));
    assert_eq!(commands.last().map(String::as_str), Some("QUIT"));

    assert!(data.contains("Subject: Report\r\n"));
    assert!(data.contains("See attached.\r\nBye"));
    assert!(data.contains("Content-Type: text/plain; charset=utf-8; name=\"notes.txt\""));
    assert!(data.contains("cGxhaW4gbm90ZXMK"));
    assert!(!data.contains("hidden@example.com"));
}

#[tokio::test]
async fn test_mailer_reports_all_problems_without_connecting() {
    let settings = Settings {
        auth_method: Some(AuthMethod::Plain),
        ..Settings::default()
    };
    let mailer = Mailer::new(settings);
    let mut message = mailer.build_message().unwrap();

    let Error::Validation(errors) = mailer.send(&mut message).await.unwrap_err() else {
        panic!("expected validation errors");
    };
    assert_eq!(
        &errors[..4],
        &[
            ValidationError::MissingHost,
            ValidationError::MissingPort,
            ValidationError::MissingLogin(AuthMethod::Plain),
            ValidationError::MissingPassword(AuthMethod::Plain),
        ]
    );
    assert!(errors.contains(&ValidationError::PlainAuthUnencrypted));
    assert!(errors.contains(&ValidationError::Message(
        mailpost_mime::ValidationError::MissingRecipients
    )));
}
