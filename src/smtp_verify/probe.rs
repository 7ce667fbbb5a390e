use std::fmt;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use crate::mx::{MxRecord, SystemResolver};

use super::SmtpProber;
use super::error::SmtpVerifyError;
use super::options::MailboxProbeOptions;
use super::session::SmtpSession;
use super::types::{ProbeRequest, RcptVerdict, Sender, SmtpDetails};
use super::util::random_local_part;

/// [`SmtpProber`] speaking plain SMTP over TCP, without ever sending `DATA`.
///
/// MX host names are resolved through the shared DNS resolver when one is
/// attached, so the `[dns]` timeout bounds them too. Without one the
/// operating system's resolver is used.
#[derive(Clone, Default)]
pub struct SmtpVerifier {
    options: MailboxProbeOptions,
    resolver: Option<Arc<SystemResolver>>,
}

impl fmt::Debug for SmtpVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpVerifier")
            .field("options", &self.options)
            .field("dns_resolver", &self.resolver.is_some())
            .finish()
    }
}

impl SmtpVerifier {
    pub fn new(options: MailboxProbeOptions) -> Self {
        Self {
            options,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<SystemResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn options(&self) -> &MailboxProbeOptions {
        &self.options
    }

    fn mail_from(&self, request: &ProbeRequest<'_>) -> String {
        match request.sender {
            Sender::Address(address) if !address.trim().is_empty() => {
                format!("MAIL FROM:<{}>", address.trim())
            }
            Sender::Address(_) | Sender::NullPath => "MAIL FROM:<>".to_string(),
            Sender::ProberDefault => {
                format!("MAIL FROM:<{}>", self.options.default_sender(request.domain))
            }
        }
    }

    fn connect(&self, record: &MxRecord) -> Result<SmtpSession, SmtpVerifyError> {
        let addrs = self.socket_addrs(&record.exchange)?;
        let (session, peer) = SmtpSession::connect(
            &record.exchange,
            &addrs,
            self.options.connect_timeout,
            self.options.command_timeout,
        )?;
        tracing::debug!(host = %record.exchange, %peer, "SMTP connection established");
        Ok(session)
    }

    fn socket_addrs(&self, exchange: &str) -> Result<Vec<SocketAddr>, SmtpVerifyError> {
        let port = self.options.port;
        if let Ok(ip) = exchange.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }
        let Some(resolver) = &self.resolver else {
            return resolve_socket_addrs(exchange, port);
        };
        let ips = resolver
            .lookup_ips(exchange)
            .map_err(|source| SmtpVerifyError::HostLookup {
                host: exchange.to_string(),
                source,
            })?;
        if ips.is_empty() {
            return Err(no_addresses(exchange));
        }
        Ok(ips.into_iter().map(|ip| SocketAddr::new(ip, port)).collect())
    }

    /// Runs the envelope dialogue on an already greeted session.
    fn converse(
        &self,
        session: &mut SmtpSession,
        request: &ProbeRequest<'_>,
        details: &mut SmtpDetails,
    ) -> Result<(), SmtpVerifyError> {
        let helo = self.options.helo_name(request.domain).into_owned();
        let ehlo = session.send_command(&format!("EHLO {helo}"))?;
        if !ehlo.is_positive_completion() {
            let helo_reply = session.send_command(&format!("HELO {helo}"))?;
            if !helo_reply.is_positive_completion() {
                details.error = Some(format!("EHLO/HELO rejected: {helo_reply}"));
                return Ok(());
            }
        }

        let mail_reply = session.send_command(&self.mail_from(request))?;
        if !mail_reply.is_positive_completion() {
            details.error = Some(format!("MAIL FROM rejected: {mail_reply}"));
            return Ok(());
        }

        let recipient = request.recipient();
        let rcpt_reply = session.send_command(&format!("RCPT TO:<{recipient}>"))?;
        match RcptVerdict::classify(&rcpt_reply) {
            RcptVerdict::Deliverable => details.is_deliverable = true,
            RcptVerdict::FullInbox => details.has_full_inbox = true,
            RcptVerdict::Disabled => details.is_disabled = true,
            RcptVerdict::Undeliverable => {}
            RcptVerdict::Inconclusive => {
                details.error = Some(format!("RCPT TO inconclusive: {rcpt_reply}"));
            }
        }
        details.reply = Some(rcpt_reply);

        if details.is_deliverable {
            details.is_catch_all = self.probe_catch_all(session, request)?;
        }

        if let Err(err) = session.send_command("RSET") {
            session.record("!", &err.to_string());
        }
        Ok(())
    }

    fn probe_catch_all(
        &self,
        session: &mut SmtpSession,
        request: &ProbeRequest<'_>,
    ) -> Result<bool, SmtpVerifyError> {
        for _ in 0..self.options.catchall_probes.min(5) {
            let alias = random_local_part(request.local.len());
            if alias == request.local {
                continue;
            }
            let reply = session.send_command(&format!("RCPT TO:<{alias}@{}>", request.domain))?;
            if reply.is_positive_completion() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl SmtpProber for SmtpVerifier {
    fn probe(&self, request: &ProbeRequest<'_>) -> SmtpDetails {
        let mut transcript = Vec::new();
        let mut last_error = SmtpVerifyError::NoSmtpServers.to_string();

        for record in request.mx_hosts.iter().take(self.options.max_mx.max(1)) {
            let mut session = match self.connect(record) {
                Ok(session) => session,
                Err(err) => {
                    tracing::debug!(host = %record.exchange, error = %err, "MX host unreachable");
                    transcript.push(format!("[{}] !: {err}", record.exchange));
                    last_error = err.to_string();
                    continue;
                }
            };

            match session.read_greeting() {
                Ok(greeting) if greeting.is_positive_completion() => {}
                Ok(greeting) => {
                    last_error = format!("{} refused the session: {greeting}", record.exchange);
                    session.quit();
                    transcript.append(&mut session.transcript);
                    continue;
                }
                Err(err) => {
                    last_error = format!("{}: no greeting ({err})", record.exchange);
                    session.record("!", &err.to_string());
                    transcript.append(&mut session.transcript);
                    continue;
                }
            }

            let mut details = SmtpDetails {
                can_connect: true,
                mx_host: Some(record.exchange.clone()),
                ..SmtpDetails::default()
            };
            match self.converse(&mut session, request, &mut details) {
                Ok(()) => session.quit(),
                Err(err) => {
                    session.record("!", &err.to_string());
                    details.error = Some(err.to_string());
                }
            }
            transcript.append(&mut session.transcript);
            details.transcript = transcript;
            return details;
        }

        SmtpDetails {
            transcript,
            ..SmtpDetails::unreachable(last_error)
        }
    }
}

fn resolve_socket_addrs(exchange: &str, port: u16) -> Result<Vec<SocketAddr>, SmtpVerifyError> {
    let addrs: Vec<SocketAddr> = (exchange, port)
        .to_socket_addrs()
        .map_err(|source| SmtpVerifyError::Resolve {
            host: exchange.to_string(),
            source,
        })?
        .collect();
    if addrs.is_empty() {
        return Err(no_addresses(exchange));
    }
    Ok(addrs)
}

fn no_addresses(exchange: &str) -> SmtpVerifyError {
    SmtpVerifyError::Resolve {
        host: exchange.to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "no socket addresses resolved",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    fn spawn_mock_server(
        script: Vec<(&'static str, &'static str)>,
    ) -> (u16, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("addr").port();
        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            ready_tx.send(()).ok();
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = handle_session(&mut stream, script);
            }
        });
        ready_rx.recv().expect("server ready");
        (port, handle)
    }

    fn handle_session(
        stream: &mut TcpStream,
        script: Vec<(&'static str, &'static str)>,
    ) -> io::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        stream.write_all(b"220 mock.smtp.test ESMTP\r\n")?;
        stream.flush()?;
        for (expected, response) in script {
            let mut line = String::new();
            reader.read_line(&mut line)?;
            assert!(
                line.starts_with(expected),
                "expected command starting with '{expected}', got '{line}'"
            );
            stream.write_all(response.as_bytes())?;
            stream.flush()?;
        }
        Ok(())
    }

    fn verifier(port: u16, catchall_probes: u8) -> SmtpVerifier {
        SmtpVerifier::new(MailboxProbeOptions {
            port,
            helo_domain: Some("probe.test".to_string()),
            catchall_probes,
            ..MailboxProbeOptions::default()
        })
    }

    fn request<'a>(hosts: &'a [MxRecord], sender: Sender<'a>) -> ProbeRequest<'a> {
        ProbeRequest {
            domain: "example.com",
            mx_hosts: hosts,
            local: "user",
            sender,
        }
    }

    #[test]
    fn mail_from_follows_sender_policy() {
        let verifier = verifier(25, 0);
        let hosts: [MxRecord; 0] = [];
        assert_eq!(
            verifier.mail_from(&request(&hosts, Sender::Address("me@probe.test"))),
            "MAIL FROM:<me@probe.test>"
        );
        assert_eq!(
            verifier.mail_from(&request(&hosts, Sender::ProberDefault)),
            "MAIL FROM:<postmaster@probe.test>"
        );
        assert_eq!(
            verifier.mail_from(&request(&hosts, Sender::NullPath)),
            "MAIL FROM:<>"
        );
        assert_eq!(
            verifier.mail_from(&request(&hosts, Sender::Address(" "))),
            "MAIL FROM:<>"
        );
    }

    #[test]
    fn ip_literal_hosts_skip_dns() {
        let addrs = verifier(2525, 0).socket_addrs("192.0.2.7").expect("literal");
        assert_eq!(addrs, vec![SocketAddr::from(([192, 0, 2, 7], 2525))]);

        let addrs = verifier(25, 0).socket_addrs("::1").expect("literal");
        assert_eq!(addrs, vec![SocketAddr::new(IpAddr::from([0u16, 0, 0, 0, 0, 0, 0, 1]), 25)]);
    }

    #[test]
    fn no_hosts_means_no_connection() {
        let details = verifier(25, 0).probe(&request(&[], Sender::NullPath));
        assert!(!details.can_connect);
        assert!(details.error.is_some());
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn delivers_via_rcpt_to() {
        let (port, handle) = spawn_mock_server(vec![
            ("EHLO probe.test", "250-mock.example\r\n250 SIZE 1000\r\n"),
            ("MAIL FROM:<me@probe.test>", "250 2.1.0 Ok\r\n"),
            ("RCPT TO:<user@example.com>", "250 2.1.5 Ok\r\n"),
            ("RSET", "250 2.0.0 Reset\r\n"),
            ("QUIT", "221 2.0.0 Bye\r\n"),
        ]);
        let hosts = [MxRecord::new(10, "127.0.0.1")];
        let details = verifier(port, 0).probe(&request(&hosts, Sender::Address("me@probe.test")));
        assert!(details.can_connect);
        assert!(details.is_valid(), "{details:?}");
        assert!(!details.is_catch_all);
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn flags_catch_all_and_full_inbox() {
        let (port, handle) = spawn_mock_server(vec![
            ("EHLO", "250 mock.example\r\n"),
            ("MAIL FROM:<>", "250 2.1.0 Ok\r\n"),
            ("RCPT TO:<user@example.com>", "250 2.1.5 Ok\r\n"),
            ("RCPT TO:", "250 2.1.5 Ok\r\n"),
            ("RSET", "250 2.0.0 Reset\r\n"),
            ("QUIT", "221 2.0.0 Bye\r\n"),
        ]);
        let hosts = [MxRecord::new(10, "127.0.0.1")];
        let details = verifier(port, 1).probe(&request(&hosts, Sender::NullPath));
        assert!(details.is_catch_all);
        handle.join().expect("server thread");

        let (port, handle) = spawn_mock_server(vec![
            ("EHLO", "250 mock.example\r\n"),
            ("MAIL FROM:", "250 2.1.0 Ok\r\n"),
            ("RCPT TO:", "552 5.2.2 Mailbox full\r\n"),
            ("RSET", "250 2.0.0 Reset\r\n"),
            ("QUIT", "221 2.0.0 Bye\r\n"),
        ]);
        let details = verifier(port, 1).probe(&request(&hosts, Sender::ProberDefault));
        assert!(details.can_connect);
        assert!(details.has_full_inbox);
        assert!(!details.is_valid());
        handle.join().expect("server thread");
    }

    #[test]
    #[ignore = "requires loopback TCP binding"]
    fn falls_back_to_helo() {
        let (port, handle) = spawn_mock_server(vec![
            ("EHLO", "502 5.5.2 Command not recognized\r\n"),
            ("HELO probe.test", "250 mock.example\r\n"),
            ("MAIL FROM:", "250 2.1.0 Ok\r\n"),
            ("RCPT TO:", "550 5.1.1 User unknown\r\n"),
            ("RSET", "250 2.0.0 Reset\r\n"),
            ("QUIT", "221 2.0.0 Bye\r\n"),
        ]);
        let hosts = [MxRecord::new(10, "127.0.0.1")];
        let details = verifier(port, 0).probe(&request(&hosts, Sender::NullPath));
        assert!(details.can_connect);
        assert!(!details.is_deliverable);
        assert_eq!(details.reply.as_ref().map(|r| r.code), Some(550));
        handle.join().expect("server thread");
    }
}
