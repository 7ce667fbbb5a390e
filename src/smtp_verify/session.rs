use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use super::error::SmtpVerifyError;
use super::types::SmtpReply;

const MAX_LINE_LEN: usize = 2048;
const MAX_REPLY_LINES: usize = 128;

pub(crate) struct SmtpSession {
    host: String,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    pub(crate) transcript: Vec<String>,
}

impl SmtpSession {
    /// Connects to the first reachable address; every later read and write is
    /// bounded by `command_timeout`.
    pub(crate) fn connect(
        host: &str,
        addrs: &[SocketAddr],
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<(Self, SocketAddr), SmtpVerifyError> {
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(command_timeout))
                        .map_err(SmtpVerifyError::io)?;
                    stream
                        .set_write_timeout(Some(command_timeout))
                        .map_err(SmtpVerifyError::io)?;
                    let reader = BufReader::new(stream.try_clone().map_err(SmtpVerifyError::io)?);
                    let session = Self {
                        host: host.to_string(),
                        stream,
                        reader,
                        transcript: Vec::new(),
                    };
                    return Ok((session, *addr));
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(SmtpVerifyError::Connect {
            host: host.to_string(),
            source: last_err.unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "no socket address available",
                )
            }),
        })
    }

    pub(crate) fn read_greeting(&mut self) -> Result<SmtpReply, SmtpVerifyError> {
        let reply = read_reply(&mut self.reader)?;
        self.record_reply(&reply);
        Ok(reply)
    }

    pub(crate) fn send_command(&mut self, command: &str) -> Result<SmtpReply, SmtpVerifyError> {
        self.record("C", command);
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream.write_all(&line).map_err(SmtpVerifyError::io)?;
        self.stream.flush().map_err(SmtpVerifyError::io)?;
        let reply = read_reply(&mut self.reader)?;
        self.record_reply(&reply);
        Ok(reply)
    }

    /// Best-effort `QUIT`; failures only show up in the transcript.
    pub(crate) fn quit(&mut self) {
        if let Err(err) = self.send_command("QUIT") {
            self.record("!", &err.to_string());
        }
    }

    pub(crate) fn record(&mut self, direction: &str, message: &str) {
        self.transcript
            .push(format!("[{}] {direction}: {message}", self.host));
    }

    fn record_reply(&mut self, reply: &SmtpReply) {
        if reply.lines.is_empty() {
            self.record("S", &reply.code.to_string());
        } else {
            for line in &reply.lines {
                self.record("S", &format!("{} {}", reply.code, line));
            }
        }
    }
}

/// Reads one (possibly multi-line) reply.
pub(crate) fn read_reply<R: BufRead>(reader: &mut R) -> Result<SmtpReply, SmtpVerifyError> {
    let mut code = None;
    let mut lines = Vec::new();
    loop {
        let mut raw = String::new();
        let bytes = reader
            .by_ref()
            .take(MAX_LINE_LEN as u64)
            .read_line(&mut raw)
            .map_err(SmtpVerifyError::io)?;
        if bytes == 0 {
            return Err(SmtpVerifyError::io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed while reading reply",
            )));
        }
        if !raw.ends_with('\n') && bytes >= MAX_LINE_LEN {
            return Err(SmtpVerifyError::protocol("reply line too long"));
        }
        let line = raw.trim_end_matches(['\r', '\n']);

        if line.len() < 3 || !line.is_char_boundary(3) {
            return Err(SmtpVerifyError::protocol(format!("invalid SMTP reply: '{line}'")));
        }
        let code_part = &line[..3];
        let parsed_code = code_part.parse::<u16>().map_err(|_| {
            SmtpVerifyError::protocol(format!("invalid SMTP status code: '{code_part}'"))
        })?;
        if let Some(existing) = code {
            if existing != parsed_code {
                return Err(SmtpVerifyError::protocol(format!(
                    "inconsistent SMTP reply codes: {existing} vs {parsed_code}"
                )));
            }
        } else {
            code = Some(parsed_code);
        }

        let continuation = line.as_bytes().get(3) == Some(&b'-');
        lines.push(line.get(4..).unwrap_or_default().to_string());
        if !continuation {
            break;
        }
        if lines.len() >= MAX_REPLY_LINES {
            return Err(SmtpVerifyError::protocol("too many reply lines"));
        }
    }
    Ok(SmtpReply {
        code: code.ok_or_else(|| SmtpVerifyError::protocol("SMTP reply missing status code"))?,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_single_line_reply() {
        let mut input = Cursor::new(&b"250 2.1.0 Ok\r\n"[..]);
        let reply = read_reply(&mut input).expect("reply");
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines, vec!["2.1.0 Ok".to_string()]);
    }

    #[test]
    fn reads_multi_line_reply() {
        let mut input = Cursor::new(&b"250-mx.example\r\n250-SIZE 100\r\n250 STARTTLS\r\n"[..]);
        let reply = read_reply(&mut input).expect("reply");
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines.len(), 3);
        assert_eq!(reply.lines[2], "STARTTLS");
    }

    #[test]
    fn bare_code_has_empty_text() {
        let mut input = Cursor::new(&b"221\r\n"[..]);
        let reply = read_reply(&mut input).expect("reply");
        assert_eq!(reply.code, 221);
        assert_eq!(reply.lines, vec![String::new()]);
    }

    #[test]
    fn rejects_inconsistent_codes() {
        let mut input = Cursor::new(&b"250-first\r\n550 second\r\n"[..]);
        let err = read_reply(&mut input).expect_err("inconsistent");
        assert!(matches!(err, SmtpVerifyError::Protocol(_)));
    }

    #[test]
    fn rejects_garbage_and_eof() {
        let mut garbage = Cursor::new(&b"hello\r\n"[..]);
        assert!(read_reply(&mut garbage).is_err());
        let mut empty = Cursor::new(&b""[..]);
        assert!(matches!(
            read_reply(&mut empty),
            Err(SmtpVerifyError::Io { .. })
        ));
    }
}
