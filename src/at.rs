//! AT command driver for LoRa-E5 style LoRaWAN modems.
//!
//! The modem runs the whole LoRaWAN stack; this module only formats
//! commands, splits the UART stream into lines and classifies the replies.
//! It is generic over an [`AtTransport`] so the exchange logic is tested
//! on desktop against a scripted transport.
//!
//! # Command Flow
//!
//! ```text
//! join:  AT+MODE=LWOTAA, AT+ID=DevEui,"…", AT+ID=AppEui,"…",
//!        AT+KEY=APPKEY,"…", [AT+DR=EU868], AT+JOIN  → "+JOIN: Network joined"
//! send:  [AT+PORT=2], AT+MSGHEX="0303E8…"           → "+MSGHEX: Done"
//! sleep: AT+LOWPOWER
//! ```
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::at::{classify, AtResponse};
//!
//! assert_eq!(classify("+JOIN: Network joined"), AtResponse::Joined);
//! assert_eq!(classify("+MSGHEX: Done"), AtResponse::Done);
//! assert_eq!(classify("+MSGHEX: ERROR(-12)"), AtResponse::Error(-12));
//! ```

use core::fmt::{self, Write};

use crate::config::ShortString;
use crate::traits::{Downlink, JoinCredentials, RadioLink};

/// Longest command or response line handled.
pub const MAX_LINE: usize = 128;

/// One command or response line.
pub type AtLine = heapless::String<MAX_LINE>;

/// Byte transport to the modem (a UART on hardware).
pub trait AtTransport {
    /// Error type for the transport.
    type Error: fmt::Debug;

    /// Write `line` followed by CRLF.
    fn write_line(&mut self, line: &str) -> Result<(), Self::Error>;

    /// Read one byte, waiting at most `timeout_ms`. `Ok(None)` on timeout.
    fn read_byte(&mut self, timeout_ms: u32) -> Result<Option<u8>, Self::Error>;

    /// Discard anything already received.
    fn clear_input(&mut self) -> Result<(), Self::Error> {
        while self.read_byte(0)?.is_some() {}
        Ok(())
    }
}

/// Modem exchange failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AtError<E> {
    /// The transport failed.
    Transport(E),
    /// No terminal reply within the timeout.
    Timeout,
    /// The modem reported `ERROR(code)`.
    Code(i16),
    /// The modem refused the request (not joined, no free band, ...).
    Rejected,
    /// The join procedure finished without a session.
    JoinFailed,
    /// A command did not fit in [`MAX_LINE`].
    Overflow,
}

impl<E: fmt::Debug> fmt::Display for AtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtError::Transport(e) => write!(f, "transport error: {:?}", e),
            AtError::Timeout => write!(f, "modem timeout"),
            AtError::Code(code) => write!(f, "modem error {}", code),
            AtError::Rejected => write!(f, "modem rejected request"),
            AtError::JoinFailed => write!(f, "join failed"),
            AtError::Overflow => write!(f, "command too long"),
        }
    }
}

// ============================================================================
// Command builders
// ============================================================================

fn command(args: fmt::Arguments<'_>) -> Option<AtLine> {
    let mut line = AtLine::new();
    line.write_fmt(args).ok()?;
    Some(line)
}

fn write_hex(out: &mut AtLine, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(out, "{:02X}", b)?;
    }
    Ok(())
}

/// `AT+MODE=LWOTAA`
pub fn mode_otaa() -> Option<AtLine> {
    command(format_args!("AT+MODE=LWOTAA"))
}

/// `AT+ID=DevEui,"…"`
pub fn set_dev_eui(eui: u64) -> Option<AtLine> {
    command(format_args!("AT+ID=DevEui,\"{:016X}\"", eui))
}

/// `AT+ID=AppEui,"…"` (JoinEUI)
pub fn set_join_eui(eui: u64) -> Option<AtLine> {
    command(format_args!("AT+ID=AppEui,\"{:016X}\"", eui))
}

/// `AT+KEY=APPKEY,"…"`
pub fn set_app_key(key: &[u8; 16]) -> Option<AtLine> {
    let mut line = command(format_args!("AT+KEY=APPKEY,\""))?;
    write_hex(&mut line, key).ok()?;
    line.push('"').ok()?;
    Some(line)
}

/// `AT+DR=<region>`
pub fn set_region(region: &str) -> Option<AtLine> {
    command(format_args!("AT+DR={}", region))
}

/// `AT+JOIN`
pub fn join() -> Option<AtLine> {
    command(format_args!("AT+JOIN"))
}

/// `AT+PORT=<port>`
pub fn set_port(port: u8) -> Option<AtLine> {
    command(format_args!("AT+PORT={}", port))
}

/// `AT+MSGHEX="…"` (unconfirmed uplink)
pub fn msg_hex(payload: &[u8]) -> Option<AtLine> {
    let mut line = command(format_args!("AT+MSGHEX=\""))?;
    write_hex(&mut line, payload).ok()?;
    line.push('"').ok()?;
    Some(line)
}

/// `AT+LOWPOWER`
pub fn low_power() -> Option<AtLine> {
    command(format_args!("AT+LOWPOWER"))
}

// ============================================================================
// Response classification
// ============================================================================

/// Meaning of one response line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AtResponse {
    /// Intermediate or echo line.
    Info,
    /// Join succeeded (or the modem was already joined).
    Joined,
    /// Join procedure failed.
    JoinFailed,
    /// Message exchange finished.
    Done,
    /// `ERROR(code)`.
    Error(i16),
    /// Request refused (not joined, length error, no free band).
    Rejected,
    /// Data received in a receive window.
    Downlink(Downlink),
}

impl AtResponse {
    /// Returns true if the exchange is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AtResponse::Info | AtResponse::Downlink(_))
    }
}

/// Classify one response line (without CRLF).
pub fn classify(line: &str) -> AtResponse {
    let line = line.trim();
    let body = match line.split_once(':') {
        Some((_, body)) => body.trim(),
        None => line,
    };

    if let Some(code) = parse_error(body) {
        return AtResponse::Error(code);
    }
    if line.starts_with("+JOIN") {
        return if body.starts_with("Network joined") || body.starts_with("Joined already") {
            AtResponse::Joined
        } else if body.starts_with("Join failed") {
            AtResponse::JoinFailed
        } else {
            AtResponse::Info
        };
    }
    if line.starts_with("+MSG") || line.starts_with("+CMSG") {
        if body == "Done" {
            return AtResponse::Done;
        }
        if body.starts_with("Please join")
            || body.starts_with("Length error")
            || body.starts_with("No band")
            || body.starts_with("DR error")
        {
            return AtResponse::Rejected;
        }
        if let Some(downlink) = parse_downlink(body) {
            return AtResponse::Downlink(downlink);
        }
        return AtResponse::Info;
    }
    if line == "OK" {
        return AtResponse::Done;
    }
    AtResponse::Info
}

/// `+CMD` for an `AT+CMD[=...]` command line.
fn echo_prefix(line: &str) -> Option<&str> {
    let cmd = line.strip_prefix("AT")?;
    let end = cmd.find(['=', '?']).unwrap_or(cmd.len());
    Some(&cmd[..end]).filter(|c| c.len() > 1 && c.starts_with('+'))
}

/// Returns true if `reply` is `<prefix>: ...`.
fn is_echo(reply: &str, prefix: &str) -> bool {
    reply
        .trim()
        .strip_prefix(prefix)
        .map_or(false, |rest| rest.trim_start().starts_with(':'))
}

fn parse_error(body: &str) -> Option<i16> {
    let rest = body.strip_prefix("ERROR(")?;
    let (code, _) = rest.split_once(')')?;
    code.trim().parse().ok()
}

/// Parse `PORT: 1; RX: "0A0B"`.
fn parse_downlink(body: &str) -> Option<Downlink> {
    let rest = body.strip_prefix("PORT:")?;
    let (port, rx) = rest.split_once(';')?;
    let port: u8 = port.trim().parse().ok()?;
    let hex = rx.trim().strip_prefix("RX:")?.trim().trim_matches('"');
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut data = heapless::Vec::new();
    for pair in hex.as_bytes().chunks(2) {
        let pair = core::str::from_utf8(pair).ok()?;
        data.push(u8::from_str_radix(pair, 16).ok()?).ok()?;
    }
    Some(Downlink { port, data })
}

// ============================================================================
// Line assembly
// ============================================================================

/// Splits a byte stream into lines on `\n`, dropping `\r`.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: heapless::Vec<u8, MAX_LINE>,
    overflowed: bool,
}

impl LineAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a complete, non-empty line when `\n` arrives.
    ///
    /// Overlong lines are dropped whole.
    pub fn push(&mut self, byte: u8) -> Option<AtLine> {
        match byte {
            b'\r' => None,
            b'\n' => {
                let overflowed = core::mem::replace(&mut self.overflowed, false);
                let line = core::str::from_utf8(&self.buf)
                    .ok()
                    .filter(|s| !overflowed && !s.trim().is_empty())
                    .and_then(|s| {
                        let mut out = AtLine::new();
                        out.push_str(s).ok().map(|_| out)
                    });
                self.buf.clear();
                line
            }
            b => {
                if self.buf.push(b).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }
}

// ============================================================================
// Modem driver
// ============================================================================

/// Timeouts for modem exchanges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtTimeouts {
    /// Configuration commands.
    pub command_ms: u32,
    /// `AT+JOIN` (covers both join accept windows).
    pub join_ms: u32,
    /// `AT+MSGHEX` (covers both receive windows).
    pub send_ms: u32,
}

impl Default for AtTimeouts {
    fn default() -> Self {
        Self {
            command_ms: 1_000,
            join_ms: 20_000,
            send_ms: 15_000,
        }
    }
}

/// Read granularity while waiting for replies.
const POLL_MS: u32 = 50;

/// LoRaWAN radio behind an AT command modem.
pub struct AtModem<T> {
    transport: T,
    region: ShortString,
    timeouts: AtTimeouts,
    port: Option<u8>,
    downlink: Option<Downlink>,
}

impl<T: AtTransport> AtModem<T> {
    /// Wrap a transport. `region` is sent as `AT+DR=` before joining when
    /// non-empty.
    pub fn new(transport: T, region: &str) -> Self {
        Self {
            transport,
            region: crate::config::short_string(region),
            timeouts: AtTimeouts::default(),
            port: None,
            downlink: None,
        }
    }

    /// Override the exchange timeouts.
    pub fn with_timeouts(mut self, timeouts: AtTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `line` and wait for a terminal reply.
    ///
    /// Downlink lines seen on the way are kept for [`RadioLink::take_downlink`].
    pub fn exchange(
        &mut self,
        line: Option<AtLine>,
        timeout_ms: u32,
    ) -> Result<AtResponse, AtError<T::Error>> {
        self.exchange_until(line, timeout_ms, false)
    }

    /// As [`exchange`](Self::exchange). With `settle_on_echo`, a `+CMD: ...`
    /// line answering `AT+CMD...` also ends the exchange as [`AtResponse::Done`].
    fn exchange_until(
        &mut self,
        line: Option<AtLine>,
        timeout_ms: u32,
        settle_on_echo: bool,
    ) -> Result<AtResponse, AtError<T::Error>> {
        let line = line.ok_or(AtError::Overflow)?;
        let echo = if settle_on_echo { echo_prefix(&line) } else { None };
        self.transport.clear_input().map_err(AtError::Transport)?;
        log::debug!("at >> {}", line);
        self.transport
            .write_line(&line)
            .map_err(AtError::Transport)?;

        let mut assembler = LineAssembler::new();
        let mut waited = 0;
        while waited <= timeout_ms {
            match self
                .transport
                .read_byte(POLL_MS)
                .map_err(AtError::Transport)?
            {
                Some(byte) => {
                    if let Some(reply) = assembler.push(byte) {
                        log::debug!("at << {}", reply);
                        match classify(&reply) {
                            AtResponse::Downlink(downlink) => self.downlink = Some(downlink),
                            AtResponse::Info if echo.map_or(false, |e| is_echo(&reply, e)) => {
                                return Ok(AtResponse::Done)
                            }
                            AtResponse::Info => {}
                            terminal => return Ok(terminal),
                        }
                    }
                }
                None => waited += POLL_MS,
            }
        }
        Err(AtError::Timeout)
    }

    /// Configuration command: anything but an error counts as accepted,
    /// including silence from modems that do not echo settings.
    fn configure(&mut self, line: Option<AtLine>) -> Result<(), AtError<T::Error>> {
        match self.exchange_until(line, self.timeouts.command_ms, true) {
            Ok(AtResponse::Error(code)) => Err(AtError::Code(code)),
            Ok(AtResponse::Rejected) => Err(AtError::Rejected),
            Ok(_) | Err(AtError::Timeout) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Consume the modem and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: AtTransport> RadioLink for AtModem<T> {
    type Error = AtError<T::Error>;

    fn join(&mut self, credentials: &JoinCredentials) -> Result<(), Self::Error> {
        self.configure(mode_otaa())?;
        self.configure(set_dev_eui(credentials.dev_eui))?;
        self.configure(set_join_eui(credentials.join_eui))?;
        self.configure(set_app_key(&credentials.app_key))?;
        if !self.region.is_empty() {
            let region = self.region.clone();
            self.configure(set_region(&region))?;
        }
        self.port = None;

        match self.exchange(join(), self.timeouts.join_ms)? {
            AtResponse::Joined => Ok(()),
            AtResponse::Error(code) => Err(AtError::Code(code)),
            _ => Err(AtError::JoinFailed),
        }
    }

    fn send(&mut self, payload: &[u8], port: u8) -> Result<(), Self::Error> {
        if self.port != Some(port) {
            self.configure(set_port(port))?;
            self.port = Some(port);
        }
        self.downlink = None;
        match self.exchange(msg_hex(payload), self.timeouts.send_ms)? {
            AtResponse::Done => Ok(()),
            AtResponse::Error(code) => Err(AtError::Code(code)),
            _ => Err(AtError::Rejected),
        }
    }

    fn take_downlink(&mut self) -> Option<Downlink> {
        self.downlink.take()
    }

    fn sleep(&mut self) -> Result<(), Self::Error> {
        self.configure(low_power())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockAtTransport;

    #[test]
    fn command_formatting() {
        assert_eq!(set_dev_eui(0x0004_A30B_001C_0530).unwrap().as_str(), "AT+ID=DevEui,\"0004A30B001C0530\"");
        assert_eq!(set_join_eui(1).unwrap().as_str(), "AT+ID=AppEui,\"0000000000000001\"");
        let mut key = [0u8; 16];
        key[15] = 0xAB;
        assert_eq!(
            set_app_key(&key).unwrap().as_str(),
            "AT+KEY=APPKEY,\"000000000000000000000000000000AB\""
        );
        assert_eq!(set_port(2).unwrap().as_str(), "AT+PORT=2");
        assert_eq!(msg_hex(&[3, 0x03, 0xE8]).unwrap().as_str(), "AT+MSGHEX=\"0303E8\"");
    }

    #[test]
    fn classify_join_lines() {
        assert_eq!(classify("+JOIN: Start"), AtResponse::Info);
        assert_eq!(classify("+JOIN: NORMAL"), AtResponse::Info);
        assert_eq!(classify("+JOIN: Network joined"), AtResponse::Joined);
        assert_eq!(classify("+JOIN: Joined already"), AtResponse::Joined);
        assert_eq!(classify("+JOIN: Join failed"), AtResponse::JoinFailed);
        assert_eq!(classify("+JOIN: ERROR(-1)"), AtResponse::Error(-1));
    }

    #[test]
    fn classify_msg_lines() {
        assert_eq!(classify("+MSGHEX: Start"), AtResponse::Info);
        assert_eq!(classify("+MSGHEX: Done\r"), AtResponse::Done);
        assert_eq!(classify("+MSGHEX: Please join network first"), AtResponse::Rejected);
        assert_eq!(classify("+MSGHEX: No band in 13897ms"), AtResponse::Rejected);
        assert_eq!(classify("+MSGHEX: RXWIN2, RSSI -106, SNR 4.0"), AtResponse::Info);
        assert_eq!(classify("+PORT: 2"), AtResponse::Info);
    }

    #[test]
    fn classify_downlink() {
        let response = classify("+MSGHEX: PORT: 1; RX: \"0A0B\"");
        let mut data = heapless::Vec::new();
        data.extend_from_slice(&[0x0A, 0x0B]).unwrap();
        assert_eq!(response, AtResponse::Downlink(Downlink { port: 1, data }));
        assert!(!response.is_terminal());
    }

    #[test]
    fn line_assembler_splits_and_drops_blank() {
        let mut lines = LineAssembler::new();
        let mut out = heapless::Vec::<AtLine, 4>::new();
        for b in b"\r\n+JOIN: Start\r\n\r\n+JOIN: Done\r\n" {
            if let Some(line) = lines.push(*b) {
                out.push(line).unwrap();
            }
        }
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_str(), "+JOIN: Start");
        assert_eq!(out[1].as_str(), "+JOIN: Done");
    }

    #[test]
    fn line_assembler_drops_overlong_line() {
        let mut lines = LineAssembler::new();
        for _ in 0..MAX_LINE + 10 {
            assert!(lines.push(b'x').is_none());
        }
        assert!(lines.push(b'\n').is_none());
        for b in b"OK" {
            lines.push(*b);
        }
        assert_eq!(lines.push(b'\n').unwrap().as_str(), "OK");
    }

    #[test]
    fn modem_join_success() {
        let mut transport = MockAtTransport::new();
        for _ in 0..5 {
            transport.reply("+OK");
        }
        transport.reply("+JOIN: Start\r\n+JOIN: NORMAL\r\n+JOIN: Network joined\r\n+JOIN: Done");
        let mut modem = AtModem::new(transport, "EU868");

        modem.join(&JoinCredentials::default()).unwrap();
        let written = &modem.transport().written;
        assert_eq!(written.len(), 6);
        assert_eq!(written[0], "AT+MODE=LWOTAA");
        assert_eq!(written[4], "AT+DR=EU868");
        assert_eq!(written[5], "AT+JOIN");
    }

    #[test]
    fn settings_echo_ends_the_exchange() {
        assert_eq!(echo_prefix("AT+ID=DevEui,\"01\""), Some("+ID"));
        assert_eq!(echo_prefix("AT+LOWPOWER"), Some("+LOWPOWER"));
        assert_eq!(echo_prefix("AT"), None);
        assert!(is_echo("+MODE: LWOTAA", "+MODE"));
        assert!(!is_echo("+MODEX: 1", "+MODE"));

        let mut transport = MockAtTransport::new();
        transport.reply("+MODE: LWOTAA");
        transport.reply("+ID: DevEui, 00:00:00:00:00:00:00:00");
        transport.reply("+ID: AppEui, 00:00:00:00:00:00:00:00");
        transport.reply("+KEY: APPKEY 00000000000000000000000000000000");
        transport.reply("+JOIN: Start\r\n+JOIN: Network joined");
        let mut modem = AtModem::new(transport, "");

        modem.join(&JoinCredentials::default()).unwrap();
        assert_eq!(modem.transport().idle_polls, 0);
    }

    #[test]
    fn modem_join_failure() {
        let mut transport = MockAtTransport::new();
        for _ in 0..4 {
            transport.reply("+OK");
        }
        transport.reply("+JOIN: Start\r\n+JOIN: Join failed\r\n+JOIN: Done");
        let mut modem = AtModem::new(transport, "");

        assert_eq!(
            modem.join(&JoinCredentials::default()),
            Err(AtError::JoinFailed)
        );
    }

    #[test]
    fn modem_send_sets_port_once_and_keeps_downlink() {
        let mut transport = MockAtTransport::new();
        transport.reply("+PORT: 2");
        transport.reply("+MSGHEX: Start\r\n+MSGHEX: PORT: 1; RX: \"FF\"\r\n+MSGHEX: Done");
        transport.reply("+MSGHEX: Start\r\n+MSGHEX: Done");
        let mut modem = AtModem::new(transport, "");

        modem.send(&[1, 2, 3], 2).unwrap();
        let downlink = modem.take_downlink().unwrap();
        assert_eq!(downlink.port, 1);
        assert_eq!(downlink.data.as_slice(), &[0xFF]);

        modem.send(&[1, 2, 3], 2).unwrap();
        assert!(modem.take_downlink().is_none());

        let written = &modem.transport().written;
        assert_eq!(written.len(), 3);
        assert_eq!(written[0], "AT+PORT=2");
        assert_eq!(written[1], "AT+MSGHEX=\"010203\"");
    }

    #[test]
    fn modem_send_not_joined_is_rejected() {
        let mut transport = MockAtTransport::new();
        transport.reply("+PORT: 2");
        transport.reply("+MSGHEX: Please join network first");
        let mut modem = AtModem::new(transport, "");

        assert_eq!(modem.send(&[1], 2), Err(AtError::Rejected));
    }

    #[test]
    fn modem_send_timeout() {
        let mut transport = MockAtTransport::new();
        transport.reply("+PORT: 2");
        transport.reply("+MSGHEX: Start");
        let mut modem = AtModem::new(transport, "").with_timeouts(AtTimeouts {
            command_ms: 100,
            join_ms: 100,
            send_ms: 100,
        });

        assert_eq!(modem.send(&[1], 2), Err(AtError::Timeout));
    }
}
