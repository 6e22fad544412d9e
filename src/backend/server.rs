//! Server Backend
//!
//! Blocking wire client: frames commands as `*N\r\n$len\r\n...` arrays,
//! parses replies from a growable buffer, optionally over TLS.

use bytes::{Buf, Bytes, BytesMut};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::io::{Cursor, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use tracing::debug;

use super::{Backend, Reply};
use crate::error::{Error, Result};

const READ_CHUNK: usize = 4096;

/// Backend bound to a remote server over a blocking socket.
pub struct ServerBackend {
    transport: Transport,
    buffer: BytesMut,
}

enum Transport {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Transport::Plain(s) => s.read(buf),
            Transport::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Transport::Plain(s) => s.write(buf),
            Transport::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Transport::Plain(s) => s.flush(),
            Transport::Tls(s) => s.flush(),
        }
    }
}

impl ServerBackend {
    /// Connect to `host:port`, negotiating TLS when asked, and select the
    /// requested logical database before handing the connection out.
    pub fn connect(host: &str, port: u16, tls: bool, db: u32) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).map_err(io_err)?;
        stream.set_nodelay(true).map_err(io_err)?;

        let transport = if tls {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            let config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            let name = ServerName::try_from(host.to_string())
                .map_err(|_| Error::Open(format!("invalid TLS server name: {}", host)))?;
            let conn = ClientConnection::new(Arc::new(config), name)
                .map_err(|e| Error::Open(format!("TLS setup failed: {}", e)))?;
            Transport::Tls(Box::new(StreamOwned::new(conn, stream)))
        } else {
            Transport::Plain(stream)
        };

        let mut backend = Self {
            transport,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        };
        debug!(host, port, tls, db, "connected");
        if db != 0 {
            backend.execute("SELECT", &[Bytes::from(db.to_string())])?;
        }
        Ok(backend)
    }

    fn send(&mut self, name: &str, args: &[Bytes]) -> Result<()> {
        let mut frame = Vec::with_capacity(64);
        frame.extend_from_slice(format!("*{}\r\n", args.len() + 1).as_bytes());
        frame.extend_from_slice(format!("${}\r\n", name.len()).as_bytes());
        frame.extend_from_slice(name.as_bytes());
        frame.extend_from_slice(b"\r\n");
        for arg in args {
            frame.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
            frame.extend_from_slice(arg);
            frame.extend_from_slice(b"\r\n");
        }
        self.transport.write_all(&frame).map_err(io_err)?;
        self.transport.flush().map_err(io_err)
    }

    fn read_reply(&mut self) -> Result<Reply> {
        loop {
            if let Some(reply) = self.parse_frame()? {
                return Ok(reply);
            }
            let mut chunk = [0u8; READ_CHUNK];
            let n = self.transport.read(&mut chunk).map_err(io_err)?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Reply>> {
        let mut cursor = Cursor::new(&self.buffer[..]);
        match check(&mut cursor) {
            Ok(()) => {
                let len = cursor.position() as usize;
                cursor.set_position(0);
                let reply = parse(&mut cursor)?;
                self.buffer.advance(len);
                match reply {
                    Frame::Error(message) => Err(Error::Backend(message)),
                    Frame::Value(reply) => Ok(Some(reply)),
                }
            }
            Err(ParseError::Incomplete) => Ok(None),
            Err(ParseError::Other(detail)) => Err(Error::Protocol(detail)),
        }
    }
}

impl Backend for ServerBackend {
    fn execute(&mut self, name: &str, args: &[Bytes]) -> Result<Reply> {
        self.send(name, args)?;
        self.read_reply()
    }

    fn close(&mut self) {
        let stream = match &mut self.transport {
            Transport::Plain(s) => s,
            Transport::Tls(s) => s.get_mut(),
        };
        let _ = stream.shutdown(Shutdown::Both);
    }
}

fn io_err(error: std::io::Error) -> Error {
    Error::Backend(format!("io error: {}", error))
}

enum Frame {
    Value(Reply),
    Error(String),
}

enum ParseError {
    Incomplete,
    Other(String),
}

/// Verify a complete frame sits in the buffer, advancing past it.
fn check(buf: &mut Cursor<&[u8]>) -> std::result::Result<(), ParseError> {
    match get_u8(buf)? {
        b'+' | b'-' | b':' => get_line(buf).map(|_| ()),
        b'$' => {
            let len = get_decimal(buf)?;
            if len == -1 {
                return Ok(());
            }
            let len = len as usize;
            if buf.remaining() < len + 2 {
                return Err(ParseError::Incomplete);
            }
            buf.advance(len + 2);
            Ok(())
        }
        b'*' => {
            let len = get_decimal(buf)?;
            for _ in 0..len.max(0) {
                check(buf)?;
            }
            Ok(())
        }
        other => Err(ParseError::Other(format!(
            "invalid reply type byte: 0x{:02x}",
            other
        ))),
    }
}

/// Parse a frame that `check` has already verified complete.
fn parse(buf: &mut Cursor<&[u8]>) -> Result<Frame> {
    let reply = match get_u8(buf).map_err(incomplete)? {
        b'+' => {
            let line = get_line(buf).map_err(incomplete)?;
            Frame::Value(Reply::Simple(String::from_utf8_lossy(line).into_owned()))
        }
        b'-' => {
            let line = get_line(buf).map_err(incomplete)?;
            Frame::Error(String::from_utf8_lossy(line).into_owned())
        }
        b':' => Frame::Value(Reply::Int(get_decimal(buf).map_err(incomplete)?)),
        b'$' => {
            let len = get_decimal(buf).map_err(incomplete)?;
            if len == -1 {
                Frame::Value(Reply::Nil)
            } else {
                let len = len as usize;
                let data = buf.chunk();
                if data.len() < len + 2 {
                    return Err(Error::Protocol("truncated bulk payload".to_string()));
                }
                let payload = Bytes::copy_from_slice(&data[..len]);
                buf.advance(len + 2);
                Frame::Value(Reply::Bulk(payload))
            }
        }
        b'*' => {
            let len = get_decimal(buf).map_err(incomplete)?;
            if len == -1 {
                Frame::Value(Reply::Nil)
            } else {
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    match parse(buf)? {
                        Frame::Value(item) => items.push(item),
                        Frame::Error(message) => return Err(Error::Backend(message)),
                    }
                }
                Frame::Value(Reply::Array(items))
            }
        }
        other => {
            return Err(Error::Protocol(format!(
                "invalid reply type byte: 0x{:02x}",
                other
            )))
        }
    };
    Ok(reply)
}

fn incomplete(_: ParseError) -> Error {
    Error::Protocol("truncated reply".to_string())
}

fn get_u8(buf: &mut Cursor<&[u8]>) -> std::result::Result<u8, ParseError> {
    if !buf.has_remaining() {
        return Err(ParseError::Incomplete);
    }
    Ok(buf.get_u8())
}

fn get_line<'a>(buf: &mut Cursor<&'a [u8]>) -> std::result::Result<&'a [u8], ParseError> {
    let start = buf.position() as usize;
    let data = *buf.get_ref();
    if data.is_empty() {
        return Err(ParseError::Incomplete);
    }
    for i in start..data.len() - 1 {
        if data[i] == b'\r' && data[i + 1] == b'\n' {
            buf.set_position((i + 2) as u64);
            return Ok(&data[start..i]);
        }
    }
    Err(ParseError::Incomplete)
}

fn get_decimal(buf: &mut Cursor<&[u8]>) -> std::result::Result<i64, ParseError> {
    let line = get_line(buf)?;
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ParseError::Other("invalid length header".to_string()))
}
