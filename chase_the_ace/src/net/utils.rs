use std::io::{self, BufRead, Read, Write};

/// Maximum allowed payload size to prevent unbounded allocation from a
/// hostile or corrupted length prefix.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Read one newline-terminated line, without the terminator.
///
/// A clean EOF before any byte is an `UnexpectedEof` error so callers see
/// closed connections as transport failures.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

/// Write one line, appending the terminator, and flush.
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Write a control line and its raw payload in a single chunk to prevent
/// read-side EOF race conditions.
pub fn write_sized<W: Write>(writer: &mut W, control: &str, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "payload size {} exceeds maximum allowed size of {} bytes",
                payload.len(),
                MAX_PAYLOAD_SIZE
            ),
        ));
    }
    let mut buf = Vec::with_capacity(control.len() + 1 + payload.len());
    buf.extend_from_slice(control.as_bytes());
    buf.push(b'\n');
    buf.extend_from_slice(payload);
    writer.write_all(&buf)?;
    writer.flush()
}

/// Read exactly `len` raw payload bytes, regardless of intermediate
/// buffering. The size is validated before any allocation.
pub fn read_payload<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("payload size {len} exceeds maximum allowed size of {MAX_PAYLOAD_SIZE} bytes"),
        ));
    }
    let mut buf = vec![0; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, BufReader, Write},
        net::{TcpListener, TcpStream},
    };

    use super::{MAX_PAYLOAD_SIZE, read_line, read_payload, write_line, write_sized};

    fn setup() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (stream, _) = listener.accept().unwrap();
        (client, stream)
    }

    #[test]
    fn write_and_read_line() {
        let (client, mut stream) = setup();
        let mut reader = BufReader::new(client);
        assert!(write_line(&mut stream, "WAITING:hello").is_ok());
        assert_eq!(read_line(&mut reader).unwrap(), "WAITING:hello");
    }

    #[test]
    fn read_line_strips_crlf() {
        let (client, mut stream) = setup();
        let mut reader = BufReader::new(client);
        assert!(stream.write_all(b"keep\r\n").is_ok());
        assert_eq!(read_line(&mut reader).unwrap(), "keep");
    }

    #[test]
    fn read_line_on_closed_connection_is_eof() {
        let (client, stream) = setup();
        let mut reader = BufReader::new(client);
        drop(stream);
        assert_eq!(
            read_line(&mut reader).map_err(|e| e.kind()),
            Err(io::ErrorKind::UnexpectedEof)
        );
    }

    #[test]
    fn write_sized_and_read_payload() {
        let (client, mut stream) = setup();
        let mut reader = BufReader::new(client);
        let payload = br#"{"0":["alice",4,true]}"#;
        assert!(write_sized(&mut stream, &format!("TABLE:{}", payload.len()), payload).is_ok());
        let control = read_line(&mut reader).unwrap();
        assert_eq!(control, format!("TABLE:{}", payload.len()));
        let bytes = read_payload(&mut reader, payload.len()).unwrap();
        assert_eq!(bytes, payload);
    }

    #[test]
    fn payload_survives_line_buffering() {
        // The payload bytes may already sit in the line reader's buffer;
        // read_payload must drain the buffer before touching the socket.
        let (client, mut stream) = setup();
        let mut reader = BufReader::new(client);
        assert!(stream.write_all(b"TABLE:4\nabcdWAITING:next\n").is_ok());
        assert_eq!(read_line(&mut reader).unwrap(), "TABLE:4");
        assert_eq!(read_payload(&mut reader, 4).unwrap(), b"abcd");
        assert_eq!(read_line(&mut reader).unwrap(), "WAITING:next");
    }

    #[test]
    fn reject_oversized_payload() {
        let (client, _stream) = setup();
        let mut reader = BufReader::new(client);
        assert_eq!(
            read_payload(&mut reader, MAX_PAYLOAD_SIZE + 1).map_err(|e| e.kind()),
            Err(io::ErrorKind::InvalidData)
        );
    }

    #[test]
    fn reject_oversized_write() {
        let (_client, mut stream) = setup();
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(
            write_sized(&mut stream, "TABLE:big", &payload).map_err(|e| e.kind()),
            Err(io::ErrorKind::InvalidData)
        );
    }

    #[test]
    fn short_payload_is_unexpected_eof() {
        let (client, mut stream) = setup();
        let mut reader = BufReader::new(client);
        assert!(stream.write_all(b"ab").is_ok());
        drop(stream);
        assert_eq!(
            read_payload(&mut reader, 4).map_err(|e| e.kind()),
            Err(io::ErrorKind::UnexpectedEof)
        );
    }

    #[test]
    fn many_sequential_lines() {
        let (client, mut stream) = setup();
        let mut reader = BufReader::new(client);
        for i in 0..500 {
            assert!(write_line(&mut stream, &format!("WAITING:tick {i}")).is_ok());
        }
        for i in 0..500 {
            assert_eq!(read_line(&mut reader).unwrap(), format!("WAITING:tick {i}"));
        }
    }
}
