//! Line-oriented framing over an async byte stream.
//!
//! A line is a possibly-empty byte sequence terminated by `\n` or by end of
//! stream. Reads and writes operate on `String`s: the wire protocol is
//! ASCII-only and nothing upstream needs raw bytes.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

/// Read one logical line from `reader`.
///
/// Returns `(line, eof)` where `line` has any trailing `\n` stripped and
/// `eof` is true only when the stream closed before any byte of this line
/// was read. A non-empty final line with no trailing newline is returned
/// with `eof = false`; the following call then returns `("", true)`.
pub async fn read_line<R>(reader: &mut R) -> std::io::Result<(String, bool)>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut buf = String::new();
    let n = reader.read_line(&mut buf).await?;
    if n == 0 {
        return Ok((String::new(), true));
    }
    if buf.ends_with('\n') {
        buf.pop();
    }
    Ok((buf, false))
}

/// Write one line, appending `\n`, and flush before returning.
pub async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn reads_terminated_line() {
        let data = b"AUTH:hunter2\nNAME:alice\n".to_vec();
        let mut r = BufReader::new(&data[..]);
        let (line, eof) = read_line(&mut r).await.unwrap();
        assert_eq!(line, "AUTH:hunter2");
        assert!(!eof);
        let (line, eof) = read_line(&mut r).await.unwrap();
        assert_eq!(line, "NAME:alice");
        assert!(!eof);
    }

    #[tokio::test]
    async fn unterminated_final_line_then_eof() {
        let data = b"LIST".to_vec();
        let mut r = BufReader::new(&data[..]);
        let (line, eof) = read_line(&mut r).await.unwrap();
        assert_eq!(line, "LIST");
        assert!(!eof);
        let (line, eof) = read_line(&mut r).await.unwrap();
        assert_eq!(line, "");
        assert!(eof);
    }

    #[tokio::test]
    async fn immediate_eof() {
        let data: Vec<u8> = Vec::new();
        let mut r = BufReader::new(&data[..]);
        let (line, eof) = read_line(&mut r).await.unwrap();
        assert_eq!(line, "");
        assert!(eof);
    }

    #[tokio::test]
    async fn trailing_carriage_return_is_part_of_the_payload() {
        let data = b"SAY:bye\r\n".to_vec();
        let mut r = BufReader::new(&data[..]);
        let (line, eof) = read_line(&mut r).await.unwrap();
        assert_eq!(line, "SAY:bye\r");
        assert!(!eof);
    }

    #[tokio::test]
    async fn write_line_appends_newline() {
        let mut buf: Vec<u8> = Vec::new();
        write_line(&mut buf, "OK:").await.unwrap();
        assert_eq!(buf, b"OK:\n");
    }
}
