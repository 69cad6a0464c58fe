// RouterOS wire framing
//
// Words are length-prefixed byte strings; the length itself uses a 1-5 byte
// variable encoding keyed off the leading bits of the first byte. A sentence
// is a run of words terminated by a zero-length word. Everything here is
// framing only -- reply interpretation lives in `command`.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Error;

/// Append the variable-length encoding of `len` to `buf`.
pub(crate) fn encode_length(len: u32, buf: &mut BytesMut) {
    match len {
        0..=0x7F => buf.put_u8(len as u8),
        0x80..=0x3FFF => buf.put_u16(len as u16 | 0x8000),
        0x4000..=0x001F_FFFF => {
            let v = len | 0x00C0_0000;
            buf.put_u8((v >> 16) as u8);
            buf.put_u16((v & 0xFFFF) as u16);
        }
        0x0020_0000..=0x0FFF_FFFF => buf.put_u32(len | 0xE000_0000),
        _ => {
            buf.put_u8(0xF0);
            buf.put_u32(len);
        }
    }
}

/// Read one variable-length word length.
pub(crate) async fn read_length<R>(reader: &mut R) -> Result<u32, Error>
where
    R: AsyncRead + Unpin,
{
    let b0 = u32::from(reader.read_u8().await?);
    if b0 & 0x80 == 0 {
        return Ok(b0);
    }
    if b0 & 0xC0 == 0x80 {
        let b1 = u32::from(reader.read_u8().await?);
        return Ok(((b0 & 0x3F) << 8) | b1);
    }
    if b0 & 0xE0 == 0xC0 {
        let b1 = u32::from(reader.read_u8().await?);
        let b2 = u32::from(reader.read_u8().await?);
        return Ok(((b0 & 0x1F) << 16) | (b1 << 8) | b2);
    }
    if b0 & 0xF0 == 0xE0 {
        let b1 = u32::from(reader.read_u8().await?);
        let b2 = u32::from(reader.read_u8().await?);
        let b3 = u32::from(reader.read_u8().await?);
        return Ok(((b0 & 0x0F) << 24) | (b1 << 16) | (b2 << 8) | b3);
    }
    if b0 == 0xF0 {
        return Ok(reader.read_u32().await?);
    }
    // 0xF1..=0xFF are reserved for control bytes we never negotiate.
    Err(Error::Protocol(format!("reserved length byte 0x{b0:02X}")))
}

/// Read one sentence: words until the zero-length terminator.
pub(crate) async fn read_sentence<R>(reader: &mut R) -> Result<Vec<String>, Error>
where
    R: AsyncRead + Unpin,
{
    let mut words = Vec::new();
    loop {
        let len = read_length(reader).await?;
        if len == 0 {
            return Ok(words);
        }
        let mut raw = vec![0u8; len as usize];
        reader.read_exact(&mut raw).await?;
        // RouterOS values are not guaranteed UTF-8 (comments, identities).
        words.push(String::from_utf8_lossy(&raw).into_owned());
    }
}

/// Write one sentence and flush it.
pub(crate) async fn write_sentence<W, S>(writer: &mut W, words: &[S]) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    let mut buf = BytesMut::new();
    for word in words {
        let bytes = word.as_ref().as_bytes();
        encode_length(bytes.len() as u32, &mut buf);
        buf.put_slice(bytes);
    }
    buf.put_u8(0);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(len: u32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_length(len, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn length_encoding_boundaries() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(0x7F), vec![0x7F]);
        assert_eq!(encoded(0x80), vec![0x80, 0x80]);
        assert_eq!(encoded(0x3FFF), vec![0xBF, 0xFF]);
        assert_eq!(encoded(0x4000), vec![0xC0, 0x40, 0x00]);
        assert_eq!(encoded(0x001F_FFFF), vec![0xDF, 0xFF, 0xFF]);
        assert_eq!(encoded(0x0020_0000), vec![0xE0, 0x20, 0x00, 0x00]);
        assert_eq!(encoded(0x0FFF_FFFF), vec![0xEF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(encoded(0x1000_0000), vec![0xF0, 0x10, 0x00, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn length_round_trip() {
        for len in [0u32, 1, 0x7F, 0x80, 0x3FFF, 0x4000, 0x001F_FFFF, 0x0020_0000] {
            let bytes = encoded(len);
            let mut cursor = std::io::Cursor::new(bytes);
            assert_eq!(read_length(&mut cursor).await.unwrap(), len);
        }
    }

    #[tokio::test]
    async fn sentence_round_trip() {
        let words = ["/ppp/secret/print", "?name=alice", ".tag=7"];
        let (mut client, mut server) = tokio::io::duplex(256);
        write_sentence(&mut client, &words).await.unwrap();
        let read = read_sentence(&mut server).await.unwrap();
        assert_eq!(read, words);
    }

    #[tokio::test]
    async fn reserved_length_byte_is_rejected() {
        let mut cursor = std::io::Cursor::new(vec![0xF7u8]);
        let err = read_length(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
