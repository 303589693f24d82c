//! Hex wire framing for async streams
//!
//! A framed header is 24 hex characters followed by one separator byte whose
//! value is ignored. Readers consume exactly that many bytes and never touch
//! the payload behind them, so the stream can be handed on afterwards.

use crate::{Header, ProtocolError, HEADER_LEN, HEX_HEADER_LEN, WIRE_HEADER_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read one framed header from an async reader
pub async fn read_header<H, R>(reader: &mut R) -> Result<H, ProtocolError>
where
    H: Header,
    R: AsyncRead + Unpin + ?Sized,
{
    let mut wire = [0u8; WIRE_HEADER_LEN];
    let mut filled = 0;

    while filled < WIRE_HEADER_LEN {
        let n = reader.read(&mut wire[filled..]).await?;
        if n == 0 {
            return Err(ProtocolError::Truncated {
                expected: WIRE_HEADER_LEN,
                received: filled,
            });
        }
        filled += n;
    }

    let mut raw = [0u8; HEADER_LEN];
    hex::decode_to_slice(&wire[..HEX_HEADER_LEN], &mut raw)
        .map_err(|_| ProtocolError::InvalidHex)?;

    H::decode(&raw)
}

/// Write one framed header to an async writer
pub async fn write_header<H, W>(writer: &mut W, header: &H, separator: u8) -> Result<(), ProtocolError>
where
    H: Header,
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(&header.to_wire(separator)).await?;
    writer.flush().await?;
    Ok(())
}
