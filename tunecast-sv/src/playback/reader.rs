//! Fixed-size frame reads

use tokio::io::{AsyncRead, AsyncReadExt};

/// Fill `buf` from `source`, stopping early only at end of file
///
/// Returns the number of bytes read: `buf.len()` for a full frame, less for
/// the final partial frame, zero at end of file.
pub async fn read_frame<R>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
