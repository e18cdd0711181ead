//! Piped stdin acquisition that never blocks on an idle pipe

use anyhow::{Context, Result};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io::{self, Read};
use std::os::fd::AsFd;

/// Read piped stdin if data is already queued.
///
/// Returns `None` when nothing is waiting, which keeps us from hanging under a
/// shell that holds the pipe open without writing.
pub fn read_piped_input() -> Result<Option<String>> {
    read_if_ready(io::stdin().lock())
}

/// Zero-timeout readiness poll, then read to EOF only if the source is ready.
///
/// Once data is ready the read blocks until the writer closes its end, so slow
/// producers are not truncated. Surrounding whitespace is trimmed and an empty
/// result is reported as `None`.
pub fn read_if_ready<S: AsFd + Read>(mut source: S) -> Result<Option<String>> {
    let ready = {
        let mut fds = [PollFd::new(source.as_fd(), PollFlags::POLLIN)];
        poll(&mut fds, PollTimeout::ZERO).context("Failed to poll stdin")?
    };

    if ready == 0 {
        tracing::debug!("No piped input queued");
        return Ok(None);
    }

    let mut buf = Vec::new();
    source
        .read_to_end(&mut buf)
        .context("Failed to read piped input")?;

    let text = String::from_utf8_lossy(&buf);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}
