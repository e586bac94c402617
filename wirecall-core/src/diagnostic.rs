//! Readable rendering of raw records for debug logging.
//!
//! Rendering never moves the read cursor: binary records are transcoded into a
//! scratch buffer with the cursor saved and restored around the copy.

use crate::wire::{ValueIn, Wire, WireKind};
use std::borrow::Cow;
use tracing::Level;

/// Fixed headroom added to the transcode scratch buffer.
pub const SCRATCH_HEADROOM: usize = 64;

/// Scratch capacity for transcoding `remaining` binary bytes to text.
pub fn scratch_capacity(remaining: usize) -> usize {
    remaining * 3 / 2 + SCRATCH_HEADROOM
}

/// Render the unread part of `wire` as text, leaving the cursor where it was.
pub fn render<'a>(wire: &mut Wire<'a>) -> Cow<'a, str> {
    match wire.kind() {
        WireKind::Text => String::from_utf8_lossy(wire.remaining()),
        WireKind::Binary => {
            let mut scratch = Vec::with_capacity(scratch_capacity(wire.read_remaining()));
            let position = wire.read_position();
            let copied = wire.copy_to_text(&mut scratch);
            wire.set_read_position(position);

            match copied {
                Ok(()) => Cow::Owned(
                    String::from_utf8(scratch)
                        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
                ),
                Err(error) => Cow::Owned(format!(
                    "<unreadable {} bytes: {error}>",
                    wire.read_remaining()
                )),
            }
        }
    }
}

/// Log `name` and the rendered value at debug level.
pub fn log_message(name: &str, value: &mut ValueIn<'_, '_>) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    let rest = value.render();
    tracing::debug!("read {name} - {rest}");
}
