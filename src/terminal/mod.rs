//! Terminal-side helpers: emulator detection, escape-sequence signaling and
//! piped stdin acquisition.

pub mod detect;
pub mod signal;
pub mod stdin;

pub use detect::{detect, detect_from_process, TerminalVariant};
pub use signal::{AlertColor, TerminalSignaler};
pub use stdin::{read_if_ready, read_piped_input};
