//! Escape-sequence signaling for the detected terminal emulator

use crossterm::tty::IsTty;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use super::detect::TerminalVariant;

/// Message shown by terminals that only support toast-style alerts
const TOAST_MESSAGE: &str = "Terminal alert";

/// Default pause between the flash and its reset
pub const DEFAULT_FLASH_PAUSE: Duration = Duration::from_millis(300);

/// Default application identifier for kitty notifications
pub const DEFAULT_APP_ID: &str = "termnotify";

/// Named alert colors understood by `--terminal-alert-color`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertColor {
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Purple,
    Cyan,
}

impl AlertColor {
    /// Resolve a color name (case-insensitive). Unrecognized names fall back
    /// to red, so the lookup is total.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "green" => AlertColor::Green,
            "blue" => AlertColor::Blue,
            "yellow" => AlertColor::Yellow,
            "orange" => AlertColor::Orange,
            "purple" => AlertColor::Purple,
            "cyan" => AlertColor::Cyan,
            _ => AlertColor::Red,
        }
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            AlertColor::Red => (255, 0, 0),
            AlertColor::Green => (0, 255, 0),
            AlertColor::Blue => (0, 0, 255),
            AlertColor::Yellow => (255, 255, 0),
            AlertColor::Orange => (255, 165, 0),
            AlertColor::Purple => (128, 0, 128),
            AlertColor::Cyan => (0, 255, 255),
        }
    }
}

/// Writes terminal-specific escape sequences to an output stream.
///
/// Nothing is written unless the output is an interactive terminal; control
/// codes in a pipe or file would corrupt it.
pub struct TerminalSignaler<W: Write> {
    variant: TerminalVariant,
    out: W,
    interactive: bool,
    pause: Duration,
    app_id: String,
}

impl TerminalSignaler<Stdout> {
    /// Signaler bound to stdout, interactive only if stdout is a TTY
    pub fn stdout(variant: TerminalVariant) -> Self {
        let out = io::stdout();
        let interactive = out.is_tty();
        Self::new(variant, out, interactive)
    }
}

impl<W: Write> TerminalSignaler<W> {
    pub fn new(variant: TerminalVariant, out: W, interactive: bool) -> Self {
        Self {
            variant,
            out,
            interactive,
            pause: DEFAULT_FLASH_PAUSE,
            app_id: DEFAULT_APP_ID.to_string(),
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Flash the terminal (or post a toast where flashing is unsupported).
    ///
    /// Blocks the caller for the flash pause on iTerm2 and unknown terminals.
    pub fn flash(&mut self, color: &str) -> io::Result<()> {
        if !self.interactive {
            tracing::debug!("Output is not a terminal, skipping flash");
            return Ok(());
        }

        match self.variant {
            TerminalVariant::ITerm2 => {
                let (r, g, b) = AlertColor::from_name(color).rgb();
                for (channel, value) in [("red", r), ("green", g), ("blue", b)] {
                    self.emit(&format!("\x1b]6;1;bg;{};brightness;{}\x07", channel, value))?;
                }
                std::thread::sleep(self.pause);
                self.emit("\x1b]6;1;bg;*;default\x07")
            }
            TerminalVariant::Warp | TerminalVariant::WezTerm => {
                self.emit(&osc9(TOAST_MESSAGE))
            }
            TerminalVariant::Kitty => {
                let (title, body) = osc99(&self.app_id, TOAST_MESSAGE, "");
                self.emit(&title)?;
                self.emit(&body)
            }
            TerminalVariant::Unknown => {
                self.emit("\x1b[?5h")?;
                std::thread::sleep(self.pause);
                self.emit("\x1b[?5l")
            }
        }
    }

    /// Post a title/body message through the terminal's notification protocol
    pub fn emit_notification(&mut self, title: &str, body: &str) -> io::Result<()> {
        if !self.interactive {
            return Ok(());
        }

        match self.variant {
            TerminalVariant::ITerm2 | TerminalVariant::Warp | TerminalVariant::WezTerm => {
                self.emit(&osc9(&format!("{}: {}", title, body)))
            }
            TerminalVariant::Kitty => {
                let (title, body) = osc99(&self.app_id, title, body);
                self.emit(&title)?;
                self.emit(&body)
            }
            // No universal equivalent
            TerminalVariant::Unknown => Ok(()),
        }
    }

    fn emit(&mut self, sequence: &str) -> io::Result<()> {
        self.out.write_all(sequence.as_bytes())?;
        self.out.flush()
    }
}

/// OSC 9 toast
fn osc9(message: &str) -> String {
    format!("\x1b]9;{}\x07", sanitize(message))
}

/// OSC 99 title and body chunks, `d=0` marks the notification incomplete
/// until the body arrives
fn osc99(app_id: &str, title: &str, body: &str) -> (String, String) {
    let id = sanitize(app_id).replace([':', ';'], "-");
    (
        format!("\x1b]99;i={}:d=0:p=title;{}\x1b\\", id, sanitize(title)),
        format!("\x1b]99;i={}:d=1:p=body;{}\x1b\\", id, sanitize(body)),
    )
}

/// Strip control characters that would terminate the sequence early
fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}
