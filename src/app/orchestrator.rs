//! Mode dispatch: parsing, terminal signaling and the notification engine

use anyhow::Result;
use std::io::Write;
use tracing::{error, warn};

use super::cli::{self, Mode, Options, ParseOutcome, UsageError};
use crate::notify::{NotificationBackend, NotificationEngine, NotificationSpec};
use crate::terminal::TerminalSignaler;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

/// Flags that make piped stdin irrelevant
const STDIN_BLOCKERS: &[&str] = &["--message", "--remove", "--list", "--help", "-h", "--version"];

fn blocks_stdin(arg: &str) -> bool {
    STDIN_BLOCKERS
        .iter()
        .any(|flag| arg == *flag || arg.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')))
}

/// Inject piped stdin as the message when no mode flag was given.
///
/// `sniff` is only called when stdin is not a terminal and none of the
/// message, remove, list, help or version flags are present.
pub fn prepare_args<F>(mut args: Vec<String>, stdin_is_tty: bool, sniff: F) -> Vec<String>
where
    F: FnOnce() -> Result<Option<String>>,
{
    if stdin_is_tty || args.iter().any(|a| blocks_stdin(a)) {
        return args;
    }

    match sniff() {
        // = form so a message starting with '-' is not taken for a flag
        Ok(Some(message)) => args.push(format!("--message={}", message)),
        Ok(None) => {}
        Err(e) => warn!("Ignoring stdin: {:#}", e),
    }
    args
}

/// Runs one invocation in exactly one mode and returns the exit code
pub struct Orchestrator<B, W: Write> {
    engine: NotificationEngine<B>,
    signaler: TerminalSignaler<W>,
}

impl<B: NotificationBackend, W: Write> Orchestrator<B, W> {
    pub fn new(engine: NotificationEngine<B>, signaler: TerminalSignaler<W>) -> Self {
        Self { engine, signaler }
    }

    pub fn into_parts(self) -> (NotificationEngine<B>, TerminalSignaler<W>) {
        (self.engine, self.signaler)
    }

    /// Parse `args` (without the program name) and run
    pub async fn run<O: Write, E: Write>(&mut self, args: &[String], out: &mut O, err: &mut E) -> u8 {
        self.handle(cli::parse(args), out, err).await
    }

    /// Run an already parsed command line
    pub async fn handle<O: Write, E: Write>(
        &mut self,
        parsed: std::result::Result<ParseOutcome, UsageError>,
        out: &mut O,
        err: &mut E,
    ) -> u8 {
        match self.dispatch(parsed, out, err).await {
            Ok(code) => code,
            Err(e) => {
                error!("{:#}", e);
                let _ = writeln!(err, "error: {:#}", e);
                EXIT_FAILURE
            }
        }
    }

    async fn dispatch<O: Write, E: Write>(
        &mut self,
        parsed: std::result::Result<ParseOutcome, UsageError>,
        out: &mut O,
        err: &mut E,
    ) -> Result<u8> {
        match parsed {
            Ok(ParseOutcome::Help(text)) | Ok(ParseOutcome::Version(text)) => {
                writeln!(out, "{}", text.trim_end())?;
                Ok(EXIT_SUCCESS)
            }
            Err(usage) => {
                writeln!(err, "{}", usage.to_string().trim_end())?;
                Ok(EXIT_FAILURE)
            }
            Ok(ParseOutcome::Run(options)) => self.execute(&options, out, err).await,
        }
    }

    async fn execute<O: Write, E: Write>(
        &mut self,
        options: &Options,
        out: &mut O,
        err: &mut E,
    ) -> Result<u8> {
        let mode = match options.mode() {
            Ok(mode) => mode,
            Err(usage) => {
                writeln!(err, "{}", usage)?;
                writeln!(err)?;
                writeln!(err, "{}", cli::help_text().trim_end())?;
                return Ok(EXIT_FAILURE);
            }
        };

        match mode {
            Mode::List(target) => {
                let items = self.engine.list(&target).await?;
                writeln!(out, "{}", serde_json::to_string_pretty(&items)?)?;
            }
            Mode::Remove(target) => {
                self.engine.remove(&target).await?;
            }
            Mode::Deliver(spec) => {
                if options.terminal_alert {
                    self.alert_terminal(&spec, &options.terminal_alert_color);
                }
                self.engine.deliver(&spec).await?;
            }
        }
        Ok(EXIT_SUCCESS)
    }

    /// Flash, then post the notification through the terminal too.
    /// A terminal that cannot be written to must not fail the delivery.
    fn alert_terminal(&mut self, spec: &NotificationSpec, color: &str) {
        if let Err(e) = self.signaler.flash(color) {
            warn!("Terminal flash failed: {}", e);
        }
        if let Err(e) = self.signaler.emit_notification(&spec.title, &spec.message) {
            warn!("Terminal notification failed: {}", e);
        }
    }
}
