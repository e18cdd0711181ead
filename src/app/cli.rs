//! コマンドライン引数の解析

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use thiserror::Error;

use crate::notify::protocol::{ALL_GROUPS, DEFAULT_TITLE};
use crate::notify::{NotificationSpec, Sound};

const BIN_NAME: &str = "termnotify";

/// Deliver, list and remove desktop notifications
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "termnotify")]
#[command(version, about, long_about = None)]
#[command(args_override_self = true)]
pub struct Options {
    /// Notification body (read from stdin when piped)
    #[arg(long, value_name = "TEXT")]
    pub message: Option<String>,

    /// Notification title
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Notification subtitle
    #[arg(long, value_name = "TEXT")]
    pub subtitle: Option<String>,

    /// Sound to play ("default" for the system default)
    #[arg(long, value_name = "NAME")]
    pub sound: Option<String>,

    /// Group id; a new notification replaces earlier ones in the same group
    #[arg(long, value_name = "ID")]
    pub group: Option<String>,

    /// Remove notifications by group or identifier ("ALL" removes everything)
    #[arg(long, value_name = "ID|ALL")]
    pub remove: Option<String>,

    /// List notifications as JSON by group or identifier ("ALL" lists everything)
    #[arg(long, value_name = "ID|ALL")]
    pub list: Option<String>,

    /// Flash the terminal before delivering
    #[arg(long)]
    pub terminal_alert: bool,

    /// Flash color (red, green, blue, yellow, orange, purple, cyan)
    #[arg(long, value_name = "COLOR", default_value = "red")]
    pub terminal_alert_color: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// 実行モード（1回の起動につき1つ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Deliver(NotificationSpec),
    Remove(String),
    List(String),
}

/// 解析結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Run(Options),
    Help(String),
    Version(String),
}

/// 使い方の誤り
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// clap が整形したエラーメッセージ
    #[error("{0}")]
    Invalid(String),

    #[error("error: no message given; pass --message or pipe text on stdin")]
    MissingMessage,

    /// 空文字列と "ALL" はグループ ID にできない
    #[error("error: invalid group id {0:?}; it must be non-empty and not \"ALL\"")]
    InvalidGroup(String),
}

impl Options {
    /// モードを決定（--list > --remove > 通知配信）
    pub fn mode(&self) -> Result<Mode, UsageError> {
        if let Some(target) = &self.list {
            return Ok(Mode::List(target.clone()));
        }
        if let Some(target) = &self.remove {
            return Ok(Mode::Remove(target.clone()));
        }

        let message = self
            .message
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or(UsageError::MissingMessage)?;

        let mut spec = NotificationSpec::new(message).title(self.title.clone());
        if let Some(subtitle) = &self.subtitle {
            spec = spec.subtitle(subtitle.clone());
        }
        if let Some(sound) = &self.sound {
            spec = spec.sound(Sound::from_name(sound));
        }
        if let Some(group) = &self.group {
            if group.is_empty() || group == ALL_GROUPS {
                return Err(UsageError::InvalidGroup(group.clone()));
            }
            spec = spec.group(group.clone());
        }
        Ok(Mode::Deliver(spec))
    }
}

/// 引数を解析（プログラム名は含まない）
///
/// --help / -h / --version はどの位置にあっても他の検証より先に処理する。
/// 値の位置にあるトークンも対象なので `--message -h` はヘルプを表示する。
/// ダッシュで始まる本文は `--message=-h` の形で渡す。
pub fn parse(args: &[String]) -> Result<ParseOutcome, UsageError> {
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(ParseOutcome::Help(help_text())),
            "--version" => return Ok(ParseOutcome::Version(version_text())),
            _ => {}
        }
    }

    let argv = std::iter::once(BIN_NAME.to_string()).chain(args.iter().cloned());
    match Options::try_parse_from(argv) {
        Ok(options) => Ok(ParseOutcome::Run(options)),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => Ok(ParseOutcome::Help(e.to_string())),
            ErrorKind::DisplayVersion => Ok(ParseOutcome::Version(e.to_string())),
            _ => Err(UsageError::Invalid(e.to_string())),
        },
    }
}

pub fn help_text() -> String {
    Options::command().render_help().to_string()
}

pub fn version_text() -> String {
    Options::command().render_version()
}
