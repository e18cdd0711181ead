use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::notify::DeliveryTiming;

/// 配信タイミング設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// 通知をスケジュールしてから表示するまでの遅延（ミリ秒）
    #[serde(default = "default_trigger_delay_ms")]
    pub trigger_delay_ms: u64,
    /// スケジュール後、プロセス終了前に待つ時間（ミリ秒）
    #[serde(default = "default_propagation_wait_ms")]
    pub propagation_wait_ms: u64,
}

fn default_trigger_delay_ms() -> u64 {
    100
}

fn default_propagation_wait_ms() -> u64 {
    900
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            trigger_delay_ms: default_trigger_delay_ms(),
            propagation_wait_ms: default_propagation_wait_ms(),
        }
    }
}

impl DeliveryConfig {
    pub fn timing(&self) -> DeliveryTiming {
        DeliveryTiming {
            trigger_delay: Duration::from_millis(self.trigger_delay_ms),
            propagation_wait: Duration::from_millis(self.propagation_wait_ms),
        }
    }
}

/// ターミナル通知設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// フラッシュを表示しておく時間（ミリ秒）
    #[serde(default = "default_flash_pause_ms")]
    pub flash_pause_ms: u64,
    /// kitty 通知のアプリケーション識別子
    #[serde(default = "default_app_id")]
    pub app_id: String,
}

fn default_flash_pause_ms() -> u64 {
    300
}

fn default_app_id() -> String {
    crate::terminal::signal::DEFAULT_APP_ID.to_string()
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            flash_pause_ms: default_flash_pause_ms(),
            app_id: default_app_id(),
        }
    }
}

impl TerminalConfig {
    pub fn flash_pause(&self) -> Duration {
        Duration::from_millis(self.flash_pause_ms)
    }
}

/// デスクトップ通知バックエンド設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 配信済み通知の台帳ファイル（未設定時はデータディレクトリ）
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
    /// 台帳に通知を残しておく時間（秒）
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

fn default_retention_secs() -> u64 {
    24 * 60 * 60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ledger_path: None,
            retention_secs: default_retention_secs(),
        }
    }
}

impl BackendConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(crate::notify::ledger_path)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// ログレベル（--log-level と RUST_LOG が優先）
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            delivery: DeliveryConfig::default(),
            terminal: TerminalConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み（存在しない場合はデフォルト）
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;
        Ok(config)
    }

    /// 設定ファイルパスを取得
    pub fn config_path() -> Result<PathBuf> {
        // ~/.config/termnotify/config.toml を使用
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))?;
        Ok(base_dirs.home_dir().join(".config/termnotify/config.toml"))
    }
}
