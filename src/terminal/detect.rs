//! Terminal emulator detection from environment variables

use std::collections::HashMap;

/// Environment snapshot used for detection
pub type Environment = HashMap<String, String>;

/// Terminal emulators with a known signaling protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalVariant {
    ITerm2,
    Warp,
    Kitty,
    WezTerm,
    Unknown,
}

impl TerminalVariant {
    /// Human-readable name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            TerminalVariant::ITerm2 => "iTerm2",
            TerminalVariant::Warp => "Warp",
            TerminalVariant::Kitty => "kitty",
            TerminalVariant::WezTerm => "WezTerm",
            TerminalVariant::Unknown => "unknown",
        }
    }
}

const ITERM_SESSION_VAR: &str = "ITERM_SESSION_ID";
const ITERM_PROGRAM: &str = "iTerm.app";
const WARP_PROGRAM: &str = "WarpTerminal";
const KITTY_TERM: &str = "xterm-kitty";
const WEZTERM_VAR: &str = "WEZTERM_EXECUTABLE";

/// Classify the controlling terminal from an explicit environment mapping.
///
/// Checks run in priority order; some of these variables co-occur and the
/// iTerm2 markers take precedence.
pub fn detect(env: &Environment) -> TerminalVariant {
    let term_program = env.get("TERM_PROGRAM").map(String::as_str);

    if env.contains_key(ITERM_SESSION_VAR) || term_program == Some(ITERM_PROGRAM) {
        TerminalVariant::ITerm2
    } else if term_program == Some(WARP_PROGRAM) {
        TerminalVariant::Warp
    } else if env.get("TERM").map(String::as_str) == Some(KITTY_TERM) {
        TerminalVariant::Kitty
    } else if env.contains_key(WEZTERM_VAR) {
        TerminalVariant::WezTerm
    } else {
        TerminalVariant::Unknown
    }
}

/// Snapshot the process environment and classify it.
///
/// Variables that are not valid UTF-8 are skipped.
pub fn detect_from_process() -> TerminalVariant {
    let env: Environment = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    let variant = detect(&env);
    tracing::debug!("Detected terminal: {}", variant.name());
    variant
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_detect_iterm_by_session_id() {
        let e = env(&[("ITERM_SESSION_ID", "w0t0p0:ABC")]);
        assert_eq!(detect(&e), TerminalVariant::ITerm2);
    }

    #[test]
    fn test_detect_iterm_by_program() {
        let e = env(&[("TERM_PROGRAM", "iTerm.app")]);
        assert_eq!(detect(&e), TerminalVariant::ITerm2);
    }

    #[test]
    fn test_detect_warp() {
        let e = env(&[("TERM_PROGRAM", "WarpTerminal")]);
        assert_eq!(detect(&e), TerminalVariant::Warp);
    }

    #[test]
    fn test_detect_kitty() {
        let e = env(&[("TERM", "xterm-kitty")]);
        assert_eq!(detect(&e), TerminalVariant::Kitty);
    }

    #[test]
    fn test_detect_wezterm() {
        let e = env(&[("WEZTERM_EXECUTABLE", "/usr/bin/wezterm-gui")]);
        assert_eq!(detect(&e), TerminalVariant::WezTerm);
    }

    #[test]
    fn test_detect_unknown() {
        let e = env(&[("TERM", "xterm-256color"), ("TERM_PROGRAM", "Apple_Terminal")]);
        assert_eq!(detect(&e), TerminalVariant::Unknown);
        assert_eq!(detect(&Environment::new()), TerminalVariant::Unknown);
    }

    #[test]
    fn test_iterm_wins_over_other_markers() {
        let e = env(&[
            ("ITERM_SESSION_ID", "w0t0p0"),
            ("TERM_PROGRAM", "WarpTerminal"),
            ("TERM", "xterm-kitty"),
            ("WEZTERM_EXECUTABLE", "wezterm"),
        ]);
        assert_eq!(detect(&e), TerminalVariant::ITerm2);
    }

    #[test]
    fn test_kitty_wins_over_wezterm() {
        let e = env(&[("TERM", "xterm-kitty"), ("WEZTERM_EXECUTABLE", "wezterm")]);
        assert_eq!(detect(&e), TerminalVariant::Kitty);
    }

    #[test]
    fn test_detection_is_pure() {
        let e = env(&[("TERM_PROGRAM", "WarpTerminal"), ("TERM", "xterm-kitty")]);
        let first = detect(&e);
        let _ = detect(&env(&[("TERM", "xterm-kitty")]));
        assert_eq!(detect(&e), first);
        assert_eq!(first, TerminalVariant::Warp);
    }
}
