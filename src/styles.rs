//! ANSI styling for terminal output.
//!
//! Escape codes live here so the rest of the crate only asks whether colors
//! are wanted on a given stream.

use std::io::IsTerminal;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const RESET: &str = "\x1b[0m";

fn no_color() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty())
}

/// Colors on stdout: it is a terminal and `NO_COLOR` is unset.
pub fn colors_enabled() -> bool {
    !no_color() && std::io::stdout().is_terminal()
}

/// Colors on stderr: it is a terminal and `NO_COLOR` is unset.
pub fn colors_enabled_stderr() -> bool {
    !no_color() && std::io::stderr().is_terminal()
}

/// Wrap `text` in `style` when `enabled`, otherwise return it unchanged.
pub fn paint(text: &str, style: &str, enabled: bool) -> String {
    if enabled {
        format!("{style}{text}{RESET}")
    } else {
        text.to_string()
    }
}

pub fn bold(text: &str) -> String {
    format!("{BOLD}{text}{RESET}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_disabled_is_plain() {
        assert_eq!(paint("main", GREEN, false), "main");
    }

    #[test]
    fn test_paint_enabled_wraps() {
        assert_eq!(paint("main", GREEN, true), "\x1b[32mmain\x1b[0m");
        assert_eq!(bold("x"), "\x1b[1mx\x1b[0m");
    }
}
