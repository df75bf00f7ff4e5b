//! Help and error styling for the `pkgdeploy` CLI.

use clap::builder::styling::{AnsiColor, Color, Style, Styles};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn ansi(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

/// Styles applied to `--help` output and parse errors.
pub fn styles() -> Styles {
    Styles::styled()
        .header(ansi(AnsiColor::Blue).bold().underline())
        .usage(ansi(AnsiColor::Blue).bold())
        .literal(ansi(AnsiColor::Green))
        .placeholder(ansi(AnsiColor::Magenta))
        .error(ansi(AnsiColor::Red).bold())
        .invalid(ansi(AnsiColor::Yellow).bold())
        .valid(ansi(AnsiColor::Green).bold())
}
