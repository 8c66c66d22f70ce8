//! Color constants for the terminal board.

use ratatui::style::Color;

use crate::fields::Status;

pub const SLATE: Color = Color::Rgb(100, 116, 139);
pub const BLUE: Color = Color::Rgb(59, 130, 246);
pub const SKY: Color = Color::Rgb(14, 165, 233);
pub const GREEN: Color = Color::Rgb(34, 197, 94);
pub const RED: Color = Color::Rgb(239, 68, 68);
/// Columns at their WIP limit.
pub const AMBER: Color = Color::Rgb(245, 158, 11);

/// Accent used for a column's border and the status bar.
pub fn status_color(status: Status) -> Color {
    match status {
        Status::Backlog => SLATE,
        Status::InProgress => BLUE,
        Status::Review => SKY,
        Status::Done => GREEN,
        Status::Blocked => RED,
    }
}

/// Parse a `#RRGGBB` string.
pub fn parse_hex(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}
