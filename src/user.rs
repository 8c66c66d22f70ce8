//! People who act on the board.

use serde::{Deserialize, Serialize};

/// A member of the team. Tasks, comments and log entries refer to users by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub initials: String,
    pub color: String,
}

/// First letter of each word in `name`, uppercased ("Alex Johnson" -> "AJ").
pub fn derive_initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Palette cycled through when assigning accent colors to new users.
const PALETTE: [&str; 8] = [
    "#3B82F6", "#8B5CF6", "#10B981", "#F59E0B", "#EF4444", "#06B6D4", "#EC4899", "#84CC16",
];

/// Pick an accent color from the palette based on how many users already exist.
pub fn pick_color(existing_users: usize) -> String {
    PALETTE[existing_users % PALETTE.len()].to_string()
}
