//! ASCII board rendering for terminal review.

use tactics_core::prelude::*;

use crate::roster::Roster;

/// ASCII rendering configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Use colored output (ANSI).
    pub use_color: bool,
    /// Show the unit legend under the grid.
    pub show_legend: bool,
    /// Mark empty victory squares.
    pub show_zones: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            use_color: true,
            show_legend: true,
            show_zones: true,
        }
    }
}

impl AsciiConfig {
    /// Plain output for files and tests.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            use_color: false,
            ..Self::default()
        }
    }
}

/// ANSI color codes.
pub mod colors {
    #![allow(missing_docs)]

    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const WHITE: &str = "\x1b[37m";
    pub const GRAY: &str = "\x1b[90m";
    pub const MAGENTA: &str = "\x1b[35m";
}

const TEAM_COLORS: [&str; 5] = [
    colors::BLUE,
    colors::YELLOW,
    colors::GREEN,
    colors::MAGENTA,
    colors::CYAN,
];

fn team_color(team: Option<TeamId>) -> &'static str {
    match team {
        Some(team) => TEAM_COLORS[team % TEAM_COLORS.len()],
        None => colors::GRAY,
    }
}

fn health_color(hp: u32, max_hp: u32) -> &'static str {
    let hp = u64::from(hp) * 3;
    let max_hp = u64::from(max_hp.max(1));
    if hp > max_hp * 2 {
        colors::GREEN
    } else if hp > max_hp {
        colors::YELLOW
    } else {
        colors::RED
    }
}

fn paint(out: &mut String, text: &str, color: &str, config: &AsciiConfig) {
    if config.use_color && !color.is_empty() {
        out.push_str(color);
        out.push_str(text);
        out.push_str(colors::RESET);
    } else {
        out.push_str(text);
    }
}

fn cell(board: &BoardState, roster: &Roster, position: Position, config: &AsciiConfig) -> (char, &'static str) {
    if let Some(id) = board.entities().id_at(position) {
        let glyph = roster.get(id).map_or('?', |u| u.glyph);
        let team = board.get(id).and_then(|v| v.team);
        return (glyph, team_color(team));
    }

    if config.show_zones {
        let owner = (0..board.config().team_count()).find(|&t| board.config().is_zone_of(t, position));
        if let Some(team) = owner {
            return ('+', team_color(Some(team)));
        }
    }
    ('.', colors::DIM)
}

/// Render the board as ASCII art.
///
/// Units are drawn with their roster glyph in their team's color, scenery in
/// gray and empty victory squares as `+`.
#[must_use]
pub fn render_ascii(board: &BoardState, roster: &Roster, config: &AsciiConfig) -> String {
    let size = board.config().size();
    let mut output = String::new();

    let width = size.cols as usize * 2 + 1;
    output.push_str("   ");
    for col in 0..size.cols {
        output.push_str(&format!("{:>2}", col % 100));
    }
    output.push('\n');

    output.push_str("  ╔");
    output.push_str(&"═".repeat(width));
    output.push_str("╗\n");

    for row in 0..size.rows {
        output.push_str(&format!("{:>2}║ ", row % 100));
        for col in 0..size.cols {
            let position = Position::new(row as i32, col as i32);
            let (glyph, color) = cell(board, roster, position, config);
            paint(&mut output, &glyph.to_string(), color, config);
            output.push(' ');
        }
        output.push_str("║\n");
    }

    output.push_str("  ╚");
    output.push_str(&"═".repeat(width));
    output.push_str("╝\n");

    if config.show_legend {
        for id in board.entities().sorted_ids() {
            let (Some(unit), Some(value)) = (roster.get(id), board.get(id)) else {
                continue;
            };
            output.push_str("  ");
            paint(&mut output, &unit.glyph.to_string(), team_color(value.team), config);
            output.push_str(&format!(" {:<10} ", unit.name));
            paint(
                &mut output,
                &format!("{:>3}/{:<3}", value.hp, value.max_hp),
                health_color(value.hp, value.max_hp),
                config,
            );
            if value.is_combatant() {
                output.push_str(&format!(" sp {:>2}", value.sp));
            }
            let statuses: Vec<&str> = value.statuses().iter().map(|s| s.name.as_str()).collect();
            if !statuses.is_empty() {
                output.push_str(&format!(" [{}]", statuses.join(", ")));
            }
            output.push('\n');
        }
    }

    output
}

/// One-line live count per team.
#[must_use]
pub fn render_team_line(board: &BoardState, names: &[String], config: &AsciiConfig) -> String {
    let mut output = String::new();
    for (team, count) in board.live_counts().iter().enumerate() {
        if team > 0 {
            output.push_str(" │ ");
        }
        let name = names.get(team).map_or("?", String::as_str);
        paint(&mut output, name, team_color(Some(team)), config);
        output.push_str(&format!(": {count}"));
    }
    output
}
