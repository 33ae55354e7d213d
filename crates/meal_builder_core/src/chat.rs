//! Chat-bot rendering: the weekly grid as a Markdown text message, split to
//! fit the transport's message size, plus parsing of the bot's commands.

use crate::domain::MealType;
use crate::grid::WeeklyGrid;

/// Maximum characters per outgoing chat message.
pub const MESSAGE_LIMIT: usize = 4096;

pub fn meal_type_icon(meal_type: MealType) -> &'static str {
    match meal_type {
        MealType::Breakfast => "🥣",
        MealType::Lunch => "🥪",
        MealType::Dinner => "🍽",
        MealType::Snack => "🍎",
        MealType::Dessert => "🎂",
    }
}

/// Escapes the characters legacy Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders every day and meal type of the grid, in grid order.
pub fn render_plan(grid: &WeeklyGrid) -> String {
    let mut lines = Vec::with_capacity(grid.cells.len() + 16);
    lines.push(format!("*Meal Plan:* _{}_", escape_markdown(&grid.name)));
    lines.push(String::new());

    for (day, row) in grid.rows() {
        lines.push(format!("*{day}*"));
        for cell in row {
            let icon = meal_type_icon(cell.meal_type);
            let line = match &cell.recipe_title {
                Some(title) => {
                    let notes = cell
                        .notes
                        .as_deref()
                        .filter(|n| !n.trim().is_empty())
                        .map(|n| format!(" — _{}_", escape_markdown(n)))
                        .unwrap_or_default();
                    format!(
                        "• {icon} _{}_ — *{}*{notes}",
                        cell.meal_type,
                        escape_markdown(title)
                    )
                }
                None => format!("• {icon} _{}_ — `—`", cell.meal_type),
            };
            lines.push(line);
        }
        lines.push(String::new());
    }

    lines.join("\n").trim_end().to_owned()
}

/// Splits `text` into chunks of at most `limit` characters. A chunk ends at
/// the last newline inside its window when there is one; that newline is
/// dropped. Otherwise the window is cut hard.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return vec![text.to_owned()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + limit).min(chars.len());
        if end == chars.len() {
            chunks.push(chars[start..end].iter().collect());
            break;
        }
        match chars[start..end].iter().rposition(|&c| c == '\n') {
            Some(pos) if pos > 0 => {
                chunks.push(chars[start..start + pos].iter().collect());
                start += pos + 1;
            }
            _ => {
                chunks.push(chars[start..end].iter().collect());
                start = end;
            }
        }
    }
    chunks
}

/// A command understood by the chat bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// `/plan <id>` or the deep link `/start plan_<id>`.
    ShowPlan(i64),
    /// `/plan` without a usable id.
    PlanUsage,
    /// `/start` without a plan payload.
    Welcome,
    Help,
}

impl BotCommand {
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split_whitespace();
        let Some(head) = parts.next() else {
            return Self::Help;
        };
        // Group chats address commands as `/plan@SomeBot`.
        let command = head.split('@').next().unwrap_or(head).to_ascii_lowercase();

        match command.as_str() {
            "/start" => {
                let payload = parts.next().unwrap_or_default();
                let id = payload
                    .get(..5)
                    .filter(|p| p.eq_ignore_ascii_case("plan_"))
                    .and_then(|_| payload[5..].parse::<i64>().ok());
                match id {
                    Some(id) => Self::ShowPlan(id),
                    None => Self::Welcome,
                }
            }
            "/plan" => match parts.next().and_then(|p| p.parse::<i64>().ok()) {
                Some(id) => Self::ShowPlan(id),
                None => Self::PlanUsage,
            },
            _ => Self::Help,
        }
    }
}

pub const WELCOME_TEXT: &str = "Hi! Send `/plan <id>` to get your meal schedule 🍽";
pub const PLAN_USAGE_TEXT: &str = "Try it like this: `/plan 5`, where 5 is the meal plan ID.";
pub const HELP_TEXT: &str = "Commands: `/plan <id>` or `/start plan_<id>` (deep link).";

pub fn plan_not_found_text(id: i64) -> String {
    format!("Meal plan #{id} not found.")
}
