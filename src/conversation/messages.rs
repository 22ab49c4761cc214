//! Reply texts.

use crate::store::TasteEntry;

pub const TASTE_PROMPT: &str = "Which taste did you like?";
pub const RENAME_PROMPT: &str = "What should I call you now?";
pub const MENU_AFTER_NAME: &str = "What would you like to do?";
pub const MENU_AFTER_TASTE: &str = "Want to add another one?";
pub const NO_TASTES: &str = "📭 No entries yet.";

pub const HELP: &str = "🤖 Commands:\n\
/start - Start\n\
/mytastes - Show my tastes\n\
/help - Help";

pub fn greeting(display_name: &str) -> String {
    format!(
        "👋 Hi, {display_name}!\n\
         I'll help you remember the tastes you liked.\n\n\
         📝 What's your name?"
    )
}

pub fn name_saved(name: &str) -> String {
    format!("✅ Great, {name}!")
}

pub fn welcome_back(name: &str) -> String {
    format!("🎉 {name}, what would you like to do?")
}

pub fn taste_saved(taste: &str, date: &str) -> String {
    format!("✅ Saved: '{taste}'\n📅 {date}")
}

/// Numbered list, oldest first. Callers handle the empty case.
pub fn taste_list(name: &str, tastes: &[TasteEntry]) -> String {
    let mut response = format!("📜 {name}, your tastes:\n\n");
    for (i, entry) in tastes.iter().enumerate() {
        response.push_str(&format!(
            "{}. 🗓️ {} {} - {}\n",
            i + 1,
            entry.date,
            entry.time,
            entry.taste
        ));
    }
    response
}
