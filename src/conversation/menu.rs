//! Main menu: button labels and the label → action table.

use crate::channels::ReplyKeyboard;

pub const ADD_TASTE_LABEL: &str = "➕ Add taste";
pub const MY_TASTES_LABEL: &str = "📋 My tastes";
pub const CHANGE_NAME_LABEL: &str = "🔄 Change name";

/// What a menu button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    AddTaste,
    ListTastes,
    ChangeName,
}

/// Label table, in keyboard order.
const MENU: &[(&str, MenuAction)] = &[
    (ADD_TASTE_LABEL, MenuAction::AddTaste),
    (MY_TASTES_LABEL, MenuAction::ListTastes),
    (CHANGE_NAME_LABEL, MenuAction::ChangeName),
];

impl MenuAction {
    /// Exact label match; anything else is not a menu choice.
    pub fn from_label(text: &str) -> Option<Self> {
        MENU.iter()
            .find(|(label, _)| *label == text)
            .map(|(_, action)| *action)
    }
}

/// One button per row, resized to fit.
pub fn main_menu_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(MENU.iter().map(|(label, _)| [*label]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_label_maps_to_its_action() {
        assert_eq!(MenuAction::from_label(ADD_TASTE_LABEL), Some(MenuAction::AddTaste));
        assert_eq!(MenuAction::from_label(MY_TASTES_LABEL), Some(MenuAction::ListTastes));
        assert_eq!(MenuAction::from_label(CHANGE_NAME_LABEL), Some(MenuAction::ChangeName));
    }

    #[test]
    fn match_is_literal() {
        assert_eq!(MenuAction::from_label("Add taste"), None);
        assert_eq!(MenuAction::from_label("➕ add taste"), None);
        assert_eq!(MenuAction::from_label(" ➕ Add taste"), None);
        assert_eq!(MenuAction::from_label(""), None);
    }

    #[test]
    fn keyboard_has_one_button_per_row() {
        let keyboard = main_menu_keyboard();
        assert_eq!(
            keyboard.rows,
            vec![
                vec![ADD_TASTE_LABEL.to_string()],
                vec![MY_TASTES_LABEL.to_string()],
                vec![CHANGE_NAME_LABEL.to_string()],
            ]
        );
        assert!(keyboard.resize);
    }
}
