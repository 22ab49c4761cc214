//! Inbound text classification: slash commands vs. plain text.

/// A parsed inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/mytastes`
    MyTastes,
    /// Any other slash command, lowercased without its `@BotName` suffix.
    UnknownCommand(String),
    /// Anything else, verbatim.
    Text(String),
}

/// Parses raw message text into an [`Inbound`].
pub struct CommandParser;

impl CommandParser {
    pub fn parse(content: &str) -> Inbound {
        let Some(command) = command_word(content) else {
            return Inbound::Text(content.to_string());
        };

        let command = command.to_lowercase();
        match command.as_str() {
            "/start" => Inbound::Start,
            "/help" | "/?" => Inbound::Help,
            "/mytastes" | "/tastes" => Inbound::MyTastes,
            _ => Inbound::UnknownCommand(command),
        }
    }
}

/// First word of a slash command with any `@BotName` suffix removed.
///
/// The slash must be the very first character; a bare `/` is not a command.
fn command_word(content: &str) -> Option<&str> {
    if !content.starts_with('/') {
        return None;
    }
    let word = content.split_whitespace().next()?;
    let word = word.split('@').next().unwrap_or(word);
    (word.len() > 1).then_some(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_commands() {
        assert_eq!(CommandParser::parse("/start"), Inbound::Start);
        assert_eq!(CommandParser::parse("/help"), Inbound::Help);
        assert_eq!(CommandParser::parse("/mytastes"), Inbound::MyTastes);
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(CommandParser::parse("/START"), Inbound::Start);
        assert_eq!(CommandParser::parse("/MyTastes"), Inbound::MyTastes);
    }

    #[test]
    fn bot_suffix_and_arguments_are_ignored() {
        assert_eq!(CommandParser::parse("/start@TasteBot"), Inbound::Start);
        assert_eq!(CommandParser::parse("/start deep-link-payload"), Inbound::Start);
        assert_eq!(CommandParser::parse("/help@TasteBot extra"), Inbound::Help);
    }

    #[test]
    fn plain_text_is_verbatim() {
        assert_eq!(
            CommandParser::parse("  Double Apple "),
            Inbound::Text("  Double Apple ".into())
        );
    }

    #[test]
    fn unknown_command_is_kept_apart_from_text() {
        assert_eq!(
            CommandParser::parse("/Settings@TasteBot now"),
            Inbound::UnknownCommand("/settings".into())
        );
    }

    #[test]
    fn leading_space_is_not_a_command() {
        assert_eq!(
            CommandParser::parse("  /start"),
            Inbound::Text("  /start".into())
        );
    }

    #[test]
    fn bare_slash_is_text() {
        assert_eq!(CommandParser::parse("/"), Inbound::Text("/".into()));
    }

    #[test]
    fn command_word_must_lead() {
        assert_eq!(
            CommandParser::parse("try /start"),
            Inbound::Text("try /start".into())
        );
    }
}
