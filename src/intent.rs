use thiserror::Error;

use crate::chat::{ChatMode, QuickPrompt};

/// One line typed at the kitchen prompt, turned into a user intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Help,
    Quit,
    /// Replace the recipe input without analysing it.
    Recipe(String),
    /// Analyse the given text, or the current recipe input.
    Analyze(Option<String>),
    Presets,
    Preset(String),
    AddTimer {
        label: String,
        minutes: u32,
        seconds: u32,
    },
    Start(String),
    Pause(String),
    Resume(String),
    Stop(String),
    Timers,
    Watch,
    Log,
    Steps(Option<String>),
    /// `strict` fails on the first unreadable line instead of skipping it.
    Nutrition { reference: String, strict: bool },
    Mode(ChatMode),
    /// `mode` of `None` keeps the session's current chat mode.
    Chat {
        mode: Option<ChatMode>,
        text: String,
    },
    Quick(QuickPrompt),
    History,
    Stats,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseIntentError {
    #[error("type a command, or 'help' for the list")]
    Empty,

    #[error("unknown command '{0}', type 'help' for the list")]
    Unknown(String),

    #[error("'{command}' needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("{what} must be a whole number, got '{value}'")]
    InvalidNumber { what: &'static str, value: String },

    #[error("unknown chat mode '{0}' (use ideas, tips or subs)")]
    UnknownMode(String),

    #[error("unknown quick prompt '{0}' (use dinner, garlic or snack)")]
    UnknownQuickPrompt(String),
}

impl Intent {
    pub fn parse(line: &str) -> Result<Self, ParseIntentError> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command.to_lowercase().as_str() {
            "" => Err(ParseIntentError::Empty),
            "help" | "?" => Ok(Intent::Help),
            "quit" | "exit" | "q" => Ok(Intent::Quit),
            "recipe" => required("recipe", "the recipe text", rest).map(Intent::Recipe),
            "analyze" | "analyse" => Ok(Intent::Analyze(optional(rest))),
            "presets" => Ok(Intent::Presets),
            "preset" => required("preset", "a preset name or number", rest).map(Intent::Preset),
            "add" => parse_add(rest),
            "start" => required("start", "a timer label", rest).map(Intent::Start),
            "pause" => required("pause", "a timer label", rest).map(Intent::Pause),
            "resume" => required("resume", "a timer label", rest).map(Intent::Resume),
            "stop" => required("stop", "a timer label", rest).map(Intent::Stop),
            "timers" | "ls" => Ok(Intent::Timers),
            "watch" => Ok(Intent::Watch),
            "log" | "done" => Ok(Intent::Log),
            "steps" => Ok(Intent::Steps(optional(rest))),
            "nutrition" => parse_nutrition_request(rest),
            "mode" => {
                let word = required("mode", "ideas, tips or subs", rest)?;
                ChatMode::from_keyword(&word)
                    .map(Intent::Mode)
                    .ok_or(ParseIntentError::UnknownMode(word))
            }
            "chat" | "ask" => Ok(parse_chat(rest)),
            "quick" => {
                let word = required("quick", "dinner, garlic or snack", rest)?;
                QuickPrompt::from_keyword(&word)
                    .map(Intent::Quick)
                    .ok_or(ParseIntentError::UnknownQuickPrompt(word))
            }
            "history" => Ok(Intent::History),
            "stats" => Ok(Intent::Stats),
            other => Err(ParseIntentError::Unknown(other.to_string())),
        }
    }
}

fn required(command: &'static str, what: &'static str, rest: &str) -> Result<String, ParseIntentError> {
    if rest.is_empty() {
        Err(ParseIntentError::MissingArgument { command, what })
    } else {
        Ok(rest.to_string())
    }
}

fn optional(rest: &str) -> Option<String> {
    (!rest.is_empty()).then(|| rest.to_string())
}

/// `add <minutes> <seconds> <label...>`
fn parse_add(rest: &str) -> Result<Intent, ParseIntentError> {
    let mut words = rest.split_whitespace();
    let minutes = number(words.next(), "minutes")?;
    let seconds = number(words.next(), "seconds")?;
    let label = words.collect::<Vec<_>>().join(" ");
    Ok(Intent::AddTimer {
        label: if label.is_empty() { "My Dish".to_string() } else { label },
        minutes,
        seconds,
    })
}

/// `nutrition [--strict] <label>`
fn parse_nutrition_request(rest: &str) -> Result<Intent, ParseIntentError> {
    let (strict, reference) = match rest.strip_prefix("--strict") {
        Some(tail) if tail.is_empty() || tail.starts_with(char::is_whitespace) => {
            (true, tail.trim())
        }
        _ => (false, rest),
    };
    let reference = required("nutrition", "a timer label", reference)?;
    Ok(Intent::Nutrition { reference, strict })
}

fn number(part: Option<&str>, what: &'static str) -> Result<u32, ParseIntentError> {
    let value = part.filter(|p| !p.is_empty()).ok_or(ParseIntentError::MissingArgument {
        command: "add",
        what: "minutes and seconds",
    })?;
    value.parse().map_err(|_| ParseIntentError::InvalidNumber {
        what,
        value: value.to_string(),
    })
}

/// `chat [ideas|tips|subs] <text>`; a leading mode keyword is optional.
fn parse_chat(rest: &str) -> Intent {
    let (first, tail) = match rest.split_once(char::is_whitespace) {
        Some((first, tail)) => (first, tail.trim()),
        None => (rest, ""),
    };
    match ChatMode::from_keyword(first) {
        Some(mode) => Intent::Chat {
            mode: Some(mode),
            text: tail.to_string(),
        },
        None => Intent::Chat {
            mode: None,
            text: rest.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_commands() {
        assert_eq!(
            Intent::parse("add 0 30 Rice").unwrap(),
            Intent::AddTimer { label: "Rice".to_string(), minutes: 0, seconds: 30 }
        );
        assert_eq!(
            Intent::parse("add 12 0   Boiled eggs ").unwrap(),
            Intent::AddTimer { label: "Boiled eggs".to_string(), minutes: 12, seconds: 0 }
        );
        assert_eq!(
            Intent::parse("add 5  0   Rice").unwrap(),
            Intent::AddTimer { label: "Rice".to_string(), minutes: 5, seconds: 0 }
        );
        assert_eq!(
            Intent::parse("add\t3 15\tPoached egg").unwrap(),
            Intent::AddTimer { label: "Poached egg".to_string(), minutes: 3, seconds: 15 }
        );
        assert_eq!(
            Intent::parse("add 5 0").unwrap(),
            Intent::AddTimer { label: "My Dish".to_string(), minutes: 5, seconds: 0 }
        );
        assert_eq!(Intent::parse("START My Dish").unwrap(), Intent::Start("My Dish".to_string()));
        assert_eq!(Intent::parse("stop 2").unwrap(), Intent::Stop("2".to_string()));
    }

    #[test]
    fn test_add_rejects_bad_numbers() {
        assert_eq!(
            Intent::parse("add five 0 Rice"),
            Err(ParseIntentError::InvalidNumber { what: "minutes", value: "five".to_string() })
        );
        assert!(matches!(
            Intent::parse("add 5"),
            Err(ParseIntentError::MissingArgument { command: "add", .. })
        ));
    }

    #[test]
    fn test_chat_with_and_without_mode() {
        assert_eq!(
            Intent::parse("chat subs garlic").unwrap(),
            Intent::Chat { mode: Some(ChatMode::IngredientSubstitutes), text: "garlic".to_string() }
        );
        assert_eq!(
            Intent::parse("ask how long do I rest a steak?").unwrap(),
            Intent::Chat { mode: None, text: "how long do I rest a steak?".to_string() }
        );
        assert_eq!(
            Intent::parse("chat").unwrap(),
            Intent::Chat { mode: None, text: String::new() }
        );
    }

    #[test]
    fn test_misc_commands() {
        assert_eq!(Intent::parse("analyze").unwrap(), Intent::Analyze(None));
        assert_eq!(
            Intent::parse("analyze Pancakes with syrup").unwrap(),
            Intent::Analyze(Some("Pancakes with syrup".to_string()))
        );
        assert_eq!(
            Intent::parse("nutrition 1").unwrap(),
            Intent::Nutrition { reference: "1".to_string(), strict: false }
        );
        assert_eq!(
            Intent::parse("nutrition --strict 🍳 Risotto...").unwrap(),
            Intent::Nutrition { reference: "🍳 Risotto...".to_string(), strict: true }
        );
        assert!(matches!(
            Intent::parse("nutrition --strict"),
            Err(ParseIntentError::MissingArgument { command: "nutrition", .. })
        ));
        assert_eq!(Intent::parse("quick snack").unwrap(), Intent::Quick(QuickPrompt::HealthySnack));
        assert_eq!(Intent::parse("mode tips").unwrap(), Intent::Mode(ChatMode::CookingTips));
        assert_eq!(Intent::parse("   "), Err(ParseIntentError::Empty));
        assert_eq!(
            Intent::parse("bake 200"),
            Err(ParseIntentError::Unknown("bake".to_string()))
        );
        assert_eq!(
            Intent::parse("mode jokes"),
            Err(ParseIntentError::UnknownMode("jokes".to_string()))
        );
    }
}
