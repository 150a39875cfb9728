/// One line typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Help,
    Exit,
    Open,
    Close,
    Step,
    Flush,
    Current,
    Previous,
    Sequence,
    Break(BreakCommand),
    Info { json: bool },
    Exec(String),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakCommand {
    Arm(String),
    Clear,
    List,
}

pub struct CommandParser;

impl CommandParser {
    pub fn parse(input: &str) -> Command {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }

        let (word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (trimmed, ""),
        };

        match word {
            "help" | "?" => Command::Help,
            "exit" | "quit" => Command::Exit,
            "open" => Command::Open,
            "close" => Command::Close,
            "step" => Command::Step,
            "flush" => Command::Flush,
            "curr" | "current" => Command::Current,
            "prev" | "previous" => Command::Previous,
            "seq" => Command::Sequence,

            // Patterns may contain spaces, so the whole remainder is the glob.
            "break" => match rest {
                "" => Command::Break(BreakCommand::List),
                "clear" => Command::Break(BreakCommand::Clear),
                pattern => Command::Break(BreakCommand::Arm(pattern.to_string())),
            },

            "info" => match rest {
                "" => Command::Info { json: false },
                "json" => Command::Info { json: true },
                _ => Command::Unknown(trimmed.to_string()),
            },

            "exec" => Command::Exec(rest.to_string()),

            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}
