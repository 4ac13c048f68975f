use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Status,
    State,
    Stop,
    Home,
    Goto,
    Offset,
    Speed,
    Zero,
    Quit,
}

impl Verb {
    pub fn parse(word: &str) -> Option<Self> {
        let verb = match word.to_ascii_lowercase().as_str() {
            "status" => Verb::Status,
            "state" => Verb::State,
            "stop" => Verb::Stop,
            "home" => Verb::Home,
            "goto" => Verb::Goto,
            "offset" => Verb::Offset,
            "speed" => Verb::Speed,
            "zero" => Verb::Zero,
            "quit" | "q" => Verb::Quit,
            _ => return None,
        };
        Some(verb)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Status => "status",
            Verb::State => "state",
            Verb::Stop => "stop",
            Verb::Home => "home",
            Verb::Goto => "goto",
            Verb::Offset => "offset",
            Verb::Speed => "speed",
            Verb::Zero => "zero",
            Verb::Quit => "quit",
        }
    }

    pub fn takes_values(&self) -> bool {
        matches!(self, Verb::Goto | Verb::Offset | Verb::Speed)
    }

    pub fn defaults_to_all_axes(&self) -> bool {
        matches!(self, Verb::Status | Verb::State | Verb::Stop | Verb::Home)
    }

    pub fn starts_motion(&self) -> bool {
        matches!(self, Verb::Goto | Verb::Offset | Verb::Home)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status { axes: Vec<char> },
    State { axes: Vec<char> },
    Stop { axes: Vec<char> },
    Home { axes: Vec<char> },
    Zero { axes: Vec<char> },
    Goto { targets: Vec<(char, f64)> },
    Offset { targets: Vec<(char, f64)> },
    Speed { targets: Vec<(char, f64)> },
    Quit,
}

impl Command {
    pub fn verb(&self) -> Verb {
        match self {
            Command::Status { .. } => Verb::Status,
            Command::State { .. } => Verb::State,
            Command::Stop { .. } => Verb::Stop,
            Command::Home { .. } => Verb::Home,
            Command::Zero { .. } => Verb::Zero,
            Command::Goto { .. } => Verb::Goto,
            Command::Offset { .. } => Verb::Offset,
            Command::Speed { .. } => Verb::Speed,
            Command::Quit => Verb::Quit,
        }
    }

    pub fn slots(&self) -> Vec<char> {
        match self {
            Command::Status { axes }
            | Command::State { axes }
            | Command::Stop { axes }
            | Command::Home { axes }
            | Command::Zero { axes } => axes.clone(),
            Command::Goto { targets }
            | Command::Offset { targets }
            | Command::Speed { targets } => targets.iter().map(|(slot, _)| *slot).collect(),
            Command::Quit => Vec::new(),
        }
    }
}
