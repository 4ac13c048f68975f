use std::fmt::Display;

/// Text reply to one command: an `OK`/`BAD` first line, optionally followed
/// by `,<summary>`, then one detail line per axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    failed: bool,
    summary: Option<String>,
    details: Vec<String>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            failed: false,
            summary: None,
            details: Vec::new(),
        }
    }

    pub fn ok_with(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Self::ok()
        }
    }

    pub fn bad(summary: impl Into<String>) -> Self {
        Self {
            failed: true,
            summary: Some(summary.into()),
            details: Vec::new(),
        }
    }

    pub fn command_failure(err: impl Display) -> Self {
        Self::bad(format!("command failure: {}", err))
    }

    pub fn push_detail(&mut self, slot: char, detail: impl Display) {
        self.details.push(format!("{}={}", slot, detail));
    }

    pub fn push_failure(&mut self, slot: char, err: impl Display) {
        self.failed = true;
        self.details.push(format!("BAD,{}: {}", slot, err));
    }

    pub fn force_ok(mut self) -> Self {
        self.failed = false;
        self
    }

    pub fn is_ok(&self) -> bool {
        !self.failed
    }

    pub fn render(&self) -> String {
        let mut text = String::from(if self.failed { "BAD" } else { "OK" });
        if let Some(summary) = &self.summary {
            text.push(',');
            text.push_str(summary);
        }
        for detail in &self.details {
            text.push('\n');
            text.push_str(detail);
        }
        text
    }
}
