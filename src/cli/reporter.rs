use colored::Colorize;

use super::driver::Outcome;

pub struct Reporter {
    color: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter { color }
    }

    pub fn render(&self, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Subtype {
                sub,
                sup,
                holds,
                equivalent,
            } => {
                let relation = match (holds, equivalent) {
                    (true, true) => "≡",
                    (true, false) => "<:",
                    (false, _) => "</:",
                };
                let verdict = self.verdict(*holds);
                format!("{verdict} {sub} {relation} {sup}")
            }
            Outcome::Name(name) => name.clone(),
            Outcome::Valid {
                expected,
                value,
                mismatch,
            } => match mismatch {
                None => format!("{} {value} : {expected}", self.verdict(true)),
                Some(message) => format!("{} {message}", self.verdict(false)),
            },
        }
    }

    fn verdict(&self, ok: bool) -> String {
        let label = if ok { "ok" } else { "no" };
        match (self.color, ok) {
            (false, _) => label.to_string(),
            (true, true) => label.green().bold().to_string(),
            (true, false) => label.red().bold().to_string(),
        }
    }
}
