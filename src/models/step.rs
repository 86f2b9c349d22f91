use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse phase of the exchange, stored in the shared document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Setup,
    Selection,
    Wishes,
    AllWishes,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Setup => write!(f, "setup"),
            Step::Selection => write!(f, "selection"),
            Step::Wishes => write!(f, "wishes"),
            Step::AllWishes => write!(f, "all-wishes"),
        }
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "setup" => Ok(Step::Setup),
            "selection" => Ok(Step::Selection),
            "wishes" => Ok(Step::Wishes),
            "all-wishes" | "all_wishes" => Ok(Step::AllWishes),
            _ => Err(format!(
                "Invalid step '{}'. Valid options: setup, selection, wishes, all-wishes",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_display() {
        assert_eq!(format!("{}", Step::Setup), "setup");
        assert_eq!(format!("{}", Step::AllWishes), "all-wishes");
    }

    #[test]
    fn test_step_from_str() {
        assert_eq!(Step::from_str("SELECTION").unwrap(), Step::Selection);
        assert_eq!(Step::from_str("all_wishes").unwrap(), Step::AllWishes);
        assert!(Step::from_str("voting").is_err());
    }

    #[test]
    fn test_step_json_uses_kebab_case() {
        let json = serde_json::to_string(&Step::AllWishes).unwrap();
        assert_eq!(json, "\"all-wishes\"");

        let parsed: Step = serde_json::from_str("\"wishes\"").unwrap();
        assert_eq!(parsed, Step::Wishes);
    }
}
