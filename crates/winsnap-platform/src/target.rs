use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// What to capture, as entered by the user or read from config
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// The whole desktop window
    Desktop,
    /// A top-level window matched by its exact title
    WindowTitle(String),
}

impl FromStr for TargetSpec {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("desktop") {
            Ok(TargetSpec::Desktop)
        } else {
            Ok(TargetSpec::WindowTitle(s.to_string()))
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::Desktop => f.write_str("desktop"),
            TargetSpec::WindowTitle(title) => write!(f, "window \"{}\"", title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_desktop() {
        assert_eq!("desktop".parse::<TargetSpec>().unwrap(), TargetSpec::Desktop);
        assert_eq!("DeskTop".parse::<TargetSpec>().unwrap(), TargetSpec::Desktop);
        assert_eq!("".parse::<TargetSpec>().unwrap(), TargetSpec::Desktop);
        assert_eq!("   ".parse::<TargetSpec>().unwrap(), TargetSpec::Desktop);
    }

    #[test]
    fn test_parse_window_title() {
        assert_eq!(
            " Nox Player ".parse::<TargetSpec>().unwrap(),
            TargetSpec::WindowTitle("Nox Player".to_string())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(TargetSpec::Desktop.to_string(), "desktop");
        assert_eq!(
            TargetSpec::WindowTitle("Notepad".into()).to_string(),
            "window \"Notepad\""
        );
    }
}
