/// The commands a frontend may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Predict,
    Load,
    Unload,
    Unknown,
}

impl Command {
    /// Resolves a command name, ignoring ASCII case.
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("predict") {
            Self::Predict
        } else if name.eq_ignore_ascii_case("load") {
            Self::Load
        } else if name.eq_ignore_ascii_case("unload") {
            Self::Unload
        } else {
            Self::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ignores_case() {
        for name in ["predict", "PREDICT", "PrEdIcT"] {
            assert_eq!(Command::parse(name), Command::Predict);
        }
        assert_eq!(Command::parse("Load"), Command::Load);
        assert_eq!(Command::parse("UNLOAD"), Command::Unload);
    }

    #[test]
    fn parse_rejects_everything_else() {
        for name in ["", "predicts", " load", "reload", "ping"] {
            assert_eq!(Command::parse(name), Command::Unknown);
        }
    }
}
