//! Rulesets, as far as they concern ko and suicide.
//!
//! | Name    | Ruleset                 | Superko     | Suicide   |
//! |---------|-------------------------|-------------|-----------|
//! | `"NZ"`  | New Zealand             | situational | allowed   |
//! | `"AGA"` | American Go Association | situational | forbidden |
//! | `"TT"`  | Tromp-Taylor            | positional  | allowed   |
//! | `""`    | unrestricted            | none        | allowed   |
//!
//! Game behavior depends only on the two fields of [`Ruleset`], never on
//! the name it was looked up by.

use std::str::FromStr;

use crate::error::ConfigError;

/// Which repeated positions are forbidden.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Superko {
    /// No repetition rule.
    None,
    /// No position may repeat.
    Positional,
    /// No position may repeat with the same player having just moved.
    Situational,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ruleset {
    pub suicide_forbidden: bool,
    pub superko: Superko,
}

impl Ruleset {
    pub const UNRESTRICTED: Ruleset = Ruleset {
        suicide_forbidden: false,
        superko: Superko::None,
    };
    pub const NEW_ZEALAND: Ruleset = Ruleset {
        suicide_forbidden: false,
        superko: Superko::Situational,
    };
    pub const AGA: Ruleset = Ruleset {
        suicide_forbidden: true,
        superko: Superko::Situational,
    };
    pub const TROMP_TAYLOR: Ruleset = Ruleset {
        suicide_forbidden: false,
        superko: Superko::Positional,
    };

    /// Look up a preset by name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "" => Ok(Self::UNRESTRICTED),
            "NZ" => Ok(Self::NEW_ZEALAND),
            "AGA" => Ok(Self::AGA),
            "TT" => Ok(Self::TROMP_TAYLOR),
            other => Err(ConfigError::UnknownRuleset(other.to_string())),
        }
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::UNRESTRICTED
    }
}

impl FromStr for Ruleset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(Ruleset::from_name("").unwrap(), Ruleset::UNRESTRICTED);
        assert_eq!(
            Ruleset::from_name("NZ").unwrap(),
            Ruleset {
                suicide_forbidden: false,
                superko: Superko::Situational
            }
        );
        assert_eq!(
            Ruleset::from_name("AGA").unwrap(),
            Ruleset {
                suicide_forbidden: true,
                superko: Superko::Situational
            }
        );
        assert_eq!(
            "TT".parse::<Ruleset>().unwrap(),
            Ruleset {
                suicide_forbidden: false,
                superko: Superko::Positional
            }
        );
    }

    #[test]
    fn test_unknown_ruleset() {
        assert_eq!(
            Ruleset::from_name("Japanese"),
            Err(ConfigError::UnknownRuleset("Japanese".into()))
        );
        assert!(Ruleset::from_name("nz").is_err(), "names are case-sensitive");
    }
}
