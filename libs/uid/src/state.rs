//! Lifecycle state of a Surrogate.

use std::fmt;
use std::str::FromStr;

use crate::SchemaError;

/// Lifecycle state.
///
/// ```text
/// (none) -> GENERATED  -> 0
/// (none) -> REGISTERED -> 0
/// ```
///
/// `Inactive` is terminal; a deleted Surrogate is never reactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Created with a system-synthesized or caller-chosen external id.
    Generated,
    /// Created from a caller-supplied full identifier.
    Registered,
    /// Soft deleted.
    Inactive,
}

impl State {
    /// Returns the persisted/wire code.
    pub const fn code(&self) -> &'static str {
        match self {
            State::Generated => "GENERATED",
            State::Registered => "REGISTERED",
            State::Inactive => "0",
        }
    }

    pub const fn is_active(&self) -> bool {
        !matches!(self, State::Inactive)
    }

    /// Returns true if the lifecycle permits moving from `self` to `next`.
    pub const fn can_transition_to(&self, next: State) -> bool {
        matches!(
            (self, next),
            (State::Generated, State::Inactive) | (State::Registered, State::Inactive)
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for State {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERATED" => Ok(State::Generated),
            "REGISTERED" => Ok(State::Registered),
            "0" => Ok(State::Inactive),
            _ => Err(SchemaError::ArgumentBadValue { segment: "state" }),
        }
    }
}

impl serde::Serialize for State {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

impl<'de> serde::Deserialize<'de> for State {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for state in [State::Generated, State::Registered, State::Inactive] {
            assert_eq!(state.code().parse::<State>().unwrap(), state);
        }
    }

    #[test]
    fn test_inactive_is_terminal() {
        assert!(State::Generated.can_transition_to(State::Inactive));
        assert!(State::Registered.can_transition_to(State::Inactive));
        assert!(!State::Inactive.can_transition_to(State::Inactive));
        assert!(!State::Inactive.can_transition_to(State::Generated));
        assert!(!State::Inactive.can_transition_to(State::Registered));
    }

    #[test]
    fn test_unknown_code() {
        assert!("DELETED".parse::<State>().is_err());
    }
}
