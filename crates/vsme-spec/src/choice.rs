//! Closed option sets used by wizard fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A field value drawn from a fixed set of tokens.
pub trait Choice: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|choice| choice.as_str() == raw)
    }

    fn allowed() -> String {
        Self::ALL
            .iter()
            .map(|choice| choice.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Raised when a token is not part of a choice set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not one of: {allowed}")]
pub struct UnknownChoice {
    pub value: String,
    pub allowed: String,
}

macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Choice for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                <$name as Choice>::parse(raw).ok_or_else(|| UnknownChoice {
                    value: raw.to_string(),
                    allowed: <$name as Choice>::allowed(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

choice_enum! {
    /// Reporting currency.
    Currency {
        Eur => "EUR",
        Usd => "USD",
        Gbp => "GBP",
        Jpy => "JPY",
    }
}

choice_enum! {
    /// Scheme of the reporting entity identifier.
    IdentifierScheme {
        Lei => "LEI",
        Duns => "DUNS",
        EuId => "EU ID",
        PermId => "PermID",
    }
}

choice_enum! {
    BasisModule {
        Basic => "Basic",
        BasicAndComprehensive => "Basic & Comprehensive",
    }
}

choice_enum! {
    ReportingBasis {
        Consolidated => "Consolidated",
        Individual => "Individual",
    }
}

choice_enum! {
    EmployeeCountingMethod {
        Headcount => "Headcount",
        FullTimeEquivalent => "Full-time equivalent",
        Both => "Both",
    }
}

choice_enum! {
    /// Answer to a yes/no disclosure question.
    YesNo {
        Yes => "yes",
        No => "no",
    }
}
