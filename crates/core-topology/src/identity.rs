//! Peer identities
//!
//! Every peer in the ledger network is named by an X.500-style distinguished
//! name such as `O=Alice Corp, L=London, C=GB`. Replicas of a group share the
//! group's identity template; replica `n >= 1` gets `n` appended to its common
//! name so that every running peer stays distinguishable.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed distinguished name
///
/// Attributes are rendered in a fixed order (`CN, OU, O, L, ST, C`) so the
/// string form is stable regardless of how the input was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerIdentity {
    common_name: Option<String>,
    organisation_unit: Option<String>,
    organisation: String,
    locality: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

impl PeerIdentity {
    /// Build an identity from its mandatory organisation attribute
    pub fn new(organisation: impl Into<String>) -> Self {
        Self {
            common_name: None,
            organisation_unit: None,
            organisation: organisation.into(),
            locality: None,
            state: None,
            country: None,
        }
    }

    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = Some(common_name.into());
        self
    }

    /// Parse `KEY=VALUE` pairs separated by commas
    pub fn parse(input: &str) -> Result<Self> {
        let mut common_name = None;
        let mut organisation_unit = None;
        let mut organisation = None;
        let mut locality = None;
        let mut state = None;
        let mut country = None;

        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::invalid_identity(input, format!("'{}' is not KEY=VALUE", part)))?;
            let value = value.trim();
            if value.is_empty() {
                return Err(Error::invalid_identity(
                    input,
                    format!("empty value for {}", key.trim()),
                ));
            }

            let slot = match key.trim().to_ascii_uppercase().as_str() {
                "CN" => &mut common_name,
                "OU" => &mut organisation_unit,
                "O" => &mut organisation,
                "L" => &mut locality,
                "ST" => &mut state,
                "C" => &mut country,
                other => {
                    return Err(Error::invalid_identity(
                        input,
                        format!("unsupported attribute {}", other),
                    ))
                }
            };
            if slot.is_some() {
                return Err(Error::invalid_identity(
                    input,
                    format!("duplicate attribute {}", key.trim()),
                ));
            }
            *slot = Some(value.to_string());
        }

        let organisation =
            organisation.ok_or_else(|| Error::invalid_identity(input, "missing O attribute"))?;

        Ok(Self {
            common_name,
            organisation_unit,
            organisation,
            locality,
            state,
            country,
        })
    }

    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    pub fn organisation(&self) -> &str {
        &self.organisation
    }

    /// Identity for replica `ordinal` of a group
    ///
    /// Ordinal 0 is the group identity itself.
    pub fn with_ordinal(&self, ordinal: u32) -> Self {
        if ordinal == 0 {
            return self.clone();
        }
        let mut identity = self.clone();
        let base = identity.common_name.take().unwrap_or_default();
        identity.common_name = Some(format!("{}{}", base, ordinal));
        identity
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes = [
            ("CN", self.common_name.as_deref()),
            ("OU", self.organisation_unit.as_deref()),
            ("O", Some(self.organisation.as_str())),
            ("L", self.locality.as_deref()),
            ("ST", self.state.as_deref()),
            ("C", self.country.as_deref()),
        ];

        let mut first = true;
        for (key, value) in attributes {
            if let Some(value) = value {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}={}", key, value)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl FromStr for PeerIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PeerIdentity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PeerIdentity> for String {
    fn from(identity: PeerIdentity) -> Self {
        identity.to_string()
    }
}
