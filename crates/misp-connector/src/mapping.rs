//! Label-to-code tables for MISP event and attribute metadata.
//!
//! The host platform sends human-readable labels ("High", "Ongoing",
//! "All Communities"); MISP expects numeric codes. Each table is a closed
//! enum. Labels match case-insensitively.

use crate::traits::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A closed set of labelled values with a MISP numeric code.
pub trait LabelledCode: Sized + Copy + 'static {
    /// Parameter name used in error messages.
    const FIELD: &'static str;
    /// Every variant, in code order.
    const ALL: &'static [Self];

    fn label(self) -> &'static str;
    fn code(self) -> u8;

    fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.label().eq_ignore_ascii_case(label))
    }
}

/// Resolves an optional label parameter.
///
/// Absent, `null` or empty labels resolve to `None`; a label outside the
/// table is a validation error.
pub fn resolve_label<T: LabelledCode>(value: Option<&Value>) -> ConnectorResult<Option<T>> {
    let label = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(ConnectorError::Validation(format!(
                "Invalid {} value: {}",
                T::FIELD,
                other
            )))
        }
    };

    T::from_label(label).map(Some).ok_or_else(|| {
        let allowed: Vec<&str> = T::ALL.iter().map(|v| v.label()).collect();
        ConnectorError::Validation(format!(
            "Unknown {} '{}'. Expected one of: {}",
            T::FIELD,
            label,
            allowed.join(", ")
        ))
    })
}

/// Event threat level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatLevel {
    High,
    Medium,
    Low,
    Undefined,
}

impl LabelledCode for ThreatLevel {
    const FIELD: &'static str = "threat_level";
    const ALL: &'static [Self] = &[Self::High, Self::Medium, Self::Low, Self::Undefined];

    fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Undefined => "Undefined",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
            Self::Undefined => 4,
        }
    }
}

/// Event analysis maturity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Analysis {
    Initial,
    Ongoing,
    Completed,
}

impl LabelledCode for Analysis {
    const FIELD: &'static str = "analysis";
    const ALL: &'static [Self] = &[Self::Initial, Self::Ongoing, Self::Completed];

    fn label(self) -> &'static str {
        match self {
            Self::Initial => "Initial",
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Initial => 0,
            Self::Ongoing => 1,
            Self::Completed => 2,
        }
    }
}

/// Sharing scope of an event or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distribution {
    YourOrganisationOnly,
    ThisCommunityOnly,
    ConnectedCommunities,
    AllCommunities,
    SharingGroup,
    InheritEvent,
}

impl LabelledCode for Distribution {
    const FIELD: &'static str = "distribution";
    const ALL: &'static [Self] = &[
        Self::YourOrganisationOnly,
        Self::ThisCommunityOnly,
        Self::ConnectedCommunities,
        Self::AllCommunities,
        Self::SharingGroup,
        Self::InheritEvent,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::YourOrganisationOnly => "Your Organisation Only",
            Self::ThisCommunityOnly => "This Community Only",
            Self::ConnectedCommunities => "Connected Communities",
            Self::AllCommunities => "All Communities",
            Self::SharingGroup => "Sharing Group",
            Self::InheritEvent => "Inherit Event",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::YourOrganisationOnly => 0,
            Self::ThisCommunityOnly => 1,
            Self::ConnectedCommunities => 2,
            Self::AllCommunities => 3,
            Self::SharingGroup => 4,
            Self::InheritEvent => 5,
        }
    }
}

macro_rules! impl_display_from_str {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = ConnectorError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                resolve_label::<$ty>(Some(&Value::String(s.to_string())))?
                    .ok_or_else(|| ConnectorError::Validation(format!("Empty {}", <$ty>::FIELD)))
            }
        }
    )*};
}

impl_display_from_str!(ThreatLevel, Analysis, Distribution);

/// Attribute category and the attribute types MISP allows in it.
///
/// Categories are looked up case-insensitively; an unknown category yields
/// `None`.
pub fn attribute_types(category: &str) -> Option<&'static [&'static str]> {
    let category = category.trim();
    ATTRIBUTE_TYPES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, types)| *types)
}

/// Every known attribute category.
pub fn attribute_categories() -> impl Iterator<Item = &'static str> {
    ATTRIBUTE_TYPES.iter().map(|(name, _)| *name)
}

const ATTRIBUTE_TYPES: &[(&str, &[&str])] = &[
    (
        "Internal reference",
        &["text", "link", "comment", "other", "hex", "anonymised", "git-commit-id"],
    ),
    (
        "Targeting data",
        &[
            "target-user",
            "target-email",
            "target-machine",
            "target-org",
            "target-location",
            "target-external",
            "comment",
            "anonymised",
        ],
    ),
    (
        "Antivirus detection",
        &["link", "comment", "text", "hex", "attachment", "other", "anonymised"],
    ),
    (
        "Payload delivery",
        &[
            "md5",
            "sha1",
            "sha256",
            "filename",
            "filename|md5",
            "filename|sha1",
            "filename|sha256",
            "ip-src",
            "ip-dst",
            "hostname",
            "domain",
            "email-src",
            "email-dst",
            "email-subject",
            "email-attachment",
            "url",
            "user-agent",
            "AS",
            "pattern-in-file",
            "yara",
            "attachment",
            "malware-sample",
            "link",
            "comment",
            "text",
            "vulnerability",
            "other",
        ],
    ),
    (
        "Artifacts dropped",
        &[
            "md5",
            "sha1",
            "sha256",
            "filename",
            "filename|md5",
            "filename|sha1",
            "filename|sha256",
            "regkey",
            "regkey|value",
            "pattern-in-file",
            "pattern-in-memory",
            "yara",
            "attachment",
            "malware-sample",
            "named pipe",
            "mutex",
            "comment",
            "text",
            "other",
        ],
    ),
    (
        "Payload installation",
        &[
            "md5",
            "sha1",
            "sha256",
            "filename",
            "filename|md5",
            "filename|sha1",
            "filename|sha256",
            "pattern-in-file",
            "pattern-in-memory",
            "yara",
            "vulnerability",
            "attachment",
            "malware-sample",
            "mobile-application-id",
            "comment",
            "text",
            "other",
        ],
    ),
    (
        "Persistence mechanism",
        &["filename", "regkey", "regkey|value", "comment", "text", "other"],
    ),
    (
        "Network activity",
        &[
            "ip-src",
            "ip-dst",
            "ip-dst|port",
            "ip-src|port",
            "port",
            "hostname",
            "domain",
            "domain|ip",
            "mac-address",
            "email",
            "email-dst",
            "email-src",
            "url",
            "uri",
            "user-agent",
            "http-method",
            "AS",
            "snort",
            "pattern-in-file",
            "pattern-in-traffic",
            "x509-fingerprint-sha1",
            "ja3-fingerprint-md5",
            "attachment",
            "comment",
            "text",
            "other",
        ],
    ),
    ("Payload type", &["comment", "text", "other"]),
    (
        "Attribution",
        &[
            "threat-actor",
            "campaign-name",
            "campaign-id",
            "whois-registrant-email",
            "whois-registrant-name",
            "whois-registrar",
            "whois-creation-date",
            "comment",
            "text",
            "other",
        ],
    ),
    (
        "External analysis",
        &[
            "md5",
            "sha1",
            "sha256",
            "filename",
            "ip-src",
            "ip-dst",
            "hostname",
            "domain",
            "url",
            "user-agent",
            "regkey",
            "AS",
            "snort",
            "pattern-in-file",
            "pattern-in-traffic",
            "vulnerability",
            "attachment",
            "malware-sample",
            "link",
            "comment",
            "text",
            "other",
        ],
    ),
    (
        "Financial fraud",
        &[
            "btc",
            "xmr",
            "iban",
            "bic",
            "bank-account-nr",
            "aba-rtn",
            "bin",
            "cc-number",
            "prtn",
            "phone-number",
            "comment",
            "text",
            "other",
            "hex",
        ],
    ),
    (
        "Support Tool",
        &["link", "text", "attachment", "comment", "other", "hex"],
    ),
    (
        "Social network",
        &[
            "github-username",
            "github-repository",
            "github-organisation",
            "jabber-id",
            "twitter-id",
            "email-src",
            "email-dst",
            "comment",
            "text",
            "other",
            "whois-registrant-email",
            "anonymised",
        ],
    ),
    (
        "Person",
        &[
            "first-name",
            "middle-name",
            "last-name",
            "date-of-birth",
            "place-of-birth",
            "gender",
            "passport-number",
            "passport-country",
            "nationality",
            "phone-number",
            "comment",
            "text",
            "other",
        ],
    ),
    (
        "Other",
        &[
            "comment",
            "text",
            "other",
            "size-in-bytes",
            "counter",
            "datetime",
            "cpe",
            "port",
            "float",
            "hex",
            "phone-number",
            "boolean",
            "anonymised",
        ],
    ),
];
