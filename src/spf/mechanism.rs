//! SPF term types (RFC 7208 Section 5): qualifiers, mechanisms, modifiers.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Qualifier prefix on a mechanism. Defaults to Pass if omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Qualifier {
    Pass,     // +
    Fail,     // -
    SoftFail, // ~
    Neutral,  // ?
}

impl Qualifier {
    /// Parse a single-char qualifier prefix. Returns (Qualifier, remaining str).
    /// If no qualifier prefix, defaults to Pass.
    pub fn parse_prefix(s: &str) -> (Qualifier, &str) {
        match s.as_bytes().first() {
            Some(b'+') => (Qualifier::Pass, &s[1..]),
            Some(b'-') => (Qualifier::Fail, &s[1..]),
            Some(b'~') => (Qualifier::SoftFail, &s[1..]),
            Some(b'?') => (Qualifier::Neutral, &s[1..]),
            _ => (Qualifier::Pass, s),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Pass => write!(f, "+"),
            Qualifier::Fail => write!(f, "-"),
            Qualifier::SoftFail => write!(f, "~"),
            Qualifier::Neutral => write!(f, "?"),
        }
    }
}

/// Closed set of SPF mechanism keywords, matched exhaustively everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MechanismKind {
    All,
    Include,
    A,
    Mx,
    Ptr,
    Ip4,
    Ip6,
    Exists,
}

impl MechanismKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            MechanismKind::All => "all",
            MechanismKind::Include => "include",
            MechanismKind::A => "a",
            MechanismKind::Mx => "mx",
            MechanismKind::Ptr => "ptr",
            MechanismKind::Ip4 => "ip4",
            MechanismKind::Ip6 => "ip6",
            MechanismKind::Exists => "exists",
        }
    }

    /// Whether this kind costs one DNS lookup against the RFC 7208 budget.
    /// `ip4`/`ip6` carry their data inline; `all` terminates.
    pub fn counts_lookup(&self) -> bool {
        matches!(
            self,
            MechanismKind::Include
                | MechanismKind::A
                | MechanismKind::Mx
                | MechanismKind::Ptr
                | MechanismKind::Exists
        )
    }

    /// Whether the keyword is useless without a value (`a`, `mx`, and `ptr`
    /// fall back to the current domain; the rest have nothing to act on).
    pub fn requires_value(&self) -> bool {
        matches!(
            self,
            MechanismKind::Include
                | MechanismKind::Ip4
                | MechanismKind::Ip6
                | MechanismKind::Exists
        )
    }
}

/// One parsed mechanism term. `value` is the unquoted target (empty for
/// bare `a`/`mx`/`ptr`/`all`); dual-CIDR suffixes on `a`/`mx` land in
/// `parameters` under `cidr4`/`cidr6`; `ip4`/`ip6` keep any CIDR inside
/// `value`, since the literal is reported verbatim. `raw` is the original
/// term text including the qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mechanism {
    pub qualifier: Qualifier,
    pub kind: MechanismKind,
    pub value: String,
    pub parameters: BTreeMap<String, String>,
    pub raw: String,
}

impl Mechanism {
    /// A null lookup is a mechanism that is syntactically present but
    /// semantically useless: a required value is missing, or a `:` was
    /// written with nothing after it (bare `ip4:`, `include:`, `a:`).
    pub fn is_null_lookup(&self) -> bool {
        self.value.is_empty()
            && (self.kind.requires_value() || has_empty_value_separator(&self.raw, self.kind))
    }
}

fn has_empty_value_separator(raw: &str, kind: MechanismKind) -> bool {
    let (_, rest) = Qualifier::parse_prefix(raw);
    rest.len() == kind.keyword().len() + 1 && rest.ends_with(':')
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualifier != Qualifier::Pass {
            write!(f, "{}", self.qualifier)?;
        }
        write!(f, "{}", self.kind.keyword())?;
        if !self.value.is_empty() {
            write!(f, ":{}", self.value)?;
        }
        if let Some(c4) = self.parameters.get("cidr4") {
            write!(f, "/{c4}")?;
        }
        if let Some(c6) = self.parameters.get("cidr6") {
            write!(f, "//{c6}")?;
        }
        Ok(())
    }
}

/// Modifier name. Only `redirect` and `exp` are recognized; anything else
/// stays a raw [`Term::Unknown`] token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModifierName {
    Redirect,
    Exp,
}

/// `redirect=`/`exp=` name=value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modifier {
    pub name: ModifierName,
    pub value: String,
}

/// One term of a tokenized record. Unrecognized text is preserved, not
/// discarded, so reports can show exactly what a broken record contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Term {
    Mechanism(Mechanism),
    Modifier(Modifier),
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifier_parse_explicit() {
        assert_eq!(Qualifier::parse_prefix("+all"), (Qualifier::Pass, "all"));
        assert_eq!(Qualifier::parse_prefix("-all"), (Qualifier::Fail, "all"));
        assert_eq!(Qualifier::parse_prefix("~all"), (Qualifier::SoftFail, "all"));
        assert_eq!(Qualifier::parse_prefix("?all"), (Qualifier::Neutral, "all"));
    }

    #[test]
    fn qualifier_parse_default() {
        assert_eq!(Qualifier::parse_prefix("all"), (Qualifier::Pass, "all"));
        assert_eq!(
            Qualifier::parse_prefix("include:x"),
            (Qualifier::Pass, "include:x")
        );
    }

    #[test]
    fn lookup_cost_per_kind() {
        assert!(MechanismKind::Include.counts_lookup());
        assert!(MechanismKind::A.counts_lookup());
        assert!(MechanismKind::Mx.counts_lookup());
        assert!(MechanismKind::Ptr.counts_lookup());
        assert!(MechanismKind::Exists.counts_lookup());
        assert!(!MechanismKind::Ip4.counts_lookup());
        assert!(!MechanismKind::Ip6.counts_lookup());
        assert!(!MechanismKind::All.counts_lookup());
    }

    #[test]
    fn null_lookup_detection() {
        let null_ip4 = Mechanism {
            qualifier: Qualifier::Pass,
            kind: MechanismKind::Ip4,
            value: String::new(),
            parameters: BTreeMap::new(),
            raw: "ip4:".into(),
        };
        assert!(null_ip4.is_null_lookup());

        let bare_include = Mechanism {
            qualifier: Qualifier::Pass,
            kind: MechanismKind::Include,
            value: String::new(),
            parameters: BTreeMap::new(),
            raw: "include".into(),
        };
        assert!(bare_include.is_null_lookup());

        let empty_a = Mechanism {
            qualifier: Qualifier::Pass,
            kind: MechanismKind::A,
            value: String::new(),
            parameters: BTreeMap::new(),
            raw: "a:".into(),
        };
        assert!(empty_a.is_null_lookup());

        // Bare `a` defaults to the current domain and is perfectly valid.
        let bare_a = Mechanism {
            qualifier: Qualifier::Pass,
            kind: MechanismKind::A,
            value: String::new(),
            parameters: BTreeMap::new(),
            raw: "a".into(),
        };
        assert!(!bare_a.is_null_lookup());
    }

    #[test]
    fn display_mechanism() {
        let m = Mechanism {
            qualifier: Qualifier::Fail,
            kind: MechanismKind::All,
            value: String::new(),
            parameters: BTreeMap::new(),
            raw: "-all".into(),
        };
        assert_eq!(m.to_string(), "-all");

        let mut params = BTreeMap::new();
        params.insert("cidr4".to_string(), "24".to_string());
        params.insert("cidr6".to_string(), "64".to_string());
        let a = Mechanism {
            qualifier: Qualifier::Pass,
            kind: MechanismKind::A,
            value: "example.com".into(),
            parameters: params,
            raw: "a:example.com/24//64".into(),
        };
        assert_eq!(a.to_string(), "a:example.com/24//64");
    }
}
