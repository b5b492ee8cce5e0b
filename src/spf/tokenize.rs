//! Record tokenization: splits an assembled SPF record into terms.
//!
//! The tokenizer never fails. Unknown keywords become [`Term::Unknown`],
//! empty-valued mechanisms are retained as null-lookup candidates, and a
//! record that does not even start with `v=spf1` is still tokenized
//! best-effort so the report can describe what is actually published.

use std::collections::BTreeMap;

use super::mechanism::{Mechanism, MechanismKind, Modifier, ModifierName, Qualifier, Term};

/// Tokenizer output: the ordered terms plus the purely syntactic facts
/// that only the raw text can answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedRecord {
    pub starts_correctly: bool,
    pub terms: Vec<Term>,
    pub contains_characters_after_all: bool,
}

/// Tokenize a record string. Keyword matching is case-insensitive; the
/// original casing of values is preserved.
pub fn tokenize(record: &str) -> TokenizedRecord {
    let trimmed = record.trim();
    let lower = trimmed.to_ascii_lowercase();
    let starts_correctly = lower == "v=spf1" || lower.starts_with("v=spf1 ");

    let body = if starts_correctly {
        trimmed["v=spf1".len()..].trim_start()
    } else {
        trimmed
    };

    let mut terms = Vec::new();
    let mut seen_all = false;
    let mut contains_characters_after_all = false;

    // Whitespace between terms never counts as "characters after all";
    // only a further non-whitespace term does.
    for raw in body.split_whitespace() {
        if seen_all {
            contains_characters_after_all = true;
        }
        let term = parse_term(raw);
        if matches!(
            term,
            Term::Mechanism(Mechanism {
                kind: MechanismKind::All,
                ..
            })
        ) {
            seen_all = true;
        }
        terms.push(term);
    }

    TokenizedRecord {
        starts_correctly,
        terms,
        contains_characters_after_all,
    }
}

fn parse_term(raw: &str) -> Term {
    let (qualifier, rest) = Qualifier::parse_prefix(raw);
    let lower = rest.to_ascii_lowercase();

    if let Some(value) = strip_modifier(&lower, rest, "redirect=") {
        return Term::Modifier(Modifier {
            name: ModifierName::Redirect,
            value: unquote(value).to_string(),
        });
    }
    if let Some(value) = strip_modifier(&lower, rest, "exp=") {
        return Term::Modifier(Modifier {
            name: ModifierName::Exp,
            value: unquote(value).to_string(),
        });
    }

    match parse_mechanism(rest, &lower) {
        Some((kind, value, parameters)) => Term::Mechanism(Mechanism {
            qualifier,
            kind,
            value,
            parameters,
            raw: raw.to_string(),
        }),
        None => Term::Unknown(raw.to_string()),
    }
}

fn strip_modifier<'a>(lower: &str, rest: &'a str, prefix: &str) -> Option<&'a str> {
    if lower.starts_with(prefix) {
        Some(&rest[prefix.len()..])
    } else {
        None
    }
}

type ParsedMechanism = (MechanismKind, String, BTreeMap<String, String>);

fn parse_mechanism(rest: &str, lower: &str) -> Option<ParsedMechanism> {
    let no_params = BTreeMap::new();

    if lower == "all" {
        return Some((MechanismKind::All, String::new(), no_params));
    }
    if lower == "include" || lower.starts_with("include:") {
        return Some((MechanismKind::Include, value_after(rest, "include"), no_params));
    }
    if lower == "exists" || lower.starts_with("exists:") {
        return Some((MechanismKind::Exists, value_after(rest, "exists"), no_params));
    }
    if lower == "ptr" || lower.starts_with("ptr:") {
        return Some((MechanismKind::Ptr, value_after(rest, "ptr"), no_params));
    }
    if lower == "ip4" || lower.starts_with("ip4:") {
        return Some((MechanismKind::Ip4, value_after(rest, "ip4"), no_params));
    }
    if lower == "ip6" || lower.starts_with("ip6:") {
        return Some((MechanismKind::Ip6, value_after(rest, "ip6"), no_params));
    }
    if lower == "a" || lower.starts_with("a:") || lower.starts_with("a/") {
        let (value, parameters) = split_target_and_cidr(&rest["a".len()..]);
        return Some((MechanismKind::A, value, parameters));
    }
    if lower == "mx" || lower.starts_with("mx:") || lower.starts_with("mx/") {
        let (value, parameters) = split_target_and_cidr(&rest["mx".len()..]);
        return Some((MechanismKind::Mx, value, parameters));
    }

    None
}

/// Value portion after `keyword:`, unquoted. Empty when the keyword is
/// bare or the `:` has nothing behind it (a null-lookup candidate).
fn value_after(rest: &str, keyword: &str) -> String {
    match rest.get(keyword.len() + 1..) {
        Some(v) => unquote(v).to_string(),
        None => String::new(),
    }
}

/// Split an `a`/`mx` remainder (`":domain/24//64"`, `"/24"`, `"//64"`, ...)
/// into the target domain and the dual-CIDR parameters.
fn split_target_and_cidr(remainder: &str) -> (String, BTreeMap<String, String>) {
    let mut parameters = BTreeMap::new();
    let mut value = remainder.strip_prefix(':').unwrap_or(remainder);

    if let Some(pos) = value.find("//") {
        parameters.insert("cidr6".to_string(), value[pos + 2..].to_string());
        value = &value[..pos];
    }
    if let Some(pos) = value.rfind('/') {
        parameters.insert("cidr4".to_string(), value[pos + 1..].to_string());
        value = &value[..pos];
    }

    (unquote(value).to_string(), parameters)
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mechanisms(record: &str) -> Vec<Mechanism> {
        tokenize(record)
            .terms
            .into_iter()
            .filter_map(|t| match t {
                Term::Mechanism(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn minimal_record() {
        let tokenized = tokenize("v=spf1 -all");
        assert!(tokenized.starts_correctly);
        assert_eq!(tokenized.terms.len(), 1);
        let m = &mechanisms("v=spf1 -all")[0];
        assert_eq!(m.qualifier, Qualifier::Fail);
        assert_eq!(m.kind, MechanismKind::All);
        assert_eq!(m.raw, "-all");
    }

    #[test]
    fn version_only_record() {
        let tokenized = tokenize("v=spf1");
        assert!(tokenized.starts_correctly);
        assert!(tokenized.terms.is_empty());
    }

    #[test]
    fn missing_version_still_tokenizes() {
        let tokenized = tokenize("ip4:1.2.3.4 -all");
        assert!(!tokenized.starts_correctly);
        assert_eq!(tokenized.terms.len(), 2);
    }

    #[test]
    fn wrong_version_token_is_unknown() {
        let tokenized = tokenize("v=spf2 -all");
        assert!(!tokenized.starts_correctly);
        assert_eq!(tokenized.terms[0], Term::Unknown("v=spf2".into()));
    }

    #[test]
    fn case_insensitive_keywords() {
        let upper = tokenize("V=SPF1 INCLUDE:_spf.google.com -ALL");
        assert!(upper.starts_correctly);
        let ms = mechanisms("V=SPF1 INCLUDE:_spf.google.com -ALL");
        assert_eq!(ms[0].kind, MechanismKind::Include);
        assert_eq!(ms[0].value, "_spf.google.com");
        assert_eq!(ms[1].kind, MechanismKind::All);
        assert_eq!(ms[1].qualifier, Qualifier::Fail);
        assert_eq!(ms[1].raw, "-ALL");
    }

    #[test]
    fn quoted_values_are_unquoted() {
        let ms = mechanisms("v=spf1 include:\"_spf.google.com\" -all");
        assert_eq!(ms[0].value, "_spf.google.com");
    }

    #[test]
    fn null_lookups_are_retained() {
        let ms = mechanisms("v=spf1 ip4: include: -all");
        assert_eq!(ms.len(), 3);
        assert!(ms[0].is_null_lookup());
        assert!(ms[1].is_null_lookup());
        assert!(!ms[2].is_null_lookup());
    }

    #[test]
    fn dual_cidr_lands_in_parameters() {
        let ms = mechanisms("v=spf1 a:example.com/24//64 mx/28 a//96 -all");
        assert_eq!(ms[0].value, "example.com");
        assert_eq!(ms[0].parameters.get("cidr4").map(String::as_str), Some("24"));
        assert_eq!(ms[0].parameters.get("cidr6").map(String::as_str), Some("64"));
        assert_eq!(ms[1].kind, MechanismKind::Mx);
        assert_eq!(ms[1].value, "");
        assert_eq!(ms[1].parameters.get("cidr4").map(String::as_str), Some("28"));
        assert_eq!(ms[2].value, "");
        assert_eq!(ms[2].parameters.get("cidr6").map(String::as_str), Some("96"));
        assert!(ms[2].parameters.get("cidr4").is_none());
    }

    #[test]
    fn ip_literals_keep_cidr_in_value() {
        let ms = mechanisms("v=spf1 ip4:10.0.0.0/8 ip6:2001:db8::/32 -all");
        assert_eq!(ms[0].value, "10.0.0.0/8");
        assert_eq!(ms[1].value, "2001:db8::/32");
        assert!(ms[0].parameters.is_empty());
    }

    #[test]
    fn modifiers_parse_case_insensitively() {
        let tokenized = tokenize("v=spf1 REDIRECT=_spf.example.com exp=explain.example.com");
        assert_eq!(
            tokenized.terms[0],
            Term::Modifier(Modifier {
                name: ModifierName::Redirect,
                value: "_spf.example.com".into(),
            })
        );
        assert_eq!(
            tokenized.terms[1],
            Term::Modifier(Modifier {
                name: ModifierName::Exp,
                value: "explain.example.com".into(),
            })
        );
    }

    #[test]
    fn unknown_tokens_are_preserved() {
        let tokenized = tokenize("v=spf1 spf2.0/pra bogus=value ip4:1.2.3.4 -all");
        assert_eq!(tokenized.terms[0], Term::Unknown("spf2.0/pra".into()));
        assert_eq!(tokenized.terms[1], Term::Unknown("bogus=value".into()));
    }

    #[test]
    fn characters_after_all() {
        let tokenized = tokenize("v=spf1 -all ip4:1.2.3.4");
        assert!(tokenized.contains_characters_after_all);
        // Trailing whitespace alone does not count.
        let tokenized = tokenize("v=spf1 -all   ");
        assert!(!tokenized.contains_characters_after_all);
    }

    #[test]
    fn all_terms_kept_even_after_all() {
        let tokenized = tokenize("v=spf1 -all mx");
        assert_eq!(tokenized.terms.len(), 2);
    }

    #[test]
    fn exists_and_ptr() {
        let ms = mechanisms("v=spf1 exists:%{ir}.sbl.example.com ptr ptr:example.com -all");
        assert_eq!(ms[0].kind, MechanismKind::Exists);
        assert_eq!(ms[0].value, "%{ir}.sbl.example.com");
        assert_eq!(ms[1].kind, MechanismKind::Ptr);
        assert_eq!(ms[1].value, "");
        assert_eq!(ms[2].value, "example.com");
    }
}
