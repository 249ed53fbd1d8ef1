//! `base/known-domains`: hosts whose links are meeting links

use meet_dispatch::{Action, SliceKey, SliceUpdate};

use crate::action::ShellAction;

pub const KNOWN_DOMAINS: SliceKey<KnownDomains> = SliceKey::new("features/base/known-domains");

pub const DEFAULT_KNOWN_DOMAINS: &[&str] = &["beta.meet.jit.si", "meet.jit.si"];

#[derive(Action, Clone, Debug)]
#[action(feature = "base/known-domains", kinds = "kinds")]
pub enum KnownDomainsAction {
    AddKnownDomains { domains: Vec<String> },
}

/// Lower-cased, de-duplicated domain list in insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct KnownDomains(Vec<String>);

impl KnownDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut known = Self(Vec::new());
        known.extend(domains);
        known
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.0.iter().any(|d| d.eq_ignore_ascii_case(domain))
    }

    fn extend<I, S>(&mut self, domains: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = false;
        for domain in domains {
            let domain = domain.as_ref().trim().to_lowercase();
            if !domain.is_empty() && !self.contains(&domain) {
                self.0.push(domain);
                added = true;
            }
        }
        added
    }
}

impl Default for KnownDomains {
    fn default() -> Self {
        Self::new(DEFAULT_KNOWN_DOMAINS)
    }
}

/// Replaces the slice only when a domain not yet known was added
pub fn reducer(state: &KnownDomains, action: &ShellAction) -> SliceUpdate<KnownDomains> {
    let ShellAction::KnownDomains(KnownDomainsAction::AddKnownDomains { domains }) = action else {
        return SliceUpdate::Unchanged;
    };
    let mut next = state.clone();
    if next.extend(domains) {
        SliceUpdate::Replace(next)
    } else {
        SliceUpdate::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(state: &KnownDomains, domains: &[&str]) -> SliceUpdate<KnownDomains> {
        reducer(
            state,
            &ShellAction::KnownDomains(KnownDomainsAction::AddKnownDomains {
                domains: domains.iter().map(|d| d.to_string()).collect(),
            }),
        )
    }

    #[test]
    fn test_new_domain_replaces() {
        let update = add(&KnownDomains::default(), &["Meet.Example"]);
        let SliceUpdate::Replace(next) = update else {
            panic!("expected a new domain list");
        };
        assert!(next.contains("meet.example"));
        assert_eq!(next.as_slice().len(), DEFAULT_KNOWN_DOMAINS.len() + 1);
    }

    #[test]
    fn test_known_domain_is_unchanged() {
        assert_eq!(
            add(&KnownDomains::default(), &["MEET.JIT.SI", ""]),
            SliceUpdate::Unchanged
        );
    }
}
