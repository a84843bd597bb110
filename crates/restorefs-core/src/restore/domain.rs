//! Domain to directory mapping
//!
//! App and container domains are named `<Category>-<identifier>`; they get
//! split into a category folder plus one folder per identifier. Every other
//! domain (`HomeDomain`, `RootDomain`, ...) maps to a single folder.

/// Recognized category prefixes, checked in order, first match wins
pub const DOMAIN_PREFIXES: [&str; 5] = [
    "AppDomain-",
    "AppDomainGroup-",
    "AppDomainPlugin-",
    "SysContainerDomain-",
    "SysSharedContainerDomain-",
];

/// Return the first recognized prefix of `domain`, if any
pub fn matching_prefix(domain: &str) -> Option<&'static str> {
    DOMAIN_PREFIXES
        .iter()
        .copied()
        .find(|prefix| domain.starts_with(prefix))
}

/// Directory segments a domain expands to
pub fn domain_segments(domain: &str) -> Vec<&str> {
    match matching_prefix(domain) {
        Some(prefix) => vec![&prefix[..prefix.len() - 1], &domain[prefix.len()..]],
        None => vec![domain],
    }
}
