use serde::{Deserialize, Serialize};

/// A reconciliation's granularity, ordered `Unknown < Site < Project < Org`.
///
/// Variant declaration order encodes the lattice: `derive(PartialOrd, Ord)`
/// compares variants by declaration position, so this total order is the
/// promotion rule used throughout the coalescer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Unknown,
    Site,
    Project,
    Org,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Scope::Unknown => "unknown",
            Scope::Site => "site",
            Scope::Project => "project",
            Scope::Org => "org",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_total_and_monotonic() {
        assert!(Scope::Unknown < Scope::Site);
        assert!(Scope::Site < Scope::Project);
        assert!(Scope::Project < Scope::Org);
        assert_eq!(Scope::Org.max(Scope::Site), Scope::Org);
    }
}
