use serde::{Deserialize, Serialize};

/// The category of reconciliation a coalesced batch demands downstream.
///
/// Part of the public protocol: appears in `reconciliations.reconciliation_type`
/// and as the `request_type` attribute on every published message. Additions
/// must stay backward compatible (append-only, never repurpose a variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationType {
    SshKeys,
    Secrets,
    Firewall,
    Deployment,
    Full,
}

impl std::fmt::Display for ReconciliationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReconciliationType::SshKeys => "ssh_keys",
            ReconciliationType::Secrets => "secrets",
            ReconciliationType::Firewall => "firewall",
            ReconciliationType::Deployment => "deployment",
            ReconciliationType::Full => "full",
        };
        write!(f, "{}", s)
    }
}
