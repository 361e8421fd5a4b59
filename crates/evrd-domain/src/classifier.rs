//! Pure, side-effect-free mapping from raw events to the scope and
//! reconciliation type that drive the rest of the router. Matching is
//! always on dotted *segments*, never a substring: `foo.member.created`
//! matches the member family, `foo.teammember.created` does not.

use crate::event::Event;
use crate::reconciliation_type::ReconciliationType;
use crate::scope::Scope;

fn segments(event_type: &str) -> Vec<&str> {
    event_type.split('.').collect()
}

fn has_segment(segs: &[&str], needle: &str) -> bool {
    segs.iter().any(|s| *s == needle)
}

fn is_org_family(segs: &[&str]) -> bool {
    has_segment(segs, "organization")
        || has_segment(segs, "organization_member")
        || has_segment(segs, "organization_firewall")
}

fn is_project_family(segs: &[&str]) -> bool {
    has_segment(segs, "project") || has_segment(segs, "project_member")
}

fn is_site_firewall_family(segs: &[&str]) -> bool {
    has_segment(segs, "site_firewall")
}

/// Decision order is normative: org family, then project family, then the
/// site-firewall escalation (outranks the plain site-id fallback even
/// though both ultimately touch a site), then site-id presence, then org
/// as the final fallback.
pub fn determine_scope(event: &Event) -> Scope {
    let segs = segments(&event.event_type);

    if is_org_family(&segs) {
        return Scope::Org;
    }
    if is_project_family(&segs) {
        return Scope::Project;
    }
    if is_site_firewall_family(&segs) {
        return Scope::Org;
    }
    if event.site_id.is_some() {
        return Scope::Site;
    }
    Scope::Org
}

fn is_ssh_key_event(segs: &[&str], action: &str) -> bool {
    (has_segment(segs, "member") || has_segment(segs, "site_member"))
        && matches!(action, "created" | "updated" | "removed" | "deleted")
}

fn is_secret_event(segs: &[&str], action: &str) -> bool {
    has_segment(segs, "secret") && matches!(action, "created" | "updated" | "deleted")
}

fn is_firewall_event(segs: &[&str], action: &str) -> bool {
    (has_segment(segs, "firewall")
        || has_segment(segs, "site_firewall")
        || has_segment(segs, "organization_firewall"))
        && matches!(action, "created" | "updated" | "deleted")
}

fn is_deployment_event(segs: &[&str], action: &str) -> bool {
    (has_segment(segs, "deployment") && matches!(action, "created" | "triggered"))
        || has_segment(segs, "git_push")
        || has_segment(segs, "push")
}

/// Inspects every event type in the batch and ORs flags across all of them,
/// then applies the priority rule: `deployment` dominates; two or more
/// other flags collapse to `full`; exactly one flag wins outright; none set
/// also falls back to `full` (the safe default when nothing is recognized).
pub fn determine_reconciliation_type(event_types: &[String]) -> ReconciliationType {
    let mut has_ssh_keys = false;
    let mut has_secrets = false;
    let mut has_firewall = false;
    let mut has_deployment = false;

    for event_type in event_types {
        let segs = segments(event_type);
        let action = segs.last().copied().unwrap_or("");

        if is_ssh_key_event(&segs, action) {
            has_ssh_keys = true;
        }
        if is_secret_event(&segs, action) {
            has_secrets = true;
        }
        if is_firewall_event(&segs, action) {
            has_firewall = true;
        }
        if is_deployment_event(&segs, action) {
            has_deployment = true;
        }
    }

    if has_deployment {
        return ReconciliationType::Deployment;
    }

    let other_count = [has_ssh_keys, has_secrets, has_firewall]
        .iter()
        .filter(|f| **f)
        .count();

    match other_count {
        1 if has_ssh_keys => ReconciliationType::SshKeys,
        1 if has_secrets => ReconciliationType::Secrets,
        1 if has_firewall => ReconciliationType::Firewall,
        _ => ReconciliationType::Full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventStatus;
    use crate::ids::{OrgId, ProjectId, SiteId};
    use chrono::Utc;

    fn event(event_type: &str, project_id: Option<i64>, site_id: Option<i64>) -> Event {
        Event {
            event_id: "evt-1".to_string(),
            event_type: event_type.to_string(),
            event_source: "test".to_string(),
            event_subject: "subject".to_string(),
            event_data: Vec::new(),
            content_type: "application/json".to_string(),
            organization_id: OrgId::new(1),
            project_id: project_id.map(ProjectId::new),
            site_id: site_id.map(SiteId::new),
            created_at: Utc::now(),
            status: EventStatus::Pending,
            sent_at: None,
            attempts: 0,
            last_error: None,
            processing_by: None,
            claimed_at: None,
        }
    }

    #[test]
    fn org_family_wins_regardless_of_site_id() {
        let e = event("acme.organization_member.created", None, Some(9));
        assert_eq!(determine_scope(&e), Scope::Org);
    }

    #[test]
    fn project_family_outranks_site_id() {
        let e = event("acme.project_member.updated", Some(2), Some(9));
        assert_eq!(determine_scope(&e), Scope::Project);
    }

    #[test]
    fn site_firewall_escalates_to_org() {
        let e = event("acme.site_firewall.created", None, Some(9));
        assert_eq!(determine_scope(&e), Scope::Org);
    }

    #[test]
    fn plain_site_id_yields_site_scope() {
        let e = event("acme.site_member.created", None, Some(9));
        assert_eq!(determine_scope(&e), Scope::Site);
    }

    #[test]
    fn no_site_id_and_no_family_falls_back_to_org() {
        let e = event("acme.unknown_widget.created", None, None);
        assert_eq!(determine_scope(&e), Scope::Org);
    }

    #[test]
    fn segment_matching_rejects_substrings() {
        // "teammember" contains "member" as a substring but is not the
        // "member" segment; this must not classify as an ssh-key event.
        let types = vec!["acme.teammember.created".to_string()];
        assert_eq!(determine_reconciliation_type(&types), ReconciliationType::Full);
    }

    #[test]
    fn deployment_dominates_any_mix() {
        let types = vec![
            "acme.member.created".to_string(),
            "acme.secret.updated".to_string(),
            "acme.deployment.triggered".to_string(),
        ];
        assert_eq!(
            determine_reconciliation_type(&types),
            ReconciliationType::Deployment
        );
    }

    #[test]
    fn git_push_marker_counts_as_deployment() {
        let types = vec!["acme.repo.git_push".to_string()];
        assert_eq!(
            determine_reconciliation_type(&types),
            ReconciliationType::Deployment
        );
    }

    #[test]
    fn two_distinct_flags_collapse_to_full() {
        let types = vec![
            "acme.member.created".to_string(),
            "acme.secret.updated".to_string(),
        ];
        assert_eq!(determine_reconciliation_type(&types), ReconciliationType::Full);
    }

    #[test]
    fn single_flag_wins_outright() {
        let types = vec!["acme.firewall.created".to_string()];
        assert_eq!(
            determine_reconciliation_type(&types),
            ReconciliationType::Firewall
        );
    }

    #[test]
    fn empty_batch_falls_back_to_full() {
        assert_eq!(determine_reconciliation_type(&[]), ReconciliationType::Full);
    }
}
