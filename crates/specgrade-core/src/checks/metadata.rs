//! `info` object checks.

use super::patterns::is_semver;
use super::TargetOutcome;
use crate::document::{non_empty_str, SpecDocument};

pub(super) fn api_version(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let Some(version) = doc.get(&["info", "version"]) else {
        return Vec::new();
    };
    let text = version.as_str().unwrap_or_default();
    vec![TargetOutcome::condition("/info/version", is_semver(text), || {
        format!("info.version '{}' is not a semantic version", text)
    })]
}

pub(super) fn contact_info(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let Some(info) = doc.object_at(&["info"]) else {
        return Vec::new();
    };
    let contact = info.get("contact");
    let reachable = non_empty_str(contact.and_then(|c| c.get("email"))).is_some()
        || non_empty_str(contact.and_then(|c| c.get("url"))).is_some();
    vec![TargetOutcome::condition("/info", reachable, || {
        "info.contact has neither email nor url".to_string()
    })]
}

pub(super) fn license_info(doc: &SpecDocument) -> Vec<TargetOutcome> {
    let Some(info) = doc.object_at(&["info"]) else {
        return Vec::new();
    };
    let named = non_empty_str(info.get("license").and_then(|l| l.get("name"))).is_some();
    vec![TargetOutcome::condition("/info", named, || {
        "info.license has no name".to_string()
    })]
}
