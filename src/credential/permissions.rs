use std::collections::BTreeMap;

use serde::Serialize;

/// Scopes always requested when an overlay is sent
const DEFAULT_PERMISSIONS: &[(&str, &str)] = &[
    ("contents", "write"),
    ("pull_requests", "write"),
    ("issues", "write"),
];

/// Permission scope name to access level, sent with the token exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionOverlay(BTreeMap<String, String>);

impl PermissionOverlay {
    pub fn get(&self, scope: &str) -> Option<&str> {
        self.0.get(scope).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse newline-delimited `scope: level` overrides.
///
/// Returns `None` for blank input. Otherwise the defaults are merged with
/// every well-formed line, overrides winning; lines without a non-empty key
/// and value are dropped.
pub fn parse_additional_permissions(raw: &str) -> Option<PermissionOverlay> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let mut permissions: BTreeMap<String, String> = DEFAULT_PERMISSIONS
        .iter()
        .map(|(scope, level)| (scope.to_string(), level.to_string()))
        .collect();

    for line in raw.lines() {
        let mut parts = line.trim().split(':').map(str::trim);
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        permissions.insert(key.to_string(), value.to_string());
    }

    Some(PermissionOverlay(permissions))
}
