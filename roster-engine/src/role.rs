use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A musical function a member can be scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Vocalist,
    Keyboardist,
    AcousticGuitar,
    Guitarist,
    Bassist,
    Drummer,
}

impl Role {
    /// Declared order. Generation walks roles in this order on even dates.
    pub const ALL: [Role; 6] = [
        Role::Vocalist,
        Role::Keyboardist,
        Role::AcousticGuitar,
        Role::Guitarist,
        Role::Bassist,
        Role::Drummer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Vocalist => "Vocalist",
            Role::Keyboardist => "Keyboardist",
            Role::AcousticGuitar => "AcousticGuitar",
            Role::Guitarist => "Guitarist",
            Role::Bassist => "Bassist",
            Role::Drummer => "Drummer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownRole(trimmed.to_string()))
    }
}

/// Parses a delimited role list such as `Vocalist,Guitarist` or the
/// array-literal form `{Vocalist,Guitarist}`.
///
/// Empty entries are skipped and duplicates keep their first position, so the
/// result preserves the member's declared order.
pub fn parse_role_list(raw: &str) -> Result<Vec<Role>, UnknownRole> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);

    let mut roles = Vec::new();
    for part in inner.split(',') {
        let part = part.trim().trim_matches('"');
        if part.is_empty() {
            continue;
        }
        let role: Role = part.parse()?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

/// Inverse of [`parse_role_list`] (plain comma form).
pub fn join_role_list(roles: &[Role]) -> String {
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Role processing order for a generation run.
///
/// Even-indexed dates (0-based) use `declared`. Odd-indexed dates use
/// `alternate` first, then whatever `declared` roles the alternate list left
/// out, which moves the secondary instruments ahead of vocals and keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOrder {
    pub declared: Vec<Role>,
    pub alternate: Vec<Role>,
}

impl Default for RoleOrder {
    fn default() -> Self {
        Self {
            declared: Role::ALL.to_vec(),
            alternate: vec![
                Role::AcousticGuitar,
                Role::Drummer,
                Role::Guitarist,
                Role::Bassist,
                Role::Vocalist,
                Role::Keyboardist,
            ],
        }
    }
}

impl RoleOrder {
    /// Roles to process for the date at `date_index`, restricted to `wanted`.
    pub fn for_date<F>(&self, date_index: usize, wanted: F) -> Vec<Role>
    where
        F: Fn(Role) -> bool,
    {
        let declared = self.declared.iter().copied().filter(|r| wanted(*r));

        if date_index % 2 == 0 {
            return declared.collect();
        }

        let mut ordered: Vec<Role> = Vec::new();
        for role in self.alternate.iter().copied().filter(|r| wanted(*r)) {
            if !ordered.contains(&role) {
                ordered.push(role);
            }
        }
        for role in declared {
            if !ordered.contains(&role) {
                ordered.push(role);
            }
        }
        ordered
    }
}
