//! Team table helpers.

use crate::api::types::TeamMember;

/// Members whose name or email contains `search`, ignoring case. An empty search keeps everyone.
pub fn filter_members<'a>(members: &'a [TeamMember], search: &str) -> Vec<&'a TeamMember> {
    let needle = search.trim().to_lowercase();
    members
        .iter()
        .filter(|member| {
            needle.is_empty()
                || member.full_name.to_lowercase().contains(&needle)
                || member.email.to_lowercase().contains(&needle)
        })
        .collect()
}

/// `"Administrator"` for superusers, `"Member"` otherwise.
pub fn role_label(member: &TeamMember) -> &'static str {
    if member.is_superuser {
        "Administrator"
    } else {
        "Member"
    }
}
