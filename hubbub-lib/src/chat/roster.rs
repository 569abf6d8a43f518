//! The live user roster.
//!
//! Chat servers hand out colliding display names, so users are addressed
//! by name plus an arrival-order ordinal: the second "Loach" to join is
//! "Loach 2". Ordinals shift when an earlier holder leaves, matching what
//! the roster pane shows at that moment.

use std::collections::HashMap;

use crate::chat::protocol::{UserEntry, UserParams};

/// Fallback palette for users without a usable profile color.
const PALETTE: [(u8, u8, u8); 8] = [
    (204, 102, 102),
    (222, 147, 95),
    (240, 198, 116),
    (181, 189, 104),
    (138, 190, 183),
    (129, 162, 190),
    (178, 148, 187),
    (197, 200, 198),
];

#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub color: Option<(u8, u8, u8)>,
}

impl Profile {
    fn from_params(params: UserParams) -> Self {
        let color = params.color.as_deref().and_then(parse_hex_color);
        Self {
            name: params.name,
            color,
        }
    }
}

/// Userid → profile map that remembers arrival order.
#[derive(Debug, Default)]
pub struct Roster {
    order: Vec<String>,
    profiles: HashMap<String, Profile>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole roster from a `userlist` message.
    pub fn replace_all(&mut self, entries: Vec<UserEntry>) {
        self.order.clear();
        self.profiles.clear();
        for entry in entries {
            self.add(entry.userid, entry.params);
        }
    }

    /// Insert a user, or refresh the profile of one already present
    /// (keeping their position).
    pub fn add(&mut self, userid: String, params: UserParams) {
        if !self.profiles.contains_key(&userid) {
            self.order.push(userid.clone());
        }
        self.profiles.insert(userid, Profile::from_params(params));
    }

    pub fn remove(&mut self, userid: &str) {
        self.order.retain(|id| id != userid);
        self.profiles.remove(userid);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Display name for a userid, with the duplicate ordinal applied.
    pub fn display_name(&self, userid: &str) -> Option<String> {
        let profile = self.profiles.get(userid)?;
        let position = self.ordinal_of(userid, &profile.name)?;
        if position == 1 {
            Some(profile.name.clone())
        } else {
            Some(format!("{} {}", profile.name, position))
        }
    }

    /// Userid of the `order`-th user (1-based) with this display name.
    pub fn resolve(&self, name: &str, order: usize) -> Option<&str> {
        let wanted = order.max(1);
        self.order
            .iter()
            .filter(|id| {
                self.profiles
                    .get(*id)
                    .is_some_and(|profile| profile.name == name)
            })
            .nth(wanted - 1)
            .map(String::as_str)
    }

    /// Render color for a user: profile color when usable, otherwise a
    /// stable pick from the palette.
    pub fn color(&self, userid: &str) -> (u8, u8, u8) {
        if let Some(color) = self.profiles.get(userid).and_then(|profile| profile.color) {
            return color;
        }
        let mut hash: u32 = 2166136261;
        for byte in userid.bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(16777619);
        }
        PALETTE[hash as usize % PALETTE.len()]
    }

    /// Rows for the roster pane: (display name, color), arrival order.
    pub fn rows(&self) -> Vec<(String, (u8, u8, u8))> {
        self.order
            .iter()
            .map(|userid| {
                let name = self
                    .display_name(userid)
                    .unwrap_or_else(|| userid.clone());
                (name, self.color(userid))
            })
            .collect()
    }

    fn ordinal_of(&self, userid: &str, name: &str) -> Option<usize> {
        let mut seen = 0;
        for id in &self.order {
            if self
                .profiles
                .get(id)
                .is_some_and(|profile| profile.name == name)
            {
                seen += 1;
            }
            if id == userid {
                return Some(seen);
            }
        }
        None
    }
}

/// Parse `#rrggbb` (leading `#` optional) into an RGB triple.
pub fn parse_hex_color(text: &str) -> Option<(u8, u8, u8)> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
