//! Marker glyphs, emoji matching and footer tags shared by the reaction
//! modules.

use poise::serenity_prelude::ReactionType;
use std::fmt;

pub const YES: &str = "✅";
pub const NO: &str = "❌";
pub const JOKER: &str = "🃏";

pub const KEYCAPS: [&str; 10] = [
    "1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟",
];

pub const MAX_OPTIONS: usize = KEYCAPS.len();

pub const TICKET: &str = "📩";
pub const LOCK: &str = "🔒";
pub const UNLOCK: &str = "🔓";
pub const NO_ENTRY: &str = "⛔";

const VARIATION_SELECTOR: char = '\u{fe0f}';

/// Picks the glyph set for a list of labels: yes/no and yes/no/joker labels
/// get the check-mark set, everything else gets numbered keycaps.
pub fn assign(labels: &[String]) -> Vec<&'static str> {
    let lowered: Vec<String> = labels.iter().map(|l| l.trim().to_lowercase()).collect();
    let is_yes = |s: &str| matches!(s, "oui" | "yes");
    let is_no = |s: &str| matches!(s, "non" | "no");

    match lowered.as_slice() {
        [a, b] if is_yes(a) && is_no(b) => vec![YES, NO],
        [a, b, c] if is_yes(a) && is_no(b) && c == "joker" => vec![YES, NO, JOKER],
        _ => KEYCAPS.iter().take(labels.len()).copied().collect(),
    }
}

/// Comparable form of an emoji string. Custom emoji (`<:name:id>` or
/// `<a:name:id>`) compare by id, unicode emoji ignore the variation
/// selector that clients add inconsistently.
pub fn emoji_key(emoji: &str) -> String {
    let trimmed = emoji.trim();
    if let Some(inner) = trimmed.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        if let Some(id) = inner.rsplit(':').next().filter(|id| id.parse::<u64>().is_ok()) {
            return id.to_string();
        }
    }
    trimmed.chars().filter(|c| *c != VARIATION_SELECTOR).collect()
}

pub fn same_emoji(a: &str, b: &str) -> bool {
    emoji_key(a) == emoji_key(b)
}

pub fn reaction_type(emoji: &str) -> ReactionType {
    ReactionType::try_from(emoji).unwrap_or_else(|_| ReactionType::Unicode(emoji.to_string()))
}

/// The tag written into an embed footer. It names the record a message
/// belongs to and is never touched by rendering code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterTag {
    Poll,
    Vote,
    React,
    Panel,
    Ticket,
    Mod,
}

impl FooterTag {
    pub fn render(self, id: u64) -> String {
        format!("{self} ID: {id}")
    }
}

impl fmt::Display for FooterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poll => write!(f, "Poll"),
            Self::Vote => write!(f, "Vote"),
            Self::React => write!(f, "React"),
            Self::Panel => write!(f, "Pannel"),
            Self::Ticket => write!(f, "Ticket"),
            Self::Mod => write!(f, "Mod"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn yes_no_sets_are_special_cased() {
        assert_eq!(assign(&labels(&["Oui", "Non"])), vec![YES, NO]);
        assert_eq!(assign(&labels(&["oui", "NON", "Joker"])), vec![YES, NO, JOKER]);
        assert_eq!(assign(&labels(&["Yes", "No"])), vec![YES, NO]);
    }

    #[test]
    fn other_labels_get_keycaps() {
        assert_eq!(assign(&labels(&["Non", "Oui"])), vec![KEYCAPS[0], KEYCAPS[1]]);
        assert_eq!(assign(&labels(&["a", "b", "c", "d"])).len(), 4);
        assert_eq!(assign(&labels(&["Oui", "Non", "Peut-être"]))[2], KEYCAPS[2]);
    }

    #[test]
    fn keycaps_match_without_variation_selector() {
        assert!(same_emoji("1\u{20e3}", KEYCAPS[0]));
        assert!(!same_emoji(KEYCAPS[0], KEYCAPS[1]));
    }

    #[test]
    fn custom_emoji_compare_by_id() {
        assert!(same_emoji("<:wolf:1234>", "<a:wolf_dance:1234>"));
        assert_eq!(emoji_key("<:wolf:1234>"), "1234");
        assert!(!same_emoji("<:wolf:1234>", "<:wolf:4321>"));
    }

    #[test]
    fn footer_tags_render() {
        assert_eq!(FooterTag::Poll.render(10), "Poll ID: 10");
        assert_eq!(FooterTag::Ticket.render(0), "Ticket ID: 0");
    }
}
