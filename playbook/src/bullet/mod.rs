//! Bullet definitions - atomic knowledge entries in the playbook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::PlaybookError;

/// Quality categories a bullet can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// The bullet contributed to a correct answer.
    Helpful,
    /// The bullet was wrong or misleading.
    Harmful,
    /// The bullet did not affect the result.
    Neutral,
}

impl TagKind {
    /// All categories, in display order.
    pub const ALL: [TagKind; 3] = [TagKind::Helpful, TagKind::Harmful, TagKind::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Helpful => "helpful",
            TagKind::Harmful => "harmful",
            TagKind::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagKind {
    type Err = PlaybookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "helpful" => Ok(TagKind::Helpful),
            "harmful" => Ok(TagKind::Harmful),
            "neutral" => Ok(TagKind::Neutral),
            _ => Err(PlaybookError::UnknownTag(s.to_string())),
        }
    }
}

/// A single playbook entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    /// Unique within a playbook, never changes after creation.
    pub id: String,

    pub section: String,

    pub content: String,

    #[serde(default)]
    pub helpful: u32,

    #[serde(default)]
    pub harmful: u32,

    #[serde(default)]
    pub neutral: u32,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Bullet {
    /// Create a new bullet with zeroed counters.
    pub fn new(
        id: impl Into<String>,
        section: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            section: section.into(),
            content: content.into(),
            helpful: 0,
            harmful: 0,
            neutral: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the content.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    /// Add `amount` to one counter. Counters saturate at zero and `u32::MAX`.
    pub fn tag(&mut self, kind: TagKind, amount: i64) {
        let counter = self.counter_mut(kind);
        let next = i64::from(*counter)
            .saturating_add(amount)
            .clamp(0, i64::from(u32::MAX));
        *counter = next as u32;
        self.touch();
    }

    /// Read one counter.
    pub fn counter(&self, kind: TagKind) -> u32 {
        match kind {
            TagKind::Helpful => self.helpful,
            TagKind::Harmful => self.harmful,
            TagKind::Neutral => self.neutral,
        }
    }

    fn counter_mut(&mut self, kind: TagKind) -> &mut u32 {
        match kind {
            TagKind::Helpful => &mut self.helpful,
            TagKind::Harmful => &mut self.harmful,
            TagKind::Neutral => &mut self.neutral,
        }
    }

    fn touch(&mut self) {
        // Never move backwards, even if the clock does.
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullet_creation() {
        let bullet = Bullet::new("math-00001", "math", "Check units");
        assert_eq!(bullet.id, "math-00001");
        assert_eq!(bullet.section, "math");
        assert_eq!(bullet.helpful, 0);
        assert_eq!(bullet.harmful, 0);
        assert_eq!(bullet.neutral, 0);
        assert_eq!(bullet.created_at, bullet.updated_at);
    }

    #[test]
    fn test_tag_increments_single_counter() {
        let mut bullet = Bullet::new("a-00001", "a", "x");
        let before = bullet.updated_at;

        bullet.tag(TagKind::Harmful, 2);

        assert_eq!(bullet.harmful, 2);
        assert_eq!(bullet.helpful, 0);
        assert_eq!(bullet.neutral, 0);
        assert!(bullet.updated_at >= before);
    }

    #[test]
    fn test_negative_tag_saturates_at_zero() {
        let mut bullet = Bullet::new("a-00001", "a", "x");
        bullet.tag(TagKind::Neutral, 1);
        bullet.tag(TagKind::Neutral, -5);
        assert_eq!(bullet.neutral, 0);
    }

    #[test]
    fn test_set_content_touches() {
        let mut bullet = Bullet::new("a-00001", "a", "old");
        let created = bullet.created_at;
        bullet.set_content("new");
        assert_eq!(bullet.content, "new");
        assert_eq!(bullet.created_at, created);
        assert!(bullet.updated_at >= created);
    }

    #[test]
    fn test_tag_kind_parsing() {
        assert_eq!("helpful".parse::<TagKind>().unwrap(), TagKind::Helpful);
        assert_eq!(" Harmful ".parse::<TagKind>().unwrap(), TagKind::Harmful);
        assert!(matches!(
            "useful".parse::<TagKind>(),
            Err(PlaybookError::UnknownTag(s)) if s == "useful"
        ));
    }

    #[test]
    fn test_bullet_defaults_when_fields_missing() {
        let bullet: Bullet = serde_json::from_str(
            r#"{"id": "g-00003", "section": "general", "content": "Be brief"}"#,
        )
        .unwrap();
        assert_eq!(bullet.helpful, 0);
        assert_eq!(bullet.counter(TagKind::Neutral), 0);
    }
}
