//! Presentation helpers: prompt rendering and aggregate statistics.

use serde::{Deserialize, Serialize};

use super::Playbook;
use crate::TagKind;

/// Aggregate counter totals across all bullets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagTotals {
    pub helpful: u64,
    pub harmful: u64,
    pub neutral: u64,
}

impl TagTotals {
    pub fn get(&self, kind: TagKind) -> u64 {
        match kind {
            TagKind::Helpful => self.helpful,
            TagKind::Harmful => self.harmful,
            TagKind::Neutral => self.neutral,
        }
    }
}

/// Summary statistics for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybookStats {
    pub sections: usize,
    pub bullets: usize,
    pub tags: TagTotals,
}

impl std::fmt::Display for PlaybookStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sections, {} bullets (helpful={}, harmful={}, neutral={})",
            self.sections, self.bullets, self.tags.helpful, self.tags.harmful, self.tags.neutral
        )
    }
}

impl Playbook {
    /// Render the playbook as text for prompting.
    ///
    /// Sections appear in lexicographic order, bullets in insertion order:
    ///
    /// ```text
    /// ## math
    /// - [math-00001] check units (helpful=1, harmful=0, neutral=0)
    /// ```
    pub fn as_prompt(&self) -> String {
        let mut lines = Vec::new();

        for (section, ids) in self.sections() {
            lines.push(format!("## {}", section));
            for bullet in ids.iter().filter_map(|id| self.get(id)) {
                lines.push(format!(
                    "- [{}] {} (helpful={}, harmful={}, neutral={})",
                    bullet.id, bullet.content, bullet.helpful, bullet.harmful, bullet.neutral
                ));
            }
        }

        lines.join("\n")
    }

    /// Aggregate counts.
    pub fn stats(&self) -> PlaybookStats {
        let mut tags = TagTotals::default();
        for bullet in self.bullets() {
            tags.helpful += u64::from(bullet.helpful);
            tags.harmful += u64::from(bullet.harmful);
            tags.neutral += u64::from(bullet.neutral);
        }

        PlaybookStats {
            sections: self.section_count(),
            bullets: self.len(),
            tags,
        }
    }
}

impl std::fmt::Display for Playbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_prompt())
    }
}
