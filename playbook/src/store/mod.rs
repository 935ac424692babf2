//! Playbook store - the indexed collection of bullets.
//!
//! Invariants maintained by every mutation:
//! - each id in `sections[s]` names a bullet whose section is `s`, and no id
//!   appears in more than one section list
//! - a section whose list becomes empty is removed
//! - `next_id` only ever grows; a generated id never names an existing bullet
//!
//! Documents loaded through [`Playbook::from_value`] or [`Playbook::loads`]
//! are repaired to satisfy the index invariants before they are returned.

mod render;

pub use render::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::{
    Bullet, DeltaBatch, DeltaReport, Mutation, OperationOutcome, PlaybookError, TagKind,
    MAX_OPERATIONS,
};

/// Section prefix used when a section name has no usable first word.
const FALLBACK_PREFIX: &str = "general";

/// The structured context store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Playbook {
    /// All bullets stored by ID.
    #[serde(default, alias = "bullets")]
    records: BTreeMap<String, Bullet>,

    /// Index: section name -> bullet ids in insertion order.
    #[serde(default)]
    sections: BTreeMap<String, Vec<String>>,

    /// Counter behind generated ids.
    #[serde(default)]
    next_id: u64,
}

impl Playbook {
    /// Create a new empty playbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bullet, generating an id unless one is supplied.
    ///
    /// A supplied id that already exists replaces the old bullet; the old id
    /// is first unlinked from its previous section so the index stays
    /// consistent. A generated id skips counter values already taken by
    /// explicitly supplied ids.
    pub fn add(
        &mut self,
        section: impl Into<String>,
        content: impl Into<String>,
        bullet_id: Option<String>,
    ) -> &Bullet {
        let section = section.into();
        let id = match bullet_id {
            Some(id) => id,
            None => {
                let mut id = self.generate_id(&section);
                while self.records.contains_key(&id) {
                    id = self.generate_id(&section);
                }
                id
            }
        };

        if let Some(previous) = self.records.get(&id) {
            warn!(
                bullet_id = %id,
                previous_section = %previous.section,
                section = %section,
                "bullet id collision, re-indexing"
            );
            let previous_section = previous.section.clone();
            self.unlink(&id, &previous_section);
        }

        self.sections
            .entry(section.clone())
            .or_default()
            .push(id.clone());
        debug!(bullet_id = %id, section = %section, "bullet added");

        let bullet = Bullet::new(id.clone(), section, content);
        match self.records.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(bullet);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(bullet),
        }
    }

    /// Replace a bullet's content. Returns `None` if the id is unknown.
    pub fn update(&mut self, bullet_id: &str, content: impl Into<String>) -> Option<&Bullet> {
        let bullet = self.records.get_mut(bullet_id)?;
        bullet.set_content(content);
        debug!(bullet_id, "bullet updated");
        Some(bullet)
    }

    /// Remove a bullet. Removing an unknown id is a no-op.
    pub fn remove(&mut self, bullet_id: &str) -> Option<Bullet> {
        let bullet = self.records.remove(bullet_id)?;
        self.unlink(bullet_id, &bullet.section);
        debug!(bullet_id, section = %bullet.section, "bullet removed");
        Some(bullet)
    }

    /// Add `amount` to one of a bullet's counters.
    pub fn tag(&mut self, bullet_id: &str, kind: TagKind, amount: i64) -> Option<&Bullet> {
        let bullet = self.records.get_mut(bullet_id)?;
        bullet.tag(kind, amount);
        debug!(bullet_id, tag = %kind, amount, "bullet tagged");
        Some(bullet)
    }

    /// Apply a batch in order, at most [`MAX_OPERATIONS`] operations.
    ///
    /// Invalid operations and unknown ids are skipped; earlier operations
    /// are never rolled back.
    pub fn apply_delta(&mut self, batch: &DeltaBatch) -> DeltaReport {
        let truncated = batch.operations.len().saturating_sub(MAX_OPERATIONS);
        let outcomes = batch
            .operations
            .iter()
            .take(MAX_OPERATIONS)
            .map(|operation| match operation.resolve() {
                Ok(mutation) => self.apply_mutation(mutation),
                Err(err) => {
                    debug!(error = %err, "delta operation skipped");
                    OperationOutcome::Skipped(err)
                }
            })
            .collect();

        DeltaReport {
            outcomes,
            truncated,
        }
    }

    /// Apply one validated mutation.
    pub fn apply_mutation(&mut self, mutation: Mutation) -> OperationOutcome {
        match mutation {
            Mutation::Add {
                section,
                content,
                bullet_id,
            } => {
                let id = self.add(section, content, bullet_id).id.clone();
                OperationOutcome::Added(id)
            }
            Mutation::Update { bullet_id, content } => {
                if self.update(&bullet_id, content).is_some() {
                    OperationOutcome::Updated(bullet_id)
                } else {
                    OperationOutcome::NotFound(bullet_id)
                }
            }
            Mutation::Remove { bullet_id } => {
                if self.remove(&bullet_id).is_some() {
                    OperationOutcome::Removed(bullet_id)
                } else {
                    OperationOutcome::NotFound(bullet_id)
                }
            }
        }
    }

    /// Get bullet by ID.
    pub fn get(&self, bullet_id: &str) -> Option<&Bullet> {
        self.records.get(bullet_id)
    }

    /// All bullets, ordered by id.
    pub fn bullets(&self) -> impl Iterator<Item = &Bullet> {
        self.records.values()
    }

    /// Sections in lexicographic order with their ids in insertion order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sections
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    /// Ids in a section, empty if the section does not exist.
    pub fn section_ids(&self, section: &str) -> &[String] {
        self.sections
            .get(section)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// The value the next generated id will be derived from, minus one.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Convert to the structural document stored in session state.
    pub fn to_value(&self) -> Result<Value, PlaybookError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild from the structural document stored in session state.
    pub fn from_value(value: Value) -> Result<Self, PlaybookError> {
        let playbook: Self = serde_json::from_value(value)?;
        Ok(playbook.reconcile())
    }

    /// Pretty JSON text.
    pub fn dumps(&self) -> Result<String, PlaybookError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn loads(text: &str) -> Result<Self, PlaybookError> {
        let playbook: Self = serde_json::from_str(text)?;
        Ok(playbook.reconcile())
    }

    fn generate_id(&mut self, section: &str) -> String {
        self.next_id += 1;
        let prefix = section
            .split_whitespace()
            .next()
            .map(str::to_lowercase)
            .unwrap_or_else(|| FALLBACK_PREFIX.to_string());
        format!("{}-{:05}", prefix, self.next_id)
    }

    /// Rebuild the section index from the records.
    ///
    /// Dangling, misfiled and duplicate ids are dropped, empty sections go
    /// away and unindexed records are appended to their section. A
    /// consistent document comes back unchanged.
    fn reconcile(mut self) -> Self {
        let mut indexed = BTreeSet::new();
        let mut sections = std::mem::take(&mut self.sections);

        for (section, ids) in sections.iter_mut() {
            ids.retain(|id| {
                let filed_here = self
                    .records
                    .get(id)
                    .map_or(false, |bullet| bullet.section == *section);
                if filed_here && indexed.insert(id.clone()) {
                    return true;
                }
                warn!(bullet_id = %id, section = %section, "dropping stale section entry");
                false
            });
        }
        sections.retain(|section, ids| {
            if ids.is_empty() {
                warn!(section = %section, "dropping empty section");
            }
            !ids.is_empty()
        });

        for (id, bullet) in &self.records {
            if !indexed.contains(id) {
                warn!(bullet_id = %id, section = %bullet.section, "indexing unlisted bullet");
                sections
                    .entry(bullet.section.clone())
                    .or_default()
                    .push(id.clone());
            }
        }

        self.sections = sections;
        self
    }

    fn unlink(&mut self, bullet_id: &str, section: &str) {
        if let Some(ids) = self.sections.get_mut(section) {
            ids.retain(|id| id != bullet_id);
            if ids.is_empty() {
                self.sections.remove(section);
            }
        }
    }
}
