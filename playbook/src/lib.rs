//! # Playbook
//!
//! The knowledge store behind a self-improving agent. A playbook holds
//! bullets (atomic pieces of advice with quality counters) grouped into
//! sections, and is only ever mutated through small, bounded delta batches
//! or through tagging. This crate contains no inference logic.
//!
//! ## Core Components
//!
//! - **bullet**: A single knowledge entry and its helpful/harmful/neutral counters
//! - **store**: The indexed collection of bullets, id generation, rendering and stats
//! - **delta**: The typed mutation protocol applied by curation

pub mod bullet;
pub mod delta;
pub mod error;
pub mod store;

pub use bullet::*;
pub use delta::*;
pub use error::*;
pub use store::*;
