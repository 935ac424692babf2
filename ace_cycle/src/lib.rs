//! # ACE Cycle
//!
//! Drives one improvement cycle over a playbook: a generator answers the
//! query using the playbook, a reflector critiques the answer and scores the
//! bullets it used, and a curator proposes a small delta that is applied to
//! the playbook. Stages run strictly in order over explicit session state.
//!
//! ## Core Components
//!
//! - **config**: Per-stage model ids and cycle options, loaded from TOML
//! - **session**: Key-value session state and the per-stage state deltas
//! - **inference**: The structured-output inference collaborator and its schemas
//! - **prompt**: Assembly of stage prompts from session values
//! - **stages**: Initializer, generator, reflector, curator and summary stages
//! - **cycle**: The controller that sequences stages and collects events
//!
//! ## Design Philosophy
//!
//! - **Explicit State**: Stages read a session snapshot and return a delta; only the controller commits
//! - **Degrade, Don't Abort**: A failing stage reports a diagnostic and the cycle carries on
//! - **Bounded Mutation**: The playbook changes by at most a few operations per cycle

pub mod config;
pub mod cycle;
pub mod inference;
pub mod prompt;
pub mod session;
pub mod stages;

pub use config::*;
pub use cycle::*;
pub use inference::*;
pub use prompt::*;
pub use session::*;
pub use stages::*;
