// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # angle-exhaust
//!
//! A probability-driven discovery engine. Instead of trying one approach and
//! stopping, it computes how many independent analytical angles are needed to
//! reach a target confidence of a breakthrough, generates that many across
//! eight perspective categories, and branches deeper wherever a signal shows up.
//!
//! ## Architecture
//!
//! - **Probability** (`probability`): `angles_needed`, breakthrough odds, and
//!   the descriptor-based per-angle estimator with its audit trail
//! - **Angles** (`angle`): categories, angles, results, discoveries
//! - **Generation** (`generator`): category-balanced batches and branching
//! - **Knowledge** (`knowledge`): the append-only record of a run
//! - **Engine** (`engine`): the state machine, iterator form, and checkpoints
//! - **Failure analysis** (`failure`): post-hoc report over results
//!
//! ## Library usage
//!
//! ```no_run
//! use angle_exhaust::angle::{Angle, AngleResult, Discovery};
//! use angle_exhaust::config::EngineConfig;
//! use angle_exhaust::engine::{DiscoveryEngine, DiscoveryRequest};
//! use angle_exhaust::error::DiscoveryResult;
//! use angle_exhaust::knowledge::KnowledgeGraph;
//!
//! let mut engine = DiscoveryEngine::new(EngineConfig::default())
//!     .with_executor(|angle: &Angle, _: &KnowledgeGraph| -> DiscoveryResult<AngleResult> {
//!         Ok(AngleResult::no_signal(angle.clone()))
//!     })
//!     .with_checker(|_: &str, found: &[Discovery]| -> bool { found.len() >= 3 });
//!
//! let report = engine
//!     .run(DiscoveryRequest::new("Decode the undeciphered script").with_target_confidence(0.97))
//!     .unwrap();
//! println!("{report}");
//! ```

pub mod angle;
pub mod config;
pub mod engine;
pub mod error;
pub mod failure;
pub mod generator;
pub mod knowledge;
pub mod probability;
