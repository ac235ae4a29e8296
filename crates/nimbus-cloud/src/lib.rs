//! Nimbus Cloud Reconciliation
//!
//! This crate provides the generic engine that keeps a nested collection of a
//! cloud resource (Kafka topics, database users, cluster hosts) in sync with
//! its declared configuration using a minimal set of remote calls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │            desired (config)   observed (API)    │
//! └─────────────────┬───────────────────┬───────────┘
//!                   │                   │
//! ┌─────────────────▼───────────────────▼───────────┐
//! │                  nimbus-cloud                    │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │ Diff + Mask  │─▶│  Plan/Apply  │             │
//! │  └──────────────┘  └──────┬───────┘             │
//! │                    ┌──────▼───────┐             │
//! │                    │ Conflict     │             │
//! │                    │ retry        │             │
//! │                    └──────┬───────┘             │
//! └───────────────────────────┼─────────────────────┘
//!                             │ trait Reconcilable
//!                    ┌────────▼────────┐
//!                    │ nimbus-cloud-mdb │
//!                    └─────────────────┘
//! ```

pub mod action;
pub mod config;
pub mod context;
pub mod diff;
pub mod entity;
pub mod error;
pub mod mask;
pub mod operation;
pub mod provider;
pub mod reconciler;
pub mod retry;
pub mod state;
pub mod value;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyReport, Plan, PlanSummary};
pub use config::{EngineConfig, RetryConfig, Timeouts};
pub use context::CallContext;
pub use diff::{DiffRecord, DiffSummary, compute_diffs, fill_write_only};
pub use entity::{Entity, index_by_key, validate_unique_keys};
pub use error::{CloudError, Result};
pub use mask::{FieldMask, MaskRule, substitute_version};
pub use operation::{BoxedOperation, CompletedOperation, OperationHandle};
pub use provider::Reconcilable;
pub use reconciler::{ReconcileOptions, Reconciler};
pub use retry::retry_conflicting_operation;
pub use state::{AppliedState, StateManager};
pub use value::Value;
