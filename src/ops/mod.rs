//! High-level operations.

pub mod reconcile;

pub use reconcile::{
    apply_manifest, reconcile, ReconcileOptions, ReconcileReport, Reconciler, DESCRIPTOR_GLOB,
    MODIFIED_COMMENT,
};
