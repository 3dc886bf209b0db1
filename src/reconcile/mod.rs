// src/reconcile/mod.rs
pub mod balances;
pub mod orders;

pub use balances::{BalanceReconciler, BalanceUpdateRecord};
pub use orders::{
    ApiErrorKind, FillRecord, OrderLifecycleReconciler, OrderUpdateRecord, ReconcileOutput,
};
