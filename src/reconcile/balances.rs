// src/reconcile/balances.rs
//
// Reconciles the two balance feeds: total on-chain balances and per-market
// tradeable ceilings (limits). Each feed fully replaces its table; an asset
// absent from a totals snapshot is dropped from both tables. Available is
// the per-asset minimum limit across all markets that trade the asset.
use crate::domain::errors::ReconcileResult;
use crate::domain::models::BalanceEntry;
use crate::dto::{LimitEntry, WireBalance};
use crate::metadata::{self, MetadataHandle};
use crate::precision;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Balance change emitted towards the external balance tracker. `entry` is
/// `None` when the asset disappeared from the totals snapshot.
#[derive(Debug, Clone)]
pub struct BalanceUpdateRecord {
    pub asset: String,
    pub entry: Option<BalanceEntry>,
}

pub struct BalanceReconciler {
    metadata: MetadataHandle,
    totals: HashMap<String, Decimal>,
    available: HashMap<String, Decimal>,
}

impl BalanceReconciler {
    pub fn new(metadata: MetadataHandle) -> Self {
        Self {
            metadata,
            totals: HashMap::new(),
            available: HashMap::new(),
        }
    }

    /// Applies a totals snapshot. The snapshot is authoritative: assets it
    /// does not mention are removed, from the available table as well. The
    /// whole snapshot is decoded before anything is committed, so a bad
    /// entry leaves the tables untouched.
    pub fn apply_total_balances(
        &mut self,
        balances: &[WireBalance],
    ) -> ReconcileResult<Vec<BalanceUpdateRecord>> {
        let metadata = self.metadata.snapshot();

        let mut totals = HashMap::with_capacity(balances.len());
        for balance in balances {
            let decimals = metadata.symbol_decimals(&balance.symbol)?;
            let total = precision::decimal_from_wire(&balance.total, decimals)?;
            totals.insert(balance.symbol.clone(), total);
        }

        let mut records = Vec::new();
        for asset in self.totals.keys() {
            if !totals.contains_key(asset) {
                records.push(BalanceUpdateRecord {
                    asset: asset.clone(),
                    entry: None,
                });
            }
        }
        self.available.retain(|asset, _| totals.contains_key(asset));
        self.totals = totals;

        for (asset, total) in &self.totals {
            records.push(BalanceUpdateRecord {
                asset: asset.clone(),
                entry: Some(BalanceEntry {
                    total: *total,
                    available: self.available.get(asset).copied().unwrap_or(*total),
                }),
            });
        }
        Ok(records)
    }

    /// Applies a limits snapshot. Limits arrive per market; the per-asset
    /// available balance is the minimum across every market quoting the
    /// asset. Assets without a totals entry are skipped until the next
    /// totals snapshot names them.
    pub fn apply_limits(
        &mut self,
        limits: &[LimitEntry],
    ) -> ReconcileResult<Vec<BalanceUpdateRecord>> {
        let metadata = self.metadata.snapshot();

        let mut ceilings: HashMap<String, Decimal> = HashMap::new();
        for limit in limits {
            let (base_symbol, quote_symbol) = metadata::split_market_id(limit.market_id())?;
            for (symbol, raw) in [(base_symbol, limit.base()), (quote_symbol, limit.quote())] {
                let decimals = metadata.symbol_decimals(symbol)?;
                let value = precision::decimal_from_wire(raw, decimals)?;
                ceilings
                    .entry(symbol.to_string())
                    .and_modify(|current| *current = (*current).min(value))
                    .or_insert(value);
            }
        }

        let mut available = HashMap::with_capacity(self.totals.len());
        let mut records = Vec::new();
        for (asset, total) in &self.totals {
            let Some(value) = ceilings.get(asset) else {
                log::warn!("No limit entry for {}, keeping its available balance", asset);
                if let Some(current) = self.available.get(asset) {
                    available.insert(asset.clone(), *current);
                }
                continue;
            };
            available.insert(asset.clone(), *value);
            records.push(BalanceUpdateRecord {
                asset: asset.clone(),
                entry: Some(BalanceEntry {
                    total: *total,
                    available: *value,
                }),
            });
        }
        self.available = available;
        Ok(records)
    }

    pub fn entry(&self, asset: &str) -> Option<BalanceEntry> {
        let total = *self.totals.get(asset)?;
        Some(BalanceEntry {
            total,
            available: self.available.get(asset).copied().unwrap_or(total),
        })
    }

    pub fn entries(&self) -> HashMap<String, BalanceEntry> {
        self.totals
            .keys()
            .filter_map(|asset| Some((asset.clone(), self.entry(asset)?)))
            .collect()
    }
}
