//! Merging of guardrail and LLM signal streams.
//!
//! Rule supremacy: when both streams produce the same `(type, evidence)`
//! signal in a category, the guardrail version wins wholesale; its severity,
//! verification level, and confidence are never averaged with the LLM's.
//! Keying through a BTreeMap also fixes the output order (type, then
//! normalized evidence), so identical input yields byte-identical output.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::schema::SignalCategory;

use super::types::{MaintenanceSection, SignalSet};

/// Merge the two signal streams, guardrails winning collisions.
pub fn merge_signals(rule_signals: SignalSet, llm_signals: SignalSet) -> SignalSet {
    let mut rule_signals = rule_signals;
    let mut llm_signals = llm_signals;
    let mut merged = SignalSet::default();

    for category in SignalCategory::ALL {
        let mut by_key = BTreeMap::new();
        // LLM first, rules second: later insert replaces on key collision.
        for signal in std::mem::take(llm_signals.category_mut(category)) {
            by_key.insert(signal.dedup_key(), signal);
        }
        for signal in std::mem::take(rule_signals.category_mut(category)) {
            by_key.insert(signal.dedup_key(), signal);
        }
        *merged.category_mut(category) = by_key.into_values().collect();
    }

    merged
}

/// Dedupe the maintenance section in stable order. Claims and red flags only
/// come from the LLM stream, so dedup here is within one stream, same keys
/// as signal merging. Duplicate claims keep the variant carrying `details`,
/// independent of input order.
pub fn merge_maintenance(maintenance: MaintenanceSection) -> MaintenanceSection {
    let mut claims = BTreeMap::new();
    for claim in maintenance.claims {
        match claims.entry(claim.dedup_key()) {
            Entry::Vacant(slot) => {
                slot.insert(claim);
            }
            Entry::Occupied(mut slot) => {
                if slot.get().details.is_none() && claim.details.is_some() {
                    slot.insert(claim);
                }
            }
        }
    }

    let mut red_flags = BTreeMap::new();
    for flag in maintenance.red_flags {
        red_flags.entry(flag.dedup_key()).or_insert(flag);
    }

    let evidence_present: BTreeSet<String> = maintenance.evidence_present.into_iter().collect();

    MaintenanceSection {
        claims: claims.into_values().collect(),
        evidence_present: evidence_present.into_iter().collect(),
        red_flags: red_flags.into_values().collect(),
    }
}
