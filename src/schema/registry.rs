//! Closed-enum registry for signal types and maintenance vocabularies.
//!
//! The registry is an immutable, process-wide value built once and passed by
//! reference. Unknown raw values are mapped to `"other"` by the upstream
//! normalizer; the validator only checks membership and never rewrites, so
//! every closed set includes `"other"`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::enums::SignalCategory;

const LEGALITY_TYPES: &[&str] = &[
    "no_rego",
    "rego_expired",
    "rego_short",
    "unregistered",
    "no_rwc",
    "rwc_required",
    "defected",
    "inspection_required",
    "not_roadworthy",
    "non_compliant_mods",
    "other",
];

const ACCIDENT_TYPES: &[&str] = &[
    "writeoff",
    "repairable_writeoff",
    "rebuilt_title",
    "salvage_title",
    "wovr_listed",
    "accident_damage",
    "hail_damage",
    "flood_damage",
    "structural_damage",
    "airbag_deployed",
    "chassis_damage",
    "paintwork_repair",
    "panel_replacement",
    "other",
];

const MECHANICAL_TYPES: &[&str] = &[
    "engine_knock",
    "engine_misfire",
    "engine_overheating",
    "oil_leak",
    "coolant_leak",
    "head_gasket_suspected",
    "smoke_from_exhaust",
    "rough_idle",
    "starting_issue",
    "gearbox_issue",
    "clutch_issue",
    "slipping_transmission",
    "diff_issue",
    "drivetrain_noise",
    "suspension_issue",
    "steering_issue",
    "brake_issue",
    "tyres_worn",
    "battery_issue",
    "alternator_issue",
    "electrical_fault",
    "check_engine_light",
    "needs_mechanic",
    "not_running",
    "intermittent_issue",
    "unknown_mechanical_issue",
    "other",
];

const COSMETIC_TYPES: &[&str] = &[
    "scratch",
    "dent",
    "paint_fade",
    "clearcoat_peel",
    "rust_visible",
    "interior_wear",
    "cracked_windscreen",
    "broken_light",
    "missing_parts_cosmetic",
    "dirty_or_neglected",
    "other",
];

const MODS_PERFORMANCE_TYPES: &[&str] = &[
    "tuned",
    "ecu_tune",
    "stage_1",
    "stage_2_or_higher",
    "turbo_upgrade",
    "turbo_swap",
    "supercharger",
    "engine_swap",
    "e85_flex_fuel",
    "intake_exhaust",
    "downpipe",
    "intercooler_upgrade",
    "fuel_system_upgrade",
    "track_use",
    "race_build",
    "other",
];

const MODS_COSMETIC_TYPES: &[&str] = &[
    "aftermarket_wheels",
    "bodykit",
    "wrap",
    "tint",
    "lowered",
    "lifted",
    "custom_lights",
    "interior_custom",
    "audio_upgrade",
    "other",
];

const SELLER_BEHAVIOR_TYPES: &[&str] = &[
    "need_gone",
    "moving_sale",
    "urgent_sale",
    "price_drop_mentioned",
    "firm_price",
    "open_to_offers",
    "no_timewasters",
    "no_lowballers",
    "swap_trade",
    "cash_only",
    "deposit_required",
    "finance_available",
    "delivery_available",
    "transparent_disclosure",
    "vague_description",
    "contradictory_claims",
    "too_good_to_be_true_language",
    "other",
];

const EVIDENCE_PRESENT_VALUES: &[&str] = &[
    "logbook",
    "receipts",
    "workshop_invoice",
    "photos_of_records",
    "none",
    "other",
];

const MAINTENANCE_CLAIM_TYPES: &[&str] = &[
    "serviced_recently",
    "regular_service_claimed",
    "logbook_mentioned",
    "receipts_mentioned",
    "major_service_done",
    "timing_belt_done",
    "water_pump_done",
    "clutch_replaced",
    "gearbox_rebuilt",
    "engine_rebuilt",
    "new_tyres",
    "new_brakes",
    "battery_replaced",
    "other",
];

const RED_FLAG_TYPES: &[&str] = &[
    "claim_without_proof",
    "major_work_no_receipts",
    "inconsistent_service_story",
    "recent_issue_disguised_as_minor",
    "odometer_or_history_unclear",
    "other",
];

const MISSING_INFO_VALUES: &[&str] = &[
    "vin_unknown",
    "ppsr_or_finance_status_unknown",
    "rego_expiry_unknown",
    "rwc_status_unknown",
    "accident_history_unknown",
    "service_history_unknown",
    "number_of_owners_unknown",
    "reason_for_selling_unknown",
    "recent_repairs_proof_unknown",
    "mods_engineered_unknown",
    "inspection_availability_unknown",
    "other",
];

/// Immutable lookup tables for every closed enum in the output contract.
pub struct EnumRegistry {
    legality: BTreeSet<&'static str>,
    accident_history: BTreeSet<&'static str>,
    mechanical_issues: BTreeSet<&'static str>,
    cosmetic_issues: BTreeSet<&'static str>,
    mods_performance: BTreeSet<&'static str>,
    mods_cosmetic: BTreeSet<&'static str>,
    seller_behavior: BTreeSet<&'static str>,
    evidence_present: BTreeSet<&'static str>,
    maintenance_claims: BTreeSet<&'static str>,
    red_flags: BTreeSet<&'static str>,
    missing_info: BTreeSet<&'static str>,
}

impl EnumRegistry {
    fn build() -> Self {
        let set = |values: &[&'static str]| values.iter().copied().collect::<BTreeSet<_>>();
        Self {
            legality: set(LEGALITY_TYPES),
            accident_history: set(ACCIDENT_TYPES),
            mechanical_issues: set(MECHANICAL_TYPES),
            cosmetic_issues: set(COSMETIC_TYPES),
            mods_performance: set(MODS_PERFORMANCE_TYPES),
            mods_cosmetic: set(MODS_COSMETIC_TYPES),
            seller_behavior: set(SELLER_BEHAVIOR_TYPES),
            evidence_present: set(EVIDENCE_PRESENT_VALUES),
            maintenance_claims: set(MAINTENANCE_CLAIM_TYPES),
            red_flags: set(RED_FLAG_TYPES),
            missing_info: set(MISSING_INFO_VALUES),
        }
    }

    /// Valid signal types for a category.
    pub fn signal_types(&self, category: SignalCategory) -> &BTreeSet<&'static str> {
        match category {
            SignalCategory::Legality => &self.legality,
            SignalCategory::AccidentHistory => &self.accident_history,
            SignalCategory::MechanicalIssues => &self.mechanical_issues,
            SignalCategory::CosmeticIssues => &self.cosmetic_issues,
            SignalCategory::ModsPerformance => &self.mods_performance,
            SignalCategory::ModsCosmetic => &self.mods_cosmetic,
            SignalCategory::SellerBehavior => &self.seller_behavior,
        }
    }

    pub fn is_valid_signal_type(&self, signal_type: &str, category: SignalCategory) -> bool {
        self.signal_types(category).contains(signal_type)
    }

    pub fn evidence_present_values(&self) -> &BTreeSet<&'static str> {
        &self.evidence_present
    }

    pub fn maintenance_claim_types(&self) -> &BTreeSet<&'static str> {
        &self.maintenance_claims
    }

    pub fn red_flag_types(&self) -> &BTreeSet<&'static str> {
        &self.red_flags
    }

    pub fn missing_info_values(&self) -> &BTreeSet<&'static str> {
        &self.missing_info
    }
}

static REGISTRY: LazyLock<EnumRegistry> = LazyLock::new(EnumRegistry::build);

/// The process-wide enum registry, built once.
pub fn registry() -> &'static EnumRegistry {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_other_fallback() {
        let reg = registry();
        for category in SignalCategory::ALL {
            assert!(
                reg.is_valid_signal_type("other", category),
                "category {} missing 'other'",
                category.as_str()
            );
        }
        assert!(reg.evidence_present_values().contains("other"));
        assert!(reg.maintenance_claim_types().contains("other"));
        assert!(reg.red_flag_types().contains("other"));
        assert!(reg.missing_info_values().contains("other"));
    }

    #[test]
    fn known_types_are_members() {
        let reg = registry();
        assert!(reg.is_valid_signal_type("writeoff", SignalCategory::AccidentHistory));
        assert!(reg.is_valid_signal_type("defected", SignalCategory::Legality));
        assert!(reg.is_valid_signal_type("stage_2_or_higher", SignalCategory::ModsPerformance));
        assert!(reg.is_valid_signal_type("firm_price", SignalCategory::SellerBehavior));
    }

    #[test]
    fn types_do_not_leak_across_categories() {
        let reg = registry();
        assert!(!reg.is_valid_signal_type("writeoff", SignalCategory::Legality));
        assert!(!reg.is_valid_signal_type("defected", SignalCategory::MechanicalIssues));
        assert!(!reg.is_valid_signal_type("tuned", SignalCategory::ModsCosmetic));
    }

    #[test]
    fn maintenance_vocabularies_cover_schema() {
        let reg = registry();
        assert!(reg.evidence_present_values().contains("logbook"));
        assert!(reg.maintenance_claim_types().contains("regular_service_claimed"));
        assert!(reg.red_flag_types().contains("claim_without_proof"));
        assert!(reg.missing_info_values().contains("service_history_unknown"));
    }
}
