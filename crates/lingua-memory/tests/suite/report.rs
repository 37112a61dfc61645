use lingua_memory::{BudgetLedger, MemoryBudget, MemoryPressure, MB};

#[test]
fn report_tracks_each_side_of_the_ledger() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(100 * MB));
    ledger.reserve_resource(50 * MB).unwrap().commit();
    let _pending = ledger.reserve_resource(10 * MB).unwrap();
    ledger.try_charge_cache(20 * MB).unwrap();

    let report = ledger.report();
    assert_eq!(report.resource_bytes, 50 * MB);
    assert_eq!(report.pending_bytes, 10 * MB);
    assert_eq!(report.cache_bytes, 20 * MB);
    assert_eq!(report.usage_total_bytes(), 70 * MB);
    assert_eq!(report.available_bytes(), 20 * MB);
    assert_eq!(report.pressure, MemoryPressure::Medium);
}

#[test]
fn report_serializes_with_snake_case_pressure() {
    let ledger = BudgetLedger::new(MemoryBudget::from_total(1_000));
    ledger.try_charge_cache(900).unwrap();

    let json = serde_json::to_value(ledger.report()).unwrap();
    assert_eq!(json["pressure"], "high");
    assert_eq!(json["budget"]["total"], 1_000);
    assert_eq!(json["cache_bytes"], 900);
}
