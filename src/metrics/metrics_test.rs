use super::*;

fn create_test_registry() -> Registry {
    let registry = Registry::new_custom(Some("collector".to_string()), None).unwrap();
    register_custom_metrics(&registry);
    registry
}

#[test]
fn test_custom_registry() {
    let registry = create_test_registry();

    SET_TRANSACTIONS.with_label_values(&["dut", "committed"]).inc();
    CACHED_LEAVES.with_label_values(&["dut"]).set(3);
    let metrics = &registry.gather();
    assert!(!metrics.is_empty());

    let metric_names: Vec<_> = metrics.iter().map(|m| m.get_name()).collect();
    assert!(
        metric_names.contains(&"collector_set_transactions"),
        "Missing collector_set_transactions"
    );
    assert!(metric_names.contains(&"collector_cached_leaves"));
}

#[test]
fn test_double_registration_is_tolerated() {
    let registry = create_test_registry();
    register_custom_metrics(&registry);
    INGESTED_MESSAGES.with_label_values(&["dut", "delta"]).inc();
    assert!(render(&registry).contains("collector_ingested_messages"));
}

#[test]
fn test_counter_increment() {
    INGESTED_MESSAGES.with_label_values(&["counter-test", "sync"]).inc();
    INGESTED_MESSAGES.with_label_values(&["counter-test", "sync"]).inc();

    let value = INGESTED_MESSAGES.with_label_values(&["counter-test", "sync"]).get();
    assert_eq!(value, 2, "Counter should increment correctly");
}
