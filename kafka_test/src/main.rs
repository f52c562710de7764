//! kafka_sessions E2E Test Suite Orchestrator
//!
//! This orchestrator runs all E2E tests in the correct order:
//! 1. Prober tests (the broker must be reachable first)
//! 2. Registry tests (topics must be creatable)
//! 3. Publisher tests (depend on topic creation)
//! 4. Orchestrator tests (depend on publishing)
//!
//! ## Usage
//!
//! ```bash
//! # Run all tests
//! cargo run -p kafka_test --release
//!
//! # With a custom broker
//! KAFKA_BROKERS="kafka:9092" cargo run -p kafka_test --release
//! ```
//!
//! ## Exit Codes
//!
//! - 0: All tests passed
//! - 1: One or more tests failed

use kafka_test::{
    // Orchestrator tests
    test_background_follows_new_topics,
    test_collect_from_all_topics,
    test_collect_from_topic,
    test_collect_same_topic_twice,
    // Registry tests
    test_create_duplicate,
    test_create_requires_name,
    test_create_then_list,
    test_delete_topic,
    // Prober tests
    test_probe_reachable,
    test_probe_unreachable,
    // Publisher tests
    test_publish_and_verify,
    test_publish_null_value,
    verify_broker_ready,
};

/// Test suite result tracking
struct TestSuiteResults {
    passed: usize,
    failed: usize,
    results: Vec<(&'static str, &'static str, bool)>, // (category, name, passed)
}

impl TestSuiteResults {
    fn new() -> Self {
        Self {
            passed: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    fn record(&mut self, category: &'static str, name: &'static str, passed: bool) {
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push((category, name, passed));
    }

    fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("TEST SUITE SUMMARY");
        println!("{}\n", "=".repeat(60));

        let mut current_category = "";
        for (category, name, passed) in &self.results {
            if *category != current_category {
                if !current_category.is_empty() {
                    println!();
                }
                println!("{}:", category);
                current_category = category;
            }
            let status = if *passed { "✅ PASSED" } else { "❌ FAILED" };
            println!("  {} - {}", name, status);
        }

        println!("\n{}", "-".repeat(60));
        println!(
            "Total: {} passed, {} failed, {} total",
            self.passed,
            self.failed,
            self.passed + self.failed
        );

        if self.failed == 0 {
            println!("\n✅ ALL TESTS PASSED");
        } else {
            println!("\n❌ SOME TESTS FAILED");
        }
    }
}

/// Run a single test and record the result
macro_rules! run_test {
    ($results:expr, $category:expr, $name:expr, $test_fn:expr) => {{
        let result = $test_fn.await;
        let passed = result.is_ok();
        if let Err(e) = &result {
            println!("❌ Test failed: {}", e);
        }
        $results.record($category, $name, passed);
        passed
    }};
}

fn section(title: &str) {
    println!("┌────────────────────────────────────────────────────────────┐");
    println!("│ {:<58} │", title);
    println!("└────────────────────────────────────────────────────────────┘\n");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║           kafka_sessions E2E Test Suite                    ║");
    println!("╚════════════════════════════════════════════════════════════╝\n");

    if let Err(e) = verify_broker_ready().await {
        println!("❌ Broker not ready: {}", e);
        std::process::exit(1);
    }

    let mut results = TestSuiteResults::new();

    // ==================== PROBER TESTS ====================
    section("PROBER TESTS");

    run_test!(results, "Prober", "Reachable", test_probe_reachable());
    run_test!(results, "Prober", "Unreachable", test_probe_unreachable());

    // ==================== REGISTRY TESTS ====================
    section("REGISTRY TESTS");

    run_test!(results, "Registry", "Create/List", test_create_then_list());
    run_test!(results, "Registry", "Duplicate", test_create_duplicate());
    run_test!(results, "Registry", "Delete", test_delete_topic());
    run_test!(
        results,
        "Registry",
        "Name Required",
        test_create_requires_name()
    );

    // ==================== PUBLISHER TESTS ====================
    section("PUBLISHER TESTS");

    run_test!(
        results,
        "Publisher",
        "Publish/Verify",
        test_publish_and_verify()
    );
    run_test!(results, "Publisher", "Null Value", test_publish_null_value());

    // ==================== ORCHESTRATOR TESTS ====================
    section("ORCHESTRATOR TESTS");

    run_test!(
        results,
        "Orchestrator",
        "Collect One Topic",
        test_collect_from_topic()
    );
    run_test!(
        results,
        "Orchestrator",
        "Collect Same Topic Twice",
        test_collect_same_topic_twice()
    );
    run_test!(
        results,
        "Orchestrator",
        "Collect All Topics",
        test_collect_from_all_topics()
    );
    run_test!(
        results,
        "Orchestrator",
        "Background Follows New Topics",
        test_background_follows_new_topics()
    );

    results.print_summary();

    if results.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
