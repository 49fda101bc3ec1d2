//! Integration Test: Non-Blocking Delivery
//!
//! **Policy**: A broadcast must never wait on a subscriber. Production code in
//! the broadcaster crates MUST NOT await channel sends, use blocking channel
//! operations, or sleep the thread.
//! **Required**: `try_send` for delivery, `tokio::time` for waiting.

use std::path::PathBuf;

use architectural_enforcement::{check_directory, NON_BLOCKING_RULES};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Test that production code never blocks on delivery
#[test]
fn test_no_blocking_delivery_in_production_code() {
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in ["broadcaster/core/src", "broadcaster/daemon/src"] {
        violations.extend(check_directory(&root.join(dir), NON_BLOCKING_RULES));
    }

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking delivery calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - sender.send(event).await");
        eprintln!("  - blocking_send(), blocking_recv()");
        eprintln!("  - std::thread::sleep()");
        eprintln!("\n✅ REQUIRED:");
        eprintln!("  - sender.try_send(event), dropping the event when full");
        eprintln!("  - tokio::time::sleep().await, tokio::time::interval()");

        panic!(
            "\nFound {} blocking delivery violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// The scanned directories must exist, or the check above passes vacuously
#[test]
fn test_scanned_directories_exist() {
    let root = workspace_root();
    assert!(root.join("broadcaster/core/src/registry.rs").exists());
    assert!(root.join("broadcaster/daemon/src/main.rs").exists());
}
