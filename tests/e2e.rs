// E2E tests - drive the game replica with a real headless Chrome
// Uses local HTTP server for fast, reliable, network-independent testing


use memory_game_harness::suite::{count_cards, select_difficulty};
use memory_game_harness::{
    Backoff, ChromeDriver, CheckStatus, ConnectionMode, Difficulty, FailurePolicy, GameSelectors,
    GameSuite, Harness, HarnessError, SyncStrategy, Transcript,
};
use std::time::Duration;
use test_server::TestServer;

async fn launch() -> ChromeDriver {
    ChromeDriver::new(ConnectionMode::Sandboxed {
        chrome_path: None,
        no_sandbox: true, // Required for Ubuntu 23.10+ sandbox restrictions
        headless: true,   // Always headless (no display server required)
    })
    .await
    .expect("Failed to launch Chrome")
}

/// Short polling budget for pages that are expected to fail
fn impatient() -> SyncStrategy {
    SyncStrategy::Poll {
        backoff: Backoff::default().with_timeout(Duration::from_millis(500)),
        card_flip_timeout: Duration::from_millis(300),
    }
}

#[tokio::test]
async fn test_full_suite_passes_against_replica() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let url = server.url();

    let driver = launch().await;
    let checks = GameSuite::new(GameSelectors::default(), SyncStrategy::default()).checks();

    println!("Running suite against: {}", url);
    let report = Harness::new(FailurePolicy::Continue)
        .with_transcript(Transcript::Stdout)
        .run_session(driver, &url, &checks)
        .await
        .expect("Page should load");

    println!("📊 {}", report.summary_line());
    for outcome in &report.results {
        if outcome.status == CheckStatus::Failed {
            println!("   ❌ {}: {:?}", outcome.label, outcome.message);
        }
    }

    assert_eq!(report.total, 10);
    assert_eq!(report.passed, 10, "All checks should pass on the replica");
    assert!(report.is_success());
    assert_eq!(
        report.results[0].message.as_deref(),
        Some("Select Difficulty Level")
    );
}

#[tokio::test]
async fn test_card_counts_stable_across_reloads() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");

    let driver = launch().await;
    driver
        .navigate(&server.url())
        .await
        .expect("Failed to load game");

    let selectors = GameSelectors::default();
    let sync = SyncStrategy::default();

    for _ in 0..2 {
        for difficulty in [Difficulty::Hard, Difficulty::Medium, Difficulty::Easy] {
            select_difficulty(&driver, &selectors, &sync, difficulty, true)
                .await
                .expect("Difficulty button should be clickable");
            let found = count_cards(&driver, &selectors, &sync, difficulty.expected_cards())
                .await
                .expect("Card lookup failed");

            println!("✅ {}: {} cards", difficulty, found);
            assert_eq!(found, difficulty.expected_cards());
        }
    }

    driver.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_fail_fast_on_short_deal() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let url = server.route("broken");

    let shots = std::env::temp_dir().join(format!("memory-game-e2e-shots-{}", std::process::id()));
    let driver = launch().await;
    let checks = GameSuite::new(GameSelectors::default(), impatient()).checks();

    let report = Harness::new(FailurePolicy::FailFast)
        .with_transcript(Transcript::Stdout)
        .with_screenshot_dir(&shots)
        .run_session(driver, &url, &checks)
        .await
        .expect("Page should load");

    assert_eq!(report.passed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 7);
    assert_eq!(report.results[2].status, CheckStatus::Failed);
    assert_eq!(
        report.results[2].message.as_deref(),
        Some("Hard mode should show 10 cards, found 9")
    );

    let shot = report.results[2]
        .screenshot
        .clone()
        .expect("Failure screenshot should be captured");
    let bytes = tokio::fs::read(&shot).await.expect("Screenshot missing");
    assert_eq!(&bytes[1..4], b"PNG");
    println!("✅ Failure screenshot: {} ({} bytes)", shot, bytes.len());

    tokio::fs::remove_dir_all(&shots).await.ok();
}

#[tokio::test]
async fn test_blank_page_fails_every_check_in_isolation() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let url = server.route("blank");

    let driver = launch().await;
    let checks = GameSuite::new(GameSelectors::default(), impatient()).checks();

    let report = Harness::new(FailurePolicy::Continue)
        .with_transcript(Transcript::Stdout)
        .run_session(driver, &url, &checks)
        .await
        .expect("Page should load");

    assert_eq!(report.passed + report.failed, 10);
    assert_eq!(report.failed, 10);
    assert_eq!(report.skipped, 0);
    assert_eq!(
        report.results[0].message.as_deref(),
        Some("Element not found: css=div")
    );
}

#[tokio::test]
async fn test_unreachable_target_is_fatal() {
    let driver = launch().await;
    let checks = GameSuite::new(GameSelectors::default(), impatient()).checks();

    // Nothing listens on port 1
    let result = Harness::new(FailurePolicy::Continue)
        .with_transcript(Transcript::Off)
        .run_session(driver, "http://127.0.0.1:1/", &checks)
        .await;

    match result {
        Err(HarnessError::NavigationFailed(message)) => {
            println!("✅ Navigation failed as expected: {}", message);
        }
        Err(other) => panic!("Expected a navigation failure, got {}", other),
        Ok(report) => panic!("Expected a navigation failure, got {}", report.summary_line()),
    }
}
