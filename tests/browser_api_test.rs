//! Integration tests for the browser primitives the checks are built on
//! Locator lookups, element properties, visibility, reload and screenshots
//! against the local game replica.


use memory_game_harness::{
    ChromeDriver, ConnectionMode, Difficulty, GameSelectors, HarnessError, Locator, PageDriver,
};
use std::time::Duration;
use test_server::TestServer;

async fn driver_on(server: &TestServer) -> ChromeDriver {
    let driver = ChromeDriver::new(ConnectionMode::Sandboxed {
        chrome_path: None,
        no_sandbox: true,
        headless: true,
    })
    .await
    .expect("Failed to launch Chrome");

    println!("🔗 Navigating to: {}", server.url());
    ChromeDriver::navigate(&driver, &server.url())
        .await
        .expect("Failed to navigate");
    driver
}

/// Click a difficulty and give the replica time to deal
async fn deal(driver: &ChromeDriver, difficulty: Difficulty) {
    let selectors = GameSelectors::default();
    let button = ChromeDriver::find_element(driver, &selectors.difficulty_button(difficulty))
        .await
        .expect("Difficulty button not found");
    PageDriver::click(driver, &button)
        .await
        .expect("Failed to click difficulty");
    tokio::time::sleep(Duration::from_millis(500)).await;
}

#[tokio::test]
async fn test_title_and_url() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let driver = driver_on(&server).await;

    let title = driver.title().await.expect("Failed to get title");
    println!("✅ Page title: {}", title);
    assert!(title.contains("Memory"), "Title should mention the game");

    let current = driver.current_url().await.expect("Failed to get URL");
    println!("✅ Current URL: {}", current);
    assert_eq!(current, server.url());

    assert!(driver.is_alive().await);
    assert!(driver.current_page().url().await.unwrap().is_some());

    driver.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_xpath_and_css_lookups() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let driver = driver_on(&server).await;
    let selectors = GameSelectors::default();

    for difficulty in Difficulty::ALL {
        let button = ChromeDriver::find_element(&driver, &selectors.difficulty_button(difficulty))
            .await
            .expect("Difficulty button not found");
        let text = PageDriver::text(&driver, &button)
            .await
            .expect("Failed to read button text");
        assert_eq!(text.trim(), difficulty.label());
    }

    // No deal yet
    let cards = ChromeDriver::find_elements(&driver, &selectors.cards)
        .await
        .expect("Card lookup failed");
    assert!(cards.is_empty());

    // XPath with no match is an empty list, not an error
    let none = ChromeDriver::find_elements(&driver, &Locator::button_with_text("Impossible"))
        .await
        .expect("XPath lookup failed");
    assert!(none.is_empty());

    let missing = ChromeDriver::find_element(&driver, &Locator::css("#does-not-exist")).await;
    assert!(matches!(missing, Err(HarnessError::ElementNotFound(_))));

    driver.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_card_children_and_attributes() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let driver = driver_on(&server).await;
    let selectors = GameSelectors::default();

    deal(&driver, Difficulty::Easy).await;

    let cards = ChromeDriver::find_elements(&driver, &selectors.cards)
        .await
        .expect("Card lookup failed");
    assert_eq!(cards.len(), 4);

    for card in &cards {
        let image = driver
            .find_child(card, &selectors.card_image)
            .await
            .expect("Card image missing");
        let src = driver.attribute(&image, "src").await.unwrap();
        let alt = driver.attribute(&image, "alt").await.unwrap();
        let absent = driver.attribute(&image, "data-nope").await.unwrap();

        println!("✅ Card image: {:?} / {:?}", src, alt);
        assert!(src.unwrap_or_default().starts_with("/sprites/"));
        assert!(!alt.unwrap_or_default().is_empty());
        assert!(absent.is_none());
    }

    let unsupported = driver
        .find_child(&cards[0], &Locator::xpath(".//img"))
        .await;
    assert!(matches!(unsupported, Err(HarnessError::Other(_))));

    let score = ChromeDriver::find_element(&driver, &selectors.score)
        .await
        .expect("Score not found");
    assert_eq!(PageDriver::inner_html(&driver, &score).await.unwrap(), "0/4");

    driver.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_visibility_follows_modal() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let driver = driver_on(&server).await;
    let selectors = GameSelectors::default();

    let modal = ChromeDriver::find_element(&driver, &selectors.game_over)
        .await
        .expect("Game over image should exist in the DOM");
    assert!(!driver.is_displayed(&modal).await.unwrap());

    let title = ChromeDriver::find_element(&driver, &selectors.title)
        .await
        .expect("Title not found");
    assert!(driver.is_displayed(&title).await.unwrap());

    driver
        .execute_script("document.querySelector('.modal').classList.remove('hidden')")
        .await
        .expect("Script failed");
    assert!(driver.is_displayed(&modal).await.unwrap());

    driver.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_reload_clears_deal() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let driver = driver_on(&server).await;
    let selectors = GameSelectors::default();

    deal(&driver, Difficulty::Medium).await;
    let before = ChromeDriver::find_elements(&driver, &selectors.cards)
        .await
        .unwrap();
    assert_eq!(before.len(), 7);

    ChromeDriver::reload(&driver).await.expect("Reload failed");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let after = ChromeDriver::find_elements(&driver, &selectors.cards)
        .await
        .unwrap();
    assert!(after.is_empty(), "Reload should return to the start screen");

    let value = driver
        .execute_script("document.querySelectorAll('button').length")
        .await
        .unwrap();
    assert_eq!(value, serde_json::json!(3));

    driver.close().await.expect("Failed to close browser");
}

#[tokio::test]
async fn test_screenshot_to_file() {
    let server = TestServer::start().await;
    server.wait_ready().await.expect("Server failed to start");
    let driver = driver_on(&server).await;

    let path = std::env::temp_dir().join(format!("memory-game-shot-{}.png", std::process::id()));
    driver
        .screenshot_to_file(&path)
        .await
        .expect("Screenshot failed");

    let bytes = tokio::fs::read(&path).await.expect("Screenshot not written");
    println!("✅ Screenshot: {} bytes", bytes.len());
    assert!(bytes.len() > 100);
    assert_eq!(&bytes[1..4], b"PNG");

    tokio::fs::remove_file(&path).await.ok();
    driver.close().await.expect("Failed to close browser");
}
