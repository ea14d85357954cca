// Copyright 2026 Scraperun Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end job runs: persisted JSONL configuration through the driver to
//! the final result map, without a real browser.

use scraperun::driver::fixture::FixtureDriver;
use scraperun::driver::PageDriver;
use scraperun::job::JobRunner;
use scraperun::store::memory::MemoryStore;
use std::io::Write;

const LISTING: &str = r#"<html><body>
    <button id="more">Load more</button>
    <ul>
      <li class="item">
        <h2 class="title">Alpha</h2>
        <a href="/alpha">view</a>
      </li>
      <li class="item">
        <h2 class="title">Beta</h2>
        <a href="/beta">view</a>
      </li>
    </ul>
</body></html>"#;

fn write_db(lines: &[serde_json::Value]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

#[tokio::test]
async fn test_click_then_scrap_from_jsonl_config() {
    let selectors = write_db(&[
        serde_json::json!({"_id": "root", "name": "page"}),
        serde_json::json!({
            "_id": "items", "parentId": "root", "name": "items",
            "selector": ".item", "array": true
        }),
        serde_json::json!({
            "_id": "title", "parentId": "items", "name": "title",
            "selector": ".title", "text": true
        }),
        serde_json::json!({
            "_id": "link", "parentId": "items", "name": "link",
            "selector": "a", "attrText": "href"
        }),
        serde_json::json!({"_id": "more", "name": "more", "selector": "#more"}),
    ]);
    let actions = write_db(&[
        // stored out of order on purpose
        serde_json::json!({
            "_id": "a2", "name": "products", "selectorId": "root",
            "order": 2, "action": "scrap"
        }),
        serde_json::json!({
            "_id": "a1", "name": "loadMore", "selectorId": "more",
            "order": 1, "action": "click"
        }),
    ]);

    let store = MemoryStore::load(selectors.path(), actions.path()).unwrap();
    let driver = FixtureDriver::new(LISTING);

    let results = JobRunner::new(&driver, &store).run().await.unwrap();

    // the click ran first and hit the button
    assert_eq!(driver.clicks().len(), 1);
    let button = driver
        .query(scraperun::driver::Scope::Page, "#more")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(driver.clicks()[0], button);

    assert_eq!(
        serde_json::to_value(&results).unwrap(),
        serde_json::json!({
            "products": {
                "items": [
                    {"link": "/alpha", "title": "Alpha"},
                    {"link": "/beta", "title": "Beta"}
                ]
            }
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_wait_loads_content_before_scrap() {
    let selectors = vec![
        serde_json::json!({"_id": "root", "name": "page"}),
        serde_json::json!({
            "_id": "items", "parentId": "root", "name": "items",
            "selector": ".item", "array": true
        }),
        serde_json::json!({
            "_id": "title", "parentId": "items", "name": "title",
            "selector": ".title", "text": true
        }),
        serde_json::json!({"_id": "more", "name": "more", "selector": "#more"}),
    ]
    .into_iter()
    .map(|v| serde_json::from_value(v).unwrap())
    .collect();
    let actions = vec![
        serde_json::json!({
            "name": "loadAll", "selectorId": "more", "order": 1,
            "action": "scrollToAndWait", "timeoutType": "count",
            "objectId": "items", "timeoutMs": 2000
        }),
        serde_json::json!({
            "name": "products", "selectorId": "root", "order": 2,
            "action": "scrap"
        }),
    ]
    .into_iter()
    .map(|v| serde_json::from_value(v).unwrap())
    .collect();
    let store = MemoryStore::new(selectors, actions);

    // items only appear after the first scroll
    let driver = FixtureDriver::new(r#"<html><body><div id="more">x</div></body></html>"#);
    driver.push_scroll_state(
        r#"<html><body><div id="more">x</div>
           <li class="item"><h2 class="title">Alpha</h2></li>
           <li class="item"><h2 class="title">Beta</h2></li>
        </body></html>"#,
    );

    let results = JobRunner::new(&driver, &store).run().await.unwrap();

    assert!(driver.scroll_count() >= 1);
    assert_eq!(
        serde_json::to_value(&results).unwrap(),
        serde_json::json!({
            "products": {
                "items": [
                    {"title": "Alpha"},
                    {"title": "Beta"}
                ]
            }
        })
    );
}
