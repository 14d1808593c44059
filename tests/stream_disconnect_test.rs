//! A client hanging up must stop the session's upstream fetch loop.

mod common;

use std::time::Duration;

use common::{movie_page, movies, next_frame, TestHarness};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const TOTAL_PAGES: u32 = 50;

#[tokio::test]
async fn disconnect_after_first_batch_stops_upstream_fetches() {
    let (h, addr) = TestHarness::with_server_config(|c| {
        c.aggregation.max_pages = TOTAL_PAGES;
    })
    .await;

    // Fifty slow pages of two records each. Without cancellation the session
    // would fetch all of them to satisfy the target.
    for page in 1..=TOTAL_PAGES {
        let base = page as u64 * 100;
        Mock::given(method("GET"))
            .and(path("/movie/popular"))
            .and(query_param("page", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(movie_page(page, TOTAL_PAGES, 100, movies(base..base + 2)))
                    .set_delay(Duration::from_millis(25)),
            )
            .mount(&h.upstream)
            .await;
    }

    let mut resp = reqwest::get(format!(
        "http://{addr}/api/browse/popular/events?target=100"
    ))
    .await
    .unwrap();

    // Take the first batch, then hang up.
    let mut buf = String::new();
    let first = next_frame(&mut resp, &mut buf).await.unwrap();
    assert_eq!(first["page_number"], 1);
    drop(resp);

    // Give the session time to observe the closed transport.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let after_disconnect = h.upstream_request_count().await;
    assert!(
        after_disconnect < TOTAL_PAGES as usize / 2,
        "session kept fetching after disconnect: {after_disconnect} requests"
    );

    // And it stays stopped: no further upstream calls are issued.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(h.upstream_request_count().await, after_disconnect);
}
