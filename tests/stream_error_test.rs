//! Failure-tolerance behavior of streaming sessions.

mod common;

use common::{collect_frames, emitted_ids, movie_page, movies, TestHarness};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_popular(h: &TestHarness, page: u32, status: u16, results: Vec<serde_json::Value>) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(movie_page(page, 5, 100, results))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .and(query_param("page", page.to_string()))
        .respond_with(template)
        .mount(&h.upstream)
        .await;
}

#[tokio::test]
async fn consecutive_failures_end_in_one_terminal_error_frame() {
    // Threshold of two: pages 3 and 4 failing kills the run.
    let (h, addr) = TestHarness::with_server_config(|c| {
        c.aggregation.max_consecutive_failures = 2;
    })
    .await;

    mount_popular(&h, 1, 200, movies(1..21)).await;
    mount_popular(&h, 2, 200, movies(21..41)).await;
    mount_popular(&h, 3, 500, Vec::new()).await;
    mount_popular(&h, 4, 500, Vec::new()).await;

    let resp = reqwest::get(format!(
        "http://{addr}/api/browse/popular/events?target=100"
    ))
    .await
    .unwrap();
    let frames = collect_frames(resp).await;

    // The data that arrived before the outage is preserved, then exactly one
    // terminal error frame. No partial page 3 data, no silent hang.
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0]["running_total"], 20);
    assert_eq!(frames[1]["running_total"], 40);
    let terminal = &frames[2];
    assert_eq!(terminal["is_complete"], true);
    assert!(terminal["batch"].as_array().unwrap().is_empty());
    assert!(terminal["error"]
        .as_str()
        .unwrap()
        .contains("consecutive page failures"));
    assert_eq!(emitted_ids(&frames).len(), 40);

    // Pages 1-4 were requested; page 5 never was.
    assert_eq!(h.upstream_request_count().await, 4);
}

#[tokio::test]
async fn single_failed_page_is_skipped_and_the_run_continues() {
    // Default threshold of three tolerates an isolated failure.
    let (h, addr) = TestHarness::with_server().await;

    mount_popular(&h, 1, 200, movies(1..21)).await;
    mount_popular(&h, 2, 500, Vec::new()).await;
    mount_popular(&h, 3, 200, movies(21..41)).await;
    mount_popular(&h, 4, 200, movies(41..61)).await;
    mount_popular(&h, 5, 200, movies(61..81)).await;

    let resp = reqwest::get(format!(
        "http://{addr}/api/browse/popular/events?target=60"
    ))
    .await
    .unwrap();
    let frames = collect_frames(resp).await;

    let terminal = frames.last().unwrap();
    assert_eq!(terminal["is_complete"], true);
    assert!(terminal.get("error").is_none());
    assert_eq!(terminal["running_total"], 60);

    // Pages 3 and 4 filled the target the failed page left open; page 5 was
    // never needed.
    let ids = emitted_ids(&frames);
    assert_eq!(ids, (1..61).collect::<Vec<u64>>());
    assert_eq!(h.upstream_request_count().await, 4);
}
