use crate::helpers;
use loco_rs::{bgworker::BackgroundWorker, testing::prelude::*};
use photo_augment_backend::{
    app::App,
    workers::embed_all::{EmbedAllWorker, WorkerArgs},
};
use serial_test::serial;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
#[serial]
async fn test_run_embed_all_worker() {
    // `config/test.yaml` points `host_api_url` at this fixed address, so
    // the mock has to bind there rather than a random port.
    let listener = std::net::TcpListener::bind("127.0.0.1:8080").expect("bind mock host port");
    let mock_host = MockServer::builder().listener(listener).start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/photos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_host)
        .await;

    let boot = boot_test::<App>().await.unwrap();

    // Runs in `ForegroundBlocking` mode per the test config, so this
    // exercises the full pagination path against the stubbed Host: one
    // page comes back empty, the loop terminates, and the batch pool
    // runs over zero items. The Embedder is never reached because no
    // photo makes it past pagination.
    assert!(
        EmbedAllWorker::perform_later(&boot.app_context, WorkerArgs {})
            .await
            .is_ok()
    );

    helpers::teardown(&boot.app_context.db).await;
}
