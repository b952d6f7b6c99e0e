//! Concurrent uploads each get the answer for their own image.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::task::JoinSet;
use tower::ServiceExt;

use common::{ColorClassifier, app_with, body_prediction, png_for_class, upload};
use fruitscan::server::config::ServerConfig;
use fruitscan::{ClassTable, PredictResponse, Predictor, Preprocessor};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_simultaneous_uploads_are_answered_independently() {
    let classifier = Arc::new(ColorClassifier::new());
    let predictor = Predictor::new(
        classifier.clone(),
        ClassTable::builtin(),
        Preprocessor::default(),
    );
    let app = app_with(predictor, &ServerConfig::default());
    let table = ClassTable::builtin();

    let mut tasks = JoinSet::new();
    for request in 0..50usize {
        let app = app.clone();
        tasks.spawn(async move {
            let index = request % 8;
            let response = app.oneshot(upload(&png_for_class(index))).await.unwrap();
            (index, body_prediction(response).await)
        });
    }

    let mut answered = 0;
    while let Some(joined) = tasks.join_next().await {
        let (index, response) = joined.unwrap();
        let expected = table.get(index).unwrap();
        match response {
            PredictResponse::Prediction(p) => {
                assert_eq!(p.fruit, expected.fruit, "index {index}");
                assert_eq!(p.class, expected.condition, "index {index}");
            }
            other => panic!("index {index}: {other:?}"),
        }
        answered += 1;
    }

    assert_eq!(answered, 50);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failures_do_not_affect_other_requests() {
    let app = app_with(
        common::predictor(ColorClassifier::new()),
        &ServerConfig::default(),
    );

    let mut tasks = JoinSet::new();
    for request in 0..20usize {
        let app = app.clone();
        tasks.spawn(async move {
            let bytes = if request % 2 == 0 {
                png_for_class(2)
            } else {
                b"corrupt".to_vec()
            };
            let response = app.oneshot(upload(&bytes)).await.unwrap();
            (request, body_prediction(response).await)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (request, response) = joined.unwrap();
        match (request % 2, response) {
            (0, PredictResponse::Prediction(p)) => assert_eq!(p.class, "Cedar rust"),
            (1, PredictResponse::Error { error }) => assert!(!error.is_empty()),
            (_, other) => panic!("request {request}: unexpected {other:?}"),
        }
    }
}
