#[cfg(test)]
mod app_api_tests {
    use axum::extract::{Multipart, Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use infraprobe::app::app_api::{AppAction, AppApiClient};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Requests the fake application saw, as access-log style lines
    #[derive(Clone, Default)]
    struct FakeApp {
        access_log: Arc<Mutex<Vec<String>>>,
        uploads: Arc<Mutex<Vec<(String, String, usize)>>>,
    }

    impl FakeApp {
        fn record(&self, line: String) {
            self.access_log.lock().unwrap().push(line);
        }
    }

    async fn list_images(State(app): State<FakeApp>) -> Json<Value> {
        app.record("GET /api/image HTTP/1.1".to_string());
        Json(json!([
            {"id": 1, "object_key": "images/cat.jpg", "object_type": "image/jpeg", "object_size": 3},
            {"id": "2", "object_key": "images/dog.png"}
        ]))
    }

    async fn upload_image(State(app): State<FakeApp>, mut multipart: Multipart) -> StatusCode {
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().unwrap_or_default().to_string();
            let size = field.bytes().await.unwrap().len();
            app.uploads.lock().unwrap().push((name, file_name, size));
        }
        app.record("POST /api/image HTTP/1.1".to_string());
        StatusCode::CREATED
    }

    async fn get_image(State(app): State<FakeApp>, Path(id): Path<String>) -> (StatusCode, String) {
        app.record(format!("GET /api/image/{} HTTP/1.1", id));
        if id == "1" {
            (StatusCode::OK, r#"{"id": 1, "object_key": "images/cat.jpg"}"#.to_string())
        } else {
            (StatusCode::NOT_FOUND, "Image not found".to_string())
        }
    }

    async fn delete_image(State(app): State<FakeApp>, Path(id): Path<String>) -> StatusCode {
        app.record(format!("DELETE /api/image/{} HTTP/1.1", id));
        StatusCode::NO_CONTENT
    }

    async fn list_subscriptions(State(app): State<FakeApp>) -> Json<Value> {
        app.record("GET /api/notification HTTP/1.1".to_string());
        Json(json!([
            {"SubscriptionArn": "PendingConfirmation", "Protocol": "email", "Endpoint": "qa@example.com"}
        ]))
    }

    async fn subscribe(State(app): State<FakeApp>, Path(email): Path<String>) -> StatusCode {
        app.record(format!("POST /api/notification/{} HTTP/1.1", email));
        StatusCode::CREATED
    }

    async fn unsubscribe(State(app): State<FakeApp>, Path(email): Path<String>) -> StatusCode {
        app.record(format!("DELETE /api/notification/{} HTTP/1.1", email));
        StatusCode::OK
    }

    async fn start_fake_app() -> (AppApiClient, FakeApp) {
        let app = FakeApp::default();
        let router = Router::new()
            .route("/api/image", get(list_images).post(upload_image))
            .route("/api/image/:id", get(get_image).delete(delete_image))
            .route("/api/notification", get(list_subscriptions))
            .route("/api/notification/:email", post(subscribe).delete(unsubscribe))
            .with_state(app.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = AppApiClient::new(&format!("http://{}", addr)).unwrap();
        (client, app)
    }

    #[tokio::test]
    async fn test_list_and_get_images() {
        let (client, _app) = start_fake_app().await;

        let images = client.images().await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].id, "1");
        assert_eq!(images[0].object_type.as_deref(), Some("image/jpeg"));
        assert_eq!(client.first_image_id().await.unwrap().as_deref(), Some("1"));

        let found = client.get_image("1").await.unwrap();
        assert!(found.is_success());

        // Non-2xx is data, not an error
        let missing = client.get_image("999").await.unwrap();
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body, "Image not found");
    }

    #[tokio::test]
    async fn test_upload_uses_upfile_field() {
        let (client, app) = start_fake_app().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let response = client.upload_image(&path).await.unwrap();
        assert_eq!(response.status, 201);

        let uploads = app.uploads.lock().unwrap().clone();
        assert_eq!(
            uploads,
            vec![("upfile".to_string(), "test.jpg".to_string(), 4)]
        );
    }

    #[tokio::test]
    async fn test_upload_of_missing_file_is_an_error() {
        let (client, app) = start_fake_app().await;
        let err = client
            .upload_image(std::path::Path::new("/no/such/image.jpg"))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("/no/such/image.jpg"));
        assert!(app.access_log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_round() {
        let (client, app) = start_fake_app().await;

        assert!(client.subscribe("qa@example.com").await.unwrap().is_success());
        let subscriptions = client.subscriptions().await.unwrap();
        assert!(subscriptions[0].is_pending_confirmation());
        assert!(client.unsubscribe("qa@example.com").await.unwrap().is_success());
        assert!(client.delete_image("2").await.unwrap().is_success());

        let log = app.access_log.lock().unwrap().clone();
        assert_eq!(log.len(), 4);
        // Each call leaves a line its log fragment matches
        let actions = [
            AppAction::Subscribe("qa@example.com".to_string()),
            AppAction::ListSubscriptions,
            AppAction::Unsubscribe("qa@example.com".to_string()),
            AppAction::DeleteImage("2".to_string()),
        ];
        for (line, action) in log.iter().zip(actions.iter()) {
            assert!(
                line.contains(&action.log_fragment()),
                "{} does not contain {}",
                line,
                action.log_fragment()
            );
        }
    }
}
