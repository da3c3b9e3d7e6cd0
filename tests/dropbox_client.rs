use dropsync_lib::error::RemoteError;
use dropsync_lib::remote::{DropboxStore, RemoteStore};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn store_for(server: &MockServer) -> DropboxStore {
    let base = format!("{}/2", server.uri());
    DropboxStore::with_base_urls("test-token", &base, &base).unwrap()
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn test_follows_cursor_until_exhausted() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/list_folder"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(json!({ "path": "/Docs" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [
                    {".tag": "file", "name": "b.txt", "path_display": "/Docs/b.txt",
                     "path_lower": "/docs/b.txt", "content_hash": "hb", "size": 2},
                    {".tag": "folder", "name": "Sub", "path_display": "/Docs/Sub",
                     "path_lower": "/docs/sub"}
                ],
                "cursor": "cursor-1",
                "has_more": true
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/files/list_folder/continue"))
            .and(body_json(json!({ "cursor": "cursor-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [
                    {".tag": "file", "name": "a.txt", "path_display": "/Docs/a.txt",
                     "path_lower": "/docs/a.txt", "content_hash": "ha", "size": 1},
                    {".tag": "deleted", "name": "old.txt"}
                ],
                "cursor": "cursor-2",
                "has_more": false
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = store_for(&mock_server).await;
        let entries = store.list_folder("/Docs/").await.unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Sub", "a.txt", "b.txt"]);
        assert_eq!(entries[1].content_hash.as_deref(), Some("ha"));
        assert_eq!(entries[2].display_path, "/Docs/b.txt");
    }

    #[tokio::test]
    async fn test_root_uses_empty_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/list_folder"))
            .and(body_json(json!({ "path": "" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [],
                "cursor": "c",
                "has_more": false
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = store_for(&mock_server).await;
        assert!(store.list_folder("/").await.unwrap().is_empty());
    }
}

mod errors {
    use super::*;

    #[tokio::test]
    async fn test_unauthorized() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/list_folder"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_access_token"))
            .mount(&mock_server)
            .await;

        let store = store_for(&mock_server).await;
        let err = store.list_folder("/Docs").await.unwrap_err();
        assert!(err.is_unauthorized(), "got: {:?}", err);
    }

    #[tokio::test]
    async fn test_missing_path_is_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/download"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_string(r#"{"error_summary": "path/not_found/..."}"#),
            )
            .mount(&mock_server)
            .await;

        let store = store_for(&mock_server).await;
        match store.download_file("/Docs/gone.txt").await {
            Err(RemoteError::NotFound(p)) => assert_eq!(p, "/Docs/gone.txt"),
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_existing_folder_is_ok() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/create_folder_v2"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_string(r#"{"error_summary": "path/conflict/folder/..."}"#),
            )
            .mount(&mock_server)
            .await;

        let store = store_for(&mock_server).await;
        assert!(store.create_folder("/Docs").await.is_ok());
    }
}

mod transfer {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_download() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/files/upload"))
            .and(header_exists("Dropbox-API-Arg"))
            .and(header("Content-Type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "café.txt" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/files/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&mock_server)
            .await;

        let store = store_for(&mock_server).await;
        store
            .upload_file("/Fotos/café.txt", b"hello".to_vec())
            .await
            .unwrap();
        assert_eq!(store.download_file("/Fotos/café.txt").await.unwrap(), b"hello");
    }
}
