use crate::error::ApiError;
use crate::models::{
    BaseResponse, CopyNotebookRequest, ReadCodeResponse, RenameFileRequest,
    SaveAppConfigurationRequest, SaveNotebookRequest,
};
use crate::state::SharedState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use quill_session::ConsumerId;

/// The file/session control surface.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/files/read_code", post(read_code))
        .route("/api/files/rename", post(rename_file))
        .route("/api/files/save", post(save))
        .route("/api/files/copy", post(copy_notebook))
        .route("/api/files/save_app_config", post(save_app_config))
        .with_state(state)
}

async fn read_code(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<ReadCodeResponse>, ApiError> {
    state.authorize(&headers)?;
    let session_id = state.require_session(&headers)?;

    if state.registry.manager_path(&session_id)?.is_none() {
        return Err(ApiError::bad_request(
            "File must be saved before downloading",
        ));
    }
    let contents = state
        .registry
        .with_manager(&session_id, |manager| manager.read())??;
    Ok(Json(ReadCodeResponse { contents }))
}

async fn rename_file(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<RenameFileRequest>,
) -> Result<Json<BaseResponse>, ApiError> {
    state.authorize(&headers)?;
    let session_id = state.require_session(&headers)?;

    let prev_path = state.registry.manager_path(&session_id)?;
    state
        .registry
        .with_manager(&session_id, |manager| manager.rename(&body.filename))??;
    let new_path = state.registry.manager_path(&session_id)?;

    state.dispatcher.on_rename(
        &session_id,
        ConsumerId::from(&session_id),
        prev_path.as_deref(),
        new_path.as_deref(),
    )?;

    if let (Some(notebook_id), Some(user_id)) = (&body.notebook_id, &body.user_id) {
        state
            .remote
            .metadata
            .record_rename(notebook_id, user_id, &body.filename);
    }

    Ok(Json(BaseResponse::ok()))
}

async fn save(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<SaveNotebookRequest>,
) -> Result<String, ApiError> {
    state.authorize(&headers)?;
    let session_id = state.require_session(&headers)?;

    let contents = state
        .registry
        .with_manager(&session_id, |manager| manager.save(&body.contents))??;
    let path = state
        .registry
        .manager_path(&session_id)?
        .ok_or_else(|| ApiError::bad_request("notebook has no backing file"))?;
    state
        .dispatcher
        .on_save(&session_id, ConsumerId::from(&session_id), &path)?;

    if let (Some(notebook_id), Some(user_id)) = (&body.notebook_id, &body.user_id) {
        let artifacts = [
            ("notebook.py", contents.clone()),
            ("requirements.txt", body.requirements.join("\n")),
            ("script.py", body.codes.join("\n")),
        ];
        let mut stored_url = None;
        for (name, content) in &artifacts {
            let response = state
                .remote
                .blob
                .store(&format!("{user_id}/{notebook_id}/{name}"), content);
            if response.status_code != 200 {
                return Ok(format!(
                    "Failed to save notebook. Error: status {}",
                    response.status_code
                ));
            }
            if *name == "notebook.py" {
                stored_url = response.url;
            }
        }
        state
            .remote
            .metadata
            .record_save(notebook_id, user_id, stored_url.as_deref(), &body.filename);
    }

    Ok(contents)
}

async fn copy_notebook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<CopyNotebookRequest>,
) -> Result<String, ApiError> {
    state.authorize(&headers)?;
    let session_id = state.require_session(&headers)?;

    let contents = state
        .registry
        .with_manager(&session_id, |manager| manager.copy_to(&body.destination))??;
    let source = state
        .registry
        .manager_path(&session_id)?
        .ok_or_else(|| ApiError::bad_request("notebook has no backing file"))?;
    state.dispatcher.on_copy(
        &session_id,
        ConsumerId::from(&session_id),
        &source,
        std::path::Path::new(&body.destination),
    )?;

    Ok(contents)
}

async fn save_app_config(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<SaveAppConfigurationRequest>,
) -> Result<String, ApiError> {
    state.authorize(&headers)?;
    let session_id = state.require_session(&headers)?;

    let contents = state
        .registry
        .with_manager(&session_id, |manager| manager.save_app_config(&body.config))??;
    state.dispatcher.on_save_app_config(
        &session_id,
        ConsumerId::from(&session_id),
        body.config,
    )?;

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::{copy_notebook, read_code, rename_file, save, save_app_config};
    use crate::auth::EditToken;
    use crate::models::{
        CopyNotebookRequest, RenameFileRequest, SaveAppConfigurationRequest, SaveNotebookRequest,
    };
    use crate::state::{AppState, SharedState, SESSION_HEADER};
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::Json;
    use pretty_assertions::assert_eq;
    use quill_files::{AppConfig, FileRouter, ImportParams, RemoteSources, NEW_FILE_KEY};
    use quill_session::{ControlRequest, QueuedControlRequest, SessionId};
    use std::fs;
    use std::path::Path;
    use tokio::sync::mpsc::UnboundedReceiver;

    const NOTEBOOK: &str = "import quill\n\napp = quill.App()\n";

    fn session_headers(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, id.parse().unwrap());
        headers
    }

    fn state_with_session(
        key: &str,
    ) -> (SharedState, HeaderMap, UnboundedReceiver<QueuedControlRequest>) {
        let state = AppState::new(
            FileRouter::new_file(),
            RemoteSources::disabled(),
            EditToken::new(None),
        );
        let rx = state
            .open_session(
                SessionId::new("s-1"),
                key,
                &ImportParams::default(),
                false,
            )
            .unwrap();
        (state, session_headers("s-1"), rx)
    }

    #[tokio::test]
    async fn read_code_requires_a_saved_file() {
        let (state, headers, _rx) = state_with_session(NEW_FILE_KEY);
        let err = read_code(State(state), headers).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn read_code_requires_a_known_session() {
        let state = AppState::new(
            FileRouter::new_file(),
            RemoteSources::disabled(),
            EditToken::new(None),
        );
        let err = read_code(State(state), session_headers("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn read_code_returns_the_file_contents() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("nb.py");
        fs::write(&file, NOTEBOOK).unwrap();

        let (state, headers, _rx) = state_with_session(&file.display().to_string());
        let response = read_code(State(state), headers).await.unwrap();
        assert_eq!(response.0.contents, NOTEBOOK);
    }

    #[tokio::test]
    async fn missing_edit_capability_is_unauthorized() {
        let state = AppState::new(
            FileRouter::new_file(),
            RemoteSources::disabled(),
            EditToken::new(Some("s3cret".to_string())),
        );
        let err = read_code(State(state), HeaderMap::new()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rename_moves_the_file_and_dispatches() {
        let temp = tempfile::tempdir().unwrap();
        let old = temp.path().join("old.py");
        fs::write(&old, NOTEBOOK).unwrap();
        let new = temp.path().join("new.py");

        let (state, headers, mut rx) = state_with_session(&old.display().to_string());
        let body = RenameFileRequest {
            filename: new.display().to_string(),
            notebook_id: None,
            user_id: None,
        };
        let response = rename_file(State(state.clone()), headers, Json(body))
            .await
            .unwrap();

        assert!(response.0.success);
        assert!(!old.exists());
        assert!(new.exists());

        let queued = rx.recv().await.unwrap();
        assert_eq!(
            queued.request,
            ControlRequest::Rename {
                path: new.display().to_string()
            }
        );
        assert_eq!(queued.from_consumer.as_str(), "s-1");

        let recents = state.dispatcher.recent_files();
        assert_eq!(recents[0].path, new.display().to_string());
    }

    #[tokio::test]
    async fn save_writes_and_returns_plain_text() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("nb.py");
        fs::write(&file, "").unwrap();

        let (state, headers, mut rx) = state_with_session(&file.display().to_string());
        let body = SaveNotebookRequest {
            filename: "nb.py".to_string(),
            contents: NOTEBOOK.to_string(),
            codes: vec!["x = 1".to_string()],
            requirements: Vec::new(),
            notebook_id: None,
            user_id: None,
        };
        let returned = save(State(state), headers, Json(body)).await.unwrap();

        assert_eq!(returned, NOTEBOOK);
        assert_eq!(fs::read_to_string(&file).unwrap(), NOTEBOOK);
        assert!(matches!(
            rx.recv().await.unwrap().request,
            ControlRequest::Save { .. }
        ));
    }

    #[tokio::test]
    async fn copy_duplicates_the_notebook() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("nb.py");
        fs::write(&source, NOTEBOOK).unwrap();
        let destination = temp.path().join("nb_copy.py");

        let (state, headers, mut rx) = state_with_session(&source.display().to_string());
        let body = CopyNotebookRequest {
            source: source.display().to_string(),
            destination: destination.display().to_string(),
        };
        let contents = copy_notebook(State(state), headers, Json(body))
            .await
            .unwrap();

        assert_eq!(contents, NOTEBOOK);
        assert!(source.exists());
        assert!(destination.exists());
        assert!(matches!(
            rx.recv().await.unwrap().request,
            ControlRequest::Copy { .. }
        ));
    }

    #[tokio::test]
    async fn save_app_config_rewrites_the_declaration() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("nb.py");
        fs::write(&file, NOTEBOOK).unwrap();

        let (state, headers, mut rx) = state_with_session(&file.display().to_string());
        let body = SaveAppConfigurationRequest {
            config: AppConfig {
                width: Some("full".to_string()),
                app_title: None,
            },
        };
        let contents = save_app_config(State(state), headers, Json(body))
            .await
            .unwrap();

        assert!(contents.contains("app = quill.App(width=\"full\")"));
        assert!(matches!(
            rx.recv().await.unwrap().request,
            ControlRequest::SaveAppConfig { .. }
        ));
        assert!(Path::new(&file).exists());
    }
}
