//! Route handlers: the JSON document endpoints, rendered pages and static
//! assets.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use tracing::{debug, error, info, warn};

use super::{static_files, AppState};
use crate::api::{ErrorBody, SaveResponse, ADMIN_PAGE};
use crate::error::{Error, Result};
use crate::form::{apply, EditorAction, QuoteForm};
use crate::quote::Quote;
use crate::render::{render_editor, render_load_error, render_quote};
use crate::store::fingerprint;

/// Run blocking file work off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {e}")))?
}

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// GET `/api/data`: the stored document, byte for byte.
pub(crate) async fn data(State(state): State<AppState>) -> Response {
    let store = state.store.clone();
    match blocking(move || store.load_raw()).await {
        Ok(Some(bytes)) => {
            let etag = format!("\"{}\"", fingerprint(&bytes));
            (
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (header::ETAG, etag),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(None) => error_json(StatusCode::NOT_FOUND, "data.json not found"),
        Err(e) => {
            error!("Failed to read data file: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Status for a failed request; payload problems are the client's fault.
fn error_status(err: &Error) -> StatusCode {
    if err.is_client_error() {
        warn!("Rejected request: {}", err);
        StatusCode::BAD_REQUEST
    } else {
        error!("Request failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// POST `/api/save`: replace the stored document.
pub(crate) async fn save(State(state): State<AppState>, body: Bytes) -> Response {
    let store = state.store.clone();
    let result = match Quote::from_json_slice(&body) {
        Ok(quote) => blocking(move || store.save(&quote)).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(receipt) => {
            info!(
                bytes = receipt.bytes,
                fingerprint = %receipt.fingerprint,
                "Saved quote document"
            );
            Json(SaveResponse::saved(
                receipt.total,
                receipt.saved_at.to_rfc3339(),
            ))
            .into_response()
        }
        Err(e) => (error_status(&e), Json(SaveResponse::failed(e.to_string()))).into_response(),
    }
}

/// `/admin` and `/admin/` move permanently to the editor page.
pub(crate) async fn admin_redirect() -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, ADMIN_PAGE)]).into_response()
}

/// The quote sheet, rendered from the stored document.
pub(crate) async fn quote_page(State(state): State<AppState>) -> Response {
    let store = state.store.clone();
    match blocking(move || store.load()).await {
        Ok(Some(quote)) => Html(render_quote(&quote, &state.render)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Html(render_load_error("Error loading data", &state.render)),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to load quote document: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_load_error("Error loading data", &state.render)),
            )
                .into_response()
        }
    }
}

/// Editor state for the stored document, with a notice if it could not be read.
async fn stored_form(state: &AppState) -> (QuoteForm, Option<String>) {
    let store = state.store.clone();
    match blocking(move || store.load()).await {
        Ok(Some(quote)) => (apply(&quote), None),
        Ok(None) => (QuoteForm::default(), None),
        Err(e) => {
            warn!("Editor opened without stored data: {}", e);
            (QuoteForm::default(), Some(format!("Error loading data: {e}")))
        }
    }
}

/// The editor, populated from the stored document.
pub(crate) async fn editor_page(State(state): State<AppState>) -> Response {
    let (form, notice) = stored_form(&state).await;
    Html(render_editor(&form, &state.render, notice.as_deref())).into_response()
}

/// Editor submission: a row edit, a reset or a save.
pub(crate) async fn editor_submit(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let (mut form, action) = match QuoteForm::from_fields(&fields) {
        Ok(parsed) => parsed,
        Err(e) => {
            let form = QuoteForm::from_known_fields(&fields);
            return (
                error_status(&e),
                Html(render_editor(&form, &state.render, Some(&e.to_string()))),
            )
                .into_response();
        }
    };

    match action {
        EditorAction::Save => {}
        EditorAction::Reset => {
            debug!("Editor reset to stored document");
            let (form, notice) = stored_form(&state).await;
            return Html(render_editor(&form, &state.render, notice.as_deref())).into_response();
        }
        other => {
            debug!("Editor action {}", other.value());
            form.perform(other);
            return Html(render_editor(&form, &state.render, None)).into_response();
        }
    }

    let quote = form.collect();
    let store = state.store.clone();
    match blocking(move || store.save(&quote)).await {
        Ok(receipt) => {
            info!(total = receipt.total, "Saved quote from editor");
            Redirect::to("/").into_response()
        }
        Err(e) => (
            error_status(&e),
            Html(render_editor(
                &form,
                &state.render,
                Some(&format!("Error saving data: {e}")),
            )),
        )
            .into_response(),
    }
}

/// Everything else is looked up under the static root.
pub(crate) async fn static_asset(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(path) = static_files::resolve(&state.static_dir, uri.path()) else {
        warn!("Refused path outside static root: {}", uri.path());
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, static_files::content_type(&path))],
            bytes,
        )
            .into_response(),
        Err(e) => {
            debug!("Static lookup {} failed: {}", path.display(), e);
            (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "text/plain")],
                "404 Not Found",
            )
                .into_response()
        }
    }
}
