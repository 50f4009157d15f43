//! Word dictionary API handlers.
//!
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/words \
//!   -H "Content-Type: application/json" \
//!   -d '{"word": "lantern"}'
//! curl http://localhost:6969/api/v1/words/lantern
//! curl -X DELETE http://localhost:6969/api/v1/words/lantern
//! ```

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use super::{AppState, request_id::RequestId, sessions::ApiError};

#[derive(Debug, Deserialize)]
pub struct AddWordRequest {
    pub word: String,
}

/// Dictionary operation outcome
#[derive(Debug, Serialize)]
pub struct WordResponse {
    pub word: String,
    /// add: newly inserted; remove: was present; check: is present
    pub result: bool,
}

/// Add a word to the dictionary.
///
/// `result` is false when the word was already present.
pub async fn add_word(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(request): Json<AddWordRequest>,
) -> Result<Json<WordResponse>, ApiError> {
    let added = state.registry.add_word(&request.word).await?;
    tracing::info!(
        request_id = %request_id.as_str(),
        word = %request.word,
        added,
        "Word added"
    );
    Ok(Json(WordResponse {
        word: request.word,
        result: added,
    }))
}

/// Remove a word from the dictionary.
pub async fn remove_word(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(word): Path<String>,
) -> Result<Json<WordResponse>, ApiError> {
    let removed = state.registry.remove_word(&word).await?;
    tracing::info!(
        request_id = %request_id.as_str(),
        word = %word,
        removed,
        "Word removed"
    );
    Ok(Json(WordResponse {
        word,
        result: removed,
    }))
}

/// Check whether a word is in the dictionary.
pub async fn check_word(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<Json<WordResponse>, ApiError> {
    let present = state.registry.check_word(&word).await?;
    Ok(Json(WordResponse {
        word,
        result: present,
    }))
}
