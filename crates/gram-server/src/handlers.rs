//! Route handlers. Store work runs on the blocking pool; each mutation is a
//! single atomic store operation.

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use gram_core::api::{
    COMMENT_ADDED, CommentRequest, CommentResponse, CreateInitiativeResponse, INITIATIVE_CREATED,
    ImageResponse, VoteRequest,
};
use gram_core::error::EngagementError;
use gram_core::model::{Comment, InitiativeView, VoteTally};
use gram_core::service::{CreateInitiative, ImageUpload};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

async fn blocking<R, F>(f: F) -> Result<R, ApiError>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R, EngagementError> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Parse a JSON body; an empty body reads as the all-absent request.
fn json_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("invalid JSON body: {err}")))
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::bad_request(format!("invalid form data: {}", err.body_text()))
}

async fn field_text(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(multipart_error)
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_initiatives(
    State(state): State<AppState>,
) -> Result<Json<Vec<InitiativeView>>, ApiError> {
    let service = state.initiatives;
    let initiatives = blocking(move || service.list()).await?;
    Ok(Json(initiatives))
}

pub async fn create_initiative(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreateInitiativeResponse>), ApiError> {
    let mut request = CreateInitiative::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" | "name" => request.title = Some(field_text(field).await?),
            "description" => request.description = Some(field_text(field).await?),
            "creatorId" | "id" => request.creator_id = Some(field_text(field).await?),
            "image" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !bytes.is_empty() {
                    request.image = Some(ImageUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => debug!(field = %name, "ignoring unknown form field"),
        }
    }
    request.creator_id = auth.acting_user(request.creator_id)?;

    let service = state.initiatives;
    let initiative = blocking(move || service.create(request)).await?;
    info!(initiative_id = %initiative.id, creator = %initiative.creator, "initiative created");
    Ok((
        StatusCode::CREATED,
        Json(CreateInitiativeResponse {
            message: INITIATIVE_CREATED.to_string(),
            initiative,
        }),
    ))
}

pub async fn toggle_vote(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<VoteTally>, ApiError> {
    let request: VoteRequest = json_body(&body)?;
    let user = auth.acting_user(request.user_id)?;

    let votes = state.votes;
    let tally = blocking(move || votes.toggle(&id, user.as_deref())).await?;
    Ok(Json(tally))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let comments = state.comments;
    let listed = blocking(move || comments.list(&id)).await?;
    Ok(Json(listed))
}

pub async fn append_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let request: CommentRequest = json_body(&body)?;
    let author = auth.acting_user(request.user_id)?;
    let text = request.text;

    let comments = state.comments;
    let receipt =
        blocking(move || comments.append(&id, author.as_deref(), text.as_deref())).await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            message: COMMENT_ADDED.to_string(),
            comment: receipt.comment,
            comment_count: receipt.comment_count,
        }),
    ))
}

pub async fn image_url(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImageResponse>, ApiError> {
    let service = state.initiatives;
    let image_url = blocking(move || service.image_url(&id)).await?;
    Ok(Json(ImageResponse { image_url }))
}

#[cfg(test)]
mod tests {
    use super::json_body;
    use gram_core::api::{CommentRequest, VoteRequest};

    #[test]
    fn empty_body_reads_as_absent_fields() {
        let request: VoteRequest = json_body(b"").expect("empty");
        assert!(request.user_id.is_none());
        let request: CommentRequest = json_body(b"  \n").expect("blank");
        assert!(request.text.is_none());
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        let err = json_body::<VoteRequest>(b"{userId").expect_err("malformed");
        assert_eq!(err.status().as_u16(), 400);
    }
}
