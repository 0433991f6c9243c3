//! HTTP request handlers
//!
//! Mutations are fire-and-forget on the queue protocol, so they answer
//! `202 Accepted` whether or not the authority ends up applying them.
//! Clients read the queue afterwards to see the outcome.

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vq_common::events::{DeviceEvent, PlaybackPhase};
use vq_common::{Direction, PlayerId, QueueConfiguration};

use crate::api::AppState;
use crate::error::Error;
use crate::peer::Peer;
use crate::playback::{DeviceCommand, SimulatedDevice};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

pub(crate) type ApiError = (StatusCode, Json<StatusResponse>);
type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    id: PlayerId,
    #[serde(default)]
    elevated: bool,
}

#[derive(Debug, Deserialize)]
pub struct ElevatedRequest {
    elevated: bool,
}

#[derive(Debug, Deserialize)]
pub struct QueueVideoRequest {
    url: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    direction: Direction,
}

#[derive(Debug, Deserialize)]
pub struct ConfigRequest {
    per_user_limit: Option<i64>,
    per_user_limit_enabled: Option<bool>,
    custom_url_input_enabled: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    authority: Option<PlayerId>,
    peers: Vec<PeerInfo>,
    elevated: Vec<PlayerId>,
}

#[derive(Debug, Serialize)]
pub struct PeerInfo {
    id: PlayerId,
    is_authority: bool,
    revision: u64,
    queued_count: usize,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    peer: PlayerId,
    revision: u64,
    capacity: usize,
    config: QueueConfiguration,
    phase: PlaybackPhase,
    video_owner: Option<PlayerId>,
    waiting_for_playback: bool,
    can_queue: bool,
    can_queue_custom_videos: bool,
    entries: Vec<QueueEntryInfo>,
}

/// One occupied slot with the viewing peer's permission hints
#[derive(Debug, Serialize)]
pub struct QueueEntryInfo {
    index: usize,
    url: String,
    title: String,
    queued_by: PlayerId,
    can_remove: bool,
    can_move_up: bool,
    can_move_down: bool,
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    peer: PlayerId,
    is_owner: bool,
    now_playing: Option<String>,
    commands: Vec<DeviceCommand>,
}

// ============================================================================
// Helpers
// ============================================================================

fn status(code: StatusCode, status: impl Into<String>) -> (StatusCode, Json<StatusResponse>) {
    (
        code,
        Json(StatusResponse {
            status: status.into(),
        }),
    )
}

pub(crate) fn error_response(e: Error) -> ApiError {
    let code = match &e {
        Error::UnknownPeer(_) => StatusCode::NOT_FOUND,
        Error::DuplicatePeer(_) => StatusCode::CONFLICT,
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::Common(_) | Error::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    status(code, e.to_string())
}

/// Apply one peer call and let the session settle
async fn mutate<F>(
    state: &AppState,
    id: PlayerId,
    apply: F,
) -> ApiResult<(StatusCode, Json<StatusResponse>)>
where
    F: FnOnce(&mut Peer<SimulatedDevice>),
{
    let mut session = state.session.lock().await;
    let peer = session.peer_mut(id).map_err(error_response)?;
    apply(peer);
    let delivered = session.pump();
    debug!("Delivered {} frames", delivered);
    Ok(status(StatusCode::ACCEPTED, "accepted"))
}

// ============================================================================
// Session
// ============================================================================

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.session.lock().await;
    let peers = session
        .peers()
        .map(|peer| PeerInfo {
            id: peer.id(),
            is_authority: peer.is_authority(),
            revision: peer.state().revision(),
            queued_count: peer.queued_count(),
        })
        .collect();
    Json(SessionResponse {
        authority: session.authority(),
        peers,
        elevated: session.roster().elevated().collect(),
    })
}

/// POST /peers
pub async fn join_peer(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    let mut session = state.session.lock().await;
    session
        .join(
            req.id,
            req.elevated,
            SimulatedDevice::new(format!("player {}", req.id)),
        )
        .map_err(error_response)?;
    session.pump();
    Ok(status(StatusCode::CREATED, "joined"))
}

/// DELETE /peers/:id
pub async fn leave_peer(
    State(state): State<AppState>,
    Path(id): Path<PlayerId>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    let mut session = state.session.lock().await;
    session.leave(id).map_err(error_response)?;
    session.pump();
    Ok(status(StatusCode::OK, "left"))
}

/// POST /peers/:id/elevated
pub async fn set_elevated(
    State(state): State<AppState>,
    Path(id): Path<PlayerId>,
    Json(req): Json<ElevatedRequest>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    let mut session = state.session.lock().await;
    session.set_elevated(id, req.elevated).map_err(error_response)?;
    Ok(status(StatusCode::OK, "ok"))
}

// ============================================================================
// Queue
// ============================================================================

/// GET /peers/:id/queue
pub async fn get_queue(
    State(state): State<AppState>,
    Path(id): Path<PlayerId>,
) -> ApiResult<Json<QueueResponse>> {
    let session = state.session.lock().await;
    let roster = session.roster();
    let peer = session.peer(id).map_err(error_response)?;
    let replica = peer.state();

    let entries = replica
        .slots()
        .iter()
        .enumerate()
        .map(|(index, slot)| QueueEntryInfo {
            index,
            url: slot.url.to_string(),
            title: slot.title.clone(),
            queued_by: slot.queued_by,
            can_remove: peer.is_permitted_to_remove(id, index, roster),
            can_move_up: peer.is_able_to_move(id, index, Direction::Up, roster),
            can_move_down: peer.is_able_to_move(id, index, Direction::Down, roster),
        })
        .collect();

    Ok(Json(QueueResponse {
        peer: id,
        revision: replica.revision(),
        capacity: replica.slots().capacity(),
        config: replica.config().clone(),
        phase: replica.playback().phase(),
        video_owner: replica.playback().video_owner(),
        waiting_for_playback: replica.playback().is_waiting_for_playback(),
        can_queue: peer.is_permitted_to_queue(id, roster),
        can_queue_custom_videos: peer.is_permitted_to_queue_custom_videos(id, roster),
        entries,
    }))
}

/// POST /peers/:id/queue
pub async fn queue_video(
    State(state): State<AppState>,
    Path(id): Path<PlayerId>,
    Json(req): Json<QueueVideoRequest>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    info!("Player {} queue request: {}", id, req.url);
    mutate(&state, id, |peer| peer.queue_video(req.url.as_str(), req.title)).await
}

/// DELETE /peers/:id/queue/:index
pub async fn remove_video(
    State(state): State<AppState>,
    Path((id, index)): Path<(PlayerId, usize)>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    mutate(&state, id, |peer| peer.remove_video(index)).await
}

/// POST /peers/:id/queue/:index/move
pub async fn move_video(
    State(state): State<AppState>,
    Path((id, index)): Path<(PlayerId, usize)>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    mutate(&state, id, |peer| peer.move_video(index, req.direction)).await
}

/// POST /peers/:id/queue/clear
pub async fn clear_queue(
    State(state): State<AppState>,
    Path(id): Path<PlayerId>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    mutate(&state, id, |peer| peer.clear()).await
}

/// POST /peers/:id/config
pub async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<PlayerId>,
    Json(req): Json<ConfigRequest>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    if req.per_user_limit.is_none()
        && req.per_user_limit_enabled.is_none()
        && req.custom_url_input_enabled.is_none()
    {
        return Err(status(StatusCode::BAD_REQUEST, "no settings given"));
    }

    mutate(&state, id, |peer| {
        if let Some(limit) = req.per_user_limit {
            peer.set_per_user_limit(limit);
        }
        if let Some(enabled) = req.per_user_limit_enabled {
            peer.set_per_user_limit_enabled(enabled);
        }
        if let Some(enabled) = req.custom_url_input_enabled {
            peer.set_custom_url_input_enabled(enabled);
        }
    })
    .await
}

// ============================================================================
// Device
// ============================================================================

/// GET /peers/:id/device
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<PlayerId>,
) -> ApiResult<Json<DeviceResponse>> {
    let session = state.session.lock().await;
    let peer = session.peer(id).map_err(error_response)?;
    let device = peer.device();
    Ok(Json(DeviceResponse {
        peer: id,
        is_owner: device.is_owner(),
        now_playing: device.now_playing().map(ToString::to_string),
        commands: device.commands().to_vec(),
    }))
}

/// POST /peers/:id/device/:event
pub async fn device_event(
    State(state): State<AppState>,
    Path((id, event)): Path<(PlayerId, String)>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    let event = DeviceEvent::from_str(&event)
        .map_err(|e| error_response(Error::BadRequest(e.to_string())))?;
    mutate(&state, id, |peer| peer.relay_device_event(event)).await
}
