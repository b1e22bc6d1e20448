use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Form, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::{
    io::AsyncReadExt,
    sync::mpsc,
    time::{Duration, sleep},
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    camera::{
        ffmpeg_backend::STREAM_BOUNDARY,
        image::{CapturedImage, PLACEHOLDER_URL},
        jpeg::LatestFrame,
        service::StreamSession,
    },
    core::{errors::AppError, state::CameraStatus},
    form::{FieldErrors, FormValues},
    location::Location,
};

use super::page::{self, Notice, PageView};

const GRAB_ATTEMPTS: usize = 5;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct StatusResponse {
    camera: CameraStatus,
    location: Location,
    captured: bool,
}

#[derive(Deserialize)]
pub struct DataUrlUpload {
    data_url: String,
}

#[derive(Serialize)]
pub struct CaptureResponse {
    mime: String,
    bytes: usize,
}

async fn render_page(
    state: &AppState,
    values: &FormValues,
    errors: &FieldErrors,
    notice: Option<Notice>,
) -> Html<String> {
    let camera = state.camera.lock().await.status();
    let location = state.location.current().await;
    let preview_url = state.preview_url().await;

    Html(page::render(&PageView {
        app_name: &state.config.app_name,
        submitter: state.pipeline.submitter().display_name(),
        preview_url: &preview_url,
        camera: &camera,
        location: &location,
        values,
        errors,
        notice: notice.as_ref(),
    }))
}

/// Gives a cancelled feed a moment to exit so the device is free again.
async fn wait_for_stream_release(state: &AppState) {
    for _ in 0..20 {
        let stream_active = {
            let camera = state.camera.lock().await;
            camera.is_stream_active()
        };
        if !stream_active {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
}

fn is_device_busy(err: &anyhow::Error) -> bool {
    format!("{err:#}").to_lowercase().contains("resource busy")
}

pub async fn root(State(state): State<Arc<AppState>>) -> Html<String> {
    render_page(&state, &FormValues::default(), &FieldErrors::default(), None).await
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let camera = state.camera.lock().await.status();
    Json(StatusResponse {
        camera,
        location: state.location.current().await,
        captured: state.captured().await.is_some(),
    })
}

pub async fn location(State(state): State<Arc<AppState>>) -> Json<Location> {
    Json(state.location.current().await)
}

pub async fn capture_start(
    State(state): State<Arc<AppState>>,
    Form(values): Form<FormValues>,
) -> Html<String> {
    {
        let mut camera = state.camera.lock().await;
        camera.start();
    }
    info!("camera start requested");

    let notice = match state.location.resolve().await {
        Ok(_pending_fix) => None,
        Err(err) => {
            warn!("{err}");
            Some(Notice::Alert(err.to_string()))
        }
    };
    render_page(&state, &values, &FieldErrors::default(), notice).await
}

pub async fn capture_end(
    State(state): State<Arc<AppState>>,
    Form(values): Form<FormValues>,
) -> Html<String> {
    {
        let mut camera = state.camera.lock().await;
        camera.stop();
    }
    wait_for_stream_release(&state).await;
    state.clear_latest_stream_frame().await;
    info!("camera end requested");

    render_page(&state, &values, &FieldErrors::default(), None).await
}

pub async fn capture_toggle(
    State(state): State<Arc<AppState>>,
    Form(values): Form<FormValues>,
) -> Html<String> {
    let facing = {
        let mut camera = state.camera.lock().await;
        camera.toggle_facing()
    };
    wait_for_stream_release(&state).await;
    state.clear_latest_stream_frame().await;
    info!("camera switched to {} device", facing.label());

    let notice = Notice::Info(format!("Switched to the {} camera.", facing.label()));
    render_page(&state, &values, &FieldErrors::default(), Some(notice)).await
}

pub async fn capture_snap(
    State(state): State<Arc<AppState>>,
    Form(values): Form<FormValues>,
) -> Html<String> {
    let streamed_frame = state.latest_stream_frame().await;

    let mut outcome = Ok(None);
    for attempt in 1..=GRAB_ATTEMPTS {
        outcome = {
            let camera = state.camera.lock().await;
            camera.capture(streamed_frame.clone()).await
        };
        match &outcome {
            Err(err) if is_device_busy(err) && attempt < GRAB_ATTEMPTS => {
                sleep(Duration::from_millis(150)).await;
            }
            _ => break,
        }
    }

    let notice = match outcome {
        Ok(Some(image)) => {
            info!("captured {} bytes", image.byte_len());
            state.set_captured(image).await;
            None
        }
        Ok(None) => Some(Notice::Info(
            "No frame available yet, nothing was captured.".to_owned(),
        )),
        Err(err) if is_device_busy(&err) => {
            warn!("capture gave up on a busy device: {err:#}");
            Some(Notice::Alert(
                "The camera is busy. Close other camera apps and capture again.".to_owned(),
            ))
        }
        Err(err) => {
            warn!("capture failed: {err:#}");
            Some(Notice::Alert(format!("Capture failed: {err:#}")))
        }
    };
    render_page(&state, &values, &FieldErrors::default(), notice).await
}

pub async fn capture_data_url(
    State(state): State<Arc<AppState>>,
    Json(upload): Json<DataUrlUpload>,
) -> Result<Json<CaptureResponse>, AppError> {
    let image = CapturedImage::from_data_url(&upload.data_url)
        .map_err(|err| AppError::new(StatusCode::BAD_REQUEST, err.to_string()))?;

    let response = CaptureResponse {
        mime: image.mime().to_owned(),
        bytes: image.byte_len(),
    };
    info!("fallback image stored: {} ({} bytes)", response.mime, response.bytes);
    state.set_captured(image).await;
    Ok(Json(response))
}

pub async fn preview(State(state): State<Arc<AppState>>) -> Response {
    let Some(image) = state.captured().await else {
        return Redirect::to(PLACEHOLDER_URL).into_response();
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(image.mime())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    (StatusCode::OK, headers, image.data().clone()).into_response()
}

pub async fn stream(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let permit = state
        .stream_limit
        .clone()
        .try_acquire_owned()
        .map_err(|_| AppError::new(StatusCode::LOCKED, "single-client mode: stream busy"))?;

    let session = {
        let mut camera = state.camera.lock().await;
        camera.open_stream_session().await.map_err(|err| {
            AppError::new(
                StatusCode::CONFLICT,
                format!("camera cannot stream: {err:#}"),
            )
        })?
    };
    let StreamSession {
        mut child,
        mut cancel_rx,
        lease,
    } = session;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::internal("missing ffmpeg stdout pipe for stream"))?;
    let content_type =
        HeaderValue::from_str(&format!("multipart/x-mixed-replace; boundary={STREAM_BOUNDARY}"))
            .map_err(|err| AppError::internal(format!("invalid stream content type: {err}")))?;

    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(8);
    let task_state = state.clone();
    tokio::spawn(async move {
        let mut buffer = vec![0_u8; 16 * 1024];
        let mut frames = LatestFrame::new();
        loop {
            tokio::select! {
                changed = cancel_rx.changed() => {
                    if changed.is_ok() && *cancel_rx.borrow() {
                        info!("stream cancelled");
                    }
                    break;
                }
                _ = tx.closed() => {
                    info!("stream client disconnected");
                    break;
                }
                read = stdout.read(&mut buffer) => {
                    match read {
                        Ok(0) => break,
                        Ok(n) => {
                            task_state.update_activity().await;
                            if let Some(frame) = frames.push_chunk(&buffer[..n]) {
                                task_state.set_latest_stream_frame(frame).await;
                            }
                            if tx.send(Ok(Bytes::copy_from_slice(&buffer[..n]))).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            let _ = tx.send(Err(err)).await;
                            break;
                        }
                    }
                }
            }
        }

        if let Err(err) = child.kill().await {
            warn!("failed to kill ffmpeg stream child: {err}");
        }
        task_state.clear_latest_stream_frame().await;
        drop(lease);
        drop(permit);
        info!("stream session closed after {} frames", frames.frames_seen());
    });

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok((
        StatusCode::OK,
        headers,
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response())
}

pub async fn submit_tree(
    State(state): State<Arc<AppState>>,
    Form(values): Form<FormValues>,
) -> Result<Response, AppError> {
    if let Err(errors) = values.check() {
        info!("tree submission blocked by validation");
        let page = render_page(&state, &values, &errors, None).await;
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let picture = state.captured().await;
    let location = state.location.current().await;
    let submission = state
        .pipeline
        .submit(picture.as_ref(), &location, &values)
        .await?;

    let page = match submission {
        Some(submission) => {
            let notice = Notice::Info(format!(
                "Tree \"{}\" submitted (record {}).",
                values.name, submission.tree_id
            ));
            render_page(
                &state,
                &FormValues::default(),
                &FieldErrors::default(),
                Some(notice),
            )
            .await
        }
        None => {
            let notice = Notice::Alert("Capture a picture before submitting.".to_owned());
            render_page(&state, &values, &FieldErrors::default(), Some(notice)).await
        }
    };
    Ok(page.into_response())
}
