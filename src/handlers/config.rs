use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "speech": {
                "model": config.speech.model,
                "base_url": config.speech.base_url,
                "connect_timeout_ms": config.speech.connect_timeout_ms,
                "prewarm": config.speech.prewarm
            },
            "audio": {
                "sample_rate": config.audio.sample_rate,
                "channels": config.audio.channels
            },
            "performance": {
                "max_concurrent_sessions": config.performance.max_concurrent_sessions
            }
        }
    })))
}

pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config.update_from_json(&json_str).map_err(|e| {
        AppError::ValidationError(e.to_string())
    })?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": {
            "server": {
                "host": current_config.server.host,
                "port": current_config.server.port
            },
            "speech": {
                "model": current_config.speech.model,
                "base_url": current_config.speech.base_url,
                "connect_timeout_ms": current_config.speech.connect_timeout_ms,
                "prewarm": current_config.speech.prewarm
            },
            "audio": {
                "sample_rate": current_config.audio.sample_rate,
                "channels": current_config.audio.channels
            },
            "performance": {
                "max_concurrent_sessions": current_config.performance.max_concurrent_sessions
            }
        }
    })))
}
