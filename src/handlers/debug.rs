//! Debug endpoints for exercising the command interpreter without a
//! microphone or a speech service connection.
//!
//! Useful for development and for latency probes that drive the form
//! tracker with plain text commands.

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::form::{handle_command, Action, FormSession};
use crate::state::AppState;

/// Request to run a sequence of commands through a scratch session.
#[derive(Debug, Deserialize)]
pub struct InterpretRequest {
    /// Commands applied in order to a fresh session
    pub commands: Vec<String>,
}

/// One interpreted step: the command and the action it produced.
#[derive(Debug, Serialize)]
pub struct InterpretStep {
    pub command: String,
    pub action: Action,
}

/// Response from the interpret endpoint.
#[derive(Debug, Serialize)]
pub struct InterpretResponse {
    pub steps: Vec<InterpretStep>,
    pub final_session: FormSession,
}

/// Run a command script through a fresh session.
///
/// POST /debug/interpret
/// Body: {"commands": ["I want to fill a form", "my name is John"]}
pub async fn interpret_commands(
    state: web::Data<AppState>,
    req: web::Json<InterpretRequest>,
) -> ActixResult<HttpResponse, AppError> {
    if req.commands.is_empty() {
        return Err(AppError::BadRequest("commands must not be empty".to_string()));
    }

    let mut session = FormSession::new();
    let mut steps = Vec::with_capacity(req.commands.len());

    for command in &req.commands {
        let action = handle_command(&mut session, command);
        state.record_form_action(&action);
        tracing::debug!(command = %command, action = ?action, "Debug: interpreted command");
        steps.push(InterpretStep {
            command: command.clone(),
            action,
        });
    }

    Ok(HttpResponse::Ok().json(InterpretResponse {
        steps,
        final_session: session,
    }))
}

/// Get debug info about the environment and configuration.
///
/// GET /debug/environment
pub async fn debug_environment(state: web::Data<AppState>) -> ActixResult<HttpResponse, AppError> {
    let config = state.get_config();

    let env_info = serde_json::json!({
        "gemini_api_key": if std::env::var("GEMINI_API_KEY").is_ok() { "set" } else { "not set" },
        "speech_model": config.speech.model,
        "speech_base_url": config.speech.base_url,
        "http_proxy": std::env::var("HTTP_PROXY").unwrap_or_else(|_| "not set".to_string()),
        "https_proxy": std::env::var("HTTPS_PROXY").unwrap_or_else(|_| "not set".to_string()),
        "no_proxy": std::env::var("NO_PROXY").unwrap_or_else(|_| "not set".to_string()),
    });

    Ok(HttpResponse::Ok().json(env_info))
}

/// Configuration for debug routes.
pub fn configure_debug_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/debug")
            .route("/interpret", web::post().to(interpret_commands))
            .route("/environment", web::get().to(debug_environment)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[actix_web::test]
    async fn test_interpret_runs_full_script() {
        let state = web::Data::new(AppState::new(AppConfig::default()));
        let req = web::Json(InterpretRequest {
            commands: vec![
                "I want to fill a form".to_string(),
                "my name is John Smith".to_string(),
                "please submit".to_string(),
            ],
        });

        let response = interpret_commands(state.clone(), req).await.unwrap();
        assert_eq!(response.status(), actix_web::http::StatusCode::OK);

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.forms_opened, 1);
        assert_eq!(snapshot.fields_captured, 1);
        assert_eq!(snapshot.forms_submitted, 1);
    }

    #[actix_web::test]
    async fn test_interpret_rejects_empty_script() {
        let state = web::Data::new(AppState::new(AppConfig::default()));
        let req = web::Json(InterpretRequest { commands: vec![] });

        assert!(interpret_commands(state, req).await.is_err());
    }
}
