//! Form schema listing: which forms the assistant can fill and the spoken
//! phrases that drive them. The frontend uses this to render instructions;
//! the interpreter itself is the source of truth for the phrases.

use actix_web::HttpResponse;
use serde_json::json;

use crate::form::{DEFAULT_FORM, DEFAULT_FORM_FIELDS};

pub async fn list_forms() -> HttpResponse {
    let fields: Vec<serde_json::Value> = DEFAULT_FORM_FIELDS
        .iter()
        .map(|field| {
            json!({
                "name": field,
                "trigger_phrase": format!("{} is", field),
            })
        })
        .collect();

    HttpResponse::Ok().json(json!({
        "forms": [
            {
                "id": DEFAULT_FORM,
                "open_phrase": "fill a form",
                "submit_phrase": "submit",
                "fields": fields
            }
        ]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_list_forms_shape() {
        let response = list_forms().await;
        assert_eq!(response.status(), actix_web::http::StatusCode::OK);
    }
}
