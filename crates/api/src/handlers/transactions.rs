use actix_web::{web, HttpResponse};
use idena_watch_domain::model::Notification;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::query::{handle_query, QueryArgs};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QueryResponse {
    pub notifications: Vec<Notification>,
}

pub async fn transactions_handler(
    state: web::Data<AppState>,
    payload: web::Json<QueryRequest>,
) -> HttpResponse {
    let args = QueryArgs::parse(&payload.args);
    let notifications = handle_query(&args, state.api(), state.query()).await;

    let mode = args.mode().as_ref().to_owned();
    let status = if notifications.iter().any(Notification::is_error) {
        "error"
    } else {
        "ok"
    };
    counter!("api_query_requests_total", "mode" => mode, "status" => status).increment(1);

    HttpResponse::Ok().json(QueryResponse { notifications })
}
