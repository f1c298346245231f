use actix_web::{dev::Server, http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use kameo::actor::ActorRef;
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::sync::Arc;

use super::Metrics;
use crate::actors::{GetSystemHealth, HealthMonitorActor};
use crate::config::Secret;
use crate::domain::order::{NewOrder, OrderCommand, OrderCommandHandler, OrderError};
use crate::notifications::{NotificationStore, ToastQueue};
use crate::realtime::RawChange;
use crate::telegram::{InboundHandler, InboundMessage, TelegramRelay};

/// Everything the HTTP routes need. Optional parts are absent when the
/// matching feature is disabled (no bot token, or a role without in-app
/// notifications).
pub struct AppState {
    pub metrics: Arc<Metrics>,
    pub health: ActorRef<HealthMonitorActor>,
    pub orders: Arc<OrderCommandHandler>,
    pub relay: Option<Arc<TelegramRelay>>,
    pub inbound: Option<Arc<InboundHandler>>,
    pub notifications: Option<Arc<NotificationStore>>,
    pub toasts: Option<Arc<ToastQueue>>,
    /// Checked against `X-Telegram-Bot-Api-Secret-Token` when set
    pub telegram_webhook_secret: Option<Secret<String>>,
    /// Checked against `X-Order-Hook-Secret` when set
    pub order_hook_secret: Option<Secret<String>>,
}

pub const TELEGRAM_SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";
pub const ORDER_HOOK_SECRET_HEADER: &str = "X-Order-Hook-Secret";

/// Bind the HTTP server: metrics, health, order actions, Telegram hooks and
/// the in-app notification views. The caller drives the returned server and
/// stops it through its handle.
pub fn start_http_server(state: AppState, port: u16) -> std::io::Result<Server> {
    tracing::info!("📊 Starting HTTP server on http://0.0.0.0:{}", port);

    let state = web::Data::new(state);
    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(("0.0.0.0", port))?
        .disable_signals()
        .run();
    Ok(server)
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_handler))
        .route("/health", web::get().to(health_handler))
        .route("/orders", web::post().to(place_order))
        .route("/orders/{id}/advance", web::post().to(advance_order))
        .route("/hooks/order-changes", web::post().to(order_change_hook))
        .route("/telegram/webhook", web::post().to(telegram_webhook))
        .route("/notifications", web::get().to(list_notifications))
        .route("/notifications", web::delete().to(clear_notifications))
        .route("/notifications/read", web::post().to(mark_all_read))
        .route("/notifications/{id}/read", web::post().to(mark_read))
        .route("/notifications/{id}", web::delete().to(clear_notification))
        .route("/toasts", web::get().to(list_toasts));
}

/// No configured secret means the route is open
fn is_authorized(req: &HttpRequest, header: &str, expected: Option<&Secret<String>>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    req.headers()
        .get(header)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected.reveal().as_str())
}

fn error_json(status: StatusCode, message: impl ToString) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "error": message.to_string() }))
}

async fn metrics_handler(state: web::Data<AppState>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Could not encode metrics");
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, e);
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

async fn health_handler(state: web::Data<AppState>) -> impl Responder {
    match state.health.ask(GetSystemHealth).send().await {
        Ok(health) if health.overall_status.is_unhealthy() => {
            HttpResponse::ServiceUnavailable().json(health)
        }
        Ok(health) => HttpResponse::Ok().json(health),
        Err(_) => {
            tracing::error!("❌ Health monitor did not answer");
            error_json(StatusCode::SERVICE_UNAVAILABLE, "health monitor unavailable")
        }
    }
}

fn order_error_status(error: &OrderError) -> StatusCode {
    match error {
        OrderError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderError::InvalidState(_) => StatusCode::CONFLICT,
        OrderError::EmptyItems | OrderError::InvalidQuantity { .. } | OrderError::InvalidPrice { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        OrderError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn run_order_command(state: &AppState, command: OrderCommand) -> HttpResponse {
    let created = matches!(command, OrderCommand::PlaceOrder(_));
    match state.orders.handle(command).await {
        Ok(outcome) if created => HttpResponse::Created().json(outcome),
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => {
            if e.is_client_error() {
                tracing::info!(error = %e, "Order command rejected");
            } else {
                tracing::error!(error = %e, "❌ Order command failed");
            }
            error_json(order_error_status(&e), e)
        }
    }
}

async fn place_order(state: web::Data<AppState>, body: web::Json<NewOrder>) -> impl Responder {
    run_order_command(&state, OrderCommand::PlaceOrder(body.into_inner())).await
}

async fn advance_order(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    run_order_command(&state, OrderCommand::AdvanceStatus { order_id: path.into_inner() }).await
}

/// Push endpoint for database webhooks carrying `{type, record, old_record}`
async fn order_change_hook(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> impl Responder {
    if !is_authorized(&req, ORDER_HOOK_SECRET_HEADER, state.order_hook_secret.as_ref()) {
        tracing::warn!("Rejected order change hook with a missing or wrong secret");
        return error_json(StatusCode::UNAUTHORIZED, "invalid hook secret");
    }

    let raw = match std::str::from_utf8(&body).map_err(|e| e.to_string()).and_then(|text| {
        RawChange::parse(text).map_err(|e| e.to_string())
    }) {
        Ok(raw) => raw,
        Err(e) => return error_json(StatusCode::BAD_REQUEST, e),
    };

    let Some(relay) = &state.relay else {
        return HttpResponse::Ok().json(serde_json::json!({ "outcome": "disabled" }));
    };

    match relay.relay_raw(&raw).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => error_json(StatusCode::BAD_REQUEST, e),
    }
}

#[derive(Deserialize)]
struct WebhookUpdate {
    #[serde(default)]
    message: Option<InboundMessage>,
}

/// Always 200 for the Bot API so it does not redeliver. Calls without the
/// webhook secret are not from the Bot API and get 401.
async fn telegram_webhook(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> impl Responder {
    if !is_authorized(&req, TELEGRAM_SECRET_HEADER, state.telegram_webhook_secret.as_ref()) {
        tracing::warn!("Rejected Telegram webhook with a missing or wrong secret token");
        return error_json(StatusCode::UNAUTHORIZED, "invalid secret token");
    }

    let ok = HttpResponse::Ok().json(serde_json::json!({ "ok": true }));

    let Some(inbound) = &state.inbound else {
        tracing::debug!("Telegram webhook called while the bot is disabled");
        return ok;
    };

    match serde_json::from_slice::<WebhookUpdate>(&body) {
        Ok(WebhookUpdate { message: Some(message) }) => {
            let outcome = inbound.handle(&message).await;
            tracing::debug!(?outcome, "Handled Telegram webhook");
        }
        Ok(WebhookUpdate { message: None }) => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring malformed Telegram webhook body"),
    }

    ok
}

fn notifications_disabled() -> HttpResponse {
    error_json(StatusCode::NOT_FOUND, "in-app notifications are disabled for this role")
}

async fn list_notifications(state: web::Data<AppState>) -> impl Responder {
    match &state.notifications {
        Some(store) => HttpResponse::Ok().json(serde_json::json!({
            "unread_count": store.unread_count(),
            "notifications": store.notifications(),
        })),
        None => notifications_disabled(),
    }
}

async fn mark_read(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match &state.notifications {
        Some(store) => {
            store.mark_read(&path.into_inner());
            HttpResponse::NoContent().finish()
        }
        None => notifications_disabled(),
    }
}

async fn mark_all_read(state: web::Data<AppState>) -> impl Responder {
    match &state.notifications {
        Some(store) => {
            store.mark_all_read();
            HttpResponse::NoContent().finish()
        }
        None => notifications_disabled(),
    }
}

async fn clear_notification(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match &state.notifications {
        Some(store) => {
            store.clear(&path.into_inner());
            HttpResponse::NoContent().finish()
        }
        None => notifications_disabled(),
    }
}

async fn clear_notifications(state: web::Data<AppState>) -> impl Responder {
    match &state.notifications {
        Some(store) => {
            store.clear_all();
            HttpResponse::NoContent().finish()
        }
        None => notifications_disabled(),
    }
}

async fn list_toasts(state: web::Data<AppState>) -> impl Responder {
    match &state.toasts {
        Some(toasts) => HttpResponse::Ok().json(toasts.toasts()),
        None => notifications_disabled(),
    }
}
