use axum::{Router, routing::post};
use crate::{AppState, controllers::cron_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/cron/reminders", post(cron_controller::post_reminders))
        .route("/cron/price-alerts", post(cron_controller::post_price_alerts))
        .route("/cron/events", post(cron_controller::post_events))
}
