use axum::{Router, routing::post};
use crate::{AppState, controllers::alchemy_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/alchemy/webhook", post(alchemy_controller::post_alchemy_webhook))
}
