use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::access::{
    match_face, match_plate, record_access_event, show_access_event_list, verify_access,
};

pub fn build_access_routers() -> Router<AppRegistry> {
    let access_routers = Router::new()
        .route("/verify", post(verify_access))
        .route(
            "/events",
            get(show_access_event_list).post(record_access_event),
        )
        .route("/recognition/face", post(match_face))
        .route("/recognition/plate", post(match_plate));

    Router::new().nest("/access", access_routers)
}
