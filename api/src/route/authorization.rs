use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::authorization::{
    cancel_authorization, extend_authorization, issue_authorization, show_authorization,
    show_authorization_list, sweep_authorizations,
};

pub fn build_authorization_routers() -> Router<AppRegistry> {
    let authorizations_routers = Router::new()
        .route("/", post(issue_authorization))
        .route("/", get(show_authorization_list))
        .route("/sweep", post(sweep_authorizations))
        .route("/:code", get(show_authorization))
        .route("/:code/extend", post(extend_authorization))
        .route("/:code/cancel", post(cancel_authorization));

    Router::new().nest("/authorizations", authorizations_routers)
}
