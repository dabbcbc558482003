use axum::{routing::post, Router};
use registry::AppRegistry;

use crate::handler::gate::operate_gate;

pub fn build_gate_routers() -> Router<AppRegistry> {
    Router::new().route("/gates/:gate/:action", post(operate_gate))
}
