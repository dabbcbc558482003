use super::{
    access::build_access_routers, amenity::build_amenity_routers,
    authorization::build_authorization_routers, gate::build_gate_routers,
    health::build_health_check_routers, reservation::build_reservation_routers,
};
use axum::Router;
use registry::AppRegistry;

pub fn routes() -> Router<AppRegistry> {
    let router = Router::new()
        .merge(build_authorization_routers())
        .merge(build_access_routers())
        .merge(build_gate_routers())
        .merge(build_amenity_routers())
        .merge(build_reservation_routers());
    Router::new()
        .merge(build_health_check_routers())
        .nest("/api/v1", router)
}
