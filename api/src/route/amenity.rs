use axum::{
    routing::{get, post},
    Router,
};
use registry::AppRegistry;

use crate::handler::amenity::{
    register_amenity, register_shift, register_unit, show_amenity, show_amenity_calendar,
    show_amenity_list, validate_reservation,
};

pub fn build_amenity_routers() -> Router<AppRegistry> {
    let amenities_routers = Router::new()
        .route("/", post(register_amenity))
        .route("/", get(show_amenity_list))
        .route("/:amenity_id", get(show_amenity))
        .route("/:amenity_id/calendar", get(show_amenity_calendar))
        .route("/:amenity_id/units", post(register_unit))
        .route("/:amenity_id/shifts", post(register_shift))
        .route(
            "/:amenity_id/reservations/validate",
            post(validate_reservation),
        );

    Router::new().nest("/amenities", amenities_routers)
}
