use std::sync::Arc;

use adapter::{
    database::ConnectionPool,
    notification::WebhookNotificationService,
    repository::{
        access_event::AccessEventRepositoryImpl, amenity::AmenityRepositoryImpl,
        authorization::AuthorizationRepositoryImpl, config::ConfigRepositoryImpl,
        health::HealthCheckRepositoryImpl, reservation::ReservationRepositoryImpl,
        resident::ResidentRepositoryImpl,
    },
};
use kernel::notification::NotificationService;
use kernel::repository::{
    access_event::AccessEventRepository, amenity::AmenityRepository,
    authorization::AuthorizationRepository, config::ConfigRepository,
    health::HealthCheckRepository, reservation::ReservationRepository,
    resident::ResidentRepository,
};
use shared::config::AppConfig;

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    config_repository: Arc<dyn ConfigRepository>,
    resident_repository: Arc<dyn ResidentRepository>,
    authorization_repository: Arc<dyn AuthorizationRepository>,
    access_event_repository: Arc<dyn AccessEventRepository>,
    amenity_repository: Arc<dyn AmenityRepository>,
    reservation_repository: Arc<dyn ReservationRepository>,
    notification_service: Arc<dyn NotificationService>,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, app_config: &AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let config_repository: Arc<dyn ConfigRepository> =
            Arc::new(ConfigRepositoryImpl::new(pool.clone()));
        let resident_repository = Arc::new(ResidentRepositoryImpl::new(pool.clone()));
        let authorization_repository = Arc::new(AuthorizationRepositoryImpl::new(
            pool.clone(),
            config_repository.clone(),
        ));
        let access_event_repository = Arc::new(AccessEventRepositoryImpl::new(pool.clone()));
        let amenity_repository = Arc::new(AmenityRepositoryImpl::new(pool.clone()));
        let reservation_repository = Arc::new(ReservationRepositoryImpl::new(pool.clone()));
        let notification_service = Arc::new(WebhookNotificationService::new(
            app_config.notification.webhook_url.clone(),
        ));
        Self {
            health_check_repository,
            config_repository,
            resident_repository,
            authorization_repository,
            access_event_repository,
            amenity_repository,
            reservation_repository,
            notification_service,
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn config_repository(&self) -> Arc<dyn ConfigRepository> {
        self.config_repository.clone()
    }

    pub fn resident_repository(&self) -> Arc<dyn ResidentRepository> {
        self.resident_repository.clone()
    }

    pub fn authorization_repository(&self) -> Arc<dyn AuthorizationRepository> {
        self.authorization_repository.clone()
    }

    pub fn access_event_repository(&self) -> Arc<dyn AccessEventRepository> {
        self.access_event_repository.clone()
    }

    pub fn amenity_repository(&self) -> Arc<dyn AmenityRepository> {
        self.amenity_repository.clone()
    }

    pub fn reservation_repository(&self) -> Arc<dyn ReservationRepository> {
        self.reservation_repository.clone()
    }

    pub fn notification_service(&self) -> Arc<dyn NotificationService> {
        self.notification_service.clone()
    }
}
