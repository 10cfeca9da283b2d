use std::sync::Arc;

use senselearn_application::EmailService;
use senselearn_infrastructure::ConsoleEmailService;

use crate::api_config::EmailProviderConfig;

pub fn build_email_service(config: &EmailProviderConfig) -> Arc<dyn EmailService> {
    match config {
        EmailProviderConfig::Console { from_address } => {
            Arc::new(ConsoleEmailService::new(from_address.clone()))
        }
    }
}
