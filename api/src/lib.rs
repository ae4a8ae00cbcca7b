//! Modelyard API Module
//!
//! The API module provides the REST endpoints of the service: dataset
//! upload and management, model training, inference, and the model
//! registry listing.

pub mod handlers;
pub mod models;
pub mod server;

pub use handlers::*;
pub use models::*;
pub use server::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_creation() {
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            version: "1.0.0".to_string(),
        };

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_api_config_default_port() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
    }
}
