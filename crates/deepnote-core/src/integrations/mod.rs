//! Integration configurations: types, validation, legacy upgrades, the
//! registry and project detection.

pub mod detector;
pub mod legacy;
pub mod schema;
pub mod storage;
pub mod types;

pub use detector::IntegrationDetector;
pub use storage::{IntegrationStorage, INTEGRATION_INDEX_KEY, INTEGRATION_SERVICE_NAME};
pub use types::{
    DatabaseType, IntegrationConfig, IntegrationMetadata, IntegrationStatus, IntegrationType,
    IntegrationWithStatus, DATAFRAME_SQL_INTEGRATION_ID,
};
