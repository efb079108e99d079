//! SQL connection plumbing: descriptor building and environment materialization.

pub mod connection;
pub mod env_vars;

pub use connection::{to_connection_descriptor, ConnectionDescriptor, ParamStyle};
pub use env_vars::{env_var_name, EnvironmentChange, EnvironmentVariablesProvider};
