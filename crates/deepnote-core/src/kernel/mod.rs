//! Kernel-facing integration: code run inside the kernel process at startup.

pub mod startup;

pub use startup::{
    build_startup_code, KernelContext, SqlIntegrationStartupCodeProvider, DEEPNOTE_NOTEBOOK_TYPE,
};
