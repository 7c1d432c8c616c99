//! Core types for relay.
//!
//! This crate contains shared data structures that are used across all relay crates:
//! - Actions, dispatch options and outcomes
//! - Error types
//! - Configuration types
//! - Local time-zone resolution
//! - Typed widget attributes and product configurator records

mod action;
mod attrs;
mod config;
mod configurator;
mod error;
mod timezone;

pub use action::{
    Action, ActionOutcome, DispatchOptions, DownloadReceipt, ErrorInfo, REPORT_DOWNLOAD_ACTION,
};
pub use attrs::{ButtonType, ColorAttrs, ControlPanelContext, FakeButtonAttrs, NoCreateFlags};
pub use config::{
    config_dir, config_path, ensure_config_dir, ClientConfig, DownloadConfig, ModalConfig,
    RelayConfig,
};
pub use configurator::{link_optional_products, products_to_records, ConfiguredProduct, LineRecord};
pub use error::{ConfigError, DispatchError, TransportError};
pub use timezone::{local_timezone, TimeZoneSource};
