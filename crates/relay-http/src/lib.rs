//! HTTP download transport for relay.
//!
//! `HttpDownloadTransport` posts a report request as a form, recognizes the
//! service's error envelope and streams attachments into the output directory.

pub mod response;
pub mod transport;

pub use response::{fallback_file_name, file_name_from_disposition, parse_error_envelope};
pub use transport::HttpDownloadTransport;
