//! Types shared between the admin-console client library and the apps that
//! drive it: domain identifiers, wire-level request/response structs for the
//! remote admin REST API, and the API's error-body shape.

pub mod domain;
pub mod error;
pub mod protocol;
