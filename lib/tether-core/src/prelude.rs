//! Prelude module for convenient imports.
//!
//! ```ignore
//! use tether_core::prelude::*;
//! ```

pub use crate::{
    ContentType, Error, Headers, Method, Payload, Request, RequestBuilder, Response,
    ResponseFuture, ResponseMeta, Result, StatusCode, Transport, from_json, to_json,
    transport_fn,
};
