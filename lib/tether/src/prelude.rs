//! Prelude module for convenient imports.
//!
//! ```ignore
//! use tether::prelude::*;
//! ```

pub use crate::filters::{LoggingFilter, TimeoutFilter};
pub use crate::{
    ApiCall, Client, ClientBuilder, Endpoint, Error, Filter, Headers, LoginProvider, Method, Next,
    Outcome, Request, Response, ResponseFuture, ResponseMeta, Result, User, filter_fn,
};
pub use serde::{Deserialize, Serialize};
