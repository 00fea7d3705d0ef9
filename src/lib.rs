//! Bearer-token schedule proxy for the Connect portal—refresh-token renewal, single-slot
//! caching, and graceful fallback behind one small HTTP surface.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

#[cfg(feature = "server")] pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod portal;
pub mod schedule;
#[cfg(feature = "server")] pub mod server;
pub mod store;
pub mod token;
pub mod upstream;

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "server")] pub use axum;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(feature = "server")] use {clap as _, tracing_subscriber as _};
#[cfg(test)] use httpmock as _;
