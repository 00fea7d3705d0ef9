//! Token domain: redacted secrets, whole-record lifecycle, and bearer claim decoding.

pub mod claims;
pub mod record;
pub mod secret;

pub use claims::BearerClaims;
pub use record::{
	DEFAULT_SAFETY_MARGIN, TokenRecord, TokenRecordBuilder, TokenRecordBuilderError, TokenStatus,
};
pub use secret::TokenSecret;
