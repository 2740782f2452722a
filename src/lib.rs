//! Simple client for manipulating a user's Goodreads library.
//!
//! An API key is needed and OAuth has to be configured for the account
//! beforehand; see the Goodreads API docs for instructions. Plain
//! lookups authenticate with the API key alone, writes are signed with
//! OAuth 1.0a.
//!
//! ```no_run
//! use goodreads::{Credentials, GoodreadsClient};
//!
//! # fn main() -> Result<(), goodreads::Error> {
//! let client = GoodreadsClient::new(Credentials {
//!     api_key: "api-key".to_string(),
//!     api_key_secret: "api-key-secret".to_string(),
//!     user_id: "12345".to_string(),
//!     oauth_token: "token".to_string(),
//!     oauth_token_secret: "token-secret".to_string(),
//! })?;
//!
//! let book_id = client.book_id_by_isbn("9780451526533")?;
//! client.mark_book_owned(&book_id, "2012-03-01")?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod oauth;

mod util;
mod xml;

pub use client::{Credentials, GoodreadsClient};
pub use error::Error;
pub use oauth::{AccessToken, Consumer, RequestSigner};
