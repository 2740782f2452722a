use thiserror::Error;

/// Errors surfaced by [`GoodreadsClient`](crate::GoodreadsClient).
///
/// Network failures, timeouts and non-2xx statuses arrive as the
/// underlying library errors, unmodified. Malformed user-supplied dates
/// are not errors; they fall back to an empty form field.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// Updating a review requires one to exist for the book already.
    #[error("no existing review for book {book_id}")]
    ReviewNotFound { book_id: String },
}
