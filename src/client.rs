use log::{debug, trace};
use once_cell::unsync::OnceCell;
use std::thread;
use std::time::Duration;
use url::Url;

use crate::error::Error;
use crate::oauth::{AccessToken, Consumer};
use crate::{util, xml};

const SITE: &str = "http://www.goodreads.com";

const ISBN_TO_ID_PATH: &str = "/book/isbn_to_id";
const REVIEW_SHOW_PATH: &str = "/review/show_by_user_and_book.xml";
const OWNED_BOOKS_PATH: &str = "/owned_books.xml";
const REVIEW_PATH: &str = "/review.xml";

/// Plain GETs carry this timeout; signed calls use the HTTP client's
/// stock configuration.
const GET_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed pause before the write of a lookup-then-write operation, to
/// stay under the API rate limit.
const RATE_LIMIT_PAUSE: Duration = Duration::from_secs(1);

/// API credentials for one user: the application key pair plus the
/// user's id and OAuth token pair. Token acquisition happens elsewhere;
/// see the Goodreads API docs for obtaining these.
pub struct Credentials {
    pub api_key: String,
    pub api_key_secret: String,
    pub user_id: String,
    pub oauth_token: String,
    pub oauth_token_secret: String,
}

/// Client for manipulating one user's Goodreads library.
///
/// All calls are synchronous and single-attempt; failures propagate to
/// the caller. The OAuth [`Consumer`] and [`AccessToken`] are built on
/// first use and reused for every later signed request.
pub struct GoodreadsClient {
    credentials: Credentials,
    site: Url,
    http: reqwest::blocking::Client,
    consumer: OnceCell<Consumer>,
    access_token: OnceCell<AccessToken>,
}

impl GoodreadsClient {
    pub fn new(credentials: Credentials) -> Result<Self, Error> {
        let site = Url::parse(SITE)?;
        let http = reqwest::blocking::Client::builder()
            .timeout(GET_TIMEOUT)
            .build()?;
        Ok(GoodreadsClient {
            credentials,
            site,
            http,
            consumer: OnceCell::new(),
            access_token: OnceCell::new(),
        })
    }

    /// The memoized OAuth consumer for this client.
    pub fn consumer(&self) -> &Consumer {
        self.consumer.get_or_init(|| {
            Consumer::new(
                self.credentials.api_key.as_str(),
                self.credentials.api_key_secret.as_str(),
                self.site.clone(),
            )
        })
    }

    /// The memoized access token, built from the memoized consumer.
    pub fn access_token(&self) -> &AccessToken {
        self.access_token.get_or_init(|| {
            AccessToken::new(
                self.consumer().clone(),
                self.credentials.oauth_token.as_str(),
                self.credentials.oauth_token_secret.as_str(),
            )
        })
    }

    /// Look up a book's Goodreads id by ISBN. The response body is the
    /// id as plain text, returned as-is.
    pub fn book_id_by_isbn(&self, isbn: &str) -> Result<String, Error> {
        self.get_text(self.isbn_lookup_url(isbn)?)
    }

    /// Find the id of this user's review for a book, if one exists.
    pub fn review_id_for_book(&self, book_id: &str) -> Result<Option<String>, Error> {
        let body = self.get_text(self.review_show_url(book_id)?)?;
        Ok(xml::first_review_id(&body)?)
    }

    /// Add a book to the owned-books shelf. An unparseable
    /// `purchase_date` is sent as an empty field rather than rejected.
    pub fn mark_book_owned(&self, book_id: &str, purchase_date: &str) -> Result<(), Error> {
        let form = owned_book_form(book_id, purchase_date);
        self.access_token().post(OWNED_BOOKS_PATH, &form)?;
        Ok(())
    }

    /// Post a new review for the book with the given ISBN. Resolves the
    /// book id first, then pauses before the write.
    pub fn add_review_for_isbn(
        &self,
        isbn: &str,
        review: &str,
        read_at: &str,
        rating: u8,
    ) -> Result<(), Error> {
        let book_id = self.book_id_by_isbn(isbn)?;
        pace();
        let form = new_review_form(&book_id, review, read_at, rating);
        self.access_token().post(REVIEW_PATH, &form)?;
        Ok(())
    }

    /// Replace the user's existing review of a book. Fails with
    /// [`Error::ReviewNotFound`] when the user has no review for it.
    pub fn update_review_for_book(
        &self,
        book_id: &str,
        review: &str,
        read_at: &str,
        rating: u8,
    ) -> Result<(), Error> {
        let review_id = self.review_id_for_book(book_id)?.ok_or_else(|| {
            Error::ReviewNotFound {
                book_id: book_id.to_string(),
            }
        })?;
        pace();
        let form = review_update_form(review, read_at, rating);
        self.access_token().put(&review_update_path(&review_id), &form)?;
        Ok(())
    }

    fn isbn_lookup_url(&self, isbn: &str) -> Result<Url, Error> {
        self.site_url(
            ISBN_TO_ID_PATH,
            &[("isbn", isbn), ("key", &self.credentials.api_key)],
        )
    }

    fn review_show_url(&self, book_id: &str) -> Result<Url, Error> {
        self.site_url(
            REVIEW_SHOW_PATH,
            &[
                ("user_id", &self.credentials.user_id),
                ("book_id", book_id),
                ("key", &self.credentials.api_key),
            ],
        )
    }

    fn site_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = self.site.join(path)?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    fn get_text(&self, url: Url) -> Result<String, Error> {
        debug!("GET {}", url.path());
        let body = self.http.get(url).send()?.error_for_status()?.text()?;
        Ok(body)
    }
}

fn pace() {
    trace!("pausing {:?} before the write", RATE_LIMIT_PAUSE);
    thread::sleep(RATE_LIMIT_PAUSE);
}

fn owned_book_form(book_id: &str, purchase_date: &str) -> Vec<(&'static str, String)> {
    vec![
        ("owned_book[book_id]", book_id.to_string()),
        (
            "owned_book[original_purchase_date]",
            util::date_field(purchase_date),
        ),
    ]
}

fn new_review_form(
    book_id: &str,
    review: &str,
    read_at: &str,
    rating: u8,
) -> Vec<(&'static str, String)> {
    vec![
        ("book_id", book_id.to_string()),
        ("review[review]", review.to_string()),
        ("review[read_at]", util::date_field(read_at)),
        ("review[rating]", rating.to_string()),
    ]
}

fn review_update_form(review: &str, read_at: &str, rating: u8) -> Vec<(&'static str, String)> {
    vec![
        ("review[review]", review.to_string()),
        ("review[read_at]", util::date_field(read_at)),
        ("review[rating]", rating.to_string()),
    ]
}

fn review_update_path(review_id: &str) -> String {
    format!("/review/{}.xml", review_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoodreadsClient {
        GoodreadsClient::new(Credentials {
            api_key: "api-key".to_string(),
            api_key_secret: "api-key-secret".to_string(),
            user_id: "12345".to_string(),
            oauth_token: "token".to_string(),
            oauth_token_secret: "token-secret".to_string(),
        })
        .unwrap()
    }

    fn query_pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn isbn_lookup_url_carries_isbn_and_key() {
        let url = client().isbn_lookup_url("0451526538").unwrap();
        assert_eq!(url.domain(), Some("www.goodreads.com"));
        assert_eq!(url.path(), "/book/isbn_to_id");
        assert_eq!(
            query_pairs(&url),
            vec![
                ("isbn".to_string(), "0451526538".to_string()),
                ("key".to_string(), "api-key".to_string()),
            ]
        );
    }

    #[test]
    fn review_show_url_carries_user_book_and_key() {
        let url = client().review_show_url("50").unwrap();
        assert_eq!(url.path(), "/review/show_by_user_and_book.xml");
        assert_eq!(
            query_pairs(&url),
            vec![
                ("user_id".to_string(), "12345".to_string()),
                ("book_id".to_string(), "50".to_string()),
                ("key".to_string(), "api-key".to_string()),
            ]
        );
    }

    #[test]
    fn owned_book_form_keeps_unparseable_date_empty() {
        let form = owned_book_form("123", "not-a-date");
        assert_eq!(form[0], ("owned_book[book_id]", "123".to_string()));
        assert_eq!(
            form[1],
            ("owned_book[original_purchase_date]", String::new())
        );
    }

    #[test]
    fn owned_book_form_normalizes_parseable_date() {
        let form = owned_book_form("123", "March 1, 2012");
        assert_eq!(
            form[1],
            ("owned_book[original_purchase_date]", "2012-03-01".to_string())
        );
    }

    #[test]
    fn new_review_form_fields() {
        let form = new_review_form("77", "great read", "2012/03/01", 5);
        assert_eq!(
            form,
            vec![
                ("book_id", "77".to_string()),
                ("review[review]", "great read".to_string()),
                ("review[read_at]", "2012-03-01".to_string()),
                ("review[rating]", "5".to_string()),
            ]
        );
    }

    #[test]
    fn review_update_path_contains_the_review_id() {
        assert_eq!(review_update_path("348104812"), "/review/348104812.xml");
    }

    #[test]
    fn consumer_is_memoized() {
        let client = client();
        let first = client.consumer() as *const Consumer;
        let second = client.consumer() as *const Consumer;
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn access_token_is_memoized() {
        let client = client();
        let first = client.access_token() as *const AccessToken;
        let second = client.access_token() as *const AccessToken;
        assert!(std::ptr::eq(first, second));
    }
}
