//! Querying and publishing OpenPGP keys over the network.
//!
//! This crate provides access to keyservers using the [HKP] protocol:
//! searching the server's index, retrieving ASCII armored keys, and
//! submitting keys.  Machine-readable index responses are parsed into
//! structured records by the [`index`] module.
//!
//! [HKP]: https://tools.ietf.org/html/draft-shaw-openpgp-hkp-00
//!
//! # Examples
//!
//! This example demonstrates how to search the default key server:
//!
//! ```no_run
//! # use hkp_client::{KeyServer, Result};
//! # async fn f() -> Result<()> {
//! let ks = KeyServer::default();
//! for record in ks.search("alice@example.org").await? {
//!     let key = record.primary_key();
//!     println!("{} {} {}bit", key.key_id(), key.algorithm(),
//!              key.key_length());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Re-exports of crates that we use in our API.
pub use reqwest;

use percent_encoding::{percent_encode, AsciiSet, CONTROLS};

use reqwest::{
    StatusCode,
    Url,
};

#[macro_use] mod macros;
pub mod index;
pub mod types;

pub use crate::index::{KeyRecord, PrimaryKeyInfo, UserIdInfo};
pub use crate::types::PublicKeyAlgorithm;

/// <https://url.spec.whatwg.org/#fragment-percent-encode-set>
const KEYSERVER_ENCODE_SET: &AsciiSet =
    // Formerly DEFAULT_ENCODE_SET
    &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'<').add(b'>').add(b'`')
    .add(b'?').add(b'{').add(b'}')
    // The SKS keyserver as of version 1.1.6 is a bit picky with
    // respect to the encoding.
    .add(b'-').add(b'+').add(b'/');

/// For accessing keyservers using HKP.
#[derive(Clone)]
pub struct KeyServer {
    client: reqwest::Client,
    /// The original URL given to the constructor.
    url: Url,
    /// The URL we use for the requests.
    request_url: Url,
}

assert_send_and_sync!(KeyServer);

impl Default for KeyServer {
    fn default() -> Self {
        Self::new("hkps://keys.openpgp.org/").unwrap()
    }
}

impl KeyServer {
    /// Returns a handle for the given URL.
    ///
    /// `url` must use the `hkp:` or `hkps:` scheme; the port defaults
    /// to 11371 respectively 443.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Returns a handle for the given URL with a custom `Client`.
    ///
    /// Timeouts, proxies, and TLS configuration are the client's
    /// business.
    pub fn with_client(url: &str, client: reqwest::Client) -> Result<Self> {
        let url = Url::parse(url)?;

        let (scheme, default_port) = match url.scheme() {
            "hkp" => ("http", 11371),
            "hkps" => ("https", 443),
            _ => return Err(Error::MalformedUrl.into()),
        };

        let request_url =
            format!("{}://{}:{}", scheme,
                    url.host().ok_or(Error::MalformedUrl)?,
                    url.port().unwrap_or(default_port))
            .parse()?;

        Ok(KeyServer { client, url, request_url })
    }

    /// Returns the keyserver's base URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Searches the keyserver for keys matching `query`.
    ///
    /// Issues an `op=index` lookup and parses the machine-readable
    /// response into [`KeyRecord`]s, in server-provided order.
    ///
    /// # Warning
    ///
    /// The records are server-provided metadata.  They must be
    /// mistrusted: retrieve the key material itself and verify it
    /// before relying on anything reported here.
    pub async fn search(&self, query: &str) -> Result<Vec<KeyRecord>> {
        if query.is_empty() {
            return Err(Error::InvalidArgument(
                "query must not be empty".into()).into());
        }

        let url = self.request_url.join(
            &format!("pks/lookup?op=index&options=mr&search={}",
                     percent_encode(query.as_bytes(),
                                    KEYSERVER_ENCODE_SET)))?;

        tracing::debug!(%url, "searching keyserver");
        let res = self.client.get(url).send().await?;
        match res.status() {
            StatusCode::OK =>
                index::parse(&res.text().await?, None),
            StatusCode::NOT_FOUND => Err(Error::NotFound.into()),
            n => Err(Error::HttpStatus(n).into()),
        }
    }

    /// Retrieves the key with the given handle.
    ///
    /// `handle` may be a short key ID, a long key ID, or a
    /// fingerprint; it is forwarded to the server as-is.  Returns the
    /// ASCII armored key material, unparsed.
    ///
    /// # Warning
    ///
    /// Returned keys must be mistrusted, and be carefully interpreted
    /// under a policy and trust model.
    pub async fn get(&self, handle: &str) -> Result<String> {
        if handle.is_empty() {
            return Err(Error::InvalidArgument(
                "key handle must not be empty".into()).into());
        }

        let url = self.request_url.join(
            &format!("pks/lookup?op=get&options=mr&search={}", handle))?;

        tracing::debug!(%url, "retrieving key");
        let res = self.client.get(url).send().await?;
        match res.status() {
            StatusCode::OK => Ok(res.text().await?),
            StatusCode::NOT_FOUND => Err(Error::NotFound.into()),
            n => Err(Error::HttpStatus(n).into()),
        }
    }

    /// Sends the given ASCII armored key to the server.
    ///
    /// The key text is passed through as-is; it is not parsed or
    /// validated locally.
    pub async fn send(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument(
                "key text must not be empty".into()).into());
        }

        let url = self.request_url.join("pks/add")?;

        // Prepare to send url-encoded data.
        let mut post_data = b"keytext=".to_vec();
        post_data.extend_from_slice(
            percent_encode(key.as_bytes(), KEYSERVER_ENCODE_SET)
                .collect::<String>().as_bytes());
        let length = post_data.len();

        tracing::debug!(%url, length, "submitting key");
        let res = self.client.post(url)
            .header("content-type", "application/x-www-form-urlencoded")
            .header("content-length", length.to_string())
            .body(post_data).send().await?;

        match res.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::ProtocolViolation.into()),
            n => Err(Error::HttpStatus(n).into()),
        }
    }
}

/// Results for hkp-client.
pub type Result<T> = ::std::result::Result<T, anyhow::Error>;

#[derive(thiserror::Error, Debug)]
/// Errors returned from the keyserver routines.
#[non_exhaustive]
pub enum Error {
    /// A requested key was not found.
    #[error("Key not found")]
    NotFound,
    /// A given keyserver URL was malformed.
    #[error("Malformed URL; expected hkp: or hkps:")]
    MalformedUrl,
    /// The server provided malformed data.
    #[error("Malformed response from server")]
    MalformedResponse,
    /// A User ID could not be percent-decoded to text.
    #[error("Unsupported encoding in User ID")]
    UnsupportedEncoding,
    /// An invalid argument was given.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A communication partner violated the protocol.
    #[error("Protocol violation")]
    ProtocolViolation,
    /// Encountered an unexpected low-level http status.
    #[error("server returned status {0}")]
    HttpStatus(StatusCode),
    /// A `url::ParseError` occurred.
    #[error(transparent)]
    UrlError(#[from] url::ParseError),
    /// A `reqwest::Error` occurred.
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
}
