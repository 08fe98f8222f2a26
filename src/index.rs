//! Parsing of machine-readable index responses.
//!
//! Searching a keyserver with `op=index&options=mr` yields a plain
//! text listing, one line per record: a `pub` line for every primary
//! key, followed by `uid` lines for the User IDs bound to it.  Fields
//! are colon-separated.  See [Section 5.2 of the HKP draft].
//!
//!   [Section 5.2 of the HKP draft]: https://tools.ietf.org/html/draft-shaw-openpgp-hkp-00#section-5.2

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use percent_encoding::percent_decode_str;

use crate::Error;
use crate::Result;
use crate::types::PublicKeyAlgorithm;

/// A key listed in a machine-readable index.
///
/// Consists of the primary key and the User IDs bound to it, in
/// server-provided order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRecord {
    primary_key: PrimaryKeyInfo,
    user_ids: Vec<UserIdInfo>,
}

impl KeyRecord {
    /// Returns the primary key.
    pub fn primary_key(&self) -> &PrimaryKeyInfo {
        &self.primary_key
    }

    /// Returns the User IDs bound to the primary key.
    ///
    /// The order is the server's and is only meaningful for display.
    pub fn user_ids(&self) -> &[UserIdInfo] {
        &self.user_ids
    }
}

/// A primary key as listed in a machine-readable index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimaryKeyInfo {
    key_id: String,
    algorithm: PublicKeyAlgorithm,
    key_length: u32,
    creation: SystemTime,
    expiration: Option<SystemTime>,
    expired: bool,
    revoked: bool,
    disabled: bool,
}

impl PrimaryKeyInfo {
    fn parse<'a, I>(mut fields: I, t: SystemTime) -> Result<Self>
        where I: Iterator<Item = &'a str>
    {
        let key_id = fields.next().filter(|f| ! f.is_empty())
            .ok_or(Error::MalformedResponse)?;
        let algorithm = fields.next().ok_or(Error::MalformedResponse)?;
        let key_length = fields.next().ok_or(Error::MalformedResponse)?;
        let creation = fields.next().ok_or(Error::MalformedResponse)?;
        let expiration = fields.next().ok_or(Error::MalformedResponse)?;
        let flags = fields.next().ok_or(Error::MalformedResponse)?;

        let expiration = parse_expiration(expiration)?;
        Ok(PrimaryKeyInfo {
            key_id: key_id.to_uppercase(),
            algorithm: parse_u32(algorithm)?.into(),
            key_length: if key_length.is_empty() {
                0
            } else {
                parse_u32(key_length)?
            },
            creation: parse_epoch(creation)?,
            expiration,
            expired: expiration.map(|e| e <= t).unwrap_or(false),
            revoked: flags.contains('r'),
            disabled: flags.contains('d'),
        })
    }

    /// Returns the key ID.
    ///
    /// The hexadecimal identifier as reported by the server,
    /// upper-cased.  Depending on the server this may be a short ID,
    /// a long ID, or a full fingerprint.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the public key algorithm.
    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    /// Returns the numeric public key algorithm code.
    pub fn algorithm_id(&self) -> u32 {
        self.algorithm.into()
    }

    /// Returns the key length in bits.
    ///
    /// Zero if the server did not report a length.
    pub fn key_length(&self) -> u32 {
        self.key_length
    }

    /// Returns the creation time.
    pub fn creation(&self) -> SystemTime {
        self.creation
    }

    /// Returns the expiration time, if any.
    pub fn expiration(&self) -> Option<SystemTime> {
        self.expiration
    }

    /// Returns whether the key had expired at the reference time.
    ///
    /// Computed from [`PrimaryKeyInfo::expiration`] and the reference
    /// time passed to [`parse`], never taken from the server's flag
    /// field.
    pub fn expired(&self) -> bool {
        self.expired
    }

    /// Returns whether the key is revoked.
    pub fn revoked(&self) -> bool {
        self.revoked
    }

    /// Returns whether the key is disabled on this server.
    pub fn disabled(&self) -> bool {
        self.disabled
    }
}

/// A User ID as listed in a machine-readable index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIdInfo {
    user_id: String,
    creation: SystemTime,
    expiration: Option<SystemTime>,
    expired: bool,
    revoked: bool,
    disabled: bool,
}

impl UserIdInfo {
    fn parse<'a, I>(mut fields: I, t: SystemTime) -> Result<Self>
        where I: Iterator<Item = &'a str>
    {
        let user_id = fields.next().ok_or(Error::MalformedResponse)?;
        let creation = fields.next().ok_or(Error::MalformedResponse)?;
        let expiration = fields.next().ok_or(Error::MalformedResponse)?;
        let flags = fields.next().ok_or(Error::MalformedResponse)?;

        let user_id = percent_decode_str(user_id).decode_utf8()
            .map_err(|_| Error::UnsupportedEncoding)?
            .into_owned();

        let expiration = parse_expiration(expiration)?;
        Ok(UserIdInfo {
            user_id,
            creation: parse_epoch(creation)?,
            expiration,
            expired: expiration.map(|e| e <= t).unwrap_or(false),
            revoked: flags.contains('r'),
            disabled: flags.contains('d'),
        })
    }

    /// Returns the User ID, percent-decoded.
    ///
    /// By convention of the form `Name <email>`.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the creation time.
    pub fn creation(&self) -> SystemTime {
        self.creation
    }

    /// Returns the expiration time, if any.
    pub fn expiration(&self) -> Option<SystemTime> {
        self.expiration
    }

    /// Returns whether the User ID had expired at the reference time.
    ///
    /// Computed from [`UserIdInfo::expiration`] and the reference
    /// time passed to [`parse`], never taken from the server's flag
    /// field.
    pub fn expired(&self) -> bool {
        self.expired
    }

    /// Returns whether the User ID is revoked.
    pub fn revoked(&self) -> bool {
        self.revoked
    }

    /// Returns whether the User ID is disabled on this server.
    pub fn disabled(&self) -> bool {
        self.disabled
    }
}

/// Parses a machine-readable index response.
///
/// Returns the listed keys in server-provided order.  `t` is the
/// reference time for deciding whether keys and User IDs have
/// expired; `None` means the current time.
///
/// Lines that are neither `pub` nor `uid` records, like the `info`
/// header, are skipped.  A `uid` line before the first `pub` line,
/// and a record line with too few fields, fail the whole parse with
/// [`Error::MalformedResponse`].
///
/// # Examples
///
/// ```rust
/// # fn main() -> hkp_client::Result<()> {
/// let listing = "info:1:1\n\
///                pub:ABCD1234:1:2048:1000000000::\n\
///                uid:Alice%20%3Calice%40example.com%3E:1000000000::\n";
///
/// let keys = hkp_client::index::parse(listing, None)?;
/// assert_eq!(keys.len(), 1);
/// assert_eq!(keys[0].primary_key().key_id(), "ABCD1234");
/// assert_eq!(keys[0].user_ids()[0].user_id(),
///            "Alice <alice@example.com>");
/// # Ok(())
/// # }
/// ```
pub fn parse<T>(text: &str, t: T) -> Result<Vec<KeyRecord>>
    where T: Into<Option<SystemTime>>
{
    let t = t.into().unwrap_or_else(SystemTime::now);

    let mut records = Vec::new();
    let mut current: Option<KeyRecord> = None;

    for line in text.lines() {
        let mut fields = line.split(':');
        match fields.next() {
            Some("pub") => {
                if let Some(record) = current.take() {
                    records.push(record);
                }
                current = Some(KeyRecord {
                    primary_key: PrimaryKeyInfo::parse(fields, t)?,
                    user_ids: Vec::new(),
                });
            },
            Some("uid") => match current.as_mut() {
                Some(record) =>
                    record.user_ids.push(UserIdInfo::parse(fields, t)?),
                // An orphan User ID means we cannot tell which key
                // the following lines belong to.
                None => return Err(Error::MalformedResponse.into()),
            },
            // Info lines, comments, and whatever a future revision
            // of the protocol may add.
            _ => (),
        }
    }

    if let Some(record) = current.take() {
        records.push(record);
    }

    Ok(records)
}

fn parse_u32(field: &str) -> Result<u32> {
    field.parse().map_err(|_| Error::MalformedResponse.into())
}

fn parse_epoch(field: &str) -> Result<SystemTime> {
    if field.is_empty() {
        return Ok(UNIX_EPOCH);
    }

    let secs: u64 = field.parse().map_err(|_| Error::MalformedResponse)?;
    Ok(UNIX_EPOCH + Duration::from_secs(secs))
}

fn parse_expiration(field: &str) -> Result<Option<SystemTime>> {
    if field.is_empty() || field == "0" {
        return Ok(None);
    }

    parse_epoch(field).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn single_record() {
        let text = "pub:ABCD1234:1:2048:1000000000:0:\n\
                    uid:Alice%20%3Calice%40example.com%3E:1000000000::\n";
        let records = parse(text, None).unwrap();
        assert_eq!(records.len(), 1);

        let key = records[0].primary_key();
        assert_eq!(key.key_id(), "ABCD1234");
        assert_eq!(key.algorithm(), PublicKeyAlgorithm::RSAEncryptSign);
        assert_eq!(key.algorithm().to_string(), "RSA Encrypt or Sign");
        assert_eq!(key.algorithm_id(), 1);
        assert_eq!(key.key_length(), 2048);
        assert_eq!(key.creation(), epoch(1_000_000_000));
        assert_eq!(key.expiration(), None);
        assert!(! key.expired());
        assert!(! key.revoked());
        assert!(! key.disabled());

        let uids = records[0].user_ids();
        assert_eq!(uids.len(), 1);
        assert_eq!(uids[0].user_id(), "Alice <alice@example.com>");
        assert_eq!(uids[0].creation(), epoch(1_000_000_000));
        assert_eq!(uids[0].expiration(), None);
    }

    #[test]
    fn record_boundaries() {
        let text = "info:1:3\n\
                    pub:1111111111111111:1:2048:1000000000::\n\
                    uid:one:1000000000::\n\
                    uid:two:1000000000::\n\
                    pub:2222222222222222:17:1024:1000000000::\n\
                    pub:3333333333333333:19:256:1000000000::\n\
                    uid:three:1000000000::\n";
        let records = parse(text, None).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].user_ids().len(), 2);
        assert_eq!(records[1].user_ids().len(), 0);
        assert_eq!(records[2].user_ids().len(), 1);
        assert_eq!(records[1].primary_key().algorithm(),
                   PublicKeyAlgorithm::DSA);
    }

    #[test]
    fn orphan_user_id() {
        let err = parse("uid:orphan::\n", None).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(),
                         Some(Error::MalformedResponse)));
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse("", None).unwrap(), vec![]);
        assert_eq!(parse("\n\n", None).unwrap(), vec![]);
    }

    #[test]
    fn expired_is_computed_from_reference_time() {
        let text = "pub:ABCD1234:1:2048:1000000000:1100000000:\n\
                    uid:alice:1000000000:1100000000:\n";

        let records = parse(text, epoch(1_099_999_999)).unwrap();
        assert!(! records[0].primary_key().expired());
        assert!(! records[0].user_ids()[0].expired());

        // The expiration time itself counts as expired.
        let records = parse(text, epoch(1_100_000_000)).unwrap();
        assert!(records[0].primary_key().expired());
        assert!(records[0].user_ids()[0].expired());
    }

    #[test]
    fn expired_ignores_flag_field() {
        // An `e` flag on an unexpired key does not make it expired.
        let text = "pub:ABCD1234:1:2048:1000000000:4000000000:e\n";
        let records = parse(text, epoch(1_000_000_001)).unwrap();
        assert!(! records[0].primary_key().expired());
    }

    #[test]
    fn status_flags() {
        let text = "pub:ABCD1234:1:2048:1000000000::rd\n\
                    uid:alice:1000000000::r\n\
                    uid:bob:1000000000::d\n";
        let records = parse(text, None).unwrap();

        let key = records[0].primary_key();
        assert!(key.revoked());
        assert!(key.disabled());

        let uids = records[0].user_ids();
        assert!(uids[0].revoked() && ! uids[0].disabled());
        assert!(uids[1].disabled() && ! uids[1].revoked());
    }

    #[test]
    fn key_id_is_upper_cased() {
        let text = "pub:abcd1234ef567890:1:2048:1000000000::\n";
        let records = parse(text, None).unwrap();
        assert_eq!(records[0].primary_key().key_id(), "ABCD1234EF567890");
    }

    #[test]
    fn empty_key_length() {
        let text = "pub:ABCD1234:1::1000000000::\n";
        let records = parse(text, None).unwrap();
        assert_eq!(records[0].primary_key().key_length(), 0);
    }

    #[test]
    fn empty_creation() {
        let text = "pub:ABCD1234:1:2048:::\n";
        let records = parse(text, None).unwrap();
        assert_eq!(records[0].primary_key().creation(), UNIX_EPOCH);
    }

    #[test]
    fn crlf_line_endings() {
        let text = "pub:ABCD1234:1:2048:1000000000::\r\n\
                    uid:alice:1000000000::\r\n";
        let records = parse(text, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_ids()[0].user_id(), "alice");
    }

    #[test]
    fn unknown_lines_are_skipped() {
        let text = "info:1:1\n\
                    \n\
                    pub:ABCD1234:1:2048:1000000000::\n\
                    uat:255%20192:1000000000::\n\
                    uid:alice:1000000000::\n";
        let records = parse(text, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_ids().len(), 1);
    }

    #[test]
    fn short_pub_line() {
        let err = parse("pub:ABCD1234:1:2048\n", None).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(),
                         Some(Error::MalformedResponse)));
    }

    #[test]
    fn short_uid_line() {
        let text = "pub:ABCD1234:1:2048:1000000000::\n\
                    uid:alice:1000000000\n";
        let err = parse(text, None).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(),
                         Some(Error::MalformedResponse)));
    }

    #[test]
    fn empty_key_id() {
        let err = parse("pub::1:2048:1000000000::\n", None).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(),
                         Some(Error::MalformedResponse)));
    }

    #[test]
    fn bad_integer_fields() {
        for text in ["pub:ABCD1234:rsa:2048:1000000000::\n",
                     "pub:ABCD1234:1:2048:yesterday::\n",
                     "pub:ABCD1234:1:2048:1000000000:never:\n"] {
            let err = parse(text, None).unwrap_err();
            assert!(matches!(err.downcast_ref::<Error>(),
                             Some(Error::MalformedResponse)),
                    "{:?}", text);
        }
    }

    #[test]
    fn undecodable_user_id() {
        // %C3%28 is not valid UTF-8.
        let text = "pub:ABCD1234:1:2048:1000000000::\n\
                    uid:%C3%28:1000000000::\n";
        let err = parse(text, None).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(),
                         Some(Error::UnsupportedEncoding)));
    }

    #[test]
    fn stray_percent_decodes_to_itself() {
        let text = "pub:ABCD1234:1:2048:1000000000::\n\
                    uid:100%25%20organic:1000000000::\n\
                    uid:50% off:1000000000::\n";
        let records = parse(text, None).unwrap();
        let uids = records[0].user_ids();
        assert_eq!(uids[0].user_id(), "100% organic");
        assert_eq!(uids[1].user_id(), "50% off");
    }

    #[test]
    fn unknown_algorithm() {
        let text = "pub:ABCD1234:99:2048:1000000000::\n";
        let records = parse(text, None).unwrap();
        let key = records[0].primary_key();
        assert_eq!(key.algorithm(), PublicKeyAlgorithm::Unknown(99));
        assert_eq!(key.algorithm().to_string(), "Unknown");
        assert_eq!(key.algorithm_id(), 99);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let text = "pub:ABCD1234:1:2048:1000000000:::extension\n";
        let records = parse(text, None).unwrap();
        assert_eq!(records.len(), 1);
    }
}
