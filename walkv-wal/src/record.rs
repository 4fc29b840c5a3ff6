//! WAL record types.
//!
//! Each record occupies exactly one newline-terminated line:
//!
//! ```text
//! TRANSACTION <tid> BEGIN
//! SET <key> <value>
//! TRANSACTION <tid> COMMIT
//! ```
//!
//! The key is a single token; the value is the remainder of the line after
//! the separating space and may itself contain spaces.

use crate::error::WalError;
use std::fmt;
use std::str::FromStr;

/// Transaction identifier. Always positive.
pub type TxnId = u64;

/// Largest id a record may carry. `TxnId::MAX` is never valid, so the
/// successor of any id read from the log still fits.
pub const MAX_TXN_ID: TxnId = TxnId::MAX - 1;

const TRANSACTION: &str = "TRANSACTION";
const BEGIN: &str = "BEGIN";
const COMMIT: &str = "COMMIT";
const SET_PREFIX: &str = "SET ";

/// A single WAL record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Opens transaction `tid`.
    Begin { tid: TxnId },
    /// Pending write inside the open transaction.
    Set { key: String, value: String },
    /// Commits transaction `tid`.
    Commit { tid: TxnId },
}

impl LogRecord {
    /// Builds the Begin/Set/Commit triple that frames a single write.
    pub fn transaction(tid: TxnId, key: &str, value: &str) -> [LogRecord; 3] {
        [
            LogRecord::Begin { tid },
            LogRecord::Set {
                key: key.to_string(),
                value: value.to_string(),
            },
            LogRecord::Commit { tid },
        ]
    }

    /// Returns the transaction id carried by Begin and Commit records.
    pub fn tid(&self) -> Option<TxnId> {
        match self {
            LogRecord::Begin { tid } | LogRecord::Commit { tid } => Some(*tid),
            LogRecord::Set { .. } => None,
        }
    }

    /// Encodes the record as a newline-terminated line.
    pub fn encode(&self) -> String {
        let mut line = self.to_string();
        line.push('\n');
        line
    }

    /// Parses a single line (without its trailing newline).
    ///
    /// The returned [`WalError::Format`] carries line 0; readers fill in the
    /// real position.
    pub fn parse(line: &str) -> Result<Self, WalError> {
        if let Some(rest) = line.strip_prefix(SET_PREFIX) {
            let (key, value) = rest
                .split_once(' ')
                .ok_or_else(|| malformed("SET record without value separator"))?;
            if key.is_empty() {
                return Err(malformed("SET record with empty key"));
            }
            if forbidden_key_char(key).is_some() {
                return Err(malformed("SET record with invalid key"));
            }
            return Ok(LogRecord::Set {
                key: key.to_string(),
                value: value.to_string(),
            });
        }

        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(TRANSACTION) {
            return Err(malformed("unrecognized record"));
        }
        let tid = tokens
            .next()
            .and_then(|t| t.parse::<TxnId>().ok())
            .filter(|&tid| tid > 0 && tid <= MAX_TXN_ID)
            .ok_or_else(|| malformed("missing or invalid transaction id"))?;
        let record = match tokens.next() {
            Some(BEGIN) => LogRecord::Begin { tid },
            Some(COMMIT) => LogRecord::Commit { tid },
            Some(other) => return Err(malformed(&format!("unknown marker '{}'", other))),
            None => return Err(malformed("missing BEGIN/COMMIT marker")),
        };
        if tokens.next().is_some() {
            return Err(malformed("trailing data after marker"));
        }
        Ok(record)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogRecord::Begin { tid } => write!(f, "{} {} {}", TRANSACTION, tid, BEGIN),
            LogRecord::Set { key, value } => write!(f, "{}{} {}", SET_PREFIX, key, value),
            LogRecord::Commit { tid } => write!(f, "{} {} {}", TRANSACTION, tid, COMMIT),
        }
    }
}

impl FromStr for LogRecord {
    type Err = WalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn malformed(reason: &str) -> WalError {
    WalError::Format {
        line: 0,
        reason: reason.to_string(),
    }
}

/// Checks that a key/value pair can be framed unambiguously in both the WAL
/// and the `key=value` snapshot format.
///
/// Keys must be non-empty and free of whitespace, `=` and control
/// characters. Values must not contain line breaks.
pub fn check_entry(key: &str, value: &str) -> Result<(), WalError> {
    if key.is_empty() {
        return Err(WalError::InvalidRecord("key must not be empty".to_string()));
    }
    if let Some(c) = forbidden_key_char(key) {
        return Err(WalError::InvalidRecord(format!(
            "key '{}' contains forbidden character {:?}",
            key.escape_debug(),
            c
        )));
    }
    if value.contains(['\n', '\r']) {
        return Err(WalError::InvalidRecord(format!(
            "value for key '{}' contains a line break",
            key
        )));
    }
    Ok(())
}

fn forbidden_key_char(key: &str) -> Option<char> {
    key.chars().find(|c| c.is_whitespace() || c.is_control() || *c == '=')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_formats() {
        assert_eq!(
            LogRecord::Begin { tid: 7 }.encode(),
            "TRANSACTION 7 BEGIN\n"
        );
        assert_eq!(
            LogRecord::Set {
                key: "a".to_string(),
                value: "1".to_string()
            }
            .encode(),
            "SET a 1\n"
        );
        assert_eq!(
            LogRecord::Commit { tid: 7 }.encode(),
            "TRANSACTION 7 COMMIT\n"
        );
    }

    #[test]
    fn test_parse_value_with_spaces() {
        let record = LogRecord::parse("SET greeting hello big world").unwrap();
        assert_eq!(
            record,
            LogRecord::Set {
                key: "greeting".to_string(),
                value: "hello big world".to_string()
            }
        );
    }

    #[test]
    fn test_parse_empty_value() {
        let record = LogRecord::parse("SET k ").unwrap();
        assert_eq!(
            record,
            LogRecord::Set {
                key: "k".to_string(),
                value: String::new()
            }
        );
    }

    #[test]
    fn test_parse_rejects_torn_lines() {
        for line in [
            "",
            "TRANSACTION",
            "TRANSACTION 12",
            "TRANSACTION 12 BEG",
            "TRANSACTION x BEGIN",
            "TRANSACTION 0 BEGIN",
            "TRANSACTION -3 COMMIT",
            "TRANSACTION 18446744073709551615 BEGIN",
            "TRANSACTION 18446744073709551616 COMMIT",
            "TRANSACTION 4 COMMIT extra",
            "SET k",
            "SET a=b c",
            "SET a\tb c",
            "SET  v",
            "SE",
            "garbage",
        ] {
            let err = LogRecord::parse(line).unwrap_err();
            assert!(err.is_format(), "expected format error for {:?}", line);
        }
    }

    #[test]
    fn test_parse_largest_tid() {
        let line = format!("TRANSACTION {} COMMIT", MAX_TXN_ID);
        assert_eq!(
            LogRecord::parse(&line).unwrap(),
            LogRecord::Commit { tid: MAX_TXN_ID }
        );
    }

    #[test]
    fn test_tid() {
        assert_eq!(LogRecord::Begin { tid: 3 }.tid(), Some(3));
        assert_eq!(LogRecord::Commit { tid: 9 }.tid(), Some(9));
        assert_eq!(
            LogRecord::Set {
                key: "k".to_string(),
                value: "v".to_string()
            }
            .tid(),
            None
        );
    }

    #[test]
    fn test_transaction_framing() {
        let [begin, set, commit] = LogRecord::transaction(4, "k", "v");
        assert_eq!(begin, LogRecord::Begin { tid: 4 });
        assert_eq!(set.to_string(), "SET k v");
        assert_eq!(commit, LogRecord::Commit { tid: 4 });
    }

    #[test]
    fn test_check_entry() {
        assert!(check_entry("a", "1").is_ok());
        assert!(check_entry("a", "with spaces = ok").is_ok());
        assert!(check_entry("a", "").is_ok());

        assert!(check_entry("", "1").is_err());
        assert!(check_entry("a b", "1").is_err());
        assert!(check_entry("a=b", "1").is_err());
        assert!(check_entry("a\tb", "1").is_err());
        assert!(check_entry("a", "line\nbreak").is_err());
        assert!(check_entry("a", "cr\r").is_err());
    }
}
