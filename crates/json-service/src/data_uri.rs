//! RFC 2397 `data:` URIs
//!
//! `data:[<mediatype>][;<charset>][;base64],<payload>`
//!
//! Base64 payloads are written URL-safe without padding and read in either
//! alphabet, padded or not.
//!
//! The textual form is what goes over the wire, so [`DataUri`] serializes to
//! and from a JSON string and can be used directly as an operation argument
//! or result.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = "base64";
const DEFAULT_MEDIA_TYPE: &str = "text/plain";
/// Charset whose payload is written percent-encoded instead of base64
pub const ASCII_CHARSET: &str = "ASCII";

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("Not a data URI: missing 'data:' scheme")]
    MissingScheme,

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("Character {character:?} cannot be encoded in {charset}")]
    Unrepresentable { charset: String, character: char },
}

/// A parsed data URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataUri {
    pub media_type: Option<String>,
    pub charset: Option<String>,
    pub data: Vec<u8>,
}

impl DataUri {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn parse(uri: &str) -> Result<Self, DataUriError> {
        let rest = uri
            .trim()
            .strip_prefix(SCHEME)
            .ok_or(DataUriError::MissingScheme)?;

        let Some((header, payload)) = rest.split_once(',') else {
            return Ok(Self::new(encode_text(rest, None)?));
        };

        let mut uri = DataUri::default();
        let mut is_base64 = false;
        for (i, token) in header.split(';').enumerate() {
            if token.eq_ignore_ascii_case(BASE64_MARKER) {
                is_base64 = true;
            } else if i == 0 {
                if !token.is_empty() {
                    uri.media_type = Some(token.to_string());
                }
            } else if uri.charset.is_none() && !token.is_empty() {
                let charset = token.strip_prefix("charset=").unwrap_or(token);
                uri.charset = Some(charset.to_string());
            }
        }

        uri.data = if is_base64 {
            decode_base64(payload)?
        } else {
            let text = encode_text(payload, uri.charset.as_deref())?;
            urlencoding::decode_binary(&text).into_owned()
        };
        Ok(uri)
    }

    fn is_ascii_charset(&self) -> bool {
        self.charset.as_deref() == Some(ASCII_CHARSET)
    }
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, DataUriError> {
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let engine = if cleaned.contains(['-', '_']) {
        &URL_SAFE_LENIENT
    } else {
        &STANDARD_LENIENT
    };
    Ok(engine.decode(cleaned)?)
}

/// Bytes of `text` in `charset`; US-ASCII when no charset is declared
fn encode_text(text: &str, charset: Option<&str>) -> Result<Vec<u8>, DataUriError> {
    let charset = charset.unwrap_or("US-ASCII");
    match charset.to_ascii_uppercase().as_str() {
        "UTF-8" | "UTF8" => Ok(text.as_bytes().to_vec()),
        "ASCII" | "US-ASCII" => text
            .chars()
            .map(|c| {
                if c.is_ascii() {
                    Ok(c as u8)
                } else {
                    Err(DataUriError::Unrepresentable {
                        charset: charset.to_string(),
                        character: c,
                    })
                }
            })
            .collect(),
        "ISO-8859-1" | "LATIN1" => text
            .chars()
            .map(|c| {
                u8::try_from(u32::from(c)).map_err(|_| DataUriError::Unrepresentable {
                    charset: charset.to_string(),
                    character: c,
                })
            })
            .collect(),
        _ => Err(DataUriError::UnsupportedCharset(charset.to_string())),
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SCHEME)?;
        if let Some(media_type) = &self.media_type {
            f.write_str(media_type)?;
        }
        if let Some(charset) = &self.charset {
            if self.media_type.is_none() {
                f.write_str(DEFAULT_MEDIA_TYPE)?;
            }
            write!(f, ";{}", charset)?;
        }

        if self.is_ascii_charset() {
            write!(f, ",{}", urlencoding::encode_binary(&self.data))
        } else {
            write!(f, ";{},{}", BASE64_MARKER, URL_SAFE_NO_PAD.encode(&self.data))
        }
    }
}

impl FromStr for DataUri {
    type Err = DataUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DataUri {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUri {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DataUri::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base64_with_media_type() {
        let uri = DataUri::parse("data:image/png;base64,iVBORw0=").unwrap();
        assert_eq!(uri.media_type.as_deref(), Some("image/png"));
        assert_eq!(uri.charset, None);
        assert_eq!(uri.data, vec![0x89, b'P', b'N', b'G', 0x0d]);
    }

    #[test]
    fn test_parse_accepts_unpadded_and_url_safe_base64() {
        assert_eq!(DataUri::parse("data:;base64,aGk").unwrap().data, b"hi");
        assert_eq!(DataUri::parse("data:;base64,-_8=").unwrap().data, vec![0xfb, 0xff]);
    }

    #[test]
    fn test_parse_raw_payload_with_charset() {
        let uri = DataUri::parse("data:text/plain;charset=UTF-8,caf%C3%A9 ok").unwrap();
        assert_eq!(uri.charset.as_deref(), Some("UTF-8"));
        assert_eq!(uri.data, "café ok".as_bytes());

        let latin = DataUri::parse("data:text/plain;ISO-8859-1,é").unwrap();
        assert_eq!(latin.data, vec![0xe9]);
    }

    #[test]
    fn test_parse_keeps_commas_in_payload() {
        let uri = DataUri::parse("data:,a,b,c").unwrap();
        assert_eq!(uri.media_type, None);
        assert_eq!(uri.data, b"a,b,c");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(DataUri::parse("http://x"), Err(DataUriError::MissingScheme));
        assert!(matches!(
            DataUri::parse("data:;base64,***"),
            Err(DataUriError::InvalidBase64(_))
        ));
        assert_eq!(
            DataUri::parse("data:text/plain;EBCDIC,abc"),
            Err(DataUriError::UnsupportedCharset("EBCDIC".to_string()))
        );
        assert!(matches!(
            DataUri::parse("data:,é"),
            Err(DataUriError::Unrepresentable { character: 'é', .. })
        ));
    }

    #[test]
    fn test_format_always_starts_with_scheme() {
        assert_eq!(DataUri::new(*b"hi").to_string(), "data:;base64,aGk");
        assert_eq!(
            DataUri::new(*b"hi").with_media_type("text/html").to_string(),
            "data:text/html;base64,aGk"
        );
        assert_eq!(
            DataUri::new(*b"hi").with_charset("UTF-8").to_string(),
            "data:text/plain;UTF-8;base64,aGk"
        );
    }

    #[test]
    fn test_ascii_round_trip() {
        let uri = DataUri::new(vec![b'a', b' ', b'/', 0x00, 0xff])
            .with_media_type("text/plain")
            .with_charset(ASCII_CHARSET);
        let text = uri.to_string();
        assert_eq!(text, "data:text/plain;ASCII,a%20%2F%00%FF");
        assert_eq!(DataUri::parse(&text).unwrap(), uri);
    }

    #[test]
    fn test_base64_round_trip_for_other_charsets() {
        let uri = DataUri::new("zażółć".as_bytes())
            .with_media_type("text/plain")
            .with_charset("UTF-8");
        assert_eq!(DataUri::parse(&uri.to_string()).unwrap(), uri);

        let binary = DataUri::new(vec![0xfb, 0xff, 0xbf]).with_media_type("application/octet-stream");
        assert_eq!(binary.to_string(), "data:application/octet-stream;base64,-_-_");
        assert_eq!(DataUri::parse(&binary.to_string()).unwrap(), binary);
    }

    #[test]
    fn test_charset_without_media_type_gains_text_plain() {
        let uri = DataUri::new(*b"x").with_charset("UTF-8");
        let parsed = DataUri::parse(&uri.to_string()).unwrap();
        assert_eq!(parsed.media_type.as_deref(), Some("text/plain"));
        assert_eq!(parsed.data, b"x");
    }

    #[test]
    fn test_serde_as_string() {
        let uri = DataUri::new(*b"hi").with_media_type("text/plain");
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, r#""data:text/plain;base64,aGk""#);
        let back: DataUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
        assert!(serde_json::from_str::<DataUri>(r#""nope""#).is_err());
    }
}
