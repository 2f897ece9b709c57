//! Text encodings found in binder signatures and name pools.
//!
//! Names are Shift-JIS in every generation-3 container. Generation-4
//! containers switch to UTF-16 (in the container's byte order) when their
//! unicode flag is set.

use encoding_rs::SHIFT_JIS;

use crate::{Error, Result};

/// Encoding of a string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// 7-bit ASCII; used for magic and signature fields.
    Ascii,
    /// Shift-JIS (code page 932).
    ShiftJis,
    /// UTF-16 with the container's endianness.
    Utf16,
}

impl TextEncoding {
    /// Width in bytes of one code unit, which is also the terminator width.
    #[inline]
    pub fn unit_width(self) -> usize {
        match self {
            TextEncoding::Utf16 => 2,
            TextEncoding::Ascii | TextEncoding::ShiftJis => 1,
        }
    }

    /// Name-pool encoding for a container's unicode flag.
    #[inline]
    pub fn for_names(unicode: bool) -> Self {
        if unicode {
            TextEncoding::Utf16
        } else {
            TextEncoding::ShiftJis
        }
    }

    /// Decode `bytes` (without terminator) into a `String`.
    pub fn decode(self, bytes: &[u8], big_endian: bool) -> Result<String> {
        match self {
            TextEncoding::Ascii => {
                if !bytes.is_ascii() {
                    return Err(Error::Text("non-ASCII byte in ASCII field"));
                }
                Ok(bytes.iter().map(|&b| b as char).collect())
            }
            TextEncoding::ShiftJis => {
                let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
                if had_errors {
                    return Err(Error::Text("malformed Shift-JIS"));
                }
                Ok(text.into_owned())
            }
            TextEncoding::Utf16 => {
                if bytes.len() % 2 != 0 {
                    return Err(Error::Text("odd byte count in UTF-16 field"));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| {
                        let pair = [c[0], c[1]];
                        if big_endian {
                            u16::from_be_bytes(pair)
                        } else {
                            u16::from_le_bytes(pair)
                        }
                    })
                    .collect();
                String::from_utf16(&units).map_err(|_| Error::Text("malformed UTF-16"))
            }
        }
    }

    /// Encode `text` (without terminator).
    pub fn encode(self, text: &str, big_endian: bool) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Ascii => {
                if !text.is_ascii() {
                    return Err(Error::Text("non-ASCII character in ASCII field"));
                }
                Ok(text.as_bytes().to_vec())
            }
            TextEncoding::ShiftJis => {
                let (bytes, _, had_errors) = SHIFT_JIS.encode(text);
                if had_errors {
                    return Err(Error::Text("character not representable in Shift-JIS"));
                }
                Ok(bytes.into_owned())
            }
            TextEncoding::Utf16 => Ok(text
                .encode_utf16()
                .flat_map(|u| {
                    if big_endian {
                        u.to_be_bytes()
                    } else {
                        u.to_le_bytes()
                    }
                })
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_jis_encodes_japanese_names() {
        let bytes = TextEncoding::ShiftJis.encode("テスト.txt", false).unwrap();
        assert_eq!(&bytes[..2], &[0x83, 0x65]);
        let back = TextEncoding::ShiftJis.decode(&bytes, false).unwrap();
        assert_eq!(back, "テスト.txt");
    }

    #[test]
    fn utf16_respects_byte_order() {
        assert_eq!(TextEncoding::Utf16.encode("A", false).unwrap(), [0x41, 0x00]);
        assert_eq!(TextEncoding::Utf16.encode("A", true).unwrap(), [0x00, 0x41]);
        assert_eq!(TextEncoding::Utf16.decode(&[0x00, 0x42], true).unwrap(), "B");
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        assert!(matches!(
            TextEncoding::Ascii.decode(&[0x41, 0xFF], false),
            Err(Error::Text(_))
        ));
        assert!(TextEncoding::Ascii.encode("é", false).is_err());
    }

    #[test]
    fn odd_utf16_length_is_an_error() {
        assert!(TextEncoding::Utf16.decode(&[0x41], false).is_err());
    }
}
