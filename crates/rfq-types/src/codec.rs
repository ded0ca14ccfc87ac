//! Wire codecs for the fixed-size byte types (§6: "addresses as lower-case
//! 20-byte hex with `0x` prefix"). `Address`/`Hash`/`Signature` are plain
//! `[u8; N]` aliases, so the codec is a `serde_with` adapter applied at each
//! field via `#[serde_as(as = "HexPrefixed")]` rather than attached to the
//! alias itself; it composes with `Vec<_>` and tuples the same way any other
//! `serde_with` adapter does.

use serde::{Deserialize, Deserializer, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

pub struct HexPrefixed;

impl<const N: usize> SerializeAs<[u8; N]> for HexPrefixed {
    fn serialize_as<S: Serializer>(value: &[u8; N], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }
}

impl<'de, const N: usize> DeserializeAs<'de, [u8; N]> for HexPrefixed {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<[u8; N], D::Error> {
        let raw = String::deserialize(deserializer)?;
        let stripped = raw
            .strip_prefix("0x")
            .ok_or_else(|| serde::de::Error::custom("hex value missing 0x prefix"))?;
        let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| serde::de::Error::custom(format!("expected {N} bytes, got {}", v.len())))
    }
}
