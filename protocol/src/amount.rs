//! # Amounts
//!
//! All value is a `u128` in the smallest denomination. No floats, no
//! decimals in arithmetic; `decimals` on a token is for display only.
//!
//! JSON numbers lose precision past 2^53 in most clients, so amounts cross
//! the wire as decimal strings. The serde helpers below do the conversion:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Payment {
//!     #[serde(with = "vault_protocol::amount::as_string")]
//!     value: Amount,
//! }
//! ```

/// Value in the smallest denomination.
pub type Amount = u128;

/// Serializes an [`Amount`] as a decimal string. Deserialization accepts
/// either a string or a plain JSON integer.
pub mod as_string {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(n as Amount),
        }
    }
}

/// Serializes a `HashMap<K, Amount>` with decimal-string values.
pub mod string_map {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::hash::Hash;

    pub fn serialize<K, S>(map: &HashMap<K, Amount>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut ser_map = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            ser_map.serialize_entry(key, &value.to_string())?;
        }
        ser_map.end()
    }

    pub fn deserialize<'de, K, D>(deserializer: D) -> Result<HashMap<K, Amount>, D::Error>
    where
        K: Deserialize<'de> + Eq + Hash,
        D: Deserializer<'de>,
    {
        let string_map: HashMap<K, String> = HashMap::deserialize(deserializer)?;
        string_map
            .into_iter()
            .map(|(key, value)| {
                value
                    .parse::<Amount>()
                    .map(|amount| (key, amount))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
