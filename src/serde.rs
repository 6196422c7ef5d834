use super::{AssocTable, TableConfig};

use serde::de::{Deserialize, Error, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserializer;

use std::fmt;
use std::hash::BuildHasher;
use std::marker::PhantomData;

pub struct AssocTableVisitor<V, H: BuildHasher> {
    #[allow(clippy::type_complexity)]
    marker: PhantomData<fn() -> AssocTable<V, H>>,
}

impl<V, H> AssocTableVisitor<V, H>
where
    H: BuildHasher,
{
    fn new() -> Self {
        AssocTableVisitor {
            marker: PhantomData,
        }
    }
}

impl<'de, V, H> Visitor<'de> for AssocTableVisitor<V, H>
where
    V: Deserialize<'de>,
    H: BuildHasher + Default,
{
    type Value = AssocTable<V, H>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map with string keys")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut table = AssocTable::with_config_and_hasher(TableConfig::new(), H::default())
            .map_err(M::Error::custom)?;

        while let Some((key, value)) = access.next_entry::<String, V>()? {
            table.insert(&key, value).map_err(M::Error::custom)?;
        }

        Ok(table)
    }
}

impl<'de, V, H> Deserialize<'de> for AssocTable<V, H>
where
    V: Deserialize<'de>,
    H: BuildHasher + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(AssocTableVisitor::<V, H>::new())
    }
}

impl<V, H> Serialize for AssocTable<V, H>
where
    V: Serialize,
    H: BuildHasher,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod serde_test {
    use crate::{AssocTable, TableConfig};

    use serde_test::{assert_de_tokens, assert_tokens, Token};

    #[test]
    fn serde_assoc_table() {
        let mut table: AssocTable<i16> = AssocTable::new();
        assert!(table.insert("two", -6).is_ok());
        assert_tokens(
            &table,
            &[
                Token::Map { len: Some(1) },
                Token::Str("two"),
                Token::I16(-6),
                Token::MapEnd,
            ],
        );
    }

    #[test]
    fn serde_skips_tombstones() {
        let mut table: AssocTable<u8> = AssocTable::new();
        assert!(table.insert("a", 1).is_ok());
        assert!(table.insert("b", 2).is_ok());
        assert!(table.delete("a").is_ok());
        assert_tokens(
            &table,
            &[
                Token::Map { len: Some(1) },
                Token::Str("b"),
                Token::U8(2),
                Token::MapEnd,
            ],
        );
    }

    #[test]
    fn deserialize_duplicate_keys() {
        let mut table: AssocTable<u8> = AssocTable::new();
        assert!(table.insert("k", 2).is_ok());
        assert_de_tokens(
            &table,
            &[
                Token::Map { len: Some(2) },
                Token::BorrowedStr("k"),
                Token::U8(1),
                Token::String("k"),
                Token::U8(2),
                Token::MapEnd,
            ],
        );
    }

    #[test]
    fn serde_config() {
        let config = TableConfig::new().with_initial_capacity(8);
        assert_tokens(
            &config,
            &[
                Token::Struct {
                    name: "TableConfig",
                    len: 3,
                },
                Token::Str("initial_capacity"),
                Token::U64(8),
                Token::Str("max_load_factor"),
                Token::F64(0.75),
                Token::Str("growth_factor"),
                Token::U64(2),
                Token::StructEnd,
            ],
        );
    }
}
