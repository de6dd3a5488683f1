// lib/src/config/config_serializers.rs

/// Plain-string form of `StorageEngineType` (`sled`, `inmemory`). serde_yaml2
/// only reads derived unit variants as maps (`sled: ~`).
pub mod storage_engine_type_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::config::config_structs::StorageEngineType;

    pub fn serialize<S>(value: &StorageEngineType, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<StorageEngineType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_yaml2 as serde_yaml;

    use crate::config::config_structs::StorageEngineType;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "super::storage_engine_type_serde")]
        engine: StorageEngineType,
    }

    #[test]
    fn should_read_engine_type_from_plain_scalar() {
        let quoted: Holder = serde_yaml::from_str("engine: \"sled\"\n").unwrap();
        assert_eq!(quoted.engine, StorageEngineType::Sled);
        let bare: Holder = serde_yaml::from_str("engine: In-Memory\n").unwrap();
        assert_eq!(bare.engine, StorageEngineType::InMemory);
        assert!(serde_yaml::from_str::<Holder>("engine: rocksdb\n").is_err());
    }

    #[test]
    fn should_write_engine_type_as_string() {
        let holder = Holder { engine: StorageEngineType::Sled };
        let yaml = serde_yaml::to_string(&holder).unwrap();
        assert!(!yaml.contains("sled:"), "{}", yaml);
        assert_eq!(serde_yaml::from_str::<Holder>(&yaml).unwrap(), holder);
    }
}
