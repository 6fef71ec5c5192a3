//! 载荷编解码（Codec）
//!
//! 事件载荷与快照状态在持久化层都是不透明的字节；
//! 核心只通过 `Codec` 产生与消费这些字节，从不解释其内容。
//!
use crate::error::{DomainError, DomainResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> DomainResult<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> DomainResult<T>;
}

/// 基于 serde_json 的默认编解码器
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> DomainResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|err| DomainError::Codec {
            reason: err.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> DomainResult<T> {
        serde_json::from_slice(bytes).map_err(|err| DomainError::Codec {
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        title: String,
    }

    #[test]
    fn decode_garbage_is_codec_error() {
        let err = JsonCodec.decode::<Note>(b"not json").unwrap_err();
        assert!(matches!(err, DomainError::Codec { .. }));
        assert!(err.is_store_error());
    }

    #[test]
    fn encode_failure_is_codec_error() {
        use std::collections::BTreeMap;

        // JSON 对象的键必须是字符串
        let state = BTreeMap::from([((1u8, 2u8), "x")]);
        let err = JsonCodec.encode(&state).unwrap_err();
        assert!(matches!(err, DomainError::Codec { .. }));
        assert!(err.is_store_error());
    }

    #[test]
    fn json_codec_keeps_field_values() {
        let bytes = JsonCodec
            .encode(&Note {
                title: "hello".into(),
            })
            .unwrap();
        assert_eq!(bytes, br#"{"title":"hello"}"#);
    }
}
