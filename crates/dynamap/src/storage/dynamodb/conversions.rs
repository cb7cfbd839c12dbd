//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between `dynamap_core` items and SDK
//! attribute maps. These are testable in isolation without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue as SdkValue;
use dynamap_core::{AttributeValue, Item};

/// SDK attribute map.
pub type SdkItem = HashMap<String, SdkValue>;

pub fn to_sdk_value(value: &AttributeValue) -> SdkValue {
    match value {
        AttributeValue::S(s) => SdkValue::S(s.clone()),
        AttributeValue::N(n) => SdkValue::N(n.clone()),
        AttributeValue::B(b) => SdkValue::B(Blob::new(b.clone())),
        AttributeValue::Bool(b) => SdkValue::Bool(*b),
        AttributeValue::Null => SdkValue::Null(true),
    }
}

/// Convert an SDK attribute. Set, list and map attributes are never written
/// by this crate and read back as `Null`.
pub fn from_sdk_value(value: &SdkValue) -> AttributeValue {
    match value {
        SdkValue::S(s) => AttributeValue::S(s.clone()),
        SdkValue::N(n) => AttributeValue::N(n.clone()),
        SdkValue::B(b) => AttributeValue::B(b.as_ref().to_vec()),
        SdkValue::Bool(b) => AttributeValue::Bool(*b),
        _ => AttributeValue::Null,
    }
}

pub fn to_sdk_item(item: &Item) -> SdkItem {
    item.iter()
        .map(|(name, value)| (name.clone(), to_sdk_value(value)))
        .collect()
}

pub fn from_sdk_item(item: &SdkItem) -> Item {
    item.iter()
        .map(|(name, value)| (name.clone(), from_sdk_value(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversions() {
        let mut item = Item::new();
        item.insert("name".to_string(), AttributeValue::S("w1".to_string()));
        item.insert("count".to_string(), AttributeValue::N("42".to_string()));
        item.insert("blob".to_string(), AttributeValue::B(vec![0xde, 0xad]));
        item.insert("flag".to_string(), AttributeValue::Bool(true));
        item.insert("gone".to_string(), AttributeValue::Null);

        let sdk = to_sdk_item(&item);
        assert_eq!(sdk["name"], SdkValue::S("w1".to_string()));
        assert_eq!(sdk["count"], SdkValue::N("42".to_string()));
        assert_eq!(sdk["gone"], SdkValue::Null(true));

        assert_eq!(from_sdk_item(&sdk), item);
    }

    #[test]
    fn test_unsupported_types_read_as_null() {
        let value = SdkValue::Ss(vec!["a".to_string()]);
        assert_eq!(from_sdk_value(&value), AttributeValue::Null);
    }
}
