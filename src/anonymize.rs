use md5::{Digest, Md5};
use serde_json::Value;

/// Prefix marking a value that was replaced by its digest.
pub const OBFUSCATION_PREFIX: &str = "obf:";

/// Replace `plain` by `"obf:" + md5_hex(plain)`.
///
/// The digest is unsalted: equal inputs map to equal outputs on every
/// install, which keeps records correlatable but is open to dictionary
/// attacks on small input spaces such as IPv4 addresses.
pub fn obfuscate(plain: &str) -> String {
    format!("{}{}", OBFUSCATION_PREFIX, hex::encode(Md5::digest(plain.as_bytes())))
}

/// [`obfuscate`] applied to the plain string form of a JSON value.
pub fn obfuscate_value(value: &Value) -> Value {
    Value::String(obfuscate(&plain_string(value)))
}

/// String form used for hashing: strings verbatim, numbers via their
/// display form, `true` as `"1"`, `false` and null as the empty string.
pub fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `true` for the "no authenticated user" sentinel (`0`, numeric).
pub fn is_anonymous_user(value: &Value) -> bool {
    value.as_u64() == Some(0) || value.as_i64() == Some(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_obfuscate_known_digests() {
        assert_eq!(obfuscate(""), "obf:d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(obfuscate("abc"), "obf:900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_obfuscate_value_uses_display_form() {
        assert_eq!(obfuscate_value(&json!(42)), json!(obfuscate("42")));
        assert_eq!(obfuscate_value(&json!("42")), json!(obfuscate("42")));
    }

    #[test]
    fn test_plain_string_of_booleans() {
        assert_eq!(plain_string(&json!(true)), "1");
        assert_eq!(plain_string(&json!(false)), "");
        assert_eq!(plain_string(&json!(null)), "");
        assert_eq!(obfuscate_value(&json!(true)), json!(obfuscate("1")));
        assert_eq!(obfuscate_value(&json!(false)), json!(obfuscate("")));
    }

    #[test]
    fn test_anonymous_sentinel() {
        assert!(is_anonymous_user(&json!(0)));
        assert!(!is_anonymous_user(&json!(7)));
        assert!(!is_anonymous_user(&json!("0")));
        assert!(!is_anonymous_user(&json!(null)));
    }
}
