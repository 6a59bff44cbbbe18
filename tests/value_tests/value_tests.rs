//! Value Tests
//!
//! Tests verify:
//! - Conversions from native types
//! - Integer offset arithmetic (including wrap-around)
//! - Non-integer values refuse arithmetic
//! - Display output

use bytes::Bytes;
use mergecache::Value;

// =============================================================================
// Conversion Tests
// =============================================================================

#[test]
fn test_integer_conversions_become_int() {
    assert_eq!(Value::from(7i64), Value::Int(7));
    assert_eq!(Value::from(-7i32), Value::Int(-7));
    assert_eq!(Value::from(u32::MAX), Value::Int(u32::MAX as i64));
}

#[test]
fn test_text_conversions() {
    assert_eq!(Value::from("abc"), Value::Text("abc".to_string()));
    assert_eq!(Value::from(String::from("abc")), Value::Text("abc".to_string()));
}

#[test]
fn test_byte_conversions_share_representation() {
    let from_vec = Value::from(vec![1u8, 2, 3]);
    let from_bytes = Value::from(Bytes::from_static(&[1, 2, 3]));
    assert_eq!(from_vec, from_bytes);
    assert_eq!(from_vec.as_bytes().map(|b| b.len()), Some(3));
}

#[test]
fn test_other_conversions() {
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from(1.5f64), Value::Float(1.5));
}

// =============================================================================
// Arithmetic Tests
// =============================================================================

#[test]
fn test_wrapping_offset_on_int() {
    assert_eq!(Value::Int(10).wrapping_offset(5), Some(Value::Int(15)));
    assert_eq!(Value::Int(10).wrapping_offset(-3), Some(Value::Int(7)));
}

#[test]
fn test_wrapping_offset_wraps() {
    assert_eq!(Value::Int(i64::MAX).wrapping_offset(1), Some(Value::Int(i64::MIN)));
    assert_eq!(Value::Int(i64::MIN).wrapping_offset(-1), Some(Value::Int(i64::MAX)));
}

#[test]
fn test_wrapping_offset_refuses_non_integers() {
    assert_eq!(Value::from("text").wrapping_offset(1), None);
    assert_eq!(Value::Float(1.0).wrapping_offset(1), None);
    assert_eq!(Value::Bool(false).wrapping_offset(1), None);
    assert_eq!(Value::from(vec![0u8]).wrapping_offset(1), None);
}

#[test]
fn test_accessors() {
    assert_eq!(Value::Int(3).as_int(), Some(3));
    assert!(Value::Int(3).is_int());
    assert_eq!(Value::from("x").as_text(), Some("x"));
    assert_eq!(Value::from("x").as_int(), None);
    assert!(!Value::from("x").is_int());
}

// =============================================================================
// Formatting Tests
// =============================================================================

#[test]
fn test_display_and_kind() {
    assert_eq!(Value::Int(42).to_string(), "42");
    assert_eq!(Value::from("hi").to_string(), "hi");
    assert_eq!(Value::from(vec![0u8; 4]).to_string(), "<4 bytes>");
    assert_eq!(Value::Int(1).kind(), "int");
    assert_eq!(Value::from("a").kind(), "text");
    assert_eq!(Value::Bool(true).kind(), "bool");
}
