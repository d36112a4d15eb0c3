// src/inference/classify.rs
//! First-significant-byte lookahead

/// Syntactic shape of a canonical JSON document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Zero bytes. Whitespace alone is malformed, not empty.
    Empty,
    Object,
    Tuple,
    Scalar,
}

/// Classify without parsing. Object wins over tuple wins over scalar.
pub fn classify(bytes: &[u8]) -> Shape {
    if bytes.is_empty() {
        return Shape::Empty;
    }
    match bytes.iter().find(|b| !is_json_whitespace(**b)) {
        Some(b'{') => Shape::Object,
        Some(b'[') => Shape::Tuple,
        Some(_) | None => Shape::Scalar,
    }
}

fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
