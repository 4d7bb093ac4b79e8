//! Content digests for rule groups and orderings.
//!
//! Transformations, sorted orders, and graph cache keys are identified by a
//! **simple, deterministic, non-cryptographic** digest:
//!
//! - algorithm: FNV-1a 64-bit
//! - output: `"fnv1a64:<16 lowercase hex digits>"`
//!
//! These digests are stability/identity tools, not security primitives. A
//! container digest depends only on the *content* of its rules (sorted rule
//! text), so it is stable when the surrounding order changes.

/// Prefix used in serialized digests.
pub const DIGEST_V1_PREFIX: &str = "fnv1a64:";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

fn fold(hash: &mut u64, bytes: &[u8]) {
    for b in bytes {
        *hash ^= (*b) as u64;
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

/// Compute a digest over arbitrary bytes.
pub fn fnv1a64_digest_bytes(bytes: &[u8]) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    fold(&mut hash, bytes);
    format!("{DIGEST_V1_PREFIX}{hash:016x}")
}

/// Compute a digest over UTF-8 text (program sources, model listings).
pub fn fnv1a64_digest_str(text: &str) -> String {
    fnv1a64_digest_bytes(text.as_bytes())
}

/// Digest of a rule container: rule texts are sorted first, so the result is
/// independent of insertion order and of the container's position in the
/// overall transformation order.
pub fn container_digest_v1<S: AsRef<str>>(rule_texts: &[S]) -> String {
    let mut sorted: Vec<&str> = rule_texts.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let mut hash = FNV_OFFSET_BASIS;
    for text in sorted {
        fold(&mut hash, text.as_bytes());
        fold(&mut hash, b"\n");
    }
    format!("{DIGEST_V1_PREFIX}{hash:016x}")
}

/// Digest of a full transformation order: the container digests joined in
/// order. Two sorts of the same program agree iff this digest agrees.
pub fn sort_digest_v1<S: AsRef<str>>(container_digests: &[S]) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for d in container_digests {
        fold(&mut hash, d.as_ref().as_bytes());
        fold(&mut hash, b"|");
    }
    format!("{DIGEST_V1_PREFIX}{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_has_expected_prefix_and_width() {
        let d = fnv1a64_digest_str("a :- b.\n");
        assert!(d.starts_with(DIGEST_V1_PREFIX));
        assert_eq!(d.len(), DIGEST_V1_PREFIX.len() + 16);
    }

    #[test]
    fn container_digest_ignores_rule_order() {
        let d1 = container_digest_v1(&["a :- b.", "b :- c."]);
        let d2 = container_digest_v1(&["b :- c.", "a :- b."]);
        assert_eq!(d1, d2);
    }

    #[test]
    fn container_digest_changes_with_content() {
        let d1 = container_digest_v1(&["a :- b."]);
        let d2 = container_digest_v1(&["a :- c."]);
        assert_ne!(d1, d2);
    }

    #[test]
    fn sort_digest_is_order_sensitive() {
        let d1 = sort_digest_v1(&["x", "y"]);
        let d2 = sort_digest_v1(&["y", "x"]);
        assert_ne!(d1, d2);
    }
}
