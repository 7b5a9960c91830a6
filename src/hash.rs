//! Deterministic identifier hashing.
//!
//! Every generated class name and binding is derived from a SHA-256 digest of
//! one or more string fragments, so identical inputs always reproduce the same
//! identifiers and nothing has to be remembered between invocations.

use sha2::{Digest, Sha256};

/// Scheme tag prepended to every generated identifier.
pub const HASH_PREFIX: &str = "spc-";

/// Number of hex characters kept from the digest.
pub const HASH_WIDTH: usize = 10;

/// Hash the fragments in order into a single digest and return the tagged,
/// truncated hex form, e.g. `spc-1a2b3c4d5e`.
///
/// Fragments are fed to the digest back to back, so `["ab", "c"]` and
/// `["a", "bc"]` hash identically while `["a", "b"]` and `["b", "a"]` do not.
pub fn hash_fragments<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for fragment in fragments {
        hasher.update(fragment.as_ref().as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    format!("{}{}", HASH_PREFIX, &digest[..HASH_WIDTH])
}

/// Fingerprint of a whole compilation unit. A missing filename hashes as `""`.
pub fn file_hash(content: &str, filename: Option<&str>) -> String {
    hash_fragments([content, filename.unwrap_or("")])
}

/// Turn a hash into something usable as a script identifier (`spc-ab` -> `_spc_ab`).
pub fn to_identifier(hash: &str) -> String {
    format!("_{}", hash.replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_shape() {
        let hash = hash_fragments(["hello"]);
        assert!(hash.starts_with(HASH_PREFIX));
        assert_eq!(hash.len(), HASH_PREFIX.len() + HASH_WIDTH);
        assert!(hash[HASH_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_known_digest_prefix() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(hash_fragments(["abc"]), "spc-ba7816bf8f");
        assert_eq!(hash_fragments(["a", "b", "c"]), "spc-ba7816bf8f");
    }

    #[test]
    fn test_fragment_order_matters() {
        assert_ne!(hash_fragments(["file", "title"]), hash_fragments(["title", "file"]));
        assert_ne!(
            hash_fragments(["spc-0000000000", "Child", "label"]),
            hash_fragments(["spc-0000000000", "label", "Child"])
        );
    }

    #[test]
    fn test_every_fragment_counts() {
        let base = hash_fragments(["self", "Child", "label"]);
        assert_ne!(base, hash_fragments(["other", "Child", "label"]));
        assert_ne!(base, hash_fragments(["self", "Card", "label"]));
        assert_ne!(base, hash_fragments(["self", "Child", "title"]));
    }

    #[test]
    fn test_file_hash_is_stable() {
        let a = file_hash("<div></div>", Some("App.svelte"));
        let b = file_hash("<div></div>", Some("App.svelte"));
        assert_eq!(a, b);
        assert_ne!(a, file_hash("<div></div>", Some("Other.svelte")));
        assert_ne!(a, file_hash("<span></span>", Some("App.svelte")));
        assert_eq!(file_hash("x", None), hash_fragments(["x", ""]));
    }

    #[test]
    fn test_to_identifier() {
        assert_eq!(to_identifier("spc-0a1b2c3d4e"), "_spc_0a1b2c3d4e");
    }
}
