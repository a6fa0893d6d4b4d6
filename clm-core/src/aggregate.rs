//! Root aggregation over per-section content digests.

use crate::hash::keccak256;
use crate::types::Digest;

/// Aggregate ordered per-section digests into a whole-document fingerprint.
///
/// Defined as keccak256 over the concatenation of the 32-byte digests in
/// sequence order. Order-sensitive by design: any reordering, insertion, or
/// omission changes the root.
///
/// This is a flat ordered hash, not a balanced merkle tree. It cannot
/// support per-leaf inclusion proofs; it is a whole-document fingerprint
/// only. Downstream consumers depend on this exact aggregate value.
///
/// An empty sequence aggregates to [`Digest::ZERO`].
pub fn aggregate_root(digests: &[Digest]) -> Digest {
    if digests.is_empty() {
        return Digest::ZERO;
    }
    let mut packed = Vec::with_capacity(digests.len() * 32);
    for digest in digests {
        packed.extend_from_slice(digest.as_bytes());
    }
    keccak256(&packed)
}
