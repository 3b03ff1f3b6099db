//! Key assembly: base prefix + resource prefix + namespace + name.

use bytes::Bytes;
use kectl_core::prefix_for;
use smallvec::SmallVec;

use crate::{Op, StoreError};

/// Literal key (or key prefix) for an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledKey {
    pub key: String,
    /// The key names exactly one object rather than a range.
    pub single: bool,
}

/// Combine `base` with the operation's target.
///
/// Namespace and name segments only apply once a resource is set. A name
/// without a resource is ignored; a namespace without one is rejected, as
/// such a prefix has no meaning in the server's layout.
pub fn assemble_key(base: &str, op: &Op<'_>) -> Result<AssembledKey, StoreError> {
    let base = base.trim_end_matches('/');
    let target = op.target().filter(|id| !id.is_empty());

    let Some(id) = target else {
        if !op.target_namespace().is_empty() {
            return Err(StoreError::NamespaceWithoutResource { namespace: op.target_namespace().to_string() });
        }
        return Ok(AssembledKey { key: base.to_string(), single: false });
    };

    let prefix = prefix_for(id)?;
    let mut segments: SmallVec<[&str; 4]> = SmallVec::new();
    segments.push(base);
    segments.push(&prefix);
    if !op.target_namespace().is_empty() {
        segments.push(op.target_namespace());
    }
    let single = !op.target_name().is_empty();
    if single {
        segments.push(op.target_name());
    }
    Ok(AssembledKey { key: segments.join("/"), single })
}

/// `[start, end)` covering every key strictly below `key` in the hierarchy.
pub fn prefix_range(key: &str) -> (Bytes, Bytes) {
    let mut start = Vec::with_capacity(key.len() + 1);
    start.extend_from_slice(key.as_bytes());
    start.push(b'/');
    let end = prefix_end(&start);
    (Bytes::from(start), Bytes::from(end))
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Returns `[0]` (etcd's "to the end of the keyspace") when no such key exists.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last < 0xff {
            *last += 1;
            return end;
        }
        end.pop();
    }
    vec![0]
}

/// Smallest key strictly after `key`.
pub(crate) fn key_after(key: &[u8]) -> Bytes {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0);
    Bytes::from(next)
}

#[cfg(test)]
mod tests {
    use kectl_core::ResourceIdentity;

    use super::*;

    fn pods() -> ResourceIdentity {
        ResourceIdentity::new("", "pods")
    }

    #[test]
    fn single_iff_resource_and_name() {
        let cases = [
            (Op::new().resource(pods()).name("x", "ns"), "/registry/pods/ns/x", true),
            (Op::new().resource(pods()), "/registry/pods", false),
            (Op::new().name("x", ""), "/registry", false),
            (Op::new(), "/registry", false),
        ];
        for (op, key, single) in cases {
            let got = assemble_key("/registry", &op).unwrap();
            assert_eq!(got, AssembledKey { key: key.to_string(), single }, "{op:?}");
        }
    }

    #[test]
    fn namespace_without_resource_is_rejected() {
        let op = Op::new().name("", "ns");
        assert!(matches!(
            assemble_key("/registry", &op),
            Err(StoreError::NamespaceWithoutResource { .. })
        ));
    }

    #[test]
    fn empty_identity_counts_as_absent() {
        let op = Op::new().resource(ResourceIdentity::new("apps", "")).name("x", "");
        assert_eq!(assemble_key("/registry", &op).unwrap().key, "/registry");
    }

    #[test]
    fn trailing_separator_on_base_is_trimmed() {
        let op = Op::new().resource(ResourceIdentity::new("example.com", "widgets")).name("w", "");
        let got = assemble_key("/registry/", &op).unwrap();
        assert_eq!(got.key, "/registry/example.com/widgets/w");
        assert!(!got.key.ends_with('/'));
    }

    #[test]
    fn assembly_is_deterministic() {
        let op = Op::new().resource(ResourceIdentity::new("", "services")).name("kubernetes", "default");
        let a = assemble_key("/registry", &op).unwrap();
        let b = assemble_key("/registry", &op).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key, "/registry/services/specs/default/kubernetes");
    }

    #[test]
    fn prefix_range_excludes_sibling_resources() {
        let (start, end) = prefix_range("/registry/pods");
        assert_eq!(&start[..], b"/registry/pods/");
        assert_eq!(&end[..], b"/registry/pods0");
        let psp: &[u8] = b"/registry/podsecuritypolicy/x";
        assert!(!(psp >= &start[..] && psp < &end[..]));
    }

    #[test]
    fn prefix_end_carries_over_0xff() {
        assert_eq!(prefix_end(&[b'a', 0xff]), vec![b'b']);
        assert_eq!(prefix_end(&[0xff, 0xff]), vec![0]);
    }
}
