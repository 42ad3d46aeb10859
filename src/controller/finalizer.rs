//! Finalizer helpers shared by the three reconcilers.
//!
//! The finalizer gates removal of an object from the store until its
//! upstream counterpart has been cleaned up. All three helpers are
//! idempotent.

use kube::Resource;

/// Finalizer placed on every managed object before its first upstream
/// mutation.
pub const FINALIZER: &str = "sentry.microscaler.io/finalizer";

/// Whether the object carries the finalizer.
pub fn has_finalizer<K: Resource>(obj: &K) -> bool {
    obj.meta()
        .finalizers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|f| f == FINALIZER)
}

/// Add the finalizer unless already present.
pub fn add_finalizer<K: Resource>(obj: &mut K) {
    if has_finalizer(obj) {
        return;
    }
    obj.meta_mut()
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(FINALIZER.to_owned());
}

/// Remove the first occurrence of the finalizer, collapsing an emptied list
/// to absent. A no-op when the finalizer is not present.
pub fn remove_finalizer<K: Resource>(obj: &mut K) {
    let meta = obj.meta_mut();
    let Some(finalizers) = meta.finalizers.as_mut() else {
        return;
    };
    if let Some(pos) = finalizers.iter().position(|f| f == FINALIZER) {
        finalizers.remove(pos);
    }
    if finalizers.is_empty() {
        meta.finalizers = None;
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::Pod;
    use kube::api::ObjectMeta;

    use super::*;

    fn pod_with_finalizers(finalizers: Option<Vec<&str>>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                finalizers: finalizers
                    .map(|f| f.into_iter().map(str::to_owned).collect()),
                ..ObjectMeta::default()
            },
            ..Pod::default()
        }
    }

    #[test]
    fn has_finalizer_matches_exactly() {
        assert!(!has_finalizer(&pod_with_finalizers(None)));
        assert!(!has_finalizer(&pod_with_finalizers(Some(vec!["foo"]))));
        assert!(has_finalizer(&pod_with_finalizers(Some(vec![FINALIZER]))));
        assert!(has_finalizer(&pod_with_finalizers(Some(vec![
            "foo", FINALIZER
        ]))));
    }

    #[test]
    fn add_finalizer_is_idempotent() {
        let mut pod = pod_with_finalizers(None);
        add_finalizer(&mut pod);
        add_finalizer(&mut pod);
        assert_eq!(
            pod.metadata.finalizers,
            Some(vec![FINALIZER.to_owned()])
        );
    }

    #[test]
    fn remove_finalizer_collapses_to_absent() {
        let mut pod = pod_with_finalizers(Some(vec![FINALIZER]));
        remove_finalizer(&mut pod);
        assert_eq!(pod.metadata.finalizers, None);
    }

    #[test]
    fn remove_finalizer_keeps_other_entries() {
        let mut pod = pod_with_finalizers(Some(vec![FINALIZER, "foo"]));
        remove_finalizer(&mut pod);
        assert_eq!(pod.metadata.finalizers, Some(vec!["foo".to_owned()]));
    }

    #[test]
    fn remove_finalizer_drops_one_occurrence_at_a_time() {
        let mut pod = pod_with_finalizers(Some(vec![FINALIZER, FINALIZER]));
        remove_finalizer(&mut pod);
        assert_eq!(
            pod.metadata.finalizers,
            Some(vec![FINALIZER.to_owned()])
        );
        remove_finalizer(&mut pod);
        assert_eq!(pod.metadata.finalizers, None);
    }

    #[test]
    fn remove_finalizer_without_marker_is_a_noop() {
        let mut pod = pod_with_finalizers(Some(vec!["foo"]));
        remove_finalizer(&mut pod);
        assert_eq!(pod.metadata.finalizers, Some(vec!["foo".to_owned()]));

        let mut pod = pod_with_finalizers(None);
        remove_finalizer(&mut pod);
        assert_eq!(pod.metadata.finalizers, None);
    }
}
