// ── Object discovery ──
//
// Streams object references off the link's object-list reports,
// de-duplicated against the caller's known set. The known set only ever
// grows here, so re-running discovery yields additions and nothing else.

use async_stream::try_stream;
use dashmap::DashSet;
use futures_core::Stream;
use tracing::debug;

use crate::error::CoreError;
use bacgate_proto::{ObjectListDelta, ObjectRef, RemoteLink};

/// Stream every object reference not yet in `known`, inserting each as
/// it is yielded.
///
/// Resolves to an empty stream when the link has no device identity
/// yet; the caller retries discovery once the peer is resolved.
pub fn discover<'a, L: RemoteLink>(
    link: &'a L,
    known: &'a DashSet<ObjectRef>,
) -> impl Stream<Item = Result<ObjectRef, CoreError>> + 'a {
    try_stream! {
        if link.device_ref().is_none() {
            debug!("device not resolved, skipping discovery");
            return;
        }
        let mut reports = link.list_objects().await?;
        while let Some(report) = reports.recv().await {
            match report.delta {
                ObjectListDelta::Full(refs) => {
                    for oid in refs {
                        if known.insert(oid) {
                            yield oid;
                        }
                    }
                }
                ObjectListDelta::Item(oid) => {
                    if known.insert(oid) {
                        yield oid;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockLink;
    use bacgate_proto::ObjectType;
    use futures_util::TryStreamExt;
    use pretty_assertions::assert_eq;

    fn oid(instance: u32) -> ObjectRef {
        ObjectRef::new(ObjectType::AnalogInput, instance)
    }

    #[tokio::test]
    async fn discovery_yields_only_additions() {
        let link = MockLink::new();
        link.script_objects(vec![oid(1), oid(2)]);
        let known = DashSet::new();

        let first: Vec<ObjectRef> = discover(&link, &known).try_collect().await.expect("stream");
        assert_eq!(first, vec![oid(1), oid(2)]);

        // Second pass repeats the old refs and adds one.
        link.script_objects(vec![oid(1), oid(2), oid(3)]);
        let second: Vec<ObjectRef> = discover(&link, &known).try_collect().await.expect("stream");
        assert_eq!(second, vec![oid(3)]);
    }

    #[tokio::test]
    async fn unresolved_device_discovers_nothing() {
        let link = MockLink::unresolved();
        link.script_objects(vec![oid(1)]);
        let known = DashSet::new();

        let found: Vec<ObjectRef> = discover(&link, &known).try_collect().await.expect("stream");
        assert!(found.is_empty());
        assert!(known.is_empty());
    }
}
