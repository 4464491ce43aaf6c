// ── Batched property fetch ──
//
// One fetch cycle reads the planned properties of a set of points in a
// single batched request and feeds every delivered report through the
// mapper. A transport failure aborts the whole cycle before any report
// is applied, leaving the points as they were.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::CoreError;
use crate::mapper::{self, MapperCtx};
use crate::plan;
use crate::tree::Point;
use bacgate_proto::{ObjectRef, RemoteLink};

/// Fetch and apply the planned properties of `points`.
pub async fn run<L: RemoteLink>(
    link: &L,
    points: &[Arc<Point>],
    ctx: &MapperCtx,
) -> Result<(), CoreError> {
    if points.is_empty() {
        return Ok(());
    }
    let by_ref: HashMap<ObjectRef, &Arc<Point>> =
        points.iter().map(|p| (p.object(), p)).collect();
    let batch = plan::build_batch(by_ref.keys().copied());
    debug!(objects = batch.len(), "fetching property batch");

    let mut reports = link.read_batch(batch).await?;
    while let Some(report) = reports.recv().await {
        let Some(point) = by_ref.get(&report.object) else {
            trace!(object = %report.object, "report for unknown object, dropping");
            continue;
        };
        mapper::apply(point, ctx, report.property, &report.value);
    }
    Ok(())
}
