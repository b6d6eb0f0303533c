use std::collections::BTreeSet;

use kbrowse_api::{PartitionRef, SearchWindow};

use crate::error::SearchError;
use crate::resolver::OffsetResolver;

/// Turns a wall-clock window into per-partition offset windows.
///
/// Windows are half-open, `[from, to)`:
/// - `from` is the first offset with timestamp `>= from_ms`;
/// - `to` is the first offset with timestamp `>= to_ms`, or the high-water
///   mark when no record is that recent. Either way it is the first offset
///   outside the window.
#[derive(Clone)]
pub struct RangePlanner {
    resolver: OffsetResolver,
}

impl RangePlanner {
    pub fn new(resolver: OffsetResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &OffsetResolver {
        &self.resolver
    }

    /// Plan the windows to scan, ordered by partition. Partitions with
    /// nothing to scan are left out, so an empty result means there is no
    /// data in range.
    pub async fn plan(
        &self,
        topic: &str,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<SearchWindow>, SearchError> {
        let from_offsets = self.resolver.resolve_by_time(topic, from_ms).await?;
        let to_offsets = self.resolver.resolve_by_time(topic, to_ms).await?;

        // Partitions whose end lies past the last record. A partition that
        // shows up in `from` but not in `to` is treated the same way.
        let open_ended: BTreeSet<PartitionRef> = to_offsets
            .values()
            .filter(|point| point.offset.is_none())
            .map(|point| point.partition.clone())
            .chain(
                from_offsets
                    .keys()
                    .filter(|p| !to_offsets.contains_key(*p))
                    .cloned(),
            )
            .collect();
        let marks = self.resolver.high_water_marks(&open_ended).await?;

        let mut windows = Vec::with_capacity(from_offsets.len());
        for (partition, point) in from_offsets {
            let Some(start) = point.offset else {
                tracing::debug!(%partition, from_ms, "no record at or after window start");
                continue;
            };
            let resolved_end = to_offsets.get(&partition).and_then(|p| p.offset);
            let end = match resolved_end.or_else(|| marks.get(&partition).copied()) {
                Some(end) => end,
                None => {
                    tracing::debug!(%partition, "partition missing from high-water marks");
                    continue;
                }
            };
            match SearchWindow::new(partition, start, end) {
                Some(window) if !window.is_empty() => {
                    tracing::trace!(
                        partition = %window.partition(),
                        start,
                        end,
                        start_ts_ms = ?point.ts_ms,
                        "window planned"
                    );
                    windows.push(window);
                }
                Some(window) => {
                    tracing::debug!(partition = %window.partition(), start, "empty window");
                }
                None => {
                    tracing::debug!(start, end, "window end before start");
                }
            }
        }

        tracing::debug!(
            topic,
            from_ms,
            to_ms,
            windows = windows.len(),
            substituted = marks.len(),
            "planned search windows"
        );
        Ok(windows)
    }
}
