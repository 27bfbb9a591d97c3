//! Stream-level projections.
//!
//! Accessors from [`reactive_xhr_core::accessors`] answer questions about one
//! snapshot. Lifted over a snapshot stream they become streams of answers, and
//! consumers care about changes, not repetitions: every projection here suppresses
//! consecutive equal values.
//!
//! # Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use reactive_xhr_core::accessors;
//! use reactive_xhr_runtime::SnapshotStreamExt;
//!
//! let succeeded: Vec<bool> = session
//!     .subscribe()
//!     .project(accessors::down_has_succeeded)
//!     .collect()
//!     .await;
//! assert_eq!(succeeded, vec![false, true]);
//! ```

use futures::{Stream, StreamExt, future};
use reactive_xhr_core::{Connection, ResponseBody, Snapshot, accessors};

/// Drop items equal to the one emitted just before them.
///
/// Structural equality (`PartialEq`) decides: `A, A, B, A` becomes `A, B, A`.
pub fn skip_duplicates<S>(stream: S) -> impl Stream<Item = S::Item>
where
    S: Stream,
    S::Item: PartialEq + Clone,
{
    let mut last: Option<S::Item> = None;
    stream.filter(move |item| {
        let fresh = last.as_ref() != Some(item);
        if fresh {
            last = Some(item.clone());
        }
        future::ready(fresh)
    })
}

/// Projections over any stream of snapshots.
pub trait SnapshotStreamExt<C>: Stream<Item = Snapshot<C>> + Sized
where
    C: Connection,
{
    /// Map every snapshot through `f`, skipping consecutive equal results.
    fn project<T, F>(self, mut f: F) -> impl Stream<Item = T>
    where
        T: PartialEq + Clone,
        F: FnMut(&Snapshot<C>) -> T,
    {
        skip_duplicates(self.map(move |snapshot| f(&snapshot)))
    }

    /// Like [`project`](Self::project), but absent values are dropped.
    fn project_present<T, F>(self, mut f: F) -> impl Stream<Item = T>
    where
        T: PartialEq + Clone,
        F: FnMut(&Snapshot<C>) -> Option<T>,
    {
        skip_duplicates(self.filter_map(move |snapshot| future::ready(f(&snapshot))))
    }

    /// Response bodies as they become available, each distinct value once in a row.
    fn responses(self) -> impl Stream<Item = ResponseBody> {
        self.project_present(accessors::response)
    }

    /// Value of a response header as observed at each snapshot.
    fn response_header(self, name: impl Into<String>) -> impl Stream<Item = String> {
        let name = name.into();
        self.project_present(move |snapshot| accessors::response_header(&name, snapshot))
    }
}

impl<C, S> SnapshotStreamExt<C> for S
where
    C: Connection,
    S: Stream<Item = Snapshot<C>>,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::stream;

    #[test]
    fn skips_consecutive_duplicates_only() {
        let values: Vec<_> = block_on(skip_duplicates(stream::iter(["A", "A", "B", "A"])).collect());
        assert_eq!(values, vec!["A", "B", "A"]);
    }

    #[test]
    fn structural_equality_decides() {
        let a1 = vec![1, 2];
        let a2 = vec![1, 2];
        let b = vec![3];
        let values: Vec<_> = block_on(skip_duplicates(stream::iter([a1, a2, b])).collect());
        assert_eq!(values, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn empty_stream_stays_empty() {
        let values: Vec<u8> = block_on(skip_duplicates(stream::iter(Vec::<u8>::new())).collect());
        assert!(values.is_empty());
    }
}
