use super::publish::SnapshotCell;
use crate::core::models::snapshot::VolumeGeometry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TimelineError {
    #[error("No timepoints have been appended yet")]
    Empty,
}

/// One buffered volume frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timepoint {
    pub label: String,
    pub frame: Arc<[u8]>,
}

/// The volume collaborator the streaming loop drives.
///
/// Implementations are shared between the producer and the renderer, so every
/// method takes `&self`. Only the producer ever appends, selects or purges.
pub trait VolumeTimeline: Send + Sync {
    /// Adds a frame at the tail. Never fails; a duplicate label is stored as a new
    /// entry and leaves existing entries untouched.
    fn append_timepoint(&self, label: &str, frame: Arc<[u8]>);

    /// Makes the most recently appended frame current.
    fn select_latest_timepoint(&self) -> Result<(), TimelineError>;

    /// Removes up to `count` frames from the head and returns how many went.
    ///
    /// Never leaves fewer than `keep_minimum` entries and never removes the
    /// current frame.
    fn purge_oldest(&self, count: usize, keep_minimum: usize) -> usize;
}

/// Bounded, time-indexed buffer of quantized volume frames.
///
/// The current selection is published through a [`SnapshotCell`], so a renderer
/// reading [`TimepointBuffer::current`] never waits on the producer and keeps its
/// frame alive for as long as it holds the returned `Arc`, even if the entry is
/// purged in the meantime.
#[derive(Debug)]
pub struct TimepointBuffer {
    geometry: VolumeGeometry,
    entries: Mutex<VecDeque<Arc<Timepoint>>>,
    current: SnapshotCell<Option<Arc<Timepoint>>>,
}

impl TimepointBuffer {
    pub fn new(geometry: VolumeGeometry) -> Self {
        Self {
            geometry,
            entries: Mutex::new(VecDeque::new()),
            current: SnapshotCell::new(None),
        }
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// The frame the renderer should display, if any has been selected.
    pub fn current(&self) -> Option<Arc<Timepoint>> {
        (*self.current.load()).clone()
    }

    /// Newest entry carrying `label`.
    pub fn get(&self, label: &str) -> Option<Arc<Timepoint>> {
        self.entries
            .lock()
            .iter()
            .rev()
            .find(|tp| tp.label == label)
            .cloned()
    }

    /// Labels from oldest to newest.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|tp| tp.label.clone())
            .collect()
    }
}

impl VolumeTimeline for TimepointBuffer {
    fn append_timepoint(&self, label: &str, frame: Arc<[u8]>) {
        self.entries.lock().push_back(Arc::new(Timepoint {
            label: label.to_string(),
            frame,
        }));
    }

    fn select_latest_timepoint(&self) -> Result<(), TimelineError> {
        let latest = self
            .entries
            .lock()
            .back()
            .cloned()
            .ok_or(TimelineError::Empty)?;
        self.current.publish(Arc::new(Some(latest)));
        Ok(())
    }

    fn purge_oldest(&self, count: usize, keep_minimum: usize) -> usize {
        let selected = self.current();
        let mut entries = self.entries.lock();
        let budget = count.min(entries.len().saturating_sub(keep_minimum));

        let mut removed = 0;
        while removed < budget {
            let is_current = match (entries.front(), &selected) {
                (Some(head), Some(selected)) => Arc::ptr_eq(head, selected),
                (Some(_), None) => false,
                (None, _) => break,
            };
            if is_current {
                break;
            }
            entries.pop_front();
            removed += 1;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    fn geometry() -> VolumeGeometry {
        VolumeGeometry {
            dimensions: [2, 1, 1],
            voxel_size: Vector3::new(1.0, 1.0, 1.0),
            origin: Point3::origin(),
        }
    }

    fn frame(value: u8) -> Arc<[u8]> {
        Arc::from(vec![value, value])
    }

    fn filled(count: u8) -> TimepointBuffer {
        let buffer = TimepointBuffer::new(geometry());
        for i in 0..count {
            buffer.append_timepoint(&i.to_string(), frame(i));
        }
        buffer
    }

    #[test]
    fn select_latest_on_empty_buffer_fails() {
        let buffer = TimepointBuffer::new(geometry());
        assert_eq!(buffer.select_latest_timepoint(), Err(TimelineError::Empty));
        assert!(buffer.current().is_none());
    }

    #[test]
    fn select_latest_points_at_newest_frame() {
        let buffer = filled(3);
        buffer.select_latest_timepoint().unwrap();
        assert_eq!(buffer.current().unwrap().label, "2");
    }

    #[test]
    fn oversized_purge_keeps_minimum_and_selected_frame() {
        let buffer = filled(5);
        buffer.select_latest_timepoint().unwrap();

        let removed = buffer.purge_oldest(10, 1);

        assert_eq!(removed, 4);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.labels(), vec!["4".to_string()]);
        assert_eq!(buffer.current().unwrap().label, "4");
    }

    #[test]
    fn purge_respects_keep_minimum() {
        let buffer = filled(5);
        buffer.select_latest_timepoint().unwrap();
        assert_eq!(buffer.purge_oldest(10, 3), 2);
        assert_eq!(buffer.labels(), vec!["2", "3", "4"]);
    }

    #[test]
    fn purge_stops_at_current_even_with_zero_minimum() {
        let buffer = TimepointBuffer::new(geometry());
        buffer.append_timepoint("a", frame(0));
        buffer.select_latest_timepoint().unwrap();
        buffer.append_timepoint("b", frame(1));
        buffer.append_timepoint("c", frame(2));

        assert_eq!(buffer.purge_oldest(3, 0), 0);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.current().unwrap().label, "a");
    }

    #[test]
    fn purge_on_empty_buffer_is_a_no_op() {
        let buffer = TimepointBuffer::new(geometry());
        assert_eq!(buffer.purge_oldest(10, 0), 0);
    }

    #[test]
    fn purged_frame_held_by_reader_stays_alive() {
        let buffer = filled(2);
        buffer.select_latest_timepoint().unwrap();
        let held = buffer.get("0").unwrap();

        buffer.purge_oldest(1, 1);

        assert!(buffer.get("0").is_none());
        assert_eq!(&*held.frame, &[0, 0]);
    }

    #[test]
    fn duplicate_labels_do_not_corrupt_existing_entries() {
        let buffer = TimepointBuffer::new(geometry());
        buffer.append_timepoint("x", frame(1));
        buffer.append_timepoint("x", frame(2));

        assert_eq!(buffer.len(), 2);
        assert_eq!(&*buffer.get("x").unwrap().frame, &[2, 2]);
        assert_eq!(buffer.labels(), vec!["x", "x"]);
    }
}
