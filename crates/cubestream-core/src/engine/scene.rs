use super::error::StreamError;
use crate::core::models::snapshot::AtomicSimulationSnapshot;
use nalgebra::Point3;
use std::path::Path;
use std::sync::Arc;

/// A scene-graph node tracking one atom.
pub trait SceneNode: Send + Sync {
    fn set_position(&self, position: Point3<f32>);
}

/// Index-aligned mapping from snapshot atoms to scene nodes.
///
/// The node list is fixed when the stream starts; every later snapshot must carry
/// exactly as many atoms.
pub struct SceneBinding {
    nodes: Vec<Arc<dyn SceneNode>>,
    scaling_factor: f64,
}

impl SceneBinding {
    pub fn new(nodes: Vec<Arc<dyn SceneNode>>, scaling_factor: f64) -> Self {
        Self {
            nodes,
            scaling_factor,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    /// Fails without touching any node when the atom count differs.
    pub fn check(&self, snapshot: &AtomicSimulationSnapshot, path: &Path) -> Result<(), StreamError> {
        if snapshot.number_of_atoms() != self.nodes.len() {
            return Err(StreamError::AtomCountMismatch {
                path: path.to_path_buf(),
                expected: self.nodes.len(),
                found: snapshot.number_of_atoms(),
            });
        }
        Ok(())
    }

    pub fn apply(&self, snapshot: &AtomicSimulationSnapshot, path: &Path) -> Result<(), StreamError> {
        self.check(snapshot, path)?;
        for (node, position) in self.nodes.iter().zip(snapshot.atomic_positions()) {
            node.set_position(scene_position(position, self.scaling_factor));
        }
        Ok(())
    }
}

#[inline]
pub fn scene_position(position: &Point3<f64>, scaling_factor: f64) -> Point3<f32> {
    (*position * scaling_factor).cast::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::density::DensityNormalizer;
    use crate::core::io::cube::CubeData;
    use nalgebra::Vector3;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNode {
        position: Mutex<Option<Point3<f32>>>,
    }

    impl SceneNode for RecordingNode {
        fn set_position(&self, position: Point3<f32>) {
            *self.position.lock() = Some(position);
        }
    }

    fn snapshot(positions: Vec<Point3<f64>>) -> AtomicSimulationSnapshot {
        let data = CubeData {
            comments: [String::new(), String::new()],
            origin: Point3::origin(),
            grid_dimensions: [1, 1, 1],
            grid_spacings: Vector3::new(1.0, 1.0, 1.0),
            atomic_numbers: vec![4; positions.len()],
            atomic_positions: positions,
            density: vec![0.0],
        };
        AtomicSimulationSnapshot::assemble(data, &DensityNormalizer::disabled())
    }

    #[test]
    fn apply_moves_nodes_in_atom_order_with_scaling() {
        let nodes: Vec<Arc<RecordingNode>> = (0..2).map(|_| Arc::default()).collect();
        let binding = SceneBinding::new(
            nodes.iter().map(|n| Arc::clone(n) as Arc<dyn SceneNode>).collect(),
            0.5,
        );

        binding
            .apply(
                &snapshot(vec![Point3::new(2.0, 4.0, 6.0), Point3::new(-2.0, 0.0, 1.0)]),
                Path::new("s.cube"),
            )
            .unwrap();

        assert_eq!(*nodes[0].position.lock(), Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(*nodes[1].position.lock(), Some(Point3::new(-1.0, 0.0, 0.5)));
    }

    #[test]
    fn atom_count_change_is_rejected_before_any_update() {
        let node = Arc::new(RecordingNode::default());
        let binding = SceneBinding::new(vec![node.clone() as Arc<dyn SceneNode>], 1.0);

        let err = binding
            .apply(
                &snapshot(vec![Point3::origin(), Point3::origin()]),
                Path::new("s.cube"),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            StreamError::AtomCountMismatch {
                expected: 1,
                found: 2,
                ..
            }
        ));
        assert!(node.position.lock().is_none());
    }
}
