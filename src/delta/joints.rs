//! Two-joint orientation state shared between the application and the
//! delta pair.

use std::sync::Arc;

use glam::{Quat, Vec3};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// One joint frame: a translation and a rotation.
///
/// The delta pair replicates rotations only; translations ride along
/// untouched so keyframes replace orientation without moving the joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointFrame {
    /// Position component, preserved by the delta pair.
    pub translation: Vec3,
    /// Orientation component, replicated by the delta pair.
    pub rotation: Quat,
}

impl JointFrame {
    /// Frame at the origin with no rotation.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a frame from both components.
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation }
    }

    /// Create a frame at the origin with the given rotation.
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation,
        }
    }
}

impl Default for JointFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The pair of joint frames replicated by the delta pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointPair {
    /// Joint "A".
    pub a: JointFrame,
    /// Joint "B".
    pub b: JointFrame,
}

impl JointPair {
    /// Both rotations, in (A, B) order.
    pub fn rotations(&self) -> (Quat, Quat) {
        (self.a.rotation, self.b.rotation)
    }
}

/// Shared handle to a joint pair.
///
/// Clones refer to the same state. The handle carries the destroy
/// notification that lifetime-links any attached transmitter or receiver:
/// [`destroy`](Self::destroy) fires the token and attached components
/// close themselves.
#[derive(Debug, Clone)]
pub struct JointHandle {
    state: Arc<RwLock<JointPair>>,
    destroyed: CancellationToken,
}

impl JointHandle {
    /// Create a handle owning the given initial state.
    pub fn new(initial: JointPair) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            destroyed: CancellationToken::new(),
        }
    }

    /// Copy out the current state.
    pub async fn read(&self) -> JointPair {
        *self.state.read().await
    }

    /// Mutate the state under the write lock.
    pub async fn update<R>(&self, f: impl FnOnce(&mut JointPair) -> R) -> R {
        let mut state = self.state.write().await;
        f(&mut state)
    }

    /// Replace both rotations, preserving translations.
    pub async fn set_rotations(&self, a: Quat, b: Quat) {
        self.update(|pair| {
            pair.a.rotation = a;
            pair.b.rotation = b;
        })
        .await;
    }

    /// Token cancelled when the state is destroyed.
    pub fn destroyed(&self) -> CancellationToken {
        self.destroyed.clone()
    }

    /// Signal destruction. Attached transmitters and receivers observe the
    /// token and close; the state itself stays readable for any remaining
    /// handle clones.
    pub fn destroy(&self) {
        self.destroyed.cancel();
    }

    /// Whether the state has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.is_cancelled()
    }
}

impl Default for JointHandle {
    fn default() -> Self {
        Self::new(JointPair::default())
    }
}
