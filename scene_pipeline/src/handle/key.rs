use std::fmt;

/// Kind of scene object a Key addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    /// A logical mesh entity; one drawable per submesh is derived from it
    Drawable,
    Camera,
    PointLight,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 3] = [ObjectKind::Drawable, ObjectKind::Camera, ObjectKind::PointLight];

    pub(crate) fn index(self) -> usize {
        match self {
            ObjectKind::Drawable => 0,
            ObjectKind::Camera => 1,
            ObjectKind::PointLight => 2,
        }
    }
}

/// Opaque handle to a scene object.
///
/// Valid from `KeyAllocator::allocate` until the matching `release`; the
/// generation tells a released Key apart from a later reuse of its slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    kind: ObjectKind,
    slot: u32,
    generation: u32,
}

impl Key {
    /// Never returned by an allocator
    pub const INVALID: Key = Key {
        kind: ObjectKind::Drawable,
        slot: u32::MAX,
        generation: u32::MAX,
    };

    pub(crate) fn new(kind: ObjectKind, slot: u32, generation: u32) -> Self {
        Self { kind, slot, generation }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// False only for `Key::INVALID`; a released Key still reports true
    pub fn is_valid(&self) -> bool {
        self.slot != u32::MAX
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::INVALID
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{:?}#{}v{}", self.kind, self.slot, self.generation)
        } else {
            write!(f, "Key::INVALID")
        }
    }
}
