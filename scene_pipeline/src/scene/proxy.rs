/// Logic-side handle on the prepare stage.
///
/// The SceneProxy owns the KeyAllocator and turns every scene mutation into
/// a PrepareCommand. It never reads prepare-owned state. Operations on a
/// Key that is not live panic, as the mirror would on the same command.

use std::time::Duration;
use glam::{Mat4, Quat, Vec3};
use crate::error::{Error, Result};
use crate::handle::{Key, KeyAllocator, ObjectKind};
use crate::queue::CommandSender;
use super::commands::PrepareCommand;
use super::records::{MaterialRef, SubMeshInstance};

/// How often a blocked `prepare_draw_lists` checks for a dead prepare stage
const FRAME_TOKEN_POLL: Duration = Duration::from_millis(50);

pub struct SceneProxy {
    keys: KeyAllocator,
    commands: CommandSender<PrepareCommand>,
    /// One token per frame in flight; the render stage takes them back
    frame_tokens: flume::Sender<()>,
    /// Same channel; takes back the token of a frame that was never queued
    unused_tokens: flume::Receiver<()>,
}

impl SceneProxy {
    pub(crate) fn new(
        commands: CommandSender<PrepareCommand>,
        frame_tokens: flume::Sender<()>,
        unused_tokens: flume::Receiver<()>,
    ) -> Self {
        Self {
            keys: KeyAllocator::new(),
            commands,
            frame_tokens,
            unused_tokens,
        }
    }

    // ===== CREATION / DESTRUCTION =====

    /// Create a mesh entity; give it geometry with `set_geometry`
    pub fn create_drawable(&mut self) -> Result<Key> {
        self.create(ObjectKind::Drawable, PrepareCommand::CreateDrawable)
    }

    pub fn create_camera(&mut self) -> Result<Key> {
        self.create(ObjectKind::Camera, PrepareCommand::CreateCamera)
    }

    pub fn create_point_light(&mut self) -> Result<Key> {
        self.create(ObjectKind::PointLight, PrepareCommand::CreatePointLight)
    }

    /// Release `key` and destroy its mirror record.
    ///
    /// The Key is invalid as soon as this returns; its slot may be reissued
    /// by the next create of the same kind.
    pub fn destroy(&mut self, key: Key) -> Result<()> {
        self.keys.release(key);
        self.commands.enqueue(PrepareCommand::Destroy(key))
    }

    fn create(&mut self, kind: ObjectKind, command: fn(Key) -> PrepareCommand) -> Result<Key> {
        let key = self.keys.allocate(kind);
        if let Err(err) = self.commands.enqueue(command(key)) {
            self.keys.release(key);
            return Err(err);
        }
        Ok(key)
    }

    // ===== TRANSFORMS =====

    pub fn set_position(&mut self, key: Key, position: Vec3) -> Result<()> {
        self.send(key, PrepareCommand::SetPosition(key, position))
    }

    pub fn set_orientation(&mut self, key: Key, orientation: Quat) -> Result<()> {
        self.send(key, PrepareCommand::SetOrientation(key, orientation))
    }

    pub fn set_scale(&mut self, key: Key, scale: Vec3) -> Result<()> {
        self.send(key, PrepareCommand::SetScale(key, scale))
    }

    /// Apply the same position to every Key
    pub fn set_positions(&mut self, keys: &[Key], position: Vec3) -> Result<()> {
        keys.iter().try_for_each(|&key| self.set_position(key, position))
    }

    /// Apply the same orientation to every Key
    pub fn set_orientations(&mut self, keys: &[Key], orientation: Quat) -> Result<()> {
        keys.iter().try_for_each(|&key| self.set_orientation(key, orientation))
    }

    /// Apply the same scale to every Key
    pub fn set_scales(&mut self, keys: &[Key], scale: Vec3) -> Result<()> {
        keys.iter().try_for_each(|&key| self.set_scale(key, scale))
    }

    // ===== GEOMETRY / LIGHT / CAMERA =====

    /// Replace the drawables of a mesh entity, one per submesh.
    /// `materials[i]` is the material of `submeshes[i]`.
    pub fn set_geometry(
        &mut self,
        key: Key,
        submeshes: Vec<SubMeshInstance>,
        materials: Vec<Option<MaterialRef>>,
    ) -> Result<()> {
        self.send(key, PrepareCommand::SetGeometry { key, submeshes, materials })
    }

    pub fn set_point_light(&mut self, key: Key, color: Vec3, range: Vec3) -> Result<()> {
        self.send(key, PrepareCommand::SetPointLight { key, color, range })
    }

    pub fn set_camera_info(&mut self, key: Key, projection: Mat4) -> Result<()> {
        self.send(key, PrepareCommand::SetCameraInfo { key, projection })
    }

    // ===== FRAME =====

    /// Ask the prepare stage for this frame's draw lists.
    ///
    /// Blocks while `max_frames_in_flight` frames are still waiting for the
    /// render stage.
    pub fn prepare_draw_lists(&mut self) -> Result<()> {
        loop {
            // our own receiver is the only one left once the render stage exits
            if self.frame_tokens.receiver_count() <= 1 {
                return Err(Error::StageDisconnected("render stage is gone".to_string()));
            }
            match self.frame_tokens.send_timeout((), FRAME_TOKEN_POLL) {
                Ok(()) => break,
                Err(flume::SendTimeoutError::Timeout(())) => {
                    if self.commands.is_disconnected() {
                        return Err(Error::StageDisconnected("prepare stage is gone".to_string()));
                    }
                }
                Err(flume::SendTimeoutError::Disconnected(())) => {
                    return Err(Error::StageDisconnected("render stage is gone".to_string()));
                }
            }
        }
        if let Err(err) = self.commands.enqueue(PrepareCommand::PrepareDrawLists) {
            let _ = self.unused_tokens.try_recv();
            return Err(err);
        }
        Ok(())
    }

    /// Frames requested but not yet consumed by the render stage
    pub fn frames_in_flight(&self) -> usize {
        self.frame_tokens.len()
    }

    // ===== KEYS =====

    pub fn is_live(&self, key: Key) -> bool {
        self.keys.is_live(key)
    }

    pub fn live_count(&self, kind: ObjectKind) -> u32 {
        self.keys.live_count(kind)
    }

    fn send(&self, key: Key, command: PrepareCommand) -> Result<()> {
        assert!(self.keys.is_live(key), "{:?} is not live", key);
        self.commands.enqueue(command)
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
