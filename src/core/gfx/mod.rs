use glam::Vec2;
use std::borrow::Cow;

pub type Color = [f32; 4];

pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];

// Anchors are fractions of the object's size measured from its top-left.
pub const ANCHOR_CENTER: [f32; 2] = [0.5, 0.5];
pub const ANCHOR_TOP: [f32; 2] = [0.5, 0.0];
pub const ANCHOR_BOTTOM: [f32; 2] = [0.5, 1.0];

/// Draw capability consumed by the simulation. Coordinates are already in
/// centered screen space and rotations are in degrees.
pub trait Renderer {
    fn render_rect(&mut self, pos: Vec2, size: Vec2, rotation_deg: f32, color: Color, anchor: [f32; 2]);

    fn render_texture(
        &mut self,
        texture_id: &str,
        pos: Vec2,
        scale: Vec2,
        rotation_deg: f32,
        color: Color,
        anchor: [f32; 2],
    );
}

// --- Public Data Contract ---
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand<'a> {
    Rect {
        pos: Vec2,
        size: Vec2,
        rotation_deg: f32,
        color: Color,
        anchor: [f32; 2],
    },
    Texture {
        texture_id: Cow<'a, str>,
        pos: Vec2,
        scale: Vec2,
        rotation_deg: f32,
        color: Color,
        anchor: [f32; 2],
    },
}

/// Renderer that records one frame of draw calls for a backend to replay.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCommand<'static>>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[cfg(test)]
    pub fn rect_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Rect { .. }))
            .count()
    }
}

impl Renderer for DrawList {
    fn render_rect(&mut self, pos: Vec2, size: Vec2, rotation_deg: f32, color: Color, anchor: [f32; 2]) {
        self.commands.push(DrawCommand::Rect { pos, size, rotation_deg, color, anchor });
    }

    fn render_texture(
        &mut self,
        texture_id: &str,
        pos: Vec2,
        scale: Vec2,
        rotation_deg: f32,
        color: Color,
        anchor: [f32; 2],
    ) {
        self.commands.push(DrawCommand::Texture {
            texture_id: Cow::Owned(texture_id.to_owned()),
            pos,
            scale,
            rotation_deg,
            color,
            anchor,
        });
    }
}
