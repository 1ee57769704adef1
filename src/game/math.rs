use glam::Vec2;

#[inline(always)]
pub fn lerp(start: f32, end: f32, progress: f32) -> f32 {
    start + (end - start) * progress
}

/// Progress through `[start, end)` at `time`. Zero-length spans jump straight
/// to their end value.
#[inline(always)]
pub fn span_progress(start: f32, end: f32, time: f32) -> f32 {
    let len = end - start;
    if len == 0.0 { 1.0 } else { (time - start) / len }
}

/// Offsets `origin` by `along` units in the direction of `rotation_deg` and by
/// `across` units perpendicular to it (rotation + 90 degrees).
#[inline(always)]
pub fn rotate_translate(origin: Vec2, rotation_deg: f32, along: f32, across: f32) -> Vec2 {
    let mut out = origin;
    if along != 0.0 {
        let (sin, cos) = rotation_deg.to_radians().sin_cos();
        out += Vec2::new(cos, sin) * along;
    }
    if across != 0.0 {
        let (sin, cos) = (rotation_deg + 90.0).to_radians().sin_cos();
        out += Vec2::new(cos, sin) * across;
    }
    out
}
