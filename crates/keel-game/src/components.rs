// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Standard component schemas shared by every Keel game.
//!
//! `transform2d`, `rigid_body`, and `sprite` are synchronised;
//! `render_prev` is client-local interpolation state rebuilt by
//! [`sync_render_prev`] after a snapshot restore.

use keel_core::ident::Entity;
use keel_core::store::{ComponentId, ComponentStore, FieldDef, StoreError};

/// Handles to the standard components.
#[derive(Debug, Clone, Copy)]
pub struct CoreComponents {
    /// Position and rotation.
    pub transform: ComponentId,
    /// Physics body description and mirrored velocities.
    pub rigid_body: ComponentId,
    /// Render description read by the renderer collaborator.
    pub sprite: ComponentId,
    /// Previous-position interpolation state (client-local).
    pub render_prev: ComponentId,
}

/// Body kind codes stored in `rigid_body.kind`.
pub mod body_kind {
    /// Static body.
    pub const STATIC: u8 = 0;
    /// Kinematic body.
    pub const KINEMATIC: u8 = 1;
    /// Dynamic body.
    pub const DYNAMIC: u8 = 2;
}

/// Shape codes stored in `rigid_body.shape` and `sprite.shape`.
pub mod shape_kind {
    /// Circle.
    pub const CIRCLE: u8 = 0;
    /// Axis-aligned rectangle.
    pub const RECT: u8 = 1;
}

/// Registers the standard components, returning their handles.
pub fn register_components(store: &mut ComponentStore) -> Result<CoreComponents, StoreError> {
    let transform = store.define_component(
        "transform2d",
        true,
        vec![
            FieldDef::fixed("x", 0.0),
            FieldDef::fixed("y", 0.0),
            FieldDef::fixed("angle", 0.0),
        ],
    )?;

    let rigid_body = store.define_component(
        "rigid_body",
        true,
        vec![
            FieldDef::u8("kind", body_kind::DYNAMIC),
            FieldDef::u8("shape", shape_kind::CIRCLE),
            FieldDef::fixed("radius", 0.5),
            FieldDef::fixed("half_w", 0.5),
            FieldDef::fixed("half_h", 0.5),
            FieldDef::fixed("mass", 1.0),
            FieldDef::fixed("restitution", 0.0),
            FieldDef::fixed("friction", 0.0),
            FieldDef::fixed("vx", 0.0),
            FieldDef::fixed("vy", 0.0),
            FieldDef::fixed("angular_velocity", 0.0),
            // 16-bit layer/mask bit sets, stored as integers.
            FieldDef::fixed("layer", 1.0),
            FieldDef::fixed("mask", 65535.0),
            FieldDef::flag("sensor", false),
            FieldDef::flag("fixed_rotation", false),
        ],
    )?;

    let sprite = store.define_component(
        "sprite",
        true,
        vec![
            FieldDef::u8("shape", shape_kind::CIRCLE),
            FieldDef::fixed("width", 1.0),
            FieldDef::fixed("height", 1.0),
            FieldDef::fixed("radius", 0.5),
            FieldDef::u8("color_r", 255),
            FieldDef::u8("color_g", 255),
            FieldDef::u8("color_b", 255),
            FieldDef::fixed("sprite_id", 0.0),
            FieldDef::fixed("offset_x", 0.0),
            FieldDef::fixed("offset_y", 0.0),
            FieldDef::fixed("scale", 1.0),
            FieldDef::u8("layer", 0),
            FieldDef::flag("visible", true),
        ],
    )?;

    let render_prev = store.define_component(
        "render_prev",
        false,
        vec![FieldDef::f32("prev_x", 0.0), FieldDef::f32("prev_y", 0.0)],
    )?;

    Ok(CoreComponents {
        transform,
        rigid_body,
        sprite,
        render_prev,
    })
}

/// Restore hook: seeds previous-position interpolation state from the
/// synchronised transform so the first rendered frame after a restore does
/// not lerp from stale coordinates.
pub fn sync_render_prev(store: &mut ComponentStore, entity: Entity) {
    let (Some(transform), Some(render_prev)) = (
        store.component_id("transform2d"),
        store.component_id("render_prev"),
    ) else {
        return;
    };
    let (Ok(x), Ok(y)) = (
        store.fixed(entity, transform, "x"),
        store.fixed(entity, transform, "y"),
    ) else {
        return;
    };
    let _ = store.set_float(entity, render_prev, "prev_x", x.to_f32());
    let _ = store.set_float(entity, render_prev, "prev_y", y.to_f32());
}
