//! ECS integration for the Quarry client.
//!
//! [`GameApp`] owns a `bevy_ecs` [`World`](bevy_ecs::world::World) holding
//! every piece of session state as a resource, and runs the systems in the
//! fixed [`GameSet`] order once per frame on a single thread.

pub mod app;
pub mod resources;
pub mod schedule;
pub mod systems;

pub use app::{FrameView, GameApp, RemoteView};
pub use resources::{
    FrameClock, FrameEvents, FrameInput, GameConfig, LocalBody, MAX_NOTICES,
    MOUSE_RADIANS_PER_PIXEL, NetworkLink, Notice, NoticeKind, Notices, ViewAngles,
};
pub use schedule::{GameSet, build_schedule};
