//! Client-side world model: cubes, the mining/respawn state machine, targeting
//! hysteresis, and effect subscriptions tied to the mining session.

pub mod cube;
pub mod effects;
pub mod events;
pub mod generation;
pub mod player;
pub mod store;
pub mod targeting;

pub use cube::{Cube, CubeId, CubeType};
pub use effects::{EffectCue, MiningEffects, SoundCue};
pub use events::{StopReason, WorldEvent};
pub use generation::generate_world;
pub use player::{LocalPlayer, LocalSecret, PlayerId, WalletKeys};
pub use store::{
    FrameOutcome, MinedCube, MiningSession, WithdrawRefusal, WithdrawalTicket, WorldStore,
};
pub use targeting::TargetTracker;
