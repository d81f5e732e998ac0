pub mod bridge;
pub mod cache;
pub mod cull;
pub mod draw;
pub mod hit;
pub mod pool;

pub use bridge::{BridgeConfig, RenderBridge};
pub use draw::{DrawContent, DrawItem, DrawList, Overlay};
pub use hit::{hit_test, hit_test_rect};
pub use pool::{NodePool, PoolStats, RenderHost};
