//! Timer wheel: the background task that expires channels past `timeout_at`.

pub mod wheel;

pub use wheel::TimerWheel;
