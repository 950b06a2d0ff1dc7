//! Shared infrastructure: the game clock, advisory locks, and the
//! dictionary loader.

pub mod clock;
pub mod dictionary;
pub mod locks;

pub use clock::Clock;
pub use dictionary::Dictionary;
pub use locks::LockManager;
