//! # Kickabout
//!
//! Real-time relay server for a two-player, browser-rendered soccer
//! game. Clients simulate the physics locally; the server seats them in
//! rooms, mirrors whatever state they report, and fans events out to the
//! other occupant. No server-side physics, no anti-cheat — the relay
//! trusts its two cooperating peers and favours availability over
//! strict validation.
//!
//! ```rust,no_run
//! use kickabout::KickaboutServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = KickaboutServerBuilder::new()
//!         .bind("0.0.0.0:8080")
//!         .build()
//!         .await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::KickaboutError;
pub use server::{KickaboutServer, KickaboutServerBuilder};
