//! NVIDIA Bare Metal Manager REST API Client
//!
//! A Rust client for the instance lifecycle endpoints of the BMM REST API.
//!
//! # Example
//!
//! ```no_run
//! use bmm_client::{BmmClient, GetInstanceParams};
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BmmClient::new(
//!     "https://api.nvidia-bmm.example".to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! let id = Uuid::parse_str("3f2504e0-4f89-41d3-9a0c-0305e82c3301")?;
//! if let Some(instance) = client.get_instance("my-org", id, &GetInstanceParams::default()).await? {
//!     println!("{} is {:?}", instance.id, instance.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod bmm_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use bmm_trait::BmmClientTrait;
pub use client::BmmClient;
pub use common::HttpClient;
pub use error::BmmError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockBmmClient;
