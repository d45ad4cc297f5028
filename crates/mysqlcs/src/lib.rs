//! # mysqlcs
//!
//! Client for the Oracle MySQL Cloud Service (MySQLCS) management API:
//! create, inspect, update, and delete service instances and their network
//! access rules.
//!
//! Mutating operations on this API are asynchronous on the server side. The
//! handlers in this crate issue one request to start the change and then
//! block (in the async sense) on a bounded poll loop until the remote state
//! machine reaches a terminal state, a fatal status is reported, or the
//! timeout elapses. See [`poll`] for the wait loop and the per-resource
//! cadence defaults.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mysqlcs::{MysqlcsClient, ServiceInstanceHandler};
//! use mysqlcs::service_instance::{
//!     ComponentParameters, CreateServiceInstanceInput, MysqlParameters,
//! };
//!
//! #[tokio::main]
//! async fn main() -> mysqlcs::Result<()> {
//!     let client = MysqlcsClient::builder()
//!         .base_url("https://psm.us.oraclecloud.com")
//!         .identity_domain("acme")
//!         .username("user@acme.example")
//!         .password(std::env::var("MYSQLCS_PASSWORD").unwrap())
//!         .build()?;
//!
//!     let handler = ServiceInstanceHandler::new(client.clone());
//!     let input = CreateServiceInstanceInput {
//!         service_name: "demo".to_string(),
//!         service_description: None,
//!         backup_destination: Some("NONE".to_string()),
//!         ssh_public_key: Some("ssh-rsa AAAA...".to_string()),
//!         notification_email: None,
//!         metering_frequency: None,
//!         service_level: Some("PAAS".to_string()),
//!         subscription_type: Some("HOURLY".to_string()),
//!         component_parameters: ComponentParameters {
//!             mysql: MysqlParameters {
//!                 db_name: Some("appdb".to_string()),
//!                 shape: Some("oc3".to_string()),
//!                 ..Default::default()
//!             },
//!         },
//!     };
//!
//!     // Blocks until the instance reports READY (default: poll every 60s,
//!     // give up after an hour)
//!     let instance = handler.create(&input, None, None).await?;
//!     println!("{} is {}", instance.service_name, instance.status);
//!     Ok(())
//! }
//! ```
//!
//! Each handler call owns its task until the operation settles; run
//! operations on separate tasks (each with a clone of the client) for
//! parallelism. The client shares one connection pool across clones and is
//! safe for concurrent use.

pub mod access_rule;
pub mod client;
pub mod de;
pub mod error;
pub mod job;
pub mod poll;
pub mod service_instance;

pub use access_rule::{AccessRuleHandler, AccessRuleList, RuleDisposition};
pub use client::{MysqlcsClient, MysqlcsClientBuilder};
pub use error::{Error, Result};
pub use job::JobHandler;
pub use poll::{PollOptions, ProgressCallback, ProgressEvent, poll_until};
pub use service_instance::{ServiceInstanceHandler, ServiceInstanceStatus};
