//! Service instance operations: provision, inspect, and tear down MySQLCS
//! instances
//!
//! Mutating calls block until the remote state machine settles. Creation and
//! deletion are observed through the instance's reported status; the remote
//! API is eventually consistent, so a freshly created instance may not
//! appear immediately (lookup misses during create-wait mean "keep
//! waiting") while disappearance is itself the terminal signal for
//! delete-wait.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{ContentType, MysqlcsClient};
use crate::de;
use crate::error::{Error, Result};
use crate::poll::{PollOptions, ProgressCallback, poll_until};

/// Lifecycle status reported by a service instance.
///
/// The server's status vocabulary can drift; values this client does not
/// recognize are preserved in [`ServiceInstanceStatus::Unknown`] and treated
/// as "still in progress" by the wait probes, never as failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceInstanceStatus {
    Ready,
    Initializing,
    Starting,
    Stopping,
    Stopped,
    Configuring,
    Error,
    Terminating,
    Unknown(String),
}

impl ServiceInstanceStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ServiceInstanceStatus::Ready => "READY",
            ServiceInstanceStatus::Initializing => "INITIALIZING",
            ServiceInstanceStatus::Starting => "STARTING",
            ServiceInstanceStatus::Stopping => "STOPPING",
            ServiceInstanceStatus::Stopped => "STOPPED",
            ServiceInstanceStatus::Configuring => "CONFIGURING",
            ServiceInstanceStatus::Error => "ERROR",
            ServiceInstanceStatus::Terminating => "TERMINATING",
            ServiceInstanceStatus::Unknown(s) => s,
        }
    }
}

impl From<&str> for ServiceInstanceStatus {
    fn from(s: &str) -> Self {
        match s {
            "READY" => ServiceInstanceStatus::Ready,
            "INITIALIZING" => ServiceInstanceStatus::Initializing,
            "STARTING" => ServiceInstanceStatus::Starting,
            "STOPPING" => ServiceInstanceStatus::Stopping,
            "STOPPED" => ServiceInstanceStatus::Stopped,
            "CONFIGURING" => ServiceInstanceStatus::Configuring,
            "ERROR" => ServiceInstanceStatus::Error,
            "TERMINATING" => ServiceInstanceStatus::Terminating,
            other => ServiceInstanceStatus::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for ServiceInstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ServiceInstanceStatus {
    fn default() -> Self {
        ServiceInstanceStatus::Unknown(String::new())
    }
}

impl<'de> Deserialize<'de> for ServiceInstanceStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ServiceInstanceStatus::from(s.as_str()))
    }
}

impl Serialize for ServiceInstanceStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Snapshot of a service instance as reported by the management API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    pub service_name: String,
    /// Numeric id; the live API returns this as a number or a quoted string
    #[serde(default, deserialize_with = "de::opt_u64_or_string")]
    pub service_id: Option<u64>,
    #[serde(default)]
    pub status: ServiceInstanceStatus,
    /// Populated when `status` is `ERROR`
    #[serde(default, rename = "error_reason")]
    pub error_reason: Option<String>,
    #[serde(default)]
    pub service_description: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub service_level: Option<String>,
    #[serde(default)]
    pub subscription_type: Option<String>,
    #[serde(default)]
    pub mysql_version: Option<String>,
    #[serde(default, rename = "emURL")]
    pub em_url: Option<String>,
    #[serde(default)]
    pub components: Option<ServiceComponents>,
}

/// Component block inside a service instance snapshot
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceComponents {
    #[serde(default)]
    pub mysql: Option<MysqlComponent>,
}

/// The MySQL server component of an instance
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MysqlComponent {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default, deserialize_with = "de::opt_u64_or_string")]
    pub mysql_port: Option<u64>,
    #[serde(default)]
    pub connect_string: Option<String>,
}

/// Container response for the instance list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceInstanceList {
    #[serde(default)]
    pub services: Vec<ServiceInstance>,
}

/// Request body for provisioning a service instance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceInstanceInput {
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_description: Option<String>,
    /// `NONE` or `BOTH`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "vmPublicKeyText")]
    pub ssh_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metering_frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    pub component_parameters: ComponentParameters,
}

/// Component parameters for provisioning; MySQLCS has a single component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentParameters {
    pub mysql: MysqlParameters,
}

/// Parameters for the MySQL server component
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MysqlParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    /// Storage volume size in GB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_storage: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mysql_charset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mysql_collation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mysql_port: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "mysqlUserName")]
    pub mysql_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "mysqlUserPassword")]
    pub mysql_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_monitor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_name: Option<String>,
}

/// Request body for updating an existing service instance
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceInstanceInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    /// Extra storage to attach, in GB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_storage: Option<u64>,
}

/// Handler for service instance operations
pub struct ServiceInstanceHandler {
    client: MysqlcsClient,
}

impl ServiceInstanceHandler {
    #[must_use]
    pub fn new(client: MysqlcsClient) -> Self {
        Self { client }
    }

    /// Fetch one instance by name. A missing instance surfaces as
    /// [`Error::NotFound`], which the delete-wait probe treats as success.
    pub async fn get(&self, name: &str) -> Result<ServiceInstance> {
        self.client.get_json(&self.client.instance_path(name)).await
    }

    /// List all instances in the identity domain
    pub async fn list(&self) -> Result<Vec<ServiceInstance>> {
        let list: ServiceInstanceList = self
            .client
            .get_json(&self.client.instance_container_path())
            .await?;
        Ok(list.services)
    }

    /// Provision an instance and wait until it reports `READY`.
    ///
    /// Issues one POST to start provisioning, then polls the instance status
    /// until it is ready, reports `ERROR` (fatal, carrying the server's
    /// `error_reason`), or `opts` runs out of time. Returns the final fetched
    /// instance state.
    pub async fn create(
        &self,
        input: &CreateServiceInstanceInput,
        opts: Option<PollOptions>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<ServiceInstance> {
        let name = &input.service_name;
        info!(service_name = %name, "creating service instance");
        self.client
            .execute(
                Method::POST,
                &self.client.instance_container_path(),
                Some(input),
                ContentType::ProvisioningService,
            )
            .await?;

        let opts = opts.unwrap_or(PollOptions::SERVICE_INSTANCE);
        let description = format!("service instance {name} to be ready");
        poll_until(&description, opts, on_progress, async || {
            create_wait_verdict(name, self.get(name).await)
        })
        .await?;

        self.get(name).await
    }

    /// Apply an update and wait for the instance to return to `READY`.
    ///
    /// An updating instance passes through `CONFIGURING`; the same status
    /// interpretation as create-wait applies. Returns the final fetched
    /// instance state.
    pub async fn update(
        &self,
        name: &str,
        input: &UpdateServiceInstanceInput,
        opts: Option<PollOptions>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<ServiceInstance> {
        info!(service_name = %name, "updating service instance");
        self.client
            .execute(
                Method::PUT,
                &self.client.instance_path(name),
                Some(input),
                ContentType::ProvisioningService,
            )
            .await?;

        let opts = opts.unwrap_or(PollOptions::SERVICE_INSTANCE);
        let description = format!("service instance {name} to finish updating");
        poll_until(&description, opts, on_progress, async || {
            create_wait_verdict(name, self.get(name).await)
        })
        .await?;

        self.get(name).await
    }

    /// Delete an instance and wait until the lookup reports it gone.
    ///
    /// Deletion is asynchronous on the server; the instance lingers in
    /// `TERMINATING` until its record disappears. A `NotFound` lookup is the
    /// positive terminal signal here.
    pub async fn delete(
        &self,
        name: &str,
        opts: Option<PollOptions>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<()> {
        info!(service_name = %name, "deleting service instance");
        self.client
            .execute::<()>(
                Method::DELETE,
                &self.client.instance_path(name),
                None,
                ContentType::ProvisioningService,
            )
            .await?;

        let opts = opts.unwrap_or(PollOptions::SERVICE_INSTANCE);
        let description = format!("service instance {name} to be deleted");
        poll_until(&description, opts, on_progress, async || {
            delete_wait_verdict(self.get(name).await)
        })
        .await
    }
}

/// Interpret one create-wait (or update-wait) poll tick.
///
/// `READY` is done; `ERROR` is fatal with the server-reported reason; a
/// missing record means the instance has not surfaced yet, never success.
fn create_wait_verdict(
    name: &str,
    snapshot: Result<ServiceInstance>,
) -> Result<bool> {
    match snapshot {
        Ok(instance) => {
            debug!(service_name = %name, status = %instance.status, "service instance status");
            match instance.status {
                ServiceInstanceStatus::Ready => Ok(true),
                ServiceInstanceStatus::Error => {
                    Err(Error::OperationFailed(instance.error_reason.unwrap_or_else(
                        || format!("service instance {name} reported status ERROR"),
                    )))
                }
                _ => Ok(false),
            }
        }
        // Eventual consistency: a freshly created instance may not appear
        // on the first few lookups
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Interpret one delete-wait poll tick.
///
/// Absence of the record is the terminal success signal; `ERROR` is fatal;
/// everything else (including `TERMINATING`) means keep waiting.
fn delete_wait_verdict(snapshot: Result<ServiceInstance>) -> Result<bool> {
    match snapshot {
        Err(e) if e.is_not_found() => Ok(true),
        Err(e) => Err(e),
        Ok(instance) => match instance.status {
            ServiceInstanceStatus::Error => {
                Err(Error::OperationFailed(instance.error_reason.unwrap_or_else(
                    || {
                        format!(
                            "service instance {} reported status ERROR during deletion",
                            instance.service_name
                        )
                    },
                )))
            }
            _ => Ok(false),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(status: &str, error_reason: Option<&str>) -> ServiceInstance {
        serde_json::from_value(serde_json::json!({
            "serviceName": "demo",
            "status": status,
            "error_reason": error_reason,
        }))
        .unwrap()
    }

    #[test]
    fn status_parses_known_values() {
        assert_eq!(
            ServiceInstanceStatus::from("READY"),
            ServiceInstanceStatus::Ready
        );
        assert_eq!(
            ServiceInstanceStatus::from("TERMINATING"),
            ServiceInstanceStatus::Terminating
        );
        assert_eq!(
            ServiceInstanceStatus::from("SOMETHING_NEW"),
            ServiceInstanceStatus::Unknown("SOMETHING_NEW".to_string())
        );
    }

    #[test]
    fn status_round_trips_through_serde() {
        let json = serde_json::to_string(&ServiceInstanceStatus::Configuring).unwrap();
        assert_eq!(json, "\"CONFIGURING\"");
        let status: ServiceInstanceStatus = serde_json::from_str("\"STOPPED\"").unwrap();
        assert_eq!(status, ServiceInstanceStatus::Stopped);
    }

    #[test]
    fn create_wait_ready_is_done() {
        let verdict = create_wait_verdict("demo", Ok(instance("READY", None)));
        assert!(matches!(verdict, Ok(true)));
    }

    #[test]
    fn create_wait_in_progress_states_continue() {
        for status in ["INITIALIZING", "STARTING", "CONFIGURING", "BRAND_NEW_STATE"] {
            let verdict = create_wait_verdict("demo", Ok(instance(status, None)));
            assert!(matches!(verdict, Ok(false)), "status {status} should continue");
        }
    }

    #[test]
    fn create_wait_error_carries_error_reason() {
        let verdict = create_wait_verdict(
            "demo",
            Ok(instance("ERROR", Some("shape not available in region"))),
        );
        match verdict {
            Err(Error::OperationFailed(msg)) => {
                assert!(msg.contains("shape not available in region"));
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn create_wait_error_without_reason_names_the_instance() {
        let verdict = create_wait_verdict("demo", Ok(instance("ERROR", None)));
        match verdict {
            Err(Error::OperationFailed(msg)) => assert!(msg.contains("demo")),
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn create_wait_not_found_continues() {
        let verdict = create_wait_verdict(
            "demo",
            Err(Error::NotFound {
                message: "no such instance".to_string(),
            }),
        );
        assert!(matches!(verdict, Ok(false)));
    }

    #[test]
    fn create_wait_transport_error_is_fatal() {
        let verdict = create_wait_verdict(
            "demo",
            Err(Error::Api {
                status: 500,
                message: "boom".to_string(),
            }),
        );
        assert!(verdict.is_err());
    }

    #[test]
    fn delete_wait_not_found_is_done() {
        let verdict = delete_wait_verdict(Err(Error::NotFound {
            message: "gone".to_string(),
        }));
        assert!(matches!(verdict, Ok(true)));
    }

    #[test]
    fn delete_wait_terminating_continues() {
        for status in ["TERMINATING", "READY", "WEIRD"] {
            let verdict = delete_wait_verdict(Ok(instance(status, None)));
            assert!(matches!(verdict, Ok(false)), "status {status} should continue");
        }
    }

    #[test]
    fn delete_wait_error_is_fatal() {
        let verdict = delete_wait_verdict(Ok(instance("ERROR", Some("stuck volume"))));
        match verdict {
            Err(Error::OperationFailed(msg)) => assert!(msg.contains("stuck volume")),
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn instance_decodes_with_drifting_service_id() {
        let from_number: ServiceInstance = serde_json::from_value(serde_json::json!({
            "serviceName": "demo", "serviceId": 4211, "status": "READY"
        }))
        .unwrap();
        assert_eq!(from_number.service_id, Some(4211));

        let from_string: ServiceInstance = serde_json::from_value(serde_json::json!({
            "serviceName": "demo", "serviceId": "4211", "status": "READY"
        }))
        .unwrap();
        assert_eq!(from_string.service_id, Some(4211));
    }

    #[test]
    fn create_input_serializes_component_parameters() {
        let input = CreateServiceInstanceInput {
            service_name: "demo".to_string(),
            service_description: None,
            backup_destination: Some("NONE".to_string()),
            ssh_public_key: Some("ssh-rsa AAAA".to_string()),
            notification_email: None,
            metering_frequency: None,
            service_level: Some("PAAS".to_string()),
            subscription_type: Some("HOURLY".to_string()),
            component_parameters: ComponentParameters {
                mysql: MysqlParameters {
                    db_name: Some("appdb".to_string()),
                    db_storage: Some(25),
                    mysql_username: Some("admin".to_string()),
                    mysql_password: Some("secret".to_string()),
                    shape: Some("oc3".to_string()),
                    ..Default::default()
                },
            },
        };

        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["serviceName"], "demo");
        assert_eq!(value["vmPublicKeyText"], "ssh-rsa AAAA");
        let mysql = &value["componentParameters"]["mysql"];
        assert_eq!(mysql["dbName"], "appdb");
        assert_eq!(mysql["dbStorage"], 25);
        assert_eq!(mysql["mysqlUserName"], "admin");
        assert_eq!(mysql["mysqlUserPassword"], "secret");
        // absent options are omitted, not null
        assert!(mysql.get("snapshotName").is_none());
        assert!(value.get("serviceDescription").is_none());
    }
}
