//! Network access rule operations for a service instance
//!
//! The API has no per-operation status endpoint for access rules. One GET of
//! the rule container returns both the live rule list and the recent
//! activity records, and the wait probes interpret that single snapshot:
//! rule presence is checked first (a rule can appear in the live list before
//! its creation activity resolves), then the activity trail is consulted by
//! rule name. Only `FAILED` (case-insensitive) is fatal; unrecognized
//! activity statuses are treated as still in progress so server-side
//! vocabulary drift cannot surface as spurious failures.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{ContentType, MysqlcsClient};
use crate::error::{Error, Result};
use crate::poll::{PollOptions, ProgressCallback, poll_until};

/// Whether a rule admits or blocks traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRuleStatus {
    Enabled,
    Disabled,
}

/// Lenient decode for the rule status field: matched case-insensitively,
/// with anything unrecognized mapped to `None` rather than a decode error.
fn de_rule_status<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<AccessRuleStatus>, D::Error> {
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.and_then(|s| {
        if s.eq_ignore_ascii_case("enabled") {
            Some(AccessRuleStatus::Enabled)
        } else if s.eq_ignore_ascii_case("disabled") {
            Some(AccessRuleStatus::Disabled)
        } else {
            None
        }
    }))
}

/// One network access rule as reported by the API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRule {
    pub rule_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_rule_status")]
    pub status: Option<AccessRuleStatus>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    /// Port or port range, e.g. `"3306"` or `"3306-3310"`
    #[serde(default)]
    pub ports: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    /// `DEFAULT` for provider-managed rules, `USER` for caller-created ones
    #[serde(default)]
    pub rule_type: Option<String>,
}

/// Audit record for one asynchronous operation on a named rule
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRuleActivity {
    pub rule_name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome vocabulary of an activity record, parsed case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityStatus {
    Success,
    Failed,
    Running,
    Other(String),
}

impl ActivityStatus {
    /// Parse a server-reported activity status. Matching is
    /// case-insensitive; anything unrecognized is preserved as [`Other`].
    ///
    /// [`Other`]: ActivityStatus::Other
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("success") {
            ActivityStatus::Success
        } else if s.eq_ignore_ascii_case("failed") {
            ActivityStatus::Failed
        } else if s.eq_ignore_ascii_case("running") {
            ActivityStatus::Running
        } else {
            ActivityStatus::Other(s.to_string())
        }
    }
}

/// Container response: the live rule list and all recent activities,
/// fetched together in one request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessRuleList {
    #[serde(default, rename = "accessRules")]
    pub rules: Vec<AccessRule>,
    #[serde(default)]
    pub activities: Vec<AccessRuleActivity>,
}

/// What one snapshot says about a named rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleDisposition {
    /// The rule is in the live list. Checked first: a rule can be usable
    /// while its creation activity still reads `RUNNING`.
    Present,
    /// Absent from the live list, but an activity record names it
    AbsentWithActivity(ActivityStatus, Option<String>),
    /// Absent from both lists
    AbsentNoRecord,
}

impl AccessRuleList {
    /// Classify `rule_name` against this snapshot.
    #[must_use]
    pub fn disposition(&self, rule_name: &str) -> RuleDisposition {
        if self.rules.iter().any(|r| r.rule_name == rule_name) {
            return RuleDisposition::Present;
        }
        if let Some(activity) = self.activities.iter().find(|a| a.rule_name == rule_name) {
            let status = ActivityStatus::parse(activity.status.as_deref().unwrap_or(""));
            return RuleDisposition::AbsentWithActivity(status, activity.message.clone());
        }
        RuleDisposition::AbsentNoRecord
    }

    /// The activity record for `rule_name`, if any
    #[must_use]
    pub fn activity(&self, rule_name: &str) -> Option<&AccessRuleActivity> {
        self.activities.iter().find(|a| a.rule_name == rule_name)
    }
}

/// Request body for creating an access rule
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccessRuleInput {
    pub rule_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: String,
    pub destination: String,
    pub ports: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub status: AccessRuleStatus,
}

/// Body for the item PUT endpoint, shared by enable/disable and delete
#[derive(Debug, Clone, Serialize)]
struct UpdateAccessRuleBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<AccessRuleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<&'static str>,
}

/// Handler for access rule operations on one service instance
pub struct AccessRuleHandler {
    client: MysqlcsClient,
}

impl AccessRuleHandler {
    #[must_use]
    pub fn new(client: MysqlcsClient) -> Self {
        Self { client }
    }

    /// Fetch the rule list and activity trail in a single request
    pub async fn list(&self, service_id: &str) -> Result<AccessRuleList> {
        self.client
            .get_json(&self.client.access_rule_container_path(service_id))
            .await
    }

    /// Fetch one rule by name from the container listing.
    ///
    /// There is no item GET endpoint; a missing rule surfaces as
    /// [`Error::NotFound`].
    pub async fn get(&self, service_id: &str, rule_name: &str) -> Result<AccessRule> {
        let list = self.list(service_id).await?;
        list.rules
            .into_iter()
            .find(|r| r.rule_name == rule_name)
            .ok_or_else(|| Error::NotFound {
                message: format!("access rule {rule_name} not found on {service_id}"),
            })
    }

    /// Create a rule and wait until it appears in the live list (or its
    /// creation activity resolves). Returns the final fetched rule.
    pub async fn create(
        &self,
        service_id: &str,
        input: &CreateAccessRuleInput,
        opts: Option<PollOptions>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<AccessRule> {
        let rule_name = &input.rule_name;
        info!(service_id, rule_name, "creating access rule");
        self.client
            .execute(
                Method::POST,
                &self.client.access_rule_container_path(service_id),
                Some(input),
                ContentType::Json,
            )
            .await?;

        let opts = opts.unwrap_or(PollOptions::ACCESS_RULE);
        let description = format!("access rule {rule_name} to exist");
        poll_until(&description, opts, on_progress, async || {
            let list = self.list(service_id).await?;
            create_wait_verdict(rule_name, &list.disposition(rule_name))
        })
        .await?;

        self.get(service_id, rule_name).await
    }

    /// Enable or disable a rule and wait for the activity record to settle.
    /// Returns the final fetched rule.
    pub async fn update(
        &self,
        service_id: &str,
        rule_name: &str,
        status: AccessRuleStatus,
        opts: Option<PollOptions>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<AccessRule> {
        info!(service_id, rule_name, ?status, "updating access rule");
        let body = UpdateAccessRuleBody {
            status: Some(status),
            operation: None,
        };
        self.client
            .execute(
                Method::PUT,
                &self.client.access_rule_path(service_id, rule_name),
                Some(&body),
                ContentType::Json,
            )
            .await?;

        let opts = opts.unwrap_or(PollOptions::ACCESS_RULE);
        let description = format!("access rule {rule_name} update to complete");
        poll_until(&description, opts, on_progress, async || {
            let list = self.list(service_id).await?;
            update_wait_verdict(rule_name, &list)
        })
        .await?;

        self.get(service_id, rule_name).await
    }

    /// Delete a rule and wait until it is gone from both the live list and
    /// the activity trail.
    ///
    /// The API models rule deletion as an update carrying
    /// `operation: "delete"` rather than an HTTP DELETE.
    pub async fn delete(
        &self,
        service_id: &str,
        rule_name: &str,
        opts: Option<PollOptions>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<()> {
        info!(service_id, rule_name, "deleting access rule");
        let body = UpdateAccessRuleBody {
            status: None,
            operation: Some("delete"),
        };
        self.client
            .execute(
                Method::PUT,
                &self.client.access_rule_path(service_id, rule_name),
                Some(&body),
                ContentType::Json,
            )
            .await?;

        let opts = opts.unwrap_or(PollOptions::ACCESS_RULE);
        let description = format!("access rule {rule_name} to be deleted");
        poll_until(&description, opts, on_progress, async || {
            let list = self.list(service_id).await?;
            delete_wait_verdict(rule_name, &list.disposition(rule_name))
        })
        .await
    }
}

/// Interpret one create-wait poll tick.
///
/// Presence in the live list is checked first and short-circuits the
/// activity scan. An absent rule whose activity still runs (or reads an
/// unrecognized status) means keep waiting; only `FAILED` is fatal.
fn create_wait_verdict(rule_name: &str, disposition: &RuleDisposition) -> Result<bool> {
    debug!(rule_name, ?disposition, "create-wait tick");
    match disposition {
        RuleDisposition::Present => Ok(true),
        RuleDisposition::AbsentWithActivity(ActivityStatus::Success, _) => Ok(true),
        RuleDisposition::AbsentWithActivity(ActivityStatus::Failed, message) => {
            Err(activity_failure(rule_name, message))
        }
        RuleDisposition::AbsentWithActivity(_, _) => Ok(false),
        // Not yet visible anywhere; absence is never a create verdict
        RuleDisposition::AbsentNoRecord => Ok(false),
    }
}

/// Interpret one delete-wait poll tick.
///
/// A rule still in the live list means the operation is in progress.
/// Absence from both lists means the deletion completed cleanly with no
/// further record.
fn delete_wait_verdict(rule_name: &str, disposition: &RuleDisposition) -> Result<bool> {
    debug!(rule_name, ?disposition, "delete-wait tick");
    match disposition {
        RuleDisposition::Present => Ok(false),
        RuleDisposition::AbsentWithActivity(ActivityStatus::Success, _) => Ok(true),
        RuleDisposition::AbsentWithActivity(ActivityStatus::Failed, message) => {
            Err(activity_failure(rule_name, message))
        }
        RuleDisposition::AbsentWithActivity(_, _) => Ok(false),
        RuleDisposition::AbsentNoRecord => Ok(true),
    }
}

/// Interpret one update-wait poll tick: only the activity trail matters,
/// since the rule stays in the live list throughout. No record means the
/// update left no audit entry and is considered settled.
fn update_wait_verdict(rule_name: &str, list: &AccessRuleList) -> Result<bool> {
    match list.activity(rule_name) {
        None => Ok(true),
        Some(activity) => {
            let status = ActivityStatus::parse(activity.status.as_deref().unwrap_or(""));
            debug!(rule_name, ?status, "update-wait tick");
            match status {
                ActivityStatus::Success => Ok(true),
                ActivityStatus::Failed => Err(activity_failure(rule_name, &activity.message)),
                ActivityStatus::Running | ActivityStatus::Other(_) => Ok(false),
            }
        }
    }
}

fn activity_failure(rule_name: &str, message: &Option<String>) -> Error {
    Error::OperationFailed(
        message
            .clone()
            .unwrap_or_else(|| format!("operation on access rule {rule_name} reported FAILED")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> AccessRule {
        AccessRule {
            rule_name: name.to_string(),
            description: None,
            status: Some(AccessRuleStatus::Enabled),
            source: Some("PUBLIC-INTERNET".to_string()),
            destination: Some("mysql_MASTER".to_string()),
            ports: Some("3306".to_string()),
            protocol: None,
            rule_type: Some("USER".to_string()),
        }
    }

    fn activity(name: &str, status: &str, message: Option<&str>) -> AccessRuleActivity {
        AccessRuleActivity {
            rule_name: name.to_string(),
            status: Some(status.to_string()),
            message: message.map(String::from),
        }
    }

    fn list(rules: Vec<AccessRule>, activities: Vec<AccessRuleActivity>) -> AccessRuleList {
        AccessRuleList { rules, activities }
    }

    #[test]
    fn activity_status_parse_is_case_insensitive() {
        for s in ["failed", "Failed", "FAILED"] {
            assert_eq!(ActivityStatus::parse(s), ActivityStatus::Failed);
        }
        for s in ["success", "SUCCESS", "Success"] {
            assert_eq!(ActivityStatus::parse(s), ActivityStatus::Success);
        }
        assert_eq!(ActivityStatus::parse("RuNnInG"), ActivityStatus::Running);
        assert_eq!(
            ActivityStatus::parse("queued"),
            ActivityStatus::Other("queued".to_string())
        );
    }

    #[test]
    fn disposition_present_short_circuits_activity_scan() {
        // rule is live even though its creation activity still reads RUNNING
        let snapshot = list(
            vec![rule("ssh")],
            vec![activity("ssh", "RUNNING", None)],
        );
        assert_eq!(snapshot.disposition("ssh"), RuleDisposition::Present);
        assert!(matches!(
            create_wait_verdict("ssh", &snapshot.disposition("ssh")),
            Ok(true)
        ));
    }

    #[test]
    fn disposition_absent_with_activity() {
        let snapshot = list(vec![], vec![activity("ssh", "Failed", Some("denied"))]);
        assert_eq!(
            snapshot.disposition("ssh"),
            RuleDisposition::AbsentWithActivity(
                ActivityStatus::Failed,
                Some("denied".to_string())
            )
        );
    }

    #[test]
    fn disposition_absent_no_record() {
        let snapshot = list(vec![rule("other")], vec![activity("other", "SUCCESS", None)]);
        assert_eq!(snapshot.disposition("ssh"), RuleDisposition::AbsentNoRecord);
    }

    #[test]
    fn create_wait_failed_activity_is_fatal_with_message() {
        let verdict = create_wait_verdict(
            "ssh",
            &RuleDisposition::AbsentWithActivity(
                ActivityStatus::Failed,
                Some("port already in use".to_string()),
            ),
        );
        match verdict {
            Err(Error::OperationFailed(msg)) => assert!(msg.contains("port already in use")),
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn create_wait_running_or_unrecognized_continues() {
        for status in [ActivityStatus::Running, ActivityStatus::Other("queued".to_string())] {
            let verdict = create_wait_verdict(
                "ssh",
                &RuleDisposition::AbsentWithActivity(status.clone(), None),
            );
            assert!(matches!(verdict, Ok(false)), "{status:?} should continue");
        }
    }

    #[test]
    fn create_wait_absent_no_record_continues() {
        let verdict = create_wait_verdict("ssh", &RuleDisposition::AbsentNoRecord);
        assert!(matches!(verdict, Ok(false)));
    }

    #[test]
    fn delete_wait_present_continues() {
        let verdict = delete_wait_verdict("ssh", &RuleDisposition::Present);
        assert!(matches!(verdict, Ok(false)));
    }

    #[test]
    fn delete_wait_absent_from_both_lists_is_done() {
        let verdict = delete_wait_verdict("ssh", &RuleDisposition::AbsentNoRecord);
        assert!(matches!(verdict, Ok(true)));
    }

    #[test]
    fn delete_wait_success_activity_is_done() {
        let verdict = delete_wait_verdict(
            "ssh",
            &RuleDisposition::AbsentWithActivity(ActivityStatus::Success, None),
        );
        assert!(matches!(verdict, Ok(true)));
    }

    #[test]
    fn delete_wait_failed_activity_is_fatal() {
        let verdict = delete_wait_verdict(
            "ssh",
            &RuleDisposition::AbsentWithActivity(ActivityStatus::Failed, None),
        );
        match verdict {
            Err(Error::OperationFailed(msg)) => assert!(msg.contains("ssh")),
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn update_wait_no_record_is_done() {
        let snapshot = list(vec![rule("ssh")], vec![]);
        assert!(matches!(update_wait_verdict("ssh", &snapshot), Ok(true)));
    }

    #[test]
    fn update_wait_follows_activity_status() {
        let snapshot = list(vec![rule("ssh")], vec![activity("ssh", "running", None)]);
        assert!(matches!(update_wait_verdict("ssh", &snapshot), Ok(false)));

        let snapshot = list(vec![rule("ssh")], vec![activity("ssh", "SUCCESS", None)]);
        assert!(matches!(update_wait_verdict("ssh", &snapshot), Ok(true)));

        let snapshot = list(
            vec![rule("ssh")],
            vec![activity("ssh", "failed", Some("no such rule"))],
        );
        match update_wait_verdict("ssh", &snapshot) {
            Err(Error::OperationFailed(msg)) => assert!(msg.contains("no such rule")),
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn list_decodes_rules_and_activities_together() {
        let snapshot: AccessRuleList = serde_json::from_value(serde_json::json!({
            "accessRules": [
                {"ruleName": "ora_p2_ssh", "status": "enabled", "ruleType": "DEFAULT",
                 "source": "PUBLIC-INTERNET", "destination": "mysql_MASTER", "ports": "22"}
            ],
            "activities": [
                {"ruleName": "app-mysql", "status": "RUNNING"}
            ]
        }))
        .unwrap();
        assert_eq!(snapshot.rules.len(), 1);
        assert_eq!(snapshot.rules[0].status, Some(AccessRuleStatus::Enabled));
        assert_eq!(snapshot.activities[0].rule_name, "app-mysql");
    }

    #[test]
    fn create_input_wire_shape() {
        let input = CreateAccessRuleInput {
            rule_name: "app-mysql".to_string(),
            description: Some("app tier to mysql".to_string()),
            source: "10.0.0.0/24".to_string(),
            destination: "mysql_MASTER".to_string(),
            ports: "3306".to_string(),
            protocol: Some("tcp".to_string()),
            status: AccessRuleStatus::Enabled,
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["ruleName"], "app-mysql");
        assert_eq!(value["status"], "enabled");
        assert_eq!(value["ports"], "3306");
    }
}
