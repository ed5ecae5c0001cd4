//! CloudFormation custom resource request and response documents.
//!
//! The request is delivered as the Lambda event payload; the response is
//! `PUT` to the pre-signed `ResponseURL` carried by the request.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Lifecycle event kind of the custom resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Custom resource event as sent by CloudFormation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceRequest {
    pub request_type: RequestType,
    /// Pre-signed S3 URL the response document must be uploaded to.
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Absent on `Create`.
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: ResourceProperties,
    /// Present on `Update` only.
    #[serde(default)]
    pub old_resource_properties: Option<ResourceProperties>,
}

/// The subset of resource properties this resource understands.
///
/// Unknown properties (including `ServiceToken`) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceProperties {
    #[serde(rename = "KmsKeyArns", default)]
    pub kms_key_arns: KeyList,
}

/// Key identifiers as supplied by the template: either a comma-separated
/// string (the usual `CommaDelimitedList` parameter joined with `Fn::Join`)
/// or a JSON list of strings.
///
/// Entries are kept verbatim; blank entries are filtered by the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawKeyList")]
pub struct KeyList(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKeyList {
    Joined(String),
    List(Vec<String>),
}

impl From<RawKeyList> for KeyList {
    fn from(raw: RawKeyList) -> Self {
        match raw {
            RawKeyList::Joined(s) => KeyList(s.split(',').map(str::to_owned).collect()),
            RawKeyList::List(v) => KeyList(v),
        }
    }
}

impl KeyList {
    /// Borrow the raw entries in template order.
    pub fn entries(&self) -> &[String] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Outcome reported back to CloudFormation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Payload exposed through `Fn::GetAtt` on the custom resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// The run reached the apply phase.
    #[serde(rename_all = "PascalCase")]
    Report {
        success_count: usize,
        processed_topics: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        errors: Vec<String>,
    },
    /// Planning or an unexpected error aborted the run.
    #[serde(rename_all = "PascalCase")]
    Fatal { error: String },
}

/// Response document uploaded to the request's `ResponseURL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: ResponseData,
}

impl CustomResourceResponse {
    /// Build a response that echoes the identifiers of `req`.
    pub fn for_request(
        req: &CustomResourceRequest,
        physical_resource_id: impl Into<String>,
        status: ResponseStatus,
        reason: impl Into<String>,
        data: ResponseData,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            physical_resource_id: physical_resource_id.into(),
            stack_id: req.stack_id.clone(),
            request_id: req.request_id.clone(),
            logical_resource_id: req.logical_resource_id.clone(),
            no_echo: false,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update_event() -> serde_json::Value {
        json!({
            "RequestType": "Update",
            "ResponseURL": "https://cloudformation-custom-resource-response.s3.amazonaws.com/x",
            "StackId": "arn:aws:cloudformation:us-east-1:111111111111:stack/kms/abc",
            "RequestId": "req-1",
            "ResourceType": "Custom::SnsKms",
            "LogicalResourceId": "SnsKms",
            "PhysicalResourceId": "sns-kms-1",
            "ResourceProperties": {
                "ServiceToken": "arn:aws:lambda:us-east-1:111111111111:function:f",
                "KmsKeyArns": "arn:aws:kms:us-east-1:222222222222:key/a,arn:aws:kms:eu-west-1:333333333333:key/b"
            },
            "OldResourceProperties": {
                "KmsKeyArns": "arn:aws:kms:us-east-1:222222222222:key/old"
            }
        })
    }

    #[test]
    fn update_request_parses() {
        let req: CustomResourceRequest = serde_json::from_value(update_event()).unwrap();
        assert_eq!(req.request_type, RequestType::Update);
        assert_eq!(req.physical_resource_id.as_deref(), Some("sns-kms-1"));
        assert_eq!(req.resource_properties.kms_key_arns.entries().len(), 2);
        let old = req.old_resource_properties.unwrap();
        assert_eq!(
            old.kms_key_arns.entries(),
            ["arn:aws:kms:us-east-1:222222222222:key/old"]
        );
    }

    #[test]
    fn create_request_tolerates_missing_old_properties() {
        let mut event = update_event();
        event["RequestType"] = json!("Create");
        let obj = event.as_object_mut().unwrap();
        obj.remove("OldResourceProperties");
        obj.remove("PhysicalResourceId");
        let req: CustomResourceRequest = serde_json::from_value(event).unwrap();
        assert_eq!(req.request_type, RequestType::Create);
        assert!(req.old_resource_properties.is_none());
        assert!(req.physical_resource_id.is_none());
    }

    #[test]
    fn missing_key_property_is_empty_list() {
        let mut event = update_event();
        event["ResourceProperties"] = json!({"ServiceToken": "x"});
        let req: CustomResourceRequest = serde_json::from_value(event).unwrap();
        assert!(req.resource_properties.kms_key_arns.entries().is_empty());
    }

    #[test]
    fn key_list_accepts_json_array() {
        let props: ResourceProperties =
            serde_json::from_value(json!({"KmsKeyArns": ["a", "b"]})).unwrap();
        assert_eq!(props.kms_key_arns.entries(), ["a", "b"]);
    }

    #[test]
    fn key_list_keeps_blank_entries_verbatim() {
        let props: ResourceProperties =
            serde_json::from_value(json!({"KmsKeyArns": "a,, b"})).unwrap();
        assert_eq!(props.kms_key_arns.entries(), ["a", "", " b"]);
    }

    #[test]
    fn report_response_shape() {
        let req: CustomResourceRequest = serde_json::from_value(update_event()).unwrap();
        let resp = CustomResourceResponse::for_request(
            &req,
            "sns-kms-1",
            ResponseStatus::Success,
            "ok",
            ResponseData::Report {
                success_count: 1,
                processed_topics: vec!["topic".into()],
                errors: vec![],
            },
        );
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["Status"], "SUCCESS");
        assert_eq!(v["RequestId"], "req-1");
        assert_eq!(v["NoEcho"], false);
        assert_eq!(v["Data"]["SuccessCount"], 1);
        assert!(v["Data"].get("Errors").is_none());
    }

    #[test]
    fn fatal_response_shape() {
        let req: CustomResourceRequest = serde_json::from_value(update_event()).unwrap();
        let resp = CustomResourceResponse::for_request(
            &req,
            "sns-kms-1",
            ResponseStatus::Failed,
            "malformed",
            ResponseData::Fatal {
                error: "malformed key identifier".into(),
            },
        );
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["Status"], "FAILED");
        assert_eq!(v["Data"]["Error"], "malformed key identifier");
    }
}
