//! StackSet-backed membership registry.

use async_trait::async_trait;
use common::CallError;
use tracing::debug;

use super::errors::classify;
use crate::gate::MembershipRegistry;

/// Treats every account with an instance of the governing StackSet as a member.
pub struct StackSetRegistry {
    client: aws_sdk_cloudformation::Client,
    stack_set_name: String,
}

impl StackSetRegistry {
    pub fn new(client: aws_sdk_cloudformation::Client, stack_set_name: impl Into<String>) -> Self {
        Self {
            client,
            stack_set_name: stack_set_name.into(),
        }
    }
}

#[async_trait]
impl MembershipRegistry for StackSetRegistry {
    async fn has_member(&self, account: &str) -> Result<bool, CallError> {
        let mut pages = self
            .client
            .list_stack_instances()
            .stack_set_name(&self.stack_set_name)
            .stack_instance_account(account)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(classify)?;
            if !page.summaries().is_empty() {
                debug!(account, stack_set = %self.stack_set_name, "stack instance found");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::replay::{request_bodies, response, sdk_config};
    use aws_smithy_runtime::client::http::test_util::StaticReplayClient;

    const ACCOUNT: &str = "111111111111";

    fn page(summaries: &str, next_token: Option<&str>) -> String {
        let next = next_token
            .map(|t| format!("<NextToken>{t}</NextToken>"))
            .unwrap_or_default();
        format!(
            r#"<ListStackInstancesResponse xmlns="http://cloudformation.amazonaws.com/doc/2010-05-15/">
  <ListStackInstancesResult>
    <Summaries>{summaries}</Summaries>
    {next}
  </ListStackInstancesResult>
  <ResponseMetadata><RequestId>req-1</RequestId></ResponseMetadata>
</ListStackInstancesResponse>"#
        )
    }

    fn instance(account: &str) -> String {
        format!(
            "<member><StackSetId>baseline:1</StackSetId><Region>us-east-1</Region><Account>{account}</Account><Status>CURRENT</Status></member>"
        )
    }

    fn registry(http: &StaticReplayClient) -> StackSetRegistry {
        let client = aws_sdk_cloudformation::Client::new(&sdk_config(http));
        StackSetRegistry::new(client, "AWSControlTowerBP-BASELINE-CLOUDWATCH")
    }

    #[tokio::test]
    async fn record_on_a_later_page_is_membership() {
        let http = StaticReplayClient::new(vec![
            response(200, "text/xml", &page("", Some("page-2"))),
            response(200, "text/xml", &page(&instance(ACCOUNT), None)),
        ]);

        assert!(registry(&http).has_member(ACCOUNT).await.unwrap());

        let bodies = request_bodies(&http);
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].contains("Action=ListStackInstances"));
        assert!(bodies[0].contains(&format!("StackInstanceAccount={ACCOUNT}")));
        assert!(bodies[1].contains("NextToken=page-2"));
    }

    #[tokio::test]
    async fn no_records_on_any_page_is_not_membership() {
        let http = StaticReplayClient::new(vec![
            response(200, "text/xml", &page("", Some("page-2"))),
            response(200, "text/xml", &page("", None)),
        ]);

        assert!(!registry(&http).has_member(ACCOUNT).await.unwrap());
        assert_eq!(request_bodies(&http).len(), 2);
    }

    #[tokio::test]
    async fn missing_stack_set_is_a_call_error() {
        let http = StaticReplayClient::new(vec![response(
            400,
            "text/xml",
            r#"<ErrorResponse xmlns="http://cloudformation.amazonaws.com/doc/2010-05-15/">
  <Error><Type>Sender</Type><Code>StackSetNotFoundException</Code><Message>StackSet not found</Message></Error>
  <RequestId>req-1</RequestId>
</ErrorResponse>"#,
        )]);

        assert!(matches!(
            registry(&http).has_member(ACCOUNT).await,
            Err(CallError::NotFound(_))
        ));
    }
}
