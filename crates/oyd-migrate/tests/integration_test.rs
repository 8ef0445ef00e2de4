//! Integration tests for oyd-migrate against a real Azure subscription.
//!
//! These tests require environment variables to be set:
//! - `AZURE_SUBSCRIPTION_ID`: Subscription to scan (read-only calls)
//! - an Azure CLI login (`az login`) for the same tenant
//!
//! Optional:
//! - `OYD_TEST_PROJECT_ENDPOINT` and `OYD_TEST_AGENT`: an existing agent to query
//!
//! Run with: `cargo test --test integration_test -- --ignored`

#![allow(clippy::pedantic)]

use std::env;

use oyd_migrate::azure::credential_from_config;
use oyd_migrate::config::AzureConfig;
use oyd_migrate::services::testing::validate_agent_response;
use oyd_migrate::{analyze, AzureContext};

/// Helper to check if live tests are enabled
fn live_enabled() -> bool {
    env::var("AZURE_SUBSCRIPTION_ID").is_ok()
}

fn live_context() -> AzureContext {
    let subscription_id = env::var("AZURE_SUBSCRIPTION_ID").unwrap();
    let config = AzureConfig {
        subscription_id: subscription_id.clone(),
        ..Default::default()
    };
    let credential = credential_from_config(&config).unwrap();
    AzureContext::new(credential, &subscription_id)
}

#[tokio::test]
#[ignore] // Run with --ignored flag when env vars are set
async fn test_cli_login_lists_subscription() {
    if !live_enabled() {
        eprintln!("Skipping: AZURE_SUBSCRIPTION_ID not set");
        return;
    }

    let context = live_context();
    let token = context.auth().authenticate().await.unwrap();
    assert!(!token.token.is_empty());

    let subscriptions = context.auth().list_subscriptions().await.unwrap();
    assert!(
        subscriptions
            .iter()
            .any(|s| s.subscription_id == context.subscription_id()),
        "configured subscription should be visible to the login"
    );
}

#[tokio::test]
#[ignore]
async fn test_discover_oyd_deployments() {
    if !live_enabled() {
        eprintln!("Skipping: AZURE_SUBSCRIPTION_ID not set");
        return;
    }

    let context = live_context();
    let deployments = context.aoai().discover_oyd_deployments(None).await.unwrap();

    println!("Found {} OYD deployment(s)", deployments.len());
    for deployment in &deployments {
        assert!(deployment.oyd_config.is_some());
        println!("  {}/{}", deployment.resource_name, deployment.deployment_name);
    }
}

#[tokio::test]
#[ignore]
async fn test_analyze_first_search_service() {
    if !live_enabled() {
        eprintln!("Skipping: AZURE_SUBSCRIPTION_ID not set");
        return;
    }

    let context = live_context();
    let search = context.search();
    let services = search.list_services(None).await.unwrap();
    let Some(service) = services.first() else {
        eprintln!("Skipping: no search services in subscription");
        return;
    };

    for (index, analysis) in search.analyze_indexes(service).await {
        assert_eq!(analysis, analyze(&index));
        println!(
            "  {} -> {} (search tool: {})",
            index.name, analysis.recommended_query_type, analysis.compatible_with_search_tool
        );
    }
}

#[tokio::test]
#[ignore]
async fn test_existing_agent_answers() {
    let (Ok(endpoint), Ok(agent)) = (env::var("OYD_TEST_PROJECT_ENDPOINT"), env::var("OYD_TEST_AGENT")) else {
        eprintln!("Skipping: OYD_TEST_PROJECT_ENDPOINT and OYD_TEST_AGENT not set");
        return;
    };
    if !live_enabled() {
        eprintln!("Skipping: AZURE_SUBSCRIPTION_ID not set");
        return;
    }

    let context = live_context();
    let result = context
        .test_runner(&endpoint)
        .test_agent(&agent, "What topics can you help with?")
        .await;

    let issues = validate_agent_response(&result, false, false);
    assert!(issues.is_empty(), "agent issues: {issues:?}");
}
