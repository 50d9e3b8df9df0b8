//! Integration tests for azurestack-provider
//!
//! These tests drive whole resource lifecycles through the provider against a
//! local mock of the Resource Manager and Key Vault endpoints.

use azurestack_provider::azure::{ArmClient, KeyVaultDataClient, StaticToken, TokenSource};
use azurestack_provider::config::Features;
use azurestack_provider::schema::{Resource, ResourceData};
use azurestack_provider::services::keyvault::client::KeyVaultTiming;
use azurestack_provider::timeouts::OperationContext;
use azurestack_provider::{Client, Provider};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

fn client_for(server: &MockServer) -> Client {
    let http = reqwest::Client::new();
    let token: Arc<dyn TokenSource> = Arc::new(StaticToken("token".to_string()));
    let arm = ArmClient::new(http.clone(), &format!("{}/", server.uri()), token.clone(), "aud", None)
        .expect("valid endpoint")
        .with_poll_interval(Duration::from_millis(10));
    let data = KeyVaultDataClient::new(http.clone(), token, "https://vault.azure.net", None);
    Client::new(SUBSCRIPTION, arm, data, http, Features::default()).with_key_vault_timing(KeyVaultTiming {
        nested_item_poll_interval: Duration::from_millis(10),
        availability_delay: Duration::ZERO,
        availability_poll_interval: Duration::from_millis(10),
        availability_occurrences: 1,
    })
}

fn attrs(value: Value) -> Map<String, Value> {
    value.as_object().expect("object").clone()
}

fn subnet_id() -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/internal"
    )
}

fn vnet_id() -> String {
    format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1")
}

fn subnet_body() -> Value {
    json!({
        "id": subnet_id(),
        "name": "internal",
        "properties": {
            "addressPrefix": "10.0.2.0/24",
            "provisioningState": "Succeeded"
        }
    })
}

#[tokio::test]
async fn test_subnet_lifecycle() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let provider = Provider::new().expect("provider");

    Mock::given(method("GET"))
        .and(path(subnet_id()))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "NotFound", "message": "Resource not found"}
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(subnet_id()))
        .respond_with(ResponseTemplate::new(200).set_body_json(subnet_body()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(subnet_id()))
        .and(query_param("api-version", "2018-11-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(subnet_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(vnet_id()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": vnet_id(),
            "properties": {"provisioningState": "Succeeded"}
        })))
        .mount(&server)
        .await;

    let state = provider
        .create(
            &client,
            "azurestack_subnet",
            attrs(json!({
                "name": "internal",
                "resource_group_name": "rg1",
                "virtual_network_name": "vnet1",
                "address_prefix": "10.0.2.0/24",
            })),
        )
        .await
        .expect("create subnet")
        .expect("subnet in state");
    assert_eq!(state["id"], json!(subnet_id()));
    assert_eq!(state["address_prefix"], json!("10.0.2.0/24"));
    assert_eq!(state["virtual_network_name"], json!("vnet1"));

    let read = provider
        .read(&client, "azurestack_subnet", &subnet_id(), state.clone())
        .await
        .expect("read subnet");
    assert!(read.is_some());
    server.verify().await;

    server.reset().await;
    Mock::given(method("DELETE"))
        .and(path(subnet_id()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(subnet_id()))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    provider
        .delete(&client, "azurestack_subnet", &subnet_id(), state.clone())
        .await
        .expect("delete subnet");
    let gone = provider
        .read(&client, "azurestack_subnet", &subnet_id(), state)
        .await
        .expect("read after delete");
    assert!(gone.is_none());
}

#[tokio::test]
async fn test_subnet_create_requires_import_when_present() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let provider = Provider::new().expect("provider");

    Mock::given(method("GET"))
        .and(path(subnet_id()))
        .respond_with(ResponseTemplate::new(200).set_body_json(subnet_body()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider
        .create(
            &client,
            "azurestack_subnet",
            attrs(json!({
                "name": "internal",
                "resource_group_name": "rg1",
                "virtual_network_name": "vnet1",
                "address_prefix": "10.0.2.0/24",
            })),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("needs to be imported"), "{err}");
}

#[tokio::test]
async fn test_import_of_missing_subnet_fails() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let provider = Provider::new().expect("provider");

    Mock::given(method("GET"))
        .and(path(subnet_id()))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = provider
        .import(&client, "azurestack_subnet", &subnet_id())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Cannot import non-existent remote object"));
}

#[tokio::test]
async fn test_key_vault_secret_lifecycle() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let provider = Provider::new().expect("provider");

    let vault_id =
        format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.KeyVault/vaults/vault1");
    let secret_id = format!("{}/secrets/mysecret/v1", server.uri());
    let bundle = json!({
        "value": "s3cr3t",
        "id": secret_id,
        "contentType": "password",
        "attributes": {"enabled": true}
    });

    Mock::given(method("GET"))
        .and(path(vault_id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": vault_id,
            "name": "vault1",
            "location": "local",
            "properties": {"vaultUri": format!("{}/", server.uri())}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/secrets/mysecret/?$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "SecretNotFound", "message": "Secret not found: mysecret"}
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/secrets/mysecret/?$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle.clone()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/secrets/mysecret"))
        .and(query_param("api-version", "2016-10-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle))
        .expect(1)
        .mount(&server)
        .await;

    let state = provider
        .create(
            &client,
            "azurestack_key_vault_secret",
            attrs(json!({
                "name": "mysecret",
                "key_vault_id": vault_id,
                "value": "s3cr3t",
                "content_type": "password",
            })),
        )
        .await
        .expect("create secret")
        .expect("secret in state");
    assert_eq!(state["id"], json!(secret_id));
    assert_eq!(state["version"], json!("v1"));
    assert_eq!(state["key_vault_id"], json!(vault_id));
    assert_eq!(state["content_type"], json!("password"));
    server.verify().await;

    server.reset().await;
    Mock::given(method("DELETE"))
        .and(path("/secrets/mysecret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/secrets/mysecret/?$"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3..)
        .mount(&server)
        .await;

    provider
        .delete(&client, "azurestack_key_vault_secret", &secret_id, state)
        .await
        .expect("delete secret");
    server.verify().await;
}

#[tokio::test]
async fn test_arm_delete_follows_location_header() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let operation = format!("{}/operations/delete-1", server.uri());

    Mock::given(method("DELETE"))
        .and(path(subnet_id()))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", operation.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/delete-1"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/delete-1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let ctx = OperationContext::with_timeout(Duration::from_secs(30));
    client
        .arm
        .delete(&ctx, &subnet_id(), "2018-11-01")
        .await
        .expect("delete completes once the operation stops returning 202");

    let polls = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/operations/delete-1")
        .count();
    assert_eq!(polls, 2);
    server.verify().await;
}

#[tokio::test]
async fn test_network_interface_security_group_association_lifecycle() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let provider = Provider::new().expect("provider");

    let nic_id =
        format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.Network/networkInterfaces/nic1");
    let nsg_id = format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/rg1/providers/Microsoft.Network/networkSecurityGroups/nsg1"
    );
    let nic = |nsg: Value| {
        json!({
            "id": nic_id,
            "name": "nic1",
            "location": "local",
            "properties": {
                "networkSecurityGroup": nsg,
                "ipConfigurations": [{"name": "internal"}],
                "provisioningState": "Succeeded"
            }
        })
    };

    Mock::given(method("GET"))
        .and(path(nic_id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(nic(Value::Null)))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(nic_id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(nic(json!({"id": nsg_id}))))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(nic_id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(nic(json!({"id": nsg_id}))))
        .expect(2)
        .mount(&server)
        .await;

    let resource_type = "azurestack_network_interface_security_group_association";
    let state = provider
        .create(
            &client,
            resource_type,
            attrs(json!({"network_interface_id": nic_id, "network_security_group_id": nsg_id})),
        )
        .await
        .expect("create association")
        .expect("association in state");
    let association = format!("{nic_id}|{nsg_id}");
    assert_eq!(state["id"], json!(association));
    assert_eq!(state["network_security_group_id"], json!(nsg_id));

    let err = provider
        .create(
            &client,
            resource_type,
            attrs(json!({"network_interface_id": nic_id, "network_security_group_id": nsg_id})),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("needs to be imported"), "{err}");

    provider
        .delete(&client, resource_type, &association, state)
        .await
        .expect("delete association");

    let puts: Vec<Value> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| serde_json::from_slice(&r.body).expect("json body"))
        .collect();
    assert_eq!(puts.len(), 2);
    assert_eq!(puts[0]["properties"]["networkSecurityGroup"]["id"], json!(nsg_id));
    assert_eq!(puts[0]["properties"]["ipConfigurations"][0]["name"], json!("internal"));
    assert_eq!(puts[1]["properties"]["networkSecurityGroup"], Value::Null);
    server.verify().await;
}

#[tokio::test]
async fn test_import_of_secret_in_unknown_vault_is_dropped_by_read() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let provider = Provider::new().expect("provider");
    let secret_id = format!("{}/secrets/mysecret/v1", server.uri());

    Mock::given(method("GET"))
        .and(path(format!("/subscriptions/{SUBSCRIPTION}/resources")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;

    let resource = provider.resource("azurestack_key_vault_secret").expect("registered");
    let mut d = ResourceData::from_id(secret_id.as_str());
    resource.import(&client, &mut d).await.expect("import tolerates an unknown vault");
    assert!(d.get("key_vault_id").is_none());
    assert_eq!(d.id(), secret_id);

    let err = provider
        .import(&client, "azurestack_key_vault_secret", &secret_id)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Cannot import non-existent remote object"), "{err}");
}
