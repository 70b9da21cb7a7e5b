use crate::fixtures::{catalog_json, FakeBroker, Reply, BASIC_AUTH};
use axum::http::Method;
use boss_client::ErrorKind;
use serde_json::json;

#[tokio::test]
async fn test_plan_lookup_by_name_and_id() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/v2/catalog", vec![Reply::json(200, catalog_json())]);
    let (client, _) = broker.client();

    let (service, plan) = client.plan("redis", "small").await.unwrap();
    assert_eq!(service.id, "svc-redis");
    assert_eq!(plan.id, "plan-small");

    let (service, plan) = client.plan("svc-redis", "plan-large").await.unwrap();
    assert_eq!(service.name, "redis");
    assert_eq!(plan.name, "large");

    let err = client.plan("redis", "huge").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "service 'redis' / plan 'huge' not found");

    // One fresh catalog fetch per lookup.
    assert_eq!(broker.requests_to("/v2/catalog").len(), 3);
}

#[tokio::test]
async fn test_structured_requests_carry_headers() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/v2/catalog", vec![Reply::json(200, catalog_json())]);
    let config = boss_client::ClientConfig {
        api_version: "2.14".to_string(),
        ..broker.config()
    };
    let (client, _) = crate::fixtures::open(config);

    let catalog = client.catalog().await.unwrap();
    assert_eq!(catalog.services.len(), 2);

    let request = &broker.requests()[0];
    assert_eq!(request.header("x-broker-api-version"), Some("2.14"));
    assert_eq!(request.header("authorization"), Some(BASIC_AUTH));
    assert_eq!(request.header("accept"), Some("application/json"));
    assert_eq!(request.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_resolve_instance_ids() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::GET,
        "/b/status",
        vec![Reply::json(
            200,
            json!({"instances": {"foo-bar": {"service_id": "svc-redis", "plan_id": "plan-small"}}}),
        )],
    );
    let (client, _) = broker.client();

    assert_eq!(client.resolve("foo-bar").await.unwrap(), "foo-bar");
    assert_eq!(client.resolve("foo").await.unwrap(), "foo-bar");

    let err = client.resolve("baz").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "no instance found matching 'baz'");

    let status = broker.requests_to("/b/status");
    assert!(status[0].header("x-broker-api-version").is_none());
}

#[tokio::test]
async fn test_instances_keep_unresolved_entries() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/v2/catalog", vec![Reply::json(200, catalog_json())]);
    broker.reply(
        Method::GET,
        "/b/status",
        vec![Reply::json(
            200,
            json!({
                "instances": {
                    "known": {
                        "service_id": "svc-redis",
                        "plan_id": "plan-small",
                        "state": "running",
                        "created_at": "2024-01-01T00:00:00Z"
                    },
                    "orphan": {
                        "service_id": "svc-gone",
                        "plan_id": "plan-gone",
                        "created_at": "2024-02-01T00:00:00Z"
                    },
                    "pending": {
                        "service_id": "svc-pg",
                        "plan_id": "plan-standalone",
                        "created_at": "0001-01-01T00:00:00Z"
                    }
                },
                "log": ""
            }),
        )],
    );
    let config = boss_client::ClientConfig {
        debug: true,
        ..broker.config()
    };
    let (client, _) = crate::fixtures::open(config);

    let instances = client.instances().await.unwrap();
    let ids: Vec<&str> = instances.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["orphan", "known", "pending"]);

    let orphan = &instances[0];
    assert!(orphan.service.is_none());
    assert!(orphan.plan.is_none());

    let known = &instances[1];
    assert_eq!(known.service.as_ref().map(|s| s.name.as_str()), Some("redis"));
    assert_eq!(known.plan.as_ref().map(|p| p.name.as_str()), Some("small"));
    assert_eq!(known.state.as_deref(), Some("running"));

    assert!(instances[2].created_at.is_none());
    assert!(instances[2].is_resolved());
}

#[tokio::test]
async fn test_create_then_delete() {
    let broker = FakeBroker::start().await;
    let path = "/v2/service_instances/inst-1";
    broker.reply(Method::PUT, path, vec![Reply::json(201, json!({}))]);
    broker.reply(Method::DELETE, path, vec![Reply::json(200, json!({}))]);
    let (client, _) = broker.client();

    let instance = client
        .create("inst-1", "svc-redis", "plan-small", None)
        .await
        .unwrap();
    assert_eq!(instance.id, "inst-1");
    assert!(instance.service.is_none());

    client.delete("inst-1").await.unwrap();

    let requests = broker.requests_to(path);
    assert_eq!(requests.len(), 2);

    let put = &requests[0];
    assert_eq!(put.method, Method::PUT);
    assert_eq!(put.query.as_deref(), Some("accepts_incomplete=true"));
    assert_eq!(
        put.json(),
        json!({
            "service_id": "svc-redis",
            "plan_id": "plan-small",
            "organization_guid": "boss",
            "space_guid": "boss"
        })
    );

    let delete = &requests[1];
    assert_eq!(delete.method, Method::DELETE);
    assert_eq!(delete.query.as_deref(), Some("accepts_incomplete=true"));
    assert!(delete.body.is_empty());
}

#[tokio::test]
async fn test_create_with_parameters() {
    let broker = FakeBroker::start().await;
    let path = "/v2/service_instances/inst-2";
    broker.reply(Method::PUT, path, vec![Reply::json(202, json!({"operation": "op"}))]);
    let (client, _) = broker.client();

    let mut params = boss_client::Parameters::new();
    params.insert("size".to_string(), json!("xl"));
    client
        .create("inst-2", "svc-redis", "plan-large", Some(params))
        .await
        .unwrap();

    let body = broker.requests_to(path)[0].json();
    assert_eq!(body["parameters"], json!({"size": "xl"}));
    // Plain create never polls.
    assert_eq!(broker.requests().len(), 1);
}

#[tokio::test]
async fn test_delete_gone_is_success() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::DELETE,
        "/v2/service_instances/gone",
        vec![Reply::json(410, json!({}))],
    );
    let (client, clock) = broker.client();

    client.delete("gone").await.unwrap();
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_update_sends_service_verbatim() {
    let broker = FakeBroker::start().await;
    let path = "/v2/service_instances/inst-1";
    broker.reply(Method::PATCH, path, vec![Reply::json(200, json!({}))]);
    let (client, _) = broker.client();

    client
        .update("inst-1", "svc-7", "plan-2", None)
        .await
        .unwrap();
    client.update("inst-1", "svc-7", "", None).await.unwrap();

    let requests = broker.requests_to(path);
    assert_eq!(requests[0].json(), json!({"service_id": "svc-7", "plan_id": "plan-2"}));
    assert_eq!(requests[1].json(), json!({"service_id": "svc-7"}));
}

#[tokio::test]
async fn test_conflict_is_not_retried() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::PUT,
        "/v2/service_instances/dup",
        vec![Reply::json(
            409,
            json!({"error": "Conflict", "description": "instance dup already exists"}),
        )],
    );
    let (client, clock) = broker.client();

    let err = client
        .create("dup", "svc-redis", "plan-small", None)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        err.to_string(),
        "failed to create instance dup: Conflict: instance dup already exists"
    );
    assert_eq!(broker.requests().len(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_plain_text_retrieval() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::GET,
        "/b/abc/task.log",
        vec![Reply::text(200, "Task 7 | Preparing deployment\nTask 7 | Done\n")],
    );
    broker.reply(
        Method::GET,
        "/b/abc/redeploy",
        vec![Reply::text(200, "redeploy task 8 queued")],
    );
    let (client, _) = broker.client();

    let task = client.task("abc").await.unwrap();
    assert!(task.ends_with("Task 7 | Done\n"));
    assert_eq!(client.redeploy("abc").await.unwrap(), "redeploy task 8 queued");

    for request in broker.requests() {
        assert_eq!(request.header("authorization"), Some(BASIC_AUTH));
        assert!(request.header("content-type").is_none());
        assert!(request.header("accept").is_none());
        assert!(request.header("x-broker-api-version").is_none());
    }
}

#[tokio::test]
async fn test_missing_task_log_is_not_found() {
    let broker = FakeBroker::start().await;
    let (client, clock) = broker.client();

    let err = client.task("abc").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().starts_with("failed to get task log for abc"));
    assert_eq!(broker.requests().len(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_manifest_validation() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::GET,
        "/b/good/manifest.yml",
        vec![Reply::text(200, "name: good\ninstance_groups:\n- name: redis\n")],
    );
    broker.reply(
        Method::GET,
        "/b/bad/manifest.yml",
        vec![Reply::text(200, "name: [unterminated\n")],
    );
    let (client, _) = broker.client();

    let manifest = client.manifest("good").await.unwrap();
    assert_eq!(manifest, "name: good\ninstance_groups:\n- name: redis\n");

    let err = client.manifest("bad").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().starts_with("invalid manifest for bad: invalid YAML"));
}

#[tokio::test]
async fn test_credentials() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::GET,
        "/b/abc/creds.yml",
        vec![Reply::text(
            200,
            "hostname: 10.0.0.5\nport: 6379\nusername: u\npassword: p\n",
        )],
    );
    broker.reply(
        Method::GET,
        "/b/bad/creds.yml",
        vec![Reply::text(200, "password: {broken\n")],
    );
    broker.reply(
        Method::GET,
        "/b/list/creds.yml",
        vec![Reply::text(200, "- hostname\n- port\n")],
    );
    let (client, _) = broker.client();

    let raw = client.creds("abc").await.unwrap();
    assert!(raw.starts_with("hostname: 10.0.0.5"));

    let creds = client.creds_map("abc").await.unwrap();
    assert_eq!(creds["hostname"].as_str(), Some("10.0.0.5"));
    assert_eq!(creds["port"].as_u64(), Some(6379));
    assert_eq!(creds.len(), 4);

    let err = client.creds("bad").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().starts_with("invalid credentials YAML for bad"));

    let err = client.creds_map("list").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_broker_log() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::GET,
        "/b/status",
        vec![Reply::json(
            200,
            json!({"instances": {}, "log": "broker started\nready\n"}),
        )],
    );
    let (client, _) = broker.client();

    assert_eq!(client.log().await.unwrap(), "broker started\nready\n");
}

#[tokio::test]
async fn test_create_ignores_response_body() {
    let broker = FakeBroker::start().await;
    let path = "/v2/service_instances/abc";
    broker.reply(Method::PUT, path, vec![Reply::text(201, "created")]);
    let (client, _) = broker.client();

    let instance = client
        .create("abc", "svc-redis", "plan-small", None)
        .await
        .unwrap();
    assert_eq!(instance.id, "abc");

    broker.reply(Method::PUT, "/v2/service_instances/def", vec![Reply::json(201, json!([1, 2]))]);
    client
        .create("def", "svc-redis", "plan-small", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_registry_entries_do_not_break_resolve_or_log() {
    let broker = FakeBroker::start().await;
    broker.reply(
        Method::GET,
        "/b/status",
        vec![Reply::json(
            200,
            json!({
                "instances": {
                    "foo-bar": {
                        "service_id": "s",
                        "plan_id": null,
                        "created_at": "2025-03-01 10:00:00"
                    }
                },
                "log": "hello"
            }),
        )],
    );
    let (client, _) = broker.client();

    assert_eq!(client.resolve("foo").await.unwrap(), "foo-bar");
    assert_eq!(client.log().await.unwrap(), "hello");
}

#[tokio::test]
async fn test_null_plan_id_is_unresolved() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/v2/catalog", vec![Reply::json(200, catalog_json())]);
    broker.reply(
        Method::GET,
        "/b/status",
        vec![Reply::json(
            200,
            json!({"instances": {"foo-bar": {"service_id": "svc-redis", "plan_id": null}}}),
        )],
    );
    let (client, _) = broker.client();

    assert_eq!(client.resolve("foo-bar").await.unwrap(), "foo-bar");
    let instances = client.instances().await.unwrap();
    assert_eq!(instances.len(), 1);
    assert!(!instances[0].is_resolved());
}

#[tokio::test]
async fn test_null_log_reads_empty() {
    let broker = FakeBroker::start().await;
    broker.reply(Method::GET, "/b/status", vec![Reply::json(200, json!({"log": null}))]);
    let (client, _) = broker.client();

    assert_eq!(client.log().await.unwrap(), "");
    assert_eq!(
        client.resolve("anything").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}
