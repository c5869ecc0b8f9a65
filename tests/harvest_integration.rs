//! End-to-end harvest tests against a mock search endpoint.
//!
//! The mock paginates like Jira: it reads `startAt`/`maxResults` from the
//! query and returns that slice of a fixed issue list.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use jira_harvest::fetch::RecordingSleeper;
use jira_harvest::{CheckpointStore, HarvestConfig, Harvester, NoProgress, StopReason};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

struct JiraProject {
    key: &'static str,
    count: u64,
}

impl Respond for JiraProject {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let param = |name: &str| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse::<u64>().ok())
        };
        let start = param("startAt").unwrap_or(0);
        let max = param("maxResults").unwrap_or(50);
        let end = (start + max).min(self.count);
        let issues: Vec<Value> = (start..end)
            .map(|i| {
                json!({
                    "key": format!("{}-{}", self.key, i + 1),
                    "fields": {
                        "summary": format!("Crash number {}", i + 1),
                        "description": "The broker fails on startup. Logs attached.",
                        "status": {"name": "Open"},
                        "labels": [],
                        "comment": {"comments": [
                            {"body": "Reproduced on trunk with default settings."}
                        ]}
                    }
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({
            "startAt": start,
            "maxResults": max,
            "total": self.count,
            "issues": issues,
        }))
    }
}

async fn mount_project(server: &MockServer, key: &'static str, count: u64) {
    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .and(query_param("jql", format!("project={key} ORDER BY created ASC")))
        .respond_with(JiraProject { key, count })
        .mount(server)
        .await;
}

fn config_for(server: &MockServer, dir: &TempDir, sources: &[&str]) -> HarvestConfig {
    let mut config = HarvestConfig {
        sources: sources.iter().map(|s| (*s).to_string()).collect(),
        endpoint: format!("{}/rest/api/2/search", server.uri()),
        ..HarvestConfig::default()
    };
    config.set_output_dir(dir.path().join("data"));
    config
}

fn harvester(config: HarvestConfig, sleeper: &RecordingSleeper) -> Harvester {
    Harvester::from_config_with_sleeper(config, Arc::new(NoProgress), Arc::new(sleeper.clone()))
        .expect("harvester should build")
}

fn read_lines(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .expect("output file should exist")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect()
}

#[tokio::test]
async fn test_first_run_respects_cap_and_checkpoints() {
    let server = MockServer::start().await;
    mount_project(&server, "KAFKA", 500).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir, &["KAFKA"]);
    let output = config.output_dir.join("kafka_issues.jsonl");
    let checkpoint_path = config.checkpoint_path.clone();

    let sleeper = RecordingSleeper::new();
    let report = harvester(config, &sleeper).run_all().await.unwrap();

    let source = &report.sources[0];
    assert_eq!(source.stop, StopReason::CapReached);
    assert_eq!(source.written, 200);
    assert_eq!(source.final_cursor, 200);

    let lines = read_lines(&output);
    assert_eq!(lines.len(), 200);
    assert_eq!(lines[0]["issue_id"], "KAFKA-1");
    assert_eq!(lines[0]["project"], "KAFKA");
    assert_eq!(lines[0]["derived"]["classification"], "bug");
    assert_eq!(
        lines[0]["derived"]["summary"],
        "The broker fails on startup. Logs attached."
    );

    let registry = CheckpointStore::new(checkpoint_path).load().await;
    assert_eq!(registry.cursor("KAFKA"), 200);

    // one politeness delay per page, no retries
    assert_eq!(sleeper.recorded(), vec![Duration::from_secs(1); 4]);
}

#[tokio::test]
async fn test_repeated_runs_never_duplicate_issues() {
    let server = MockServer::start().await;
    mount_project(&server, "HADOOP", 230).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir, &["HADOOP"]);
    let output = config.output_dir.join("hadoop_issues.jsonl");

    let sleeper = RecordingSleeper::new();
    let first = harvester(config.clone(), &sleeper).run_all().await.unwrap();
    assert_eq!(first.sources[0].written, 200);

    let second = harvester(config.clone(), &sleeper).run_all().await.unwrap();
    assert_eq!(second.sources[0].start_cursor, 200);
    assert_eq!(second.sources[0].written, 30);
    assert_eq!(second.sources[0].stop, StopReason::TotalReached);

    let third = harvester(config, &sleeper).run_all().await.unwrap();
    assert_eq!(third.sources[0].written, 0);

    let lines = read_lines(&output);
    assert_eq!(lines.len(), 230);
    let ids: HashSet<&str> = lines
        .iter()
        .map(|l| l["issue_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 230);
}

#[tokio::test]
async fn test_failing_project_does_not_block_the_next() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("jql", "project=SPARK ORDER BY created ASC"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;
    mount_project(&server, "KAFKA", 3).await;
    let dir = TempDir::new().unwrap();
    let config = config_for(&server, &dir, &["SPARK", "KAFKA"]);
    let spark_output = config.output_dir.join("spark_issues.jsonl");
    let kafka_output = config.output_dir.join("kafka_issues.jsonl");
    let checkpoint_path = config.checkpoint_path.clone();

    let sleeper = RecordingSleeper::new();
    let report = harvester(config, &sleeper).run_all().await.unwrap();

    assert_eq!(report.sources[0].stop, StopReason::FetchFailed);
    assert_eq!(report.sources[0].final_cursor, 0);
    assert!(!spark_output.exists());
    assert_eq!(read_lines(&kafka_output).len(), 3);
    assert_eq!(report.failed_sources(), 1);

    let registry = CheckpointStore::new(checkpoint_path).load().await;
    assert_eq!(registry.cursor("SPARK"), 0);
    assert_eq!(registry.cursor("KAFKA"), 3);
}
