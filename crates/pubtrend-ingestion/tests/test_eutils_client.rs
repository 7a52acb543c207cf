//! HTTP-level client tests against a local mock of the E-utilities service.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pubtrend_ingestion::{EutilsClient, EutilsConfig, PublicationSource, RetryPolicy};

fn test_config(server: &MockServer) -> EutilsConfig {
    EutilsConfig {
        base_url: server.uri(),
        requests_per_second: 0.0, // no pacing against the local mock
        ..EutilsConfig::default()
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
}

const ESEARCH_BODY: &str = r#"{
    "esearchresult": {
        "count": "2450",
        "retmax": "3",
        "retstart": "0",
        "idlist": ["31452104", "30123456", "29998877"]
    }
}"#;

const EFETCH_BODY: &str = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle><MedlineCitation>
    <PMID>31452104</PMID>
    <Article><ArticleTitle>First</ArticleTitle></Article>
  </MedlineCitation></PubmedArticle>
  <PubmedArticle><MedlineCitation>
    <PMID>30123456</PMID>
    <Article><ArticleTitle>Second</ArticleTitle></Article>
  </MedlineCitation></PubmedArticle>
</PubmedArticleSet>"#;

#[tokio::test]
async fn test_esearch_returns_count_and_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("retstart", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESEARCH_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let client = EutilsClient::new(test_config(&server)).unwrap();
    let page = client.search("(radiotherapy)", 100, 3).await.unwrap();
    assert_eq!(page.count, 2450);
    assert_eq!(page.ids.len(), 3);
    assert_eq!(page.ids[0], "31452104");
}

#[tokio::test]
async fn test_fetch_articles_parses_xml() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("retmode", "xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EFETCH_BODY))
        .mount(&server)
        .await;

    let client = EutilsClient::new(test_config(&server)).unwrap();
    let articles = client
        .fetch_articles(&["31452104".to_string(), "30123456".to_string()])
        .await
        .unwrap();
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].title, "First");
}

#[tokio::test]
async fn test_fetch_articles_chunks_large_batches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EFETCH_BODY))
        .expect(3) // 250 IDs at 100 per call
        .mount(&server)
        .await;

    let client = EutilsClient::new(test_config(&server)).unwrap();
    let pmids: Vec<String> = (0..250).map(|i| i.to_string()).collect();
    client.fetch_articles(&pmids).await.unwrap();
}

#[tokio::test]
async fn test_empty_pmid_list_skips_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EFETCH_BODY))
        .expect(0)
        .mount(&server)
        .await;

    let client = EutilsClient::new(test_config(&server)).unwrap();
    let articles = client.fetch_articles(&[]).await.unwrap();
    assert!(articles.is_empty());
}

#[tokio::test]
async fn test_rate_limited_call_retries_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ESEARCH_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let client = EutilsClient::new(test_config(&server))
        .unwrap()
        .with_retry_policy(fast_retry());
    let page = client.search("(imaging)", 0, 3).await.unwrap();
    assert_eq!(page.count, 2450);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = EutilsClient::new(test_config(&server))
        .unwrap()
        .with_retry_policy(fast_retry());
    let err = client.search("(imaging)", 0, 3).await.unwrap_err();
    assert!(err.to_string().contains("3 attempt"));
}

#[tokio::test]
async fn test_client_error_fails_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let client = EutilsClient::new(test_config(&server))
        .unwrap()
        .with_retry_policy(fast_retry());
    assert!(client.search("(bad", 0, 3).await.is_err());
}
