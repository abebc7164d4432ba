//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive real
//! engine cycles end-to-end against a scratch data directory.

use harvester::config::{Config, CrawlerConfig, FilterConfig, OutputConfig, UserAgentConfig};
use harvester::crawler::{crawl_once, Termination};
use harvester::output::{list_shards, CrawlRecord};
use harvester::storage::{DomainRegistry, VisitedStore};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILLER: &str = "Seasonal influenza vaccination is the best way to reduce the risk of \
    flu illness and its potentially serious complications for everyone.";

/// Creates a test configuration crawling from the given seeds
fn create_test_config(seeds: Vec<String>, data_dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_concurrent_fetches: 4,
            idle_timeout_secs: 5,
            poll_interval_ms: 100,
            drain_grace_secs: 1,
            restart_delay_ms: 10,
            ..Default::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        output: OutputConfig {
            data_dir: data_dir.display().to_string(),
            visited_file: "visited_urls.txt".to_string(),
            domains_file: "linked_domains.txt".to_string(),
            shard_prefix: "extracted_text".to_string(),
        },
        seeds,
        filter: FilterConfig::default(),
    }
}

/// Builds an English page with enough text to be recorded
fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a> "#, href))
        .collect();
    format!(
        r#"<html lang="en"><head><title>{}</title></head><body>
        <header>Site navigation</header>
        <p>{}</p><p>{}</p>
        <nav>{}</nav>
        </body></html>"#,
        title, FILLER, FILLER, anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

/// Reads every record from the shards in the directory; each must be a valid JSON array
fn read_records(dir: &Path) -> Vec<CrawlRecord> {
    let mut records = Vec::new();
    for shard in list_shards(dir, "extracted_text").unwrap() {
        let content = std::fs::read_to_string(&shard).unwrap();
        let parsed: Vec<CrawlRecord> = serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("{} is not a JSON array: {}", shard.display(), e));
        records.extend(parsed);
    }
    records
}

#[tokio::test]
async fn test_crawl_follows_seed_links_and_skips_denied() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            &["/flu/", "https://www.facebook.com/CDC", "#top", "mailto:info@cdc.gov"],
        ),
    )
    .await;
    mount_page(&server, "/flu/", html_page("Flu", &["/"])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![format!("{}/", base)], dir.path());

    let report = crawl_once(config).await.expect("engine cycle failed");

    assert_eq!(report.termination, Termination::Exhausted);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.records_written, 2);
    assert_eq!(report.fetch_failures, 0);

    let records = read_records(dir.path());
    assert_eq!(records.len(), 2);

    let home = records
        .iter()
        .find(|r| r.url == format!("{}/", base))
        .expect("no record for the seed page");
    assert_eq!(home.title, "Home");
    // Same-domain and denied links are never reported
    assert!(home.links.is_empty());
    assert!(home.text.contains("Seasonal influenza"));
    assert!(!home.text.contains("Site navigation"));

    // Only the two seed-site pages were requested; facebook.com never was
    let mut paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    paths.sort();
    assert_eq!(paths, vec!["/".to_string(), "/flu/".to_string()]);
}

#[tokio::test]
async fn test_cross_domain_links_are_reported() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(
            "Research",
            &[
                "https://www.ncbi.nlm.nih.gov/pmc/",
                "https://www.nih.gov/about",
                "https://www.who.int/news",
                "https://www.ncbi.nlm.nih.gov/pmc/",
            ],
        ),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![format!("{}/", base)], dir.path());

    let report = crawl_once(config).await.unwrap();
    assert_eq!(report.records_written, 1);

    let records = read_records(dir.path());
    assert_eq!(
        records[0].links,
        vec![
            "https://www.ncbi.nlm.nih.gov/pmc/".to_string(),
            "https://www.nih.gov/about".to_string(),
            "https://www.who.int/news".to_string(),
        ]
    );

    let domains = DomainRegistry::open(&dir.path().join("linked_domains.txt")).unwrap();
    assert_eq!(domains.len().unwrap(), 2);
    assert!(domains.contains("nih.gov").unwrap());
    assert!(domains.contains("who.int").unwrap());

    // Off-seed links are reported but never fetched
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_restart_refetches_seed_without_new_record() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(html_page("Home", &["/a"]), "text/html"),
        )
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html_page("A", &[]), "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seeds = vec![format!("{}/", base)];

    let first = crawl_once(create_test_config(seeds.clone(), dir.path()))
        .await
        .unwrap();
    assert_eq!(first.records_written, 2);

    let second = crawl_once(create_test_config(seeds, dir.path()))
        .await
        .unwrap();
    assert_eq!(second.termination, Termination::Exhausted);
    // The seed is fetched again for its links; /a is already visited
    assert_eq!(second.pages_fetched, 1);
    assert_eq!(second.records_written, 0);

    // Both cycles closed a shard; all of them parse and hold no duplicates
    let records = read_records(dir.path());
    assert_eq!(records.len(), 2);
    assert_eq!(list_shards(dir.path(), "extracted_text").unwrap().len(), 2);

    let visited = VisitedStore::open(&dir.path().join("visited_urls.txt")).unwrap();
    assert_eq!(visited.len().unwrap(), 2);
}

#[tokio::test]
async fn test_visited_seed_leads_to_unvisited_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Home", &["/a"])).await;
    mount_page(&server, "/a", html_page("A", &[])).await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("visited_urls.txt"), format!("{}/\n", base)).unwrap();

    let report = crawl_once(create_test_config(vec![format!("{}/", base)], dir.path()))
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.records_written, 1);
    let records = read_records(dir.path());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, format!("{}/a", base));
}

#[tokio::test]
async fn test_crawl_resumes_after_stall() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Home", &["/a"])).await;
    // The first request for /a hangs; later ones answer normally
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html_page("A", &[]), "text/html")
                .set_delay(Duration::from_secs(20)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a", html_page("A", &[])).await;

    let dir = TempDir::new().unwrap();
    let seeds = vec![format!("{}/", base)];
    let mut config = create_test_config(seeds, dir.path());
    config.crawler.idle_timeout_secs = 1;

    let stalled = tokio::time::timeout(Duration::from_secs(10), crawl_once(config.clone()))
        .await
        .expect("watchdog never stopped the engine")
        .unwrap();
    assert_eq!(stalled.termination, Termination::Stalled);
    assert_eq!(stalled.records_written, 1);
    assert_eq!(stalled.abandoned, 1);

    let resumed = crawl_once(config).await.unwrap();
    assert_eq!(resumed.termination, Termination::Exhausted);
    assert_eq!(resumed.records_written, 1);

    let records = read_records(dir.path());
    let mut urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    urls.sort();
    assert_eq!(urls, vec![format!("{}/", base), format!("{}/a", base)]);
}

#[tokio::test]
async fn test_failed_fetches_are_marked_visited() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Home", &["/gone", "/report.json"])).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![format!("{}/", base)], dir.path());

    let report = crawl_once(config).await.unwrap();
    assert_eq!(report.fetch_failures, 2);
    assert_eq!(report.records_written, 1);

    let visited = VisitedStore::open(&dir.path().join("visited_urls.txt")).unwrap();
    assert!(visited.contains(&format!("{}/gone", base)).unwrap());
    assert!(visited.contains(&format!("{}/report.json", base)).unwrap());
    assert_eq!(visited.len().unwrap(), 3);
}

#[tokio::test]
async fn test_short_and_foreign_pages_produce_no_record() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Home", &["/short", "/es/"])).await;
    mount_page(
        &server,
        "/short",
        r#"<html lang="en"><head><title>Short</title></head><body><p>Too short.</p></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/es/",
        format!(
            r#"<html lang="es"><head><title>Gripe</title></head><body><p>{}</p></body></html>"#,
            FILLER
        ),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![format!("{}/", base)], dir.path());

    let report = crawl_once(config).await.unwrap();
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.records_written, 1);
    assert_eq!(report.pages_skipped, 2);

    let visited = VisitedStore::open(&dir.path().join("visited_urls.txt")).unwrap();
    assert!(visited.contains(&format!("{}/es/", base)).unwrap());
}

#[tokio::test]
async fn test_stalled_engine_is_stopped_by_watchdog() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html_page("Slow", &[]), "text/html")
                .set_delay(Duration::from_secs(20)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(vec![format!("{}/", base)], dir.path());
    config.crawler.idle_timeout_secs = 1;

    let report = tokio::time::timeout(Duration::from_secs(10), crawl_once(config))
        .await
        .expect("watchdog never stopped the engine")
        .unwrap();

    assert_eq!(report.termination, Termination::Stalled);
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.records_written, 0);

    // The abandoned seed stays unvisited so the next cycle retries it
    let visited = VisitedStore::open(&dir.path().join("visited_urls.txt")).unwrap();
    assert!(visited.is_empty().unwrap());

    // The shard opened for the cycle was still closed cleanly
    assert!(read_records(dir.path()).is_empty());
}

#[tokio::test]
async fn test_unterminated_shard_is_repaired_on_start() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", html_page("Home", &[])).await;

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("extracted_text_20240101_000000_000.json"),
        "[\n{\"url\":\"https://www.cdc.gov/\",\"text\":\"t\",\"domain\":\"cdc.gov\",\"links\":[],\"title\":\"CDC\"},\n{\"url\":\"https://www.cd",
    )
    .unwrap();

    let config = create_test_config(vec![format!("{}/", base)], dir.path());
    crawl_once(config).await.unwrap();

    let records = read_records(dir.path());
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r.url == "https://www.cdc.gov/"));
}
