//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock catalog servers and test the
//! full crawl cycle end-to-end, plus a scripted in-memory fetcher for the
//! concurrency and rendered-DOM cases.

use async_trait::async_trait;
use catalog_harvest::config::{Config, OutputConfig, OutputFormat, SiteConfig, StartUrl};
use catalog_harvest::crawler::{run_crawl, Coordinator, CrawlTarget, FetchResult, HttpFetcher, PageFetcher};
use catalog_harvest::output::{open_sink, MemorySink, RecordSink, SqliteSink};
use catalog_harvest::url::{PageLabel, Site};
use catalog_harvest::{ConfigError, HarvestError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Site rooted at the mock server
fn site_for(server: &MockServer) -> Site {
    let base = url::Url::parse(&server.uri()).expect("Failed to parse base URL");
    Site::new(
        base.host_str().expect("Failed to extract host"),
        format!("{}/catalogsearch/result/?q={{query}}", server.uri()),
    )
}

/// Configuration pointing the crawler at the mock server
fn config_for(server: &MockServer, max_items: usize) -> Config {
    let site = site_for(server);
    let mut config = Config {
        site: SiteConfig {
            host: site.host().to_string(),
            search_url_template: site.search_url_template().to_string(),
        },
        ..Config::default()
    };
    config.crawl.max_items = max_items;
    config.crawl.concurrency = 1;
    config
}

fn http_coordinator(server: &MockServer, sink: Arc<dyn RecordSink>, max_items: usize) -> Coordinator {
    let fetcher = HttpFetcher::from_config(&Default::default()).expect("Failed to build client");
    Coordinator::new(site_for(server), Arc::new(fetcher), sink)
        .with_max_items(max_items)
        .with_concurrency(1)
}

async fn mount_page(server: &MockServer, page_path: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=UTF-8"))
        .expect(times)
        .mount(server)
        .await;
}

fn card(href: &str, name: &str, price: &str) -> String {
    format!(
        r#"<li class="item product product-item">
             <a class="product-item-photo" href="{href}"><img class="product-image-photo" src="/media/catalog{href}.jpg"></a>
             <a class="product-item-link" href="{href}">{name}</a>
             <div class="price-box"><span class="price">{price}</span></div>
           </li>"#
    )
}

fn listing(cards: &[String], next: Option<&str>) -> String {
    let pager = next
        .map(|href| format!(r#"<div class="pages"><a class="action next" href="{href}">Next</a></div>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body><ol class="products list items product-items">{}</ol>{}</body></html>"#,
        cards.join("\n"),
        pager
    )
}

const EAGLE_PAGE: &str = r#"<html>
<head><meta property="og:image" content="/media/catalog/ase-2025.jpg"></head>
<body>
  <h1 class="page-title"><span>2025 1 oz American Silver Eagle Coin</span></h1>
  <div class="product-info-price"><div class="price-box"><span class="price">$38.99</span></div></div>
  <div class="stock available"><span>In   Stock</span></div>
  <table class="data table additional-attributes">
    <tr><th>SKU</th><td>ASE-2025</td></tr>
    <tr><th>Metal</th><td>Silver</td></tr>
  </table>
  <div class="product attribute description"><div class="value">Struck at the West Point Mint.</div></div>
</body>
</html>"#;

#[tokio::test]
async fn test_budget_stops_listing_expansion() {
    let server = MockServer::start().await;

    let cards = vec![
        card("/2025-silver-eagle", "2025 Silver Eagle", "$38.99"),
        card("/2024-silver-maple-leaf", "2024 Silver Maple Leaf", "$36.10"),
        card("/2023-silver-britannia", "2023 Silver Britannia", "$35.00"),
    ];
    // The search page is fetched once; its next link is never followed
    mount_page(
        &server,
        "/catalogsearch/result/",
        listing(&cards, Some("/catalogsearch/result/?q=silver+coin&p=2")),
        1,
    )
    .await;

    let sink = Arc::new(MemorySink::new());
    let site = site_for(&server);
    let summary = http_coordinator(&server, sink.clone(), 2)
        .run(vec![CrawlTarget::new(site.search_url("silver coin"), PageLabel::Search)])
        .await
        .expect("Crawl failed");

    assert_eq!(summary.items_scraped, 2);
    assert_eq!(summary.pages_fetched, 1);
    assert!(!summary.is_short());

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].url, format!("{}/2025-silver-eagle", server.uri()));
    assert_eq!(records[0].name.as_deref(), Some("2025 Silver Eagle"));
    assert_eq!(records[0].numeric_price, Some(38.99));
    assert_eq!(
        records[0].image_url,
        Some(format!("{}/media/catalog/2025-silver-eagle.jpg", server.uri()))
    );
    // Listing records never carry detail-page fields
    assert_eq!(records[0].sku, None);
    assert_eq!(records[0].availability, None);
    assert_eq!(records[1].name.as_deref(), Some("2024 Silver Maple Leaf"));
}

#[tokio::test]
async fn test_category_pagination_stops_on_self_link() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/silver",
        listing(
            &[
                card("/a-silver-round", "A Silver Round", "$31.00"),
                card("/b-silver-bar", "B Silver Bar", "$330.00"),
            ],
            Some("/silver/page-2"),
        ),
        1,
    )
    .await;
    mount_page(
        &server,
        "/silver/page-2",
        listing(
            &[card("/c-silver-coin", "C Silver Coin", "$40.00")],
            Some("/silver/page-2"),
        ),
        1,
    )
    .await;

    let sink = Arc::new(MemorySink::new());
    let summary = http_coordinator(&server, sink.clone(), 10)
        .run(vec![CrawlTarget::new(format!("{}/silver", server.uri()), PageLabel::Category)])
        .await
        .expect("Crawl failed");

    assert_eq!(summary.items_scraped, 3);
    assert_eq!(summary.pages_fetched, 2);
    assert!(summary.is_short());
    assert_eq!(sink.len(), 3);
}

#[tokio::test]
async fn test_pager_cycling_back_is_not_refetched() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/gold",
        listing(&[card("/gold-eagle", "1 oz Gold Eagle", "$2,790.55")], Some("/gold/page-2")),
        1,
    )
    .await;
    mount_page(
        &server,
        "/gold/page-2",
        listing(&[card("/gold-buffalo", "1 oz Gold Buffalo", "$2,810.00")], Some("/gold")),
        1,
    )
    .await;

    let sink = Arc::new(MemorySink::new());
    let summary = http_coordinator(&server, sink.clone(), 10)
        .run(vec![CrawlTarget::new(format!("{}/gold", server.uri()), PageLabel::Category)])
        .await
        .expect("Crawl failed");

    assert_eq!(summary.items_scraped, 2);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(sink.records()[0].numeric_price, Some(2790.55));
}

#[tokio::test]
async fn test_duplicate_products_across_listings_emitted_once() {
    let server = MockServer::start().await;

    let cards = vec![
        card("/2025-silver-eagle", "2025 Silver Eagle", "$38.99"),
        card("/2025-silver-eagle?utm_source=grid", "2025 Silver Eagle", "$38.99"),
        card("/2024-silver-maple-leaf", "2024 Silver Maple Leaf", "$36.10"),
    ];
    // Both search terms land on the same results page
    mount_page(&server, "/catalogsearch/result/", listing(&cards, None), 2).await;

    let mut config = config_for(&server, 10);
    config.crawl.search_terms = vec!["silver eagle".to_string(), "silver coin".to_string()];

    let sink = Arc::new(MemorySink::new());
    let summary = run_crawl(&config, sink.clone()).await.expect("Crawl failed");

    assert_eq!(summary.items_scraped, 2);
    let urls: HashSet<String> = sink.records().into_iter().map(|r| r.url).collect();
    assert_eq!(urls.len(), 2);
    assert!(urls.contains(&format!("{}/2025-silver-eagle", server.uri())));
}

#[tokio::test]
async fn test_non_product_entries_are_skipped() {
    let server = MockServer::start().await;

    let cards = vec![
        card("https://apmex.com/silver-eagle", "Foreign Eagle", "$40.00"),
        card("/about/shipping", "Shipping Policy", "$0.00"),
        card("/silver/silver-coins", "All Silver Coins", "$1.00"),
        card("/2025-silver-eagle", "2025 Silver Eagle", "$38.99"),
    ];
    mount_page(&server, "/catalogsearch/result/", listing(&cards, None), 1).await;

    let sink = Arc::new(MemorySink::new());
    let site = site_for(&server);
    let summary = http_coordinator(&server, sink.clone(), 10)
        .run(vec![CrawlTarget::new(site.search_url("eagle"), PageLabel::Search)])
        .await
        .expect("Crawl failed");

    assert_eq!(summary.items_scraped, 1);
    assert_eq!(sink.records()[0].name.as_deref(), Some("2025 Silver Eagle"));
}

#[tokio::test]
async fn test_product_start_url_written_as_jsonl() {
    let server = MockServer::start().await;
    mount_page(&server, "/2025-american-silver-eagle", EAGLE_PAGE.to_string(), 1).await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let out_path = temp_dir.path().join("out").join("products.jsonl");

    let mut config = config_for(&server, 1);
    config.crawl.start_urls = vec![StartUrl::from(
        format!("{}/2025-american-silver-eagle", server.uri()).as_str(),
    )];
    config.output = OutputConfig {
        format: OutputFormat::Jsonl,
        path: out_path.to_string_lossy().to_string(),
    };

    let sink = open_sink(&config.output, "test-hash").expect("Failed to open sink");
    let summary = run_crawl(&config, sink).await.expect("Crawl failed");
    assert_eq!(summary.items_scraped, 1);

    let content = std::fs::read_to_string(&out_path).expect("Failed to read output");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);

    let record: serde_json::Value = serde_json::from_str(lines[0]).expect("Invalid JSON line");
    assert_eq!(record["url"], format!("{}/2025-american-silver-eagle", server.uri()));
    assert_eq!(record["name"], "2025 1 oz American Silver Eagle Coin");
    assert_eq!(record["price"], "$38.99");
    assert_eq!(record["priceNumeric"], 38.99);
    assert_eq!(record["sku"], "ASE-2025");
    assert_eq!(record["availability"], "In Stock");
    assert_eq!(record["description"], "Struck at the West Point Mint.");
    assert_eq!(
        record["imageUrl"],
        format!("{}/media/catalog/ase-2025.jpg", server.uri())
    );
    assert!(record["scrapedAt"].is_string());
}

#[tokio::test]
async fn test_product_without_price_is_still_emitted() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/1-oz-silver-round",
        r#"<h1>1 oz Silver Round</h1><span class="price">Call for price</span><p>Pre-Order</p>"#
            .to_string(),
        1,
    )
    .await;

    let sink = Arc::new(MemorySink::new());
    let summary = http_coordinator(&server, sink.clone(), 1)
        .run(vec![CrawlTarget::new(
            format!("{}/1-oz-silver-round", server.uri()),
            PageLabel::Product,
        )])
        .await
        .expect("Crawl failed");

    assert_eq!(summary.items_scraped, 1);
    let record = &sink.records()[0];
    assert_eq!(record.name.as_deref(), Some("1 oz Silver Round"));
    assert_eq!(record.raw_price_text, None);
    assert_eq!(record.numeric_price, None);
    assert_eq!(record.sku, None);

    let json = serde_json::to_value(record).expect("Failed to serialize");
    assert!(json["priceNumeric"].is_null());
    assert_eq!(json["availability"], "Pre-Order");
}

#[tokio::test]
async fn test_failed_product_fetch_does_not_stop_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken-coin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/working-coin",
        "<h1>Working Coin</h1><span class=\"price\">$10.00</span>".to_string(),
        1,
    )
    .await;

    let sink = Arc::new(MemorySink::new());
    let summary = http_coordinator(&server, sink.clone(), 5)
        .run(vec![
            CrawlTarget::new(format!("{}/broken-coin", server.uri()), PageLabel::Product),
            CrawlTarget::new(format!("{}/working-coin", server.uri()), PageLabel::Product),
        ])
        .await
        .expect("Crawl failed");

    assert_eq!(summary.items_scraped, 1);
    assert_eq!(summary.fetch_failures, 1);
    assert_eq!(sink.records()[0].name.as_deref(), Some("Working Coin"));
}

#[tokio::test]
async fn test_sqlite_sink_upserts_across_runs() {
    let server = MockServer::start().await;
    let cards = vec![
        card("/2025-silver-eagle", "2025 Silver Eagle", "$38.99"),
        card("/2024-silver-maple-leaf", "2024 Silver Maple Leaf", "$36.10"),
    ];
    mount_page(&server, "/silver", listing(&cards, None), 2).await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("products.db");

    for _ in 0..2 {
        let sink = Arc::new(SqliteSink::open(&db_path, "test-hash").expect("Failed to open db"));
        let summary = http_coordinator(&server, sink.clone(), 10)
            .run(vec![CrawlTarget::new(format!("{}/silver", server.uri()), PageLabel::Category)])
            .await
            .expect("Crawl failed");
        assert_eq!(summary.items_scraped, 2);
        assert_eq!(sink.count().expect("Failed to count"), 2);
    }
}

/// In-memory catalog: serves canned markup after a short delay
struct ScriptedFetcher {
    pages: HashMap<String, String>,
    rendered: bool,
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        tokio::time::sleep(Duration::from_millis(2)).await;
        match self.pages.get(url) {
            Some(body) => FetchResult::Success {
                final_url: url.to_string(),
                status_code: 200,
                body: body.clone(),
            },
            None => FetchResult::HttpError { status_code: 404 },
        }
    }

    fn renders_dom(&self) -> bool {
        self.rendered
    }
}

#[tokio::test]
async fn test_concurrent_workers_never_exceed_budget() {
    let mut pages = HashMap::new();
    let mut seeds = Vec::new();
    for section in 0..6 {
        let category = format!("https://sdbullion.com/silver/section-{}-coins", section);
        // Each section shares two products with the next one
        let cards: Vec<String> = (0..5)
            .map(|n| {
                let product = section * 3 + n;
                card(
                    &format!("https://sdbullion.com/product-{}", product),
                    &format!("Product {}", product),
                    "$10.00",
                )
            })
            .collect();
        pages.insert(category.clone(), listing(&cards, None));
        seeds.push(CrawlTarget::new(category, PageLabel::Category));
    }

    for max_items in [1, 7, 12] {
        let fetcher = ScriptedFetcher {
            pages: pages.clone(),
            rendered: false,
        };
        let sink = Arc::new(MemorySink::new());
        let summary = Coordinator::new(Site::default(), Arc::new(fetcher), sink.clone())
            .with_max_items(max_items)
            .with_concurrency(8)
            .run(seeds.clone())
            .await
            .expect("Crawl failed");

        let records = sink.records();
        assert_eq!(summary.items_scraped, max_items);
        assert_eq!(records.len(), max_items);
        let unique: HashSet<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(unique.len(), max_items);
    }
}

/// Holds the first `gated` fetches until all of them are in flight
struct GatedFetcher {
    gate: Barrier,
    gated: usize,
    calls: AtomicUsize,
}

impl GatedFetcher {
    fn new(gated: usize) -> Self {
        Self {
            gate: Barrier::new(gated),
            gated,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageFetcher for GatedFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.gated {
            self.gate.wait().await;
        }
        FetchResult::Success {
            final_url: url.to_string(),
            status_code: 200,
            body: format!(r#"<h1>{}</h1><span class="price">$5.00</span>"#, url),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_product_results_over_budget_are_dropped() {
    let seeds: Vec<CrawlTarget> = (0..12)
        .map(|n| CrawlTarget::new(format!("https://sdbullion.com/product-{}", n), PageLabel::Product))
        .collect();

    for _ in 0..10 {
        // All eight workers fetch before any result is recorded
        let fetcher = GatedFetcher::new(8);
        let sink = Arc::new(MemorySink::new());
        let summary = Coordinator::new(Site::default(), Arc::new(fetcher), sink.clone())
            .with_max_items(3)
            .with_concurrency(8)
            .run(seeds.clone())
            .await
            .expect("Crawl failed");

        let records = sink.records();
        assert_eq!(summary.items_scraped, 3);
        assert_eq!(records.len(), 3);
        let unique: HashSet<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(unique.len(), 3);
        assert!(summary.pages_fetched >= 8);
        assert!(summary.skipped >= 5);
    }
}

#[tokio::test]
async fn test_config_without_usable_seed_fails() {
    let mut config = Config::default();
    config.site.host = "example.com".to_string();
    config.crawl.start_urls = vec![StartUrl::from("https://sdbullion.com/silver")];

    let result = run_crawl(&config, Arc::new(MemorySink::new())).await;
    assert!(matches!(
        result,
        Err(HarvestError::Config(ConfigError::NoSeeds(_)))
    ));
}

#[tokio::test]
async fn test_rendered_dom_enables_priced_anchor_strategy() {
    let category = "https://sdbullion.com/silver/silver-rounds";
    let markup = r#"<html><body>
        <section class="tiles">
          <div class="tile">
            <a href="/1-oz-silver-buffalo-round">1 oz Silver Buffalo Round</a>
            <span class="tile-price">$32.10</span>
          </div>
          <div class="tile"><a href="/customer/account">Sign in</a></div>
        </section>
    </body></html>"#;

    let mut pages = HashMap::new();
    pages.insert(category.to_string(), markup.to_string());

    for (rendered, expected) in [(false, 0), (true, 1)] {
        let fetcher = ScriptedFetcher {
            pages: pages.clone(),
            rendered,
        };
        let sink = Arc::new(MemorySink::new());
        let summary = Coordinator::new(Site::default(), Arc::new(fetcher), sink.clone())
            .with_concurrency(1)
            .run(vec![CrawlTarget::new(category, PageLabel::Category)])
            .await
            .expect("Crawl failed");

        assert_eq!(summary.items_scraped, expected);
        if rendered {
            let record = &sink.records()[0];
            assert_eq!(record.url, "https://sdbullion.com/1-oz-silver-buffalo-round");
            assert_eq!(record.numeric_price, Some(32.10));
        } else {
            assert_eq!(summary.empty_listings, 1);
        }
    }
}
