//! Integration tests for a full catalog run
//!
//! These tests use wiremock to serve a small shop and check the files a
//! run leaves behind.

use std::path::Path;

use catalog_mapper::config::{parse_config, CategoryFilter, Config};
use catalog_mapper::crawler::{Coordinator, RunOptions};
use catalog_mapper::output::{
    read_categories_json, CATEGORIES_JSON, CATEGORIES_TXT, PRODUCTS_JSON, PRODUCTS_TXT,
};
use catalog_mapper::{Category, RunStatus};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock shop
fn create_test_config(base_url: &str, output_dir: &Path) -> Config {
    let toml = format!(
        r#"
[crawler]
max-concurrent-requests = 2
minimum-delay = 100
render-js = false

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[site]
base-url = "{}/"

[output]
directory = "{}"
"#,
        base_url,
        output_dir.display()
    );

    parse_config(&toml).expect("Test config should be valid")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn product_card(slug: &str, name: &str, price: &str) -> String {
    format!(
        r#"<li class="product type-product instock">
            <a href="/product/{slug}/"><img src="/img/{slug}.jpg">
            <h2 class="woocommerce-loop-product__title">{name}</h2></a>
            <span class="price">{price}</span>
        </li>"#
    )
}

fn listing(cards: &[String], next: Option<&str>) -> String {
    let next = next
        .map(|href| {
            format!(
                r#"<nav class="woocommerce-pagination"><a class="next" rel="next" href="{}">→</a></nav>"#,
                href
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><body><ul class="products">{}</ul>{}</body></html>"#,
        cards.join("\n"),
        next
    )
}

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Mounts the shop:
///
/// - two seed products, one under Dairy and one under Bakery
/// - Dairy with the subcategories Milk (two pages) and Cheese
/// - Bakery without subcategories
async fn mount_shop(server: &MockServer) {
    mount_page(
        server,
        "/",
        r#"<html><body><ul class="products">
            <li class="product"><a href="/product/seed-milk/">Seed Milk</a></li>
            <li class="product"><a href="/product/seed-bread/">Seed Bread</a></li>
        </ul></body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/product/seed-milk/",
        r#"<html><body><div class="product_meta">
            <span class="posted_in">Category: <a href="/product-category/dairy/">Dairy</a></span>
        </div></body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/product/seed-bread/",
        r#"<html><body><div class="product_meta">
            <span class="posted_in">Category: <a href="/product-category/bakery/">Bakery</a></span>
        </div></body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/product-category/dairy/",
        r#"<html><body>
            <div class="term-description"><p>Fresh dairy every day.</p></div>
            <ul class="product-subcategories">
                <li><a href="/product-category/dairy/">Dairy</a></li>
                <li><a href="/product-category/dairy/milk/">Milk (3)</a></li>
                <li><a href="/product-category/dairy/cheese/">Cheese (2)</a></li>
            </ul>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        server,
        "/product-category/dairy/milk/",
        listing(
            &[
                product_card("full-cream-milk", "Full Cream Milk", "QAR 7.50"),
                product_card("laban", "Laban", "QAR 4.25"),
            ],
            Some("/product-category/dairy/milk/page/2/"),
        ),
    )
    .await;

    mount_page(
        server,
        "/product-category/dairy/milk/page/2/",
        listing(&[product_card("skimmed-milk", "Skimmed Milk", "QAR 6.75")], None),
    )
    .await;

    // Laban is listed under Cheese as well; it stays with Milk
    mount_page(
        server,
        "/product-category/dairy/cheese/",
        listing(
            &[
                product_card("halloumi", "Halloumi", "QAR 18.00"),
                product_card("laban", "Laban", "QAR 4.25"),
            ],
            None,
        ),
    )
    .await;

    mount_page(
        server,
        "/product-category/bakery/",
        listing(&[product_card("arabic-bread", "Arabic Bread", "QAR 2.00")], None).replace(
            "<body>",
            r#"<body><p class="woocommerce-result-count">Showing all 1 result</p>"#,
        ),
    )
    .await;
}

fn read_products(dir: &Path) -> Vec<serde_json::Value> {
    let content =
        std::fs::read_to_string(dir.join(PRODUCTS_JSON)).expect("products.json should exist");
    serde_json::from_str(&content).expect("products.json should be valid JSON")
}

#[tokio::test]
async fn test_full_run_writes_matching_sinks() {
    let server = MockServer::start().await;
    mount_shop(&server).await;
    let output = TempDir::new().unwrap();

    let config = create_test_config(&server.uri(), output.path());
    let mut coordinator =
        Coordinator::new(config, RunOptions::default()).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Run should succeed");

    assert_eq!(report.status, RunStatus::Completed, "warnings: {:?}", report.warnings);
    assert_eq!(report.statistics.leaves, 3);
    assert_eq!(report.statistics.products, 5);
    assert_eq!(report.statistics.duplicate_products, 1);
    assert_eq!(report.flush.sinks_written.len(), 4);

    let categories = read_categories_json(&output.path().join(CATEGORIES_JSON)).unwrap();
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Dairy", "Bakery"]);

    let dairy = &categories[0];
    assert_eq!(dairy.category_id, "dairy");
    assert_eq!(dairy.description.as_deref(), Some("Fresh dairy every day."));
    let subs: Vec<&str> = dairy.subcategories.iter().map(|c| c.category_id.as_str()).collect();
    assert_eq!(subs, vec!["milk", "cheese"]);
    assert_eq!(dairy.subcategories[0].name, "Milk");

    // Counted by the listing for Bakery, by harvest for Dairy
    assert_eq!(categories[1].products_count, Some(1));
    assert_eq!(dairy.products_count, Some(4));

    let products = read_products(output.path());
    let product_names: Vec<&str> = products.iter().filter_map(|p| p["name"].as_str()).collect();
    assert_eq!(
        product_names,
        vec!["Full Cream Milk", "Laban", "Skimmed Milk", "Halloumi", "Arabic Bread"]
    );

    let laban = &products[1];
    assert_eq!(laban["category"], "Dairy");
    assert_eq!(laban["subcategory"], "Milk");
    assert_eq!(laban["price"], "QAR 4.25");
    assert!(laban["sku"].is_null());

    let bread = &products[4];
    assert_eq!(bread["category"], "Bakery");
    assert!(bread["subcategory"].is_null());

    let text = std::fs::read_to_string(output.path().join(PRODUCTS_TXT)).unwrap();
    assert_eq!(text.matches("Product Name: ").count(), products.len());
    for product in &products {
        let name = product["name"].as_str().unwrap();
        let url = product["url"].as_str().unwrap();
        assert!(text.contains(&format!("Product Name: {}\n", name)), "missing {}", name);
        assert!(text.contains(&format!("Product URL: {}\n", url)), "missing {}", url);
    }
    assert!(text.contains("Total Products Extracted: 5\n"));

    let category_text = std::fs::read_to_string(output.path().join(CATEGORIES_TXT)).unwrap();
    assert!(category_text.contains("Category ID: dairy\n"));
    assert!(category_text.contains("Category ID: bakery\n"));
    assert!(category_text.contains("Total Categories Extracted: 2\n"));
}

#[tokio::test]
async fn test_filter_prunes_before_fetching() {
    let server = MockServer::start().await;

    // Mounted first so they take precedence over the shop's own mocks
    for page in [
        "/product-category/dairy/",
        "/product-category/dairy/milk/",
        "/product-category/dairy/cheese/",
    ] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html(String::new()))
            .expect(0)
            .mount(&server)
            .await;
    }
    mount_shop(&server).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let options = RunOptions {
        category_filter: Some(CategoryFilter::parse("bak").unwrap()),
        reuse_categories: false,
    };

    let mut coordinator = Coordinator::new(config, options).unwrap();
    let report = coordinator.run().await.expect("Run should succeed");

    assert_eq!(report.status, RunStatus::Completed);

    let categories = read_categories_json(&output.path().join(CATEGORIES_JSON)).unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Bakery");

    let products = read_products(output.path());
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Arabic Bread");
}

#[tokio::test]
async fn test_failed_leaf_completes_with_warnings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product-category/dairy/cheese/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_shop(&server).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());

    let mut coordinator = Coordinator::new(config, RunOptions::default()).unwrap();
    let report = coordinator.run().await.expect("A failed leaf is not fatal");

    assert_eq!(report.status, RunStatus::CompletedWithWarnings);
    assert_eq!(report.status.exit_code(), 2);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].url.contains("/product-category/dairy/cheese/"));

    // Every other leaf still made it to disk
    let products = read_products(output.path());
    let names: Vec<&str> = products.iter().filter_map(|p| p["name"].as_str()).collect();
    assert_eq!(names, vec!["Full Cream Milk", "Laban", "Skimmed Milk", "Arabic Bread"]);
}

#[tokio::test]
async fn test_seed_failure_completes_with_warnings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product/seed-milk/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_shop(&server).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());

    let mut coordinator = Coordinator::new(config, RunOptions::default()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.status, RunStatus::CompletedWithWarnings);

    let categories = read_categories_json(&output.path().join(CATEGORIES_JSON)).unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].category_id, "bakery");
}

#[tokio::test]
async fn test_reuse_categories_skips_discovery() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(String::new()))
        .expect(0)
        .mount(&server)
        .await;
    mount_shop(&server).await;

    let output = TempDir::new().unwrap();

    let mut dairy = Category::new("dairy", "Dairy", format!("{}/product-category/dairy/", base));
    dairy.subcategories.push(Category::new(
        "cheese",
        "Cheese",
        format!("{}/product-category/dairy/cheese/", base),
    ));
    let bakery = Category::new("bakery", "Bakery", format!("{}/product-category/bakery/", base));
    std::fs::write(
        output.path().join(CATEGORIES_JSON),
        serde_json::to_string_pretty(&vec![dairy, bakery]).unwrap(),
    )
    .unwrap();

    let config = create_test_config(&base, output.path());
    let options = RunOptions {
        category_filter: None,
        reuse_categories: true,
    };

    let mut coordinator = Coordinator::new(config, options).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.statistics.leaves, 2);

    let products = read_products(output.path());
    let names: Vec<&str> = products.iter().filter_map(|p| p["name"].as_str()).collect();
    assert_eq!(names, vec!["Halloumi", "Laban", "Arabic Bread"]);
    assert_eq!(products[1]["subcategory"], "Cheese");
}

#[tokio::test]
async fn test_reuse_without_previous_run_is_fatal() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    let config = create_test_config(&server.uri(), output.path());
    let options = RunOptions {
        category_filter: None,
        reuse_categories: true,
    };

    let mut coordinator = Coordinator::new(config, options).unwrap();
    assert!(coordinator.run().await.is_err());
    assert!(!output.path().join(PRODUCTS_JSON).exists());
}
