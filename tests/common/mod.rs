//! In-process API harness: real router on an ephemeral port, catalog in a temp dir.

#![allow(dead_code)]

use async_trait::async_trait;
use books_catalog_api::infra::scraper::PageSource;
use books_catalog_api::storage::catalog::write_books;
use books_catalog_api::{transport, Book, Config, InMemoryCredentialStore};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const SITE: &str = "http://books.test";

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub data_path: PathBuf,
    _dir: TempDir,
    _server: tokio::task::JoinHandle<()>,
}

/// Serves canned listing pages by URL; unknown URLs fail like a 404.
#[derive(Default)]
pub struct CannedPages(pub HashMap<String, String>);

#[async_trait]
impl PageSource for CannedPages {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 Not Found: {url}"))
    }
}

/// Never answers, so a run stays in progress.
pub struct StalledPages;

#[async_trait]
impl PageSource for StalledPages {
    async fn fetch(&self, _url: &str) -> anyhow::Result<String> {
        std::future::pending().await
    }
}

pub fn listing_page(titles: &[(&str, &str, &str)], has_next: bool) -> String {
    let products: String = titles
        .iter()
        .map(|(title, price, stars)| {
            format!(
                r#"<article class="product_pod">
                     <div class="image_container"><img src="../media/{title}.jpg"></div>
                     <p class="star-rating {stars}"></p>
                     <h3><a href="{title}/index.html" title="{title}">{title}</a></h3>
                     <p class="price_color">£{price}</p>
                     <p class="instock availability">In stock</p>
                   </article>"#
            )
        })
        .collect();
    let next = if has_next {
        r#"<li class="next"><a href="page-2.html">next</a></li>"#
    } else {
        ""
    };
    format!("<html><body><ol>{products}</ol><ul class=\"pager\">{next}</ul></body></html>")
}

/// A catalog large enough to train on: 30 books over 3 categories.
pub fn training_catalog() -> Vec<Book> {
    let categories = ["Fiction", "Science", "History"];
    (0..30)
        .map(|i: i64| {
            let rating = (i % 5 + 1) as u8;
            Book::new(
                i + 1,
                &format!("Catalog Title {}", i + 1),
                8.0 + f64::from(rating) * 4.0 + (i % 4) as f64 * 0.5,
                rating,
                if i % 6 == 0 { "Out of stock" } else { "In stock" },
                categories[(i % 3) as usize],
                "",
                "",
            )
        })
        .collect()
}

impl TestApp {
    pub async fn spawn(books: Option<Vec<Book>>, pages: Arc<dyn PageSource>) -> TestApp {
        let dir = tempfile::tempdir().expect("tempdir");
        let data_path = dir.path().join("books_data.csv");
        if let Some(books) = books {
            write_books(&data_path, &books).expect("write catalog");
        }

        let mut config = Config::default();
        config.data_path = data_path.clone();
        config.jwt_secret = "integration-test-secret".to_string();
        config.scraper.base_url = SITE.to_string();
        config.scraper.page_delay_ms = 0;

        let credentials = InMemoryCredentialStore::with_demo_users().expect("demo users");
        let state = transport::http::AppState::new(config, Arc::new(credentials), pages);
        let router = transport::http::create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestApp {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            data_path,
            _dir: dir,
            _server: server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.expect("request");
        let status = resp.status().as_u16();
        (status, resp.json().await.expect("json body"))
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("request");
        let status = resp.status().as_u16();
        (status, resp.json().await.expect("json body"))
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("request");
        let status = resp.status().as_u16();
        (status, resp.json().await.expect("json body"))
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request");
        assert_eq!(resp.status().as_u16(), 200, "login failed for {username}");
        let body: Value = resp.json().await.expect("json body");
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Polls scrape status until the job is idle.
    pub async fn wait_for_scrape(&self) -> Value {
        for _ in 0..200 {
            let (_, body) = self.get("/api/v1/scraping/status").await;
            if body["data"]["status"]["is_running"] == json!(false) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("scrape did not finish in time");
    }
}
