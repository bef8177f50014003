use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH};
use axum::http::{HeaderMap, Request, StatusCode};
use depot_host::{DepotConfig, build_state, router};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

struct Fixture {
    _temp: TempDir,
    packages: PathBuf,
    stats: PathBuf,
    router: Router,
}

impl Fixture {
    async fn new(files: &[(&str, &[u8])]) -> Result<Self> {
        let temp = TempDir::new()?;
        let packages = temp.path().join("packages");
        fs::create_dir_all(&packages)?;
        for (name, body) in files {
            fs::write(packages.join(name), body)?;
        }
        let stats = temp.path().join("stats.json");
        let cfg = DepotConfig {
            packages_dir: packages.clone(),
            stats_path: stats.clone(),
            port: 0,
            refresh_interval: None,
        };
        let state = build_state(&cfg).await?;
        Ok(Self {
            _temp: temp,
            packages,
            stats,
            router: router(state),
        })
    }

    async fn send(&self, method: &str, uri: &str) -> Result<(StatusCode, HeaderMap, Vec<u8>)> {
        let request = Request::builder().method(method).uri(uri).body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, headers, body.to_vec()))
    }

    async fn json(&self, method: &str, uri: &str) -> Result<(StatusCode, Value)> {
        let (status, _, body) = self.send(method, uri).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    fn add(&self, name: &str, body: &[u8]) -> Result<()> {
        fs::write(self.packages.join(name), body)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        fs::remove_file(self.packages.join(name))?;
        Ok(())
    }
}

fn versions(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry["version"].as_str())
                .collect()
        })
        .unwrap_or_default()
}

const FOO_FILES: &[(&str, &[u8])] = &[
    ("foo-1.0.0.tar.gz", b"foo one"),
    ("foo-2.1.0.tar.gz", b"foo two-one"),
    ("foo-2.0.5.tar.gz", b"foo two-oh-five"),
    ("bar-0.3-x86_64.tar.gz", b"bar"),
    ("README.txt", b"not a package"),
];

#[tokio::test]
async fn lists_every_package_newest_first() -> Result<()> {
    let fixture = Fixture::new(FOO_FILES).await?;
    let (status, body) = fixture.json("GET", "/api/packages").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(
        versions(&body["packages"]["foo"]),
        vec!["2.1.0", "2.0.5", "1.0.0"]
    );
    assert_eq!(versions(&body["packages"]["bar"]), vec!["0.3"]);
    let entry = &body["packages"]["bar"][0];
    assert_eq!(entry["filename"], "bar-0.3-x86_64.tar.gz");
    assert_eq!(entry["size"], 3);
    assert_eq!(entry["hash"].as_str().map(str::len), Some(64));
    Ok(())
}

#[tokio::test]
async fn search_is_case_insensitive_and_empty_matches_all() -> Result<()> {
    let fixture = Fixture::new(FOO_FILES).await?;
    let (_, body) = fixture.json("GET", "/api/search/OO").await?;
    assert_eq!(body["query"], "OO");
    assert_eq!(body["count"], 1);
    assert!(body["results"]["foo"].is_array());

    let (_, body) = fixture.json("GET", "/api/search").await?;
    assert_eq!(body["query"], "");
    assert_eq!(body["count"], 2);

    let (status, body) = fixture.json("GET", "/api/search/zzz").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    Ok(())
}

#[tokio::test]
async fn package_detail_and_not_found() -> Result<()> {
    let fixture = Fixture::new(FOO_FILES).await?;
    let (status, body) = fixture.json("GET", "/api/package/foo").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "foo");
    assert_eq!(versions(&body["versions"]).len(), 3);

    let (status, body) = fixture.json("GET", "/api/package/Foo").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["name"], "Foo");
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn downloads_latest_and_counts_it() -> Result<()> {
    let fixture = Fixture::new(FOO_FILES).await?;
    let (status, headers, body) = fixture.send("GET", "/packages/foo").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"foo two-one");
    assert_eq!(
        headers[CONTENT_DISPOSITION],
        "attachment; filename=\"foo-2.1.0.tar.gz\""
    );
    assert_eq!(headers[CONTENT_LENGTH], "11");

    let (_, stats) = fixture.json("GET", "/api/stats").await?;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["downloads"]["foo@2.1.0"], 1);
    assert_eq!(stats["lastDownload"]["package"], "foo");
    assert_eq!(stats["lastDownload"]["version"], "2.1.0");

    let persisted: Value = serde_json::from_slice(&fs::read(&fixture.stats)?)?;
    assert_eq!(persisted["downloads"]["foo@2.1.0"], 1);
    Ok(())
}

#[tokio::test]
async fn quoted_filename_gets_an_escaped_disposition() -> Result<()> {
    let fixture = Fixture::new(&[("foo-1.0-a\"b.tar.gz", &b"quoted"[..])]).await?;
    let (status, headers, body) = fixture.send("GET", "/packages/foo").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"quoted");
    assert_eq!(
        headers[CONTENT_DISPOSITION],
        r#"attachment; filename="foo-1.0-a\"b.tar.gz""#
    );

    let (_, stats) = fixture.json("GET", "/api/stats").await?;
    assert_eq!(stats["total"], 1);
    Ok(())
}

#[tokio::test]
async fn control_character_filename_still_downloads_once() -> Result<()> {
    let fixture = Fixture::new(&[("foo-1.0-a\nb.tar.gz", &b"newline"[..])]).await?;
    let (status, headers, body) = fixture.send("GET", "/packages/foo/1.0").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"newline");
    assert_eq!(
        headers[CONTENT_DISPOSITION],
        "attachment; filename=\"foo-1.0-a_b.tar.gz\""
    );

    let persisted: Value = serde_json::from_slice(&fs::read(&fixture.stats)?)?;
    assert_eq!(persisted["total"], 1);
    assert_eq!(persisted["lastDownload"]["version"], "1.0");
    Ok(())
}

#[tokio::test]
async fn pinned_download_requires_exact_version() -> Result<()> {
    let fixture = Fixture::new(&[("foo-1.0.0.0.tar.gz", &b"four part"[..])]).await?;
    let (status, body) = fixture.json("GET", "/packages/foo/1.0.0").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["version"], "1.0.0");
    assert_eq!(body["available"], serde_json::json!(["1.0.0.0"]));

    let (status, _, body) = fixture.send("GET", "/packages/foo/1.0.0.0").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"four part");

    // Misses are not counted.
    let (_, stats) = fixture.json("GET", "/api/stats").await?;
    assert_eq!(stats["total"], 1);
    Ok(())
}

#[tokio::test]
async fn vanished_file_is_reported_until_refresh() -> Result<()> {
    let fixture = Fixture::new(FOO_FILES).await?;
    fixture.remove("foo-2.1.0.tar.gz")?;

    let (status, body) = fixture.json("GET", "/packages/foo").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["filename"], "foo-2.1.0.tar.gz");

    let (_, stats) = fixture.json("GET", "/api/stats").await?;
    assert_eq!(stats["total"], 0);

    fixture.add("foo-3.0.tar.gz", b"foo three")?;
    let (status, body) = fixture.json("POST", "/api/refresh").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert!(body["message"].is_string());

    let (_, body) = fixture.json("GET", "/api/package/foo").await?;
    assert_eq!(versions(&body["versions"]), vec!["3.0", "2.0.5", "1.0.0"]);
    let (_, _, body) = fixture.send("GET", "/packages/foo").await?;
    assert_eq!(body, b"foo three");
    Ok(())
}

#[tokio::test]
async fn missing_package_directory_serves_empty_catalog() -> Result<()> {
    let temp = TempDir::new()?;
    let cfg = DepotConfig {
        packages_dir: temp.path().join("does-not-exist"),
        stats_path: temp.path().join("stats.json"),
        port: 0,
        refresh_interval: None,
    };
    let state = build_state(&cfg).await?;
    let router = router(state);
    let response = router
        .clone()
        .oneshot(Request::get("/api/packages").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await?)?;
    assert_eq!(body["count"], 0);

    let response = router
        .oneshot(Request::get("/healthz").body(Body::empty())?)
        .await?;
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await?)?;
    assert_eq!(body["status"], "degraded");
    assert!(body["lastError"].as_str().is_some());
    Ok(())
}
