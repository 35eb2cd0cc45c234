mod common;

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use hotswap_proxy::config::{ConfigManager, FileConfigSource};
use hotswap_proxy::lifecycle::ShutdownSignal;
use hotswap_proxy::ControlPlane;

const GENERATIONS: u64 = 10;

/// Parse a mock body of the form `<host>:<generation>`.
fn parse_body(body: &str) -> (String, u64) {
    let (host, generation) = body.split_once(':').unwrap();
    (host.to_string(), generation.parse().unwrap())
}

async fn get(client: &reqwest::Client, url: &str, host: &str) -> (String, u64) {
    let response = client.get(url).header("host", host).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    parse_body(&response.text().await.unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hot_swap_under_load() {
    // Generation n routes a.test to "a:n" and b.test to "b:n".
    let mut configs = Vec::new();
    for generation in 1..=GENERATIONS {
        let a = start_mock_backend(format!("a:{generation}")).await;
        let b = start_mock_backend(format!("b:{generation}")).await;
        configs.push(config(vec![
            route("a", &["a.test"], "", &[a]),
            route("b", &["b.test"], "", &[b]),
        ]));
    }
    let mut configs = configs.into_iter();
    let manager = Arc::new(ConfigManager::new(configs.next().unwrap()));

    let source = manager.clone();
    let plane = ControlPlane::start(ephemeral_settings(), || Ok(source), ShutdownSignal::never())
        .await
        .unwrap();
    let url = proxy_url(&plane, "/");

    let running = Arc::new(AtomicBool::new(true));
    let served = Arc::new(AtomicUsize::new(0));
    let clients: Vec<_> = (0..4)
        .map(|_| {
            let (running, served, url) = (running.clone(), served.clone(), url.clone());
            tokio::spawn(async move {
                let client = client();
                let mut last_seen = 1;
                while running.load(Ordering::Relaxed) {
                    let (host_a, gen_a) = get(&client, &url, "a.test").await;
                    let (host_b, gen_b) = get(&client, &url, "b.test").await;
                    let (host_a2, gen_a2) = get(&client, &url, "a.test").await;

                    // Each host only ever reaches its own backends, and the
                    // table in force never goes back to an older generation.
                    assert_eq!((host_a.as_str(), host_b.as_str(), host_a2.as_str()), ("a", "b", "a"));
                    assert!(gen_a >= last_seen, "a went back from {last_seen} to {gen_a}");
                    assert!(gen_a <= gen_b && gen_b <= gen_a2, "a:{gen_a} b:{gen_b} a:{gen_a2}");
                    // No swap in between: b was served by the same table as a.
                    if gen_a == gen_a2 {
                        assert_eq!(gen_b, gen_a);
                    }
                    last_seen = gen_a2;
                    served.fetch_add(3, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for (generation, next) in (2..=GENERATIONS).zip(configs) {
        manager.publish(next);
        wait_for_generation(&plane, generation, Duration::from_secs(5)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    running.store(false, Ordering::Relaxed);
    for task in clients {
        task.await.unwrap();
    }
    assert!(served.load(Ordering::Relaxed) > 0);

    let client = client();
    assert_eq!(get(&client, &url, "a.test").await, ("a".to_string(), GENERATIONS));
    assert_eq!(get(&client, &url, "b.test").await, ("b".to_string(), GENERATIONS));

    plane.stop().await;
}

const FILE_SIZE: usize = 1024;

/// Overwrite in place with one fixed-size write, so the watcher never reads a
/// truncated file. Padding is a TOML comment.
fn write_file(path: &std::path::Path, contents: &str) {
    let mut padded = format!("{contents}\n#");
    assert!(padded.len() < FILE_SIZE);
    padded.extend(std::iter::repeat(' ').take(FILE_SIZE - padded.len()));

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .unwrap();
    file.write_all(padded.as_bytes()).unwrap();
    file.sync_all().unwrap();
}

fn file_config(backend: std::net::SocketAddr) -> String {
    format!(
        r#"
[proxy]
default_timeout = "5s"

[[routes]]
name = "all"
upstreams = ["http://{backend}"]
"#
    )
}

#[tokio::test]
async fn test_reload_resilience_with_file_source() {
    let first = start_mock_backend("first").await;
    let second = start_mock_backend("second").await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    write_file(&path, &file_config(first));

    let watched = path.clone();
    let plane = ControlPlane::start(
        ephemeral_settings(),
        move || FileConfigSource::open(&watched),
        ShutdownSignal::never(),
    )
    .await
    .unwrap();
    let url = proxy_url(&plane, "/");
    let client = client();

    // Unparseable file: nothing is published.
    write_file(&path, "[[routes]\nname = ");
    // Parseable but unbuildable: rejected by the control loop.
    write_file(
        &path,
        "[[routes]]\nname = \"broken\"\nupstreams = [\"://bad\"]\n",
    );
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(plane.generation(), 1);
    let body = client.get(&url).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "first");

    write_file(&path, &file_config(second));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let body = client.get(&url).send().await.unwrap().text().await.unwrap();
        if body == "second" {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "reload never applied");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(plane.generation() >= 2);

    plane.stop().await;
}

/// Save the way editors do: write a sibling temp file, then rename it over.
fn replace_file(path: &std::path::Path, contents: &str) {
    let tmp = path.with_extension("toml.tmp");
    let mut file = std::fs::File::create(&tmp).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.sync_all().unwrap();
    std::fs::rename(&tmp, path).unwrap();
}

async fn wait_for_body(client: &reqwest::Client, url: &str, want: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let body = client.get(url).send().await.unwrap().text().await.unwrap();
        if body == want {
            return;
        }
        assert!(tokio::time::Instant::now() < deadline, "still serving {body}, wanted {want}");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_reload_survives_rename_over_saves() {
    let first = start_mock_backend("first").await;
    let second = start_mock_backend("second").await;
    let third = start_mock_backend("third").await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    write_file(&path, &file_config(first));

    let watched = path.clone();
    let plane = ControlPlane::start(
        ephemeral_settings(),
        move || FileConfigSource::open(&watched),
        ShutdownSignal::never(),
    )
    .await
    .unwrap();
    let url = proxy_url(&plane, "/");
    let client = client();

    replace_file(&path, &file_config(second));
    wait_for_body(&client, &url, "second").await;

    // The file now has a new inode; later saves must still be picked up.
    replace_file(&path, &file_config(third));
    wait_for_body(&client, &url, "third").await;
    assert!(plane.generation() >= 3);

    plane.stop().await;
}
