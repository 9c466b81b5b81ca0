// metarr-core/tests/pipeline_tests.rs
//
// End-to-end runs of the batch orchestrator against temp directories, with
// every external tool replaced by the mocks in `metarr_core::external::mocks`.

use metarr_core::edit::{PromptAnswer, ScriptedPrompter};
use metarr_core::external::mocks::{
    FixedSystemProbe, MockFfmpegSpawner, MockFfprobeExecutor, StaticEncoderCatalog,
};
use metarr_core::model::{MetaOps, MetaSet};
use metarr_core::processing::ExecuteOutcome;
use metarr_core::scraper::{MockScraper, NoopScraper, Scraper, WebClass};
use metarr_core::{BatchProcessor, CancellationToken, Collaborators, CoreConfig, RunSummary};

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct Tools {
    spawner: MockFfmpegSpawner,
    prober: MockFfprobeExecutor,
    catalog: StaticEncoderCatalog,
    system: FixedSystemProbe,
    prompter: ScriptedPrompter,
}

impl Tools {
    fn new() -> Self {
        Self {
            spawner: MockFfmpegSpawner::succeeding(),
            prober: MockFfprobeExecutor::new(),
            catalog: StaticEncoderCatalog::new(["libx264", "aac", "libvpx-vp9", "libopus"]),
            system: FixedSystemProbe::new(u64::MAX, 0.0),
            prompter: ScriptedPrompter::new([]),
        }
    }

    fn run_with(&self, config: &CoreConfig, scraper: &dyn Scraper, cancel: CancellationToken) -> RunSummary {
        let tools = Collaborators {
            spawner: &self.spawner,
            prober: &self.prober,
            catalog: &self.catalog,
            system: &self.system,
            scraper,
            prompter: &self.prompter,
        };
        BatchProcessor::new(config, tools, cancel)
            .run()
            .expect("run should not fail with a config error")
    }

    fn run(&self, config: &CoreConfig) -> RunSummary {
        self.run_with(config, &NoopScraper::new(), CancellationToken::new())
    }
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn read_json(path: &Path) -> Map<String, Value> {
    let text = fs::read_to_string(path).unwrap();
    match serde_json::from_str(&text).unwrap() {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn position(args: &[String], needle: &str) -> usize {
    args.iter()
        .position(|a| a == needle)
        .unwrap_or_else(|| panic!("{needle} missing from {args:?}"))
}

#[test]
fn directory_pair_stream_copies_into_place() {
    let videos = tempfile::tempdir().unwrap();
    let sidecars = tempfile::tempdir().unwrap();
    let video = write(videos.path(), "clip.mp4", "original");
    let sidecar = write(
        sidecars.path(),
        "clip.info.json",
        r#"{"title":"Hello","upload_date":"20230101","webpage_url":"https://ex/video/1"}"#,
    );

    let config = CoreConfig {
        video_dirs: vec![videos.path().to_path_buf()],
        sidecar_dirs: vec![sidecars.path().to_path_buf()],
        ..CoreConfig::default()
    };
    let tools = Tools::new();
    let summary = tools.run(&config);

    assert!(!summary.has_failures(), "{:?}", summary.failures);
    assert_eq!(summary.processed.len(), 1);

    let json = read_json(&sidecar);
    for (key, expected) in [
        ("creation_time", "2023-01-01T00:00:00Z"),
        ("year", "2023"),
        ("date", "2023-01-01"),
        ("release_date", "2023-01-01"),
        ("originally_available_at", "2023-01-01"),
        ("formatted_date", "2023-01-01"),
    ] {
        assert_eq!(json.get(key).and_then(Value::as_str), Some(expected), "{key}");
    }

    let calls = tools.spawner.get_received_calls();
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    let temp = videos.path().join("tmp_clip.mp4.mp4");
    assert_eq!(&args[..5], ["-y", "-i", video.to_str().unwrap(), "-codec", "copy"]);
    assert_eq!(args.last().map(String::as_str), temp.to_str());
    let title = position(args, "title=Hello");
    let date = position(args, "date=2023-01-01");
    let created = position(args, "creation_time=2023-01-01T00:00:00Z");
    let year = position(args, "year=2023");
    assert!(title < date && date < created && created < year);
    assert_eq!(args[title - 1], "-metadata");

    assert_eq!(fs::read(&video).unwrap(), b"mock video");
    assert!(!temp.exists());
}

#[test]
fn webm_is_transcoded_to_mp4_and_original_removed() {
    let dir = tempfile::tempdir().unwrap();
    let video = write(dir.path(), "clip.webm", "webm bytes");
    write(dir.path(), "clip.info.json", r#"{"title":"X"}"#);

    let config = CoreConfig {
        video_dirs: vec![dir.path().to_path_buf()],
        output_ext: Some("mp4".to_string()),
        ..CoreConfig::default()
    };
    let tools = Tools::new();
    let summary = tools.run(&config);

    assert!(!summary.has_failures(), "{:?}", summary.failures);
    let final_path = dir.path().join("clip.mp4");
    assert_eq!(
        summary.processed[0].outcome,
        ExecuteOutcome::Encoded { final_path: final_path.clone() }
    );
    let args = &tools.spawner.get_received_calls()[0];
    assert!(args.contains(&"libx264".to_string()));
    assert!(args.contains(&"aac".to_string()));
    assert!(args.contains(&"256k".to_string()));
    assert!(args.contains(&"-keyint_min".to_string()));
    assert_eq!(
        args.last().map(PathBuf::from),
        Some(dir.path().join("tmp_clip.webm.mp4"))
    );
    assert!(final_path.exists());
    assert!(!video.exists());
}

#[test]
fn credits_fall_back_to_the_scraper() {
    let dir = tempfile::tempdir().unwrap();
    let sidecar = write(dir.path(), "clip.info.json", r#"{"webpage_url":"https://ex/a"}"#);
    let config = CoreConfig {
        sidecar_dirs: vec![dir.path().to_path_buf()],
        ..CoreConfig::default()
    };
    let scraper = MockScraper::new().with_answer(WebClass::Credits, "Jane");
    let tools = Tools::new();
    let summary = tools.run_with(&config, &scraper, CancellationToken::new());

    assert!(!summary.has_failures(), "{:?}", summary.failures);
    let json = read_json(&sidecar);
    for key in ["creator", "performer", "author", "artist", "director", "actor", "composer"] {
        assert_eq!(json.get(key).and_then(Value::as_str), Some("Jane"), "{key}");
    }
    assert!(scraper.calls().iter().any(|(class, _)| *class == WebClass::Credits));
}

#[test]
fn answering_no_to_all_preserves_for_the_rest_of_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(dir.path(), "a.info.json", r#"{"title":"Old"}"#);
    let second = write(dir.path(), "b.info.json", r#"{"title":"Old"}"#);
    let config = CoreConfig {
        sidecar_dirs: vec![dir.path().to_path_buf()],
        concurrency: 1,
        meta_ops: Arc::new(MetaOps {
            set: vec![MetaSet {
                field: "title".to_string(),
                value: "New".to_string(),
            }],
            ..MetaOps::default()
        }),
        ..CoreConfig::default()
    };
    let tools = Tools {
        prompter: ScriptedPrompter::new([PromptAnswer::NoToAll]),
        ..Tools::new()
    };
    let summary = tools.run(&config);

    assert!(!summary.has_failures(), "{:?}", summary.failures);
    assert_eq!(tools.prompter.questions().len(), 1);
    for path in [first, second] {
        assert_eq!(read_json(&path)["title"], "Old");
    }
}

#[test]
fn cancelling_a_gated_run_leaves_sidecars_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let body = r#"{"title":"Hello","upload_date":"20230101"}"#;
    let sidecar = write(dir.path(), "clip.info.json", body);
    let config = CoreConfig {
        sidecar_dirs: vec![dir.path().to_path_buf()],
        min_free_mem: 1 << 40,
        ..CoreConfig::default()
    };
    let tools = Tools {
        system: FixedSystemProbe::new(1 << 30, 10.0),
        ..Tools::new()
    };
    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            cancel.cancel();
        })
    };

    let summary = tools.run_with(&config, &NoopScraper::new(), cancel);
    canceller.join().unwrap();

    assert!(summary.cancelled);
    assert!(summary.processed.is_empty());
    assert!(!summary.has_failures());
    assert!(tools.system.polls() >= 1);
    assert_eq!(fs::read_to_string(&sidecar).unwrap(), body);
}

#[test]
fn non_string_values_survive_a_pass_without_edits() {
    let dir = tempfile::tempdir().unwrap();
    let sidecar = write(
        dir.path(),
        "clip.info.json",
        r#"{"title":"Hello","duration":61.5,"view_count":1200,"tags":["a","b"],"is_live":false,"formats":[{"id":1}],"extra":null}"#,
    );
    let before = read_json(&sidecar);
    let config = CoreConfig {
        sidecar_dirs: vec![dir.path().to_path_buf()],
        ..CoreConfig::default()
    };
    let summary = Tools::new().run(&config);
    assert!(!summary.has_failures(), "{:?}", summary.failures);

    let after = read_json(&sidecar);
    for (key, value) in &before {
        assert_eq!(after.get(key), Some(value), "{key}");
    }
}

#[test]
fn videos_pair_with_sidecars_by_normalised_name() {
    let videos = tempfile::tempdir().unwrap();
    let sidecars = tempfile::tempdir().unwrap();
    write(videos.path(), "My Clip!.mp4", "a");
    write(videos.path(), "other.mkv", "b");
    write(videos.path(), "lonely.mp4", "c");
    write(sidecars.path(), "my clip.info.json", r#"{"title":"One"}"#);
    write(sidecars.path(), "other.json", r#"{"title":"Two"}"#);
    write(sidecars.path(), "unrelated.info.json", r#"{"title":"Three"}"#);

    let config = CoreConfig {
        video_dirs: vec![videos.path().to_path_buf()],
        sidecar_dirs: vec![sidecars.path().to_path_buf()],
        ..CoreConfig::default()
    };
    let tools = Tools::new();
    let summary = tools.run(&config);

    assert!(!summary.has_failures(), "{:?}", summary.failures);
    let mut paired: Vec<String> = summary
        .processed
        .iter()
        .map(|r| r.sidecar.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    paired.sort();
    assert_eq!(paired, vec!["my clip.info.json", "other.json"]);
    assert_eq!(tools.spawner.get_received_calls().len(), 2);
    assert_eq!(fs::read(videos.path().join("lonely.mp4")).unwrap(), b"c");
}

#[test]
fn a_failing_ffmpeg_call_is_reported_and_keeps_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let video = write(dir.path(), "clip.mp4", "original");
    write(dir.path(), "clip.info.json", r#"{"title":"Hello"}"#);
    let config = CoreConfig {
        video_dirs: vec![dir.path().to_path_buf()],
        ..CoreConfig::default()
    };
    let tools = Tools {
        spawner: MockFfmpegSpawner::new(),
        ..Tools::new()
    };
    tools.spawner.add_exit_error_expectation("-y", Vec::new(), 1);

    let summary = tools.run(&config);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].file, video);
    assert_eq!(fs::read(&video).unwrap(), b"original");
    assert!(!dir.path().join("tmp_clip.mp4.mp4").exists());
}
