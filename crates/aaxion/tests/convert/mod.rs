use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use aaxion::{
    ActivationResolver, ActivationSource, AaxionError, ConvertOptions, Converter, FfmpegLogLevel,
    MetadataProbe, ProgressEvent, Stage, Transcoder,
};

use crate::tools::{fake_container, fake_failing_ffmpeg, fake_ffmpeg, fake_ffprobe};

struct Fixture {
    dir: tempfile::TempDir,
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn ffmpeg_log(&self) -> PathBuf {
        self.path().join("ffmpeg.log")
    }

    fn converter(&self, brand: &str, options: ConvertOptions) -> Converter {
        let ffmpeg = fake_ffmpeg(self.path(), &self.ffmpeg_log());
        self.converter_with(ffmpeg, brand, options)
    }

    fn converter_with(&self, ffmpeg: PathBuf, brand: &str, options: ConvertOptions) -> Converter {
        let ffprobe = fake_ffprobe(self.path(), brand, "7384.918000");
        let sink = self.events.clone();

        Converter::new(
            MetadataProbe::new(ffprobe),
            ActivationResolver::new()
                .with_source(ActivationSource::Explicit("1CEB00DA".parse().unwrap())),
            Transcoder::new(
                ffmpeg,
                FfmpegLogLevel::Error,
                Arc::new(move |event| sink.lock().unwrap().push(event)),
            ),
            options,
        )
    }

    fn input(&self, name: &str) -> PathBuf {
        let path = self.path().join(name);
        fake_container(&path, [0xAB; 20]);
        path
    }
}

#[tokio::test]
async fn test_convert_with_loop() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let output_dir = fixture.path().join("out");
    let converter = fixture.converter(
        "aax ",
        ConvertOptions {
            output_dir: output_dir.clone(),
            output_name: None,
            loop_video: true,
        },
    );
    let input = fixture.input("book.aax");

    let report = converter.convert_all([&input]).await;
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.success_count(), 1);

    let conversion = &report.succeeded[0];
    assert_eq!(conversion.activation_bytes.to_string(), "1CEB00DA");
    assert_eq!(conversion.metadata.duration_seconds, 7384);
    assert_eq!(conversion.metadata.checksum.as_bytes(), &[0xAB; 20]);

    let base = "Jane Doe - A Long Book [2019]";
    assert_eq!(
        conversion.outputs,
        vec![
            output_dir.join(format!("{base}.m4a")),
            output_dir.join(format!("{base}.jpg")),
            output_dir.join(format!("{base}.mp4")),
        ]
    );
    for output in &conversion.outputs {
        assert!(output.exists(), "{} was not written", output.display());
    }

    let log = std::fs::read_to_string(fixture.ffmpeg_log())?;
    let invocations: Vec<_> = log.lines().collect();
    assert_eq!(invocations.len(), 3);
    assert!(invocations[0].contains("-activation_bytes 1CEB00DA"));
    assert!(invocations[2].contains("-shortest"));

    let events = fixture.events.lock().unwrap();
    // 1800s and 3600s of 7384s.
    assert!(events.contains(&ProgressEvent::Transcode {
        stage: Stage::Decode,
        percent: 24
    }));
    assert!(events.contains(&ProgressEvent::Transcode {
        stage: Stage::Decode,
        percent: 48
    }));
    let finished: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::StageFinished { stage } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![Stage::Decode, Stage::ExtractCover, Stage::Loop]);

    Ok(())
}

#[tokio::test]
async fn test_invalid_container_skips_ffmpeg() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let converter = fixture.converter(
        "M4A ",
        ConvertOptions {
            output_dir: fixture.path().join("out"),
            ..Default::default()
        },
    );
    let input = fixture.input("song.m4a");

    let report = converter.convert_all([&input]).await;
    assert_eq!(report.success_count(), 0);
    assert_eq!(report.failure_count(), 1);
    assert!(matches!(
        &report.failures[0].1,
        AaxionError::InvalidContainer { brand, .. } if brand == "m4a"
    ));
    assert!(!fixture.ffmpeg_log().exists());

    Ok(())
}

#[tokio::test]
async fn test_batch_continues_after_failure() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let output_dir = fixture.path().join("out");
    let converter = fixture.converter(
        "aax",
        ConvertOptions {
            output_dir: output_dir.clone(),
            output_name: Some("mybook".to_string()),
            loop_video: false,
        },
    );
    let first = fixture.input("first.aax");
    let missing = fixture.path().join("missing.aax");
    let third = fixture.input("third.aax");

    let report = converter.convert_all([&first, &missing, &third]).await;
    assert_eq!(report.success_count(), 2);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures[0].0, missing);

    assert!(output_dir.join("mybook.m4a").exists());
    assert!(output_dir.join("mybook.jpg").exists());
    assert!(output_dir.join("mybook_3.m4a").exists());
    assert!(!output_dir.join("mybook.mp4").exists());

    Ok(())
}

#[tokio::test]
async fn test_failed_stage_stops_remaining_stages() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let output_dir = fixture.path().join("out");
    let ffmpeg = fake_failing_ffmpeg(fixture.path(), &fixture.ffmpeg_log());
    let converter = fixture.converter_with(
        ffmpeg,
        "aax",
        ConvertOptions {
            output_dir: output_dir.clone(),
            output_name: None,
            loop_video: true,
        },
    );
    let input = fixture.input("book.aax");

    let report = converter.convert_all([&input]).await;
    assert_eq!(report.success_count(), 0);
    assert_eq!(report.failure_count(), 1);
    match &report.failures[0].1 {
        AaxionError::ProcessFailed { program, stderr, .. } => {
            assert_eq!(program, "ffmpeg");
            assert_eq!(stderr, "Invalid data found when processing input");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Only the decode stage ran.
    let log = std::fs::read_to_string(fixture.ffmpeg_log())?;
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("-vn"));

    let events = fixture.events.lock().unwrap();
    assert!(!events
        .iter()
        .any(|event| matches!(event, ProgressEvent::StageFinished { .. })));
    assert!(!events.iter().any(|event| matches!(
        event,
        ProgressEvent::Transcode { stage, .. } if *stage != Stage::Decode
    )));

    Ok(())
}

#[tokio::test]
async fn test_dots_only_tags_fall_back_to_input_name() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let output_dir = fixture.path().join("out");
    let converter = fixture.converter(
        "aax",
        ConvertOptions {
            output_dir: output_dir.clone(),
            output_name: Some("...".to_string()),
            loop_video: false,
        },
    );
    let input = fixture.input("my book.aax");

    let report = converter.convert_all([&input]).await;
    assert_eq!(report.success_count(), 1);
    assert!(output_dir.join("my book.m4a").exists());
    assert!(!output_dir.join(".m4a").exists());

    Ok(())
}
